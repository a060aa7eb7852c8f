use axum::extract::{Extension, Path};

use crate::error::ApiError;
use crate::handlers::utils::{compiler, find_or_404};
use crate::middleware::{ApiResult, ApiResponse, PagedResponse};
use crate::models::bootcamp::{courses_expansion, COLLECTION};
use crate::query::{RawQuery, ResultPaginator};
use crate::store::{Document, StoreHandle};

/// GET /api/v1/bootcamps - Filtered, sorted, paged list with courses joined
pub async fn list(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    raw: RawQuery,
) -> Result<PagedResponse, ApiError> {
    let query = compiler().compile(&raw);
    let expansion = courses_expansion();
    let page = ResultPaginator::new(store.as_ref(), COLLECTION)
        .expand(&expansion)
        .paginate(&query)
        .await?;
    Ok(PagedResponse(page))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    let bootcamp = find_or_404(store.as_ref(), COLLECTION, &id, "Bootcamp").await?;
    Ok(ApiResponse::success(bootcamp))
}
