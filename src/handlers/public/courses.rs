use axum::extract::{Extension, Path};
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::utils::{compiler, find_or_404};
use crate::middleware::{ApiResponse, ApiResult, CollectionResponse, PagedResponse};
use crate::models::course::{bootcamp_expansion, COLLECTION};
use crate::query::{populate, CompiledFilter, Predicate, Projection, RawQuery, ResultPaginator};
use crate::store::{Document, FindOptions, StoreHandle};

/// GET /api/v1/courses - Paged list with the parent bootcamp's name and description
pub async fn list(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    raw: RawQuery,
) -> Result<PagedResponse, ApiError> {
    let query = compiler().compile(&raw);
    let expansion = bootcamp_expansion();
    let page = ResultPaginator::new(store.as_ref(), COLLECTION)
        .expand(&expansion)
        .paginate(&query)
        .await?;
    Ok(PagedResponse(page))
}

/// GET /api/v1/bootcamps/:id/courses - Every course of one bootcamp, unpaginated
pub async fn list_for_bootcamp(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Path(bootcamp_id): Path<String>,
) -> Result<CollectionResponse, ApiError> {
    let filter = CompiledFilter::new().with("bootcamp", Predicate::eq(Value::String(bootcamp_id)));
    let sort = compiler().defaults().sort.clone();
    let options = FindOptions {
        filter: &filter,
        projection: &Projection::All,
        sort: &sort,
        skip: 0,
        limit: None,
    };
    let courses = store.find(COLLECTION, &options).await?;
    Ok(CollectionResponse(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    let course = find_or_404(store.as_ref(), COLLECTION, &id, "Course").await?;
    let mut records = vec![course];
    populate(store.as_ref(), &bootcamp_expansion(), &mut records).await?;
    let course = records.pop().ok_or_else(|| ApiError::internal_server_error("Course lookup failed"))?;
    Ok(ApiResponse::success(course))
}
