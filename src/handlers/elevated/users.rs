use axum::extract::{Extension, Path};

use crate::error::ApiError;
use crate::handlers::utils::{compiler, find_or_404, reject_hidden_fields};
use crate::middleware::{authorize, ApiResponse, ApiResult, AuthUser, PagedResponse};
use crate::models::user::{self, COLLECTION, HIDDEN_FIELDS};
use crate::query::{RawQuery, ResultPaginator};
use crate::store::{Document, StoreHandle};
use crate::types::Role;

/// GET /api/v1/users - Admin list; password hashes never leave the store
pub async fn list(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    raw: RawQuery,
) -> Result<PagedResponse, ApiError> {
    authorize(&auth, &[Role::Admin])?;
    let query = compiler().compile(&raw);
    reject_hidden_fields(&query, &HIDDEN_FIELDS)?;

    let mut page = ResultPaginator::new(store.as_ref(), COLLECTION).paginate(&query).await?;
    page.records = page.records.into_iter().map(user::to_public).collect();
    Ok(PagedResponse(page))
}

/// GET /api/v1/users/:id
pub async fn get(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    authorize(&auth, &[Role::Admin])?;
    let found = find_or_404(store.as_ref(), COLLECTION, &id, "User").await?;
    Ok(ApiResponse::success(user::to_public(found)))
}
