use axum::extract::{Extension, Path};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::utils::{ensure_unique, find_or_404, require_owner};
use crate::middleware::{authorize, ApiResponse, ApiResult, AuthUser, ValidJson};
use crate::models::bootcamp::{self, BootcampInput, COLLECTION};
use crate::models::course;
use crate::query::{CompiledFilter, Predicate};
use crate::store::{Document, StoreHandle};
use crate::types::Role;

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

/// POST /api/v1/bootcamps - Publishers may own one bootcamp; admins any number
pub async fn create(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(input): ValidJson<BootcampInput>,
) -> ApiResult<Document> {
    authorize(&auth, &PUBLISHERS)?;

    if !auth.is_admin() {
        let owned = CompiledFilter::new().with("user", Predicate::eq(auth.id.clone()));
        if store.find_one(COLLECTION, &owned).await?.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                auth.id
            )));
        }
    }

    input.validate(false)?;
    if let Some(name) = input.name.as_deref() {
        ensure_unique(store.as_ref(), COLLECTION, "name", name.trim(), None).await?;
    }

    let created = store.insert(COLLECTION, input.into_document(&auth.id)?).await?;
    tracing::info!("User {} created bootcamp {}", auth.id, created.get("id").unwrap_or(&serde_json::Value::Null));
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/bootcamps/:id - Owner or admin
pub async fn update(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<BootcampInput>,
) -> ApiResult<Document> {
    authorize(&auth, &PUBLISHERS)?;
    let existing = find_or_404(store.as_ref(), COLLECTION, &id, "Bootcamp").await?;
    require_owner(&auth, bootcamp::owner(&existing), "update this bootcamp")?;

    input.validate(true)?;
    if let Some(name) = input.name.as_deref() {
        ensure_unique(store.as_ref(), COLLECTION, "name", name.trim(), Some(&id)).await?;
    }

    let updated = store
        .update(COLLECTION, &id, input.into_changes()?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {}", id)))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - Owner or admin; its courses go with it
pub async fn delete(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    authorize(&auth, &PUBLISHERS)?;
    let existing = find_or_404(store.as_ref(), COLLECTION, &id, "Bootcamp").await?;
    require_owner(&auth, bootcamp::owner(&existing), "delete this bootcamp")?;

    let courses = CompiledFilter::new().with("bootcamp", Predicate::eq(id.clone()));
    let removed = store.delete_many(course::COLLECTION, &courses).await?;
    store.delete(COLLECTION, &id).await?;

    tracing::info!("User {} deleted bootcamp {} and {} courses", auth.id, id, removed);
    Ok(ApiResponse::success(json!({})))
}
