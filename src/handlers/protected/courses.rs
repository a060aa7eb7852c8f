use axum::extract::{Extension, Path};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::utils::{find_or_404, require_owner};
use crate::middleware::{authorize, ApiResponse, ApiResult, AuthUser, ValidJson};
use crate::models::bootcamp;
use crate::models::course::{CourseInput, COLLECTION};
use crate::store::{Document, StoreHandle};
use crate::types::Role;

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

fn course_owner(course: &Document) -> Option<&str> {
    course.get("user").and_then(Value::as_str)
}

/// POST /api/v1/bootcamps/:id/courses - Bootcamp owner or admin
pub async fn create(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    ValidJson(input): ValidJson<CourseInput>,
) -> ApiResult<Document> {
    authorize(&auth, &PUBLISHERS)?;
    let parent = store
        .find_by_id(bootcamp::COLLECTION, &bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id)))?;
    require_owner(
        &auth,
        bootcamp::owner(&parent),
        &format!("add a course to bootcamp {}", bootcamp_id),
    )?;

    input.validate(false)?;
    let created = store
        .insert(COLLECTION, input.into_document(&bootcamp_id, &auth.id)?)
        .await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/courses/:id - Owner or admin
pub async fn update(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<CourseInput>,
) -> ApiResult<Document> {
    authorize(&auth, &PUBLISHERS)?;
    let existing = find_or_404(store.as_ref(), COLLECTION, &id, "Course").await?;
    require_owner(&auth, course_owner(&existing), &format!("update course {}", id))?;

    input.validate(true)?;
    let updated = store
        .update(COLLECTION, &id, input.into_changes()?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course not found with id of {}", id)))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id - Owner or admin
pub async fn delete(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    authorize(&auth, &PUBLISHERS)?;
    let existing = find_or_404(store.as_ref(), COLLECTION, &id, "Course").await?;
    require_owner(&auth, course_owner(&existing), &format!("delete course {}", id))?;

    store.delete(COLLECTION, &id).await?;
    Ok(ApiResponse::success(json!({})))
}
