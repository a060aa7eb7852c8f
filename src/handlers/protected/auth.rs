use axum::extract::Extension;
use serde_json::{json, Value};

use crate::auth::{cleared_cookie, hash_password, verify_password};
use crate::config;
use crate::error::ApiError;
use crate::handlers::utils::{ensure_unique, find_or_404, token_response};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TokenResponse, ValidJson};
use crate::models::user::{self, UpdateDetailsInput, UpdatePasswordInput, COLLECTION};
use crate::store::{Document, StoreHandle};

/// GET /api/v1/auth/logout - Clear the token cookie
pub async fn logout(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    tracing::info!("User {} logged out", auth.id);
    Ok(ApiResponse::success(json!({})).with_cookie(cleared_cookie(&config::config().security)))
}

/// GET /api/v1/auth/me
pub async fn me(Extension(auth): Extension<AuthUser>) -> ApiResult<Document> {
    Ok(ApiResponse::success(auth.document))
}

/// PUT /api/v1/auth/updatedetails - Name and email only
pub async fn update_details(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(input): ValidJson<UpdateDetailsInput>,
) -> ApiResult<Document> {
    input.validate()?;
    let changes = input.into_changes();
    if let Some(email) = changes.get("email").and_then(Value::as_str) {
        ensure_unique(store.as_ref(), COLLECTION, "email", email, Some(&auth.id)).await?;
    }

    let updated = store
        .update(COLLECTION, &auth.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User not found with id of {}", auth.id)))?;
    Ok(ApiResponse::success(user::to_public(updated)))
}

/// PUT /api/v1/auth/updatepassword - Verify the current password, store the new one, reissue the token
pub async fn update_password(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(input): ValidJson<UpdatePasswordInput>,
) -> Result<TokenResponse, ApiError> {
    input.validate()?;
    let stored = find_or_404(store.as_ref(), COLLECTION, &auth.id, "User").await?;

    let current = input.current_password.as_deref().unwrap_or_default();
    if !user::password_hash(&stored).map_or(false, |hash| verify_password(current, hash)) {
        return Err(ApiError::unauthorized("Incorrect Password"));
    }

    let hash = hash_password(input.new_password.as_deref().unwrap_or_default())?;
    let mut changes = Document::new();
    changes.insert("password".into(), Value::String(hash));
    store.update(COLLECTION, &auth.id, changes).await?;

    tracing::info!("User {} changed password", auth.id);
    token_response(&auth.id, auth.role)
}
