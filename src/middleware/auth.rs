use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{extract_token, validate_jwt, AuthError};
use crate::config;
use crate::error::ApiError;
use crate::models::user;
use crate::store::{Document, StoreHandle};
use crate::types::Role;

/// Authenticated caller, loaded from the store on every protected request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    /// Stored user document with the password hash removed
    pub document: Document,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owner match by stored `user` field, or admin
    pub fn can_modify(&self, owner: Option<&str>) -> bool {
        self.is_admin() || owner == Some(self.id.as_str())
    }
}

/// Validates the bearer/cookie JWT and injects [`AuthUser`] into the request.
///
/// The token only proves identity; the role comes from the stored user, so a
/// deleted account or a changed role takes effect immediately.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers).ok_or(AuthError::MissingToken)?;
    let claims = validate_jwt(&token, &config::config().security).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::from(e)
    })?;

    let StoreHandle(store) = request
        .extensions()
        .get::<StoreHandle>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Store not configured"))?;

    let stored = store.find_by_id(user::COLLECTION, &claims.sub).await?.ok_or_else(|| {
        tracing::warn!("Token subject {} no longer exists", claims.sub);
        ApiError::unauthorized("Not authorized to access this route")
    })?;

    let auth_user = AuthUser {
        id: claims.sub,
        role: user::role_of(&stored),
        document: user::to_public(stored),
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Role gate applied inside handlers after authentication
pub fn authorize(user: &AuthUser, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        tracing::warn!("User {} with role {} denied", user.id, user.role);
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )))
    }
}
