use axum::extract::Extension;

use crate::auth::{hash_password, verify_password, AuthError};
use crate::error::ApiError;
use crate::handlers::utils::{ensure_unique, token_response};
use crate::middleware::{TokenResponse, ValidJson};
use crate::models::user::{self, LoginInput, RegisterInput, COLLECTION};
use crate::query::{CompiledFilter, Predicate};
use crate::store::{document_id, StoreHandle};

/// POST /api/v1/auth/register - Create an account and sign it in
pub async fn register(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    ValidJson(input): ValidJson<RegisterInput>,
) -> Result<TokenResponse, ApiError> {
    input.validate()?;
    let email = user::normalize_email(input.email.as_deref().unwrap_or_default());
    ensure_unique(store.as_ref(), COLLECTION, "email", &email, None).await?;

    let password = input.password.clone().unwrap_or_default();
    let hash = hash_password(&password)?;
    let role = input.role.unwrap_or_default();
    let created = store.insert(COLLECTION, input.into_document(hash)).await?;
    let id = document_id(&created).ok_or_else(|| ApiError::internal_server_error("User was stored without an id"))?;

    tracing::info!("Registered user {} as {}", id, role);
    token_response(id, role)
}

/// POST /api/v1/auth/login - Exchange email and password for a token
pub async fn login(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    ValidJson(input): ValidJson<LoginInput>,
) -> Result<TokenResponse, ApiError> {
    let (email, password) = input.credentials()?;
    let filter = CompiledFilter::new().with("email", Predicate::eq(email));
    let found = store.find_one(COLLECTION, &filter).await?;

    let account = match found {
        Some(account) if user::password_hash(&account).map_or(false, |hash| verify_password(password, hash)) => account,
        _ => {
            tracing::info!("Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let id = document_id(&account).ok_or_else(|| ApiError::internal_server_error("Stored user has no id"))?;
    token_response(id, user::role_of(&account))
}
