use serde_json::Value;

use crate::auth::{generate_jwt, token_cookie, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::{AuthUser, TokenResponse};
use crate::query::{CompiledFilter, CompiledQuery, Predicate, QueryCompiler};
use crate::store::{document_id, Document, DocumentStore};
use crate::types::Role;

/// Compiler built from the `query` config section
pub fn compiler() -> QueryCompiler {
    QueryCompiler::from_config(&config::config().query)
}

/// Refuses list queries that select, filter or sort on a hidden field.
pub fn reject_hidden_fields(query: &CompiledQuery, hidden: &[&str]) -> Result<(), ApiError> {
    let touches = |field: &str| {
        hidden
            .iter()
            .any(|h| field == *h || field.strip_prefix(*h).map_or(false, |rest| rest.starts_with('.')))
    };

    let selected = query.projection.names().iter().map(String::as_str);
    let sorted = query.sort.fields().iter().map(|s| s.field.as_str());
    match query.filter.fields().chain(selected).chain(sorted).find(|f| touches(*f)) {
        Some(field) => Err(ApiError::bad_request(format!("Field '{}' cannot be queried", field))),
        None => Ok(()),
    }
}

pub async fn find_or_404(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    label: &str,
) -> Result<Document, ApiError> {
    store
        .find_by_id(collection, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found with id of {}", label, id)))
}

/// Fails when another document in `collection` already has `field == value`.
pub async fn ensure_unique(
    store: &dyn DocumentStore,
    collection: &str,
    field: &str,
    value: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let filter = CompiledFilter::new().with(field, Predicate::eq(Value::String(value.to_string())));
    match store.find_one(collection, &filter).await? {
        Some(existing) if document_id(&existing) != except_id => {
            tracing::debug!("{}.{} already taken", collection, field);
            Err(ApiError::bad_request("Duplicate field value entered"))
        }
        _ => Ok(()),
    }
}

/// Owner-or-admin check; failures are 401 like the rest of the auth surface.
pub fn require_owner(user: &AuthUser, owner: Option<&str>, action: &str) -> Result<(), ApiError> {
    if user.can_modify(owner) {
        Ok(())
    } else {
        tracing::warn!("User {} denied: {}", user.id, action);
        Err(ApiError::unauthorized(format!("User ID {} is not authorized to {}", user.id, action)))
    }
}

pub fn token_response(user_id: &str, role: Role) -> Result<TokenResponse, ApiError> {
    let security = &config::config().security;
    let token = generate_jwt(&Claims::new(user_id, role, security), security)?;
    let cookie = token_cookie(&token, security);
    Ok(TokenResponse { token, cookie })
}
