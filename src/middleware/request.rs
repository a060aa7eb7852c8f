use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

use crate::error::ApiError;
use crate::query::RawQuery;

/// The raw query string, pairs in arrival order with repeats kept.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RawQuery {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RawQuery::parse(parts.uri.query().unwrap_or_default()))
    }
}

/// `Json<T>` whose rejection uses the API error body.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ValidJson(value))
            .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use serde_json::Value;

    #[tokio::test]
    async fn query_pairs_keep_order_and_repeats() {
        let request = Request::builder()
            .uri("/api/v1/bootcamps?careers[in]=Business&sort=-name&sort=slug")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let raw = RawQuery::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(raw.pairs().len(), 3);
        assert_eq!(raw.pairs()[0], ("careers[in]".to_string(), "Business".to_string()));
    }

    #[tokio::test]
    async fn malformed_json_is_api_error() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = ValidJson::<Value>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }
}
