use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::query::Page;
use crate::store::Document;

/// Wrapper for API responses that adds the `{success, data}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    pub cookie: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
            cookie: None,
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
            cookie: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookie = Some(cookie);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => return serialization_failure(e),
        };

        let envelope = json!({
            "success": true,
            "data": data_value
        });

        let mut response = (status, Json(envelope)).into_response();
        if let Some(cookie) = self.cookie {
            set_cookie(&mut response, &cookie);
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

/// List envelope: `{success, count, total, pagination, data}`
#[derive(Debug)]
pub struct PagedResponse(pub Page);

impl IntoResponse for PagedResponse {
    fn into_response(self) -> Response {
        let Page { records, meta } = self.0;
        let pagination = match serde_json::to_value(&meta.pagination) {
            Ok(value) => value,
            Err(e) => return serialization_failure(e),
        };
        let data: Vec<Value> = records.into_iter().map(Value::Object).collect();
        Json(json!({
            "success": true,
            "count": meta.count,
            "total": meta.total,
            "pagination": pagination,
            "data": data
        }))
        .into_response()
    }
}

/// Unpaginated collection: `{success, count, data}`
#[derive(Debug)]
pub struct CollectionResponse(pub Vec<Document>);

impl IntoResponse for CollectionResponse {
    fn into_response(self) -> Response {
        let data: Vec<Value> = self.0.into_iter().map(Value::Object).collect();
        Json(json!({
            "success": true,
            "count": data.len(),
            "data": data
        }))
        .into_response()
    }
}

/// `{success, token}` plus the `token` cookie
#[derive(Debug)]
pub struct TokenResponse {
    pub token: String,
    pub cookie: String,
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let mut response = Json(json!({
            "success": true,
            "token": self.token
        }))
        .into_response();
        set_cookie(&mut response, &self.cookie);
        response
    }
}

fn set_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
    }
}

fn serialization_failure(e: serde_json::Error) -> Response {
    tracing::error!("Failed to serialize response data: {}", e);
    crate::error::ApiError::internal_server_error("Failed to serialize response data").into_response()
}
