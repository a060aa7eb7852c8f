//! Entity documents: input payloads, validation and document builders.

pub mod bootcamp;
pub mod course;
pub mod user;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::store::Document;

/// `createdAt` value: RFC 3339 UTC with milliseconds, so text order is time order.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serializes an input struct into a document, skipping absent fields.
pub(crate) fn to_document<T: Serialize>(input: &T) -> Result<Document, ApiError> {
    match serde_json::to_value(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::internal_server_error("Input did not serialize to an object")),
        Err(e) => {
            tracing::error!("Input serialization failed: {}", e);
            Err(ApiError::internal_server_error("Failed to process request body"))
        }
    }
}

/// Collects per-field messages and fails once at the end.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// Required on create; on update only a blank value is rejected.
    pub fn required(&mut self, field: &str, value: Option<&str>, partial: bool, message: &str) {
        match value {
            Some(text) if text.trim().is_empty() => self.fail(field, message),
            None if !partial => self.fail(field, message),
            _ => {}
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if value.map(|text| text.chars().count() > max).unwrap_or(false) {
            self.fail(field, message);
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self.errors.values().cloned().collect::<Vec<_>>().join(", ");
        Err(ApiError::validation_error(message, self.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width_utc() {
        let ts = timestamp();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn validator_reports_every_field() {
        let mut v = Validator::new();
        v.required("name", None, false, "Please add a name");
        v.required("email", Some("  "), true, "Please add an email");
        v.required("address", None, true, "Please add an address");
        v.max_len("phone", Some("123456"), 5, "Phone too long");
        let err = v.finish().unwrap_err();
        let body = err.to_json();
        assert_eq!(body["field_errors"].as_object().unwrap().len(), 3);
        assert_eq!(body["message"], "Please add an email, Please add a name, Phone too long");
    }
}
