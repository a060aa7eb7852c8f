use thiserror::Error;

use super::types::is_field_path;

/// Rejections raised where a compiled query meets a concrete store.
///
/// The compiler itself never fails; stores call [`validate_field`] before
/// turning a field name into store syntax.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),
}

pub fn validate_field(name: &str) -> Result<(), QueryError> {
    if is_field_path(name) {
        Ok(())
    } else {
        Err(QueryError::InvalidField(name.to_string()))
    }
}

pub fn validate_collection(name: &str) -> Result<(), QueryError> {
    if name.is_empty() {
        return Err(QueryError::InvalidCollection("Collection name cannot be empty".to_string()));
    }
    let mut chars = name.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    if !first_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(QueryError::InvalidCollection(format!("Invalid collection name format: {}", name)));
    }
    Ok(())
}
