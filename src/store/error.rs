use thiserror::Error;

use crate::query::QueryError;

/// Failures surfaced by a [`DocumentStore`](super::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    InvalidQuery(#[from] QueryError),

    #[error("Duplicate key in {collection}: {id}")]
    Duplicate { collection: String, id: String },

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Connectivity problems as opposed to rejected queries.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlx(
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            )
        )
    }
}
