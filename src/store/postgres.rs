use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::time::Instant;
use uuid::Uuid;

use super::sql::{self, SqlResult, DOCUMENTS_TABLE};
use super::{document_id, project, Document, DocumentStore, FindOptions, StoreError};
use crate::config::DatabaseConfig;
use crate::database::DatabaseManager;
use crate::query::{validate_collection, CompiledFilter, ID_FIELD};

/// Documents kept as JSONB rows keyed by `(collection, id)`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    log_queries: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = DatabaseManager::connect(config).await?;
        let store = Self::new(pool, config.enable_query_logging);
        store.migrate().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool, log_queries: bool) -> Self {
        Self { pool, log_queries }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )",
            DOCUMENTS_TABLE
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    fn log(&self, sql: &SqlResult, started: Instant) {
        if self.log_queries {
            tracing::debug!(
                query = %sql.query,
                params = sql.params.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "document query"
            );
        }
    }

    fn bind_all<'q>(
        collection: &'q str,
        sql: &'q SqlResult,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let mut query = sqlx::query(&sql.query).bind(collection);
        for param in &sql.params {
            query = query.bind(param);
        }
        query
    }

    fn row_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
        match row.try_get::<Value, _>("data")? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::MalformedDocument(format!("expected object, got {}", other))),
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn count(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError> {
        let sql = sql::to_count_sql(collection, filter)?;
        let started = Instant::now();
        let row = Self::bind_all(collection, &sql).fetch_one(&self.pool).await?;
        self.log(&sql, started);
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find(&self, collection: &str, options: &FindOptions<'_>) -> Result<Vec<Document>, StoreError> {
        let sql = sql::to_find_sql(collection, options)?;
        let started = Instant::now();
        let rows = Self::bind_all(collection, &sql).fetch_all(&self.pool).await?;
        self.log(&sql, started);
        rows.iter()
            .map(|row| Self::row_document(row).map(|doc| project(&doc, options.projection)))
            .collect()
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let query = format!("SELECT data FROM {} WHERE collection = $1 AND id = $2", DOCUMENTS_TABLE);
        let row = sqlx::query(&query)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_document).transpose()
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<Document, StoreError> {
        validate_collection(collection)?;
        let id = match document_id(&document) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        let query = format!("INSERT INTO {} (collection, id, data) VALUES ($1, $2, $3)", DOCUMENTS_TABLE);
        let result = sqlx::query(&query)
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(document.clone()))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(document),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(StoreError::Duplicate { collection: collection.to_string(), id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, collection: &str, id: &str, mut changes: Document) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        changes.remove(ID_FIELD);
        let query = format!(
            "UPDATE {} SET data = data || $3 WHERE collection = $1 AND id = $2 RETURNING data",
            DOCUMENTS_TABLE
        );
        let row = sqlx::query(&query)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(changes))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_document).transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        validate_collection(collection)?;
        let query = format!("DELETE FROM {} WHERE collection = $1 AND id = $2", DOCUMENTS_TABLE);
        let result = sqlx::query(&query)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError> {
        let sql = sql::to_delete_sql(collection, filter)?;
        let started = Instant::now();
        let result = Self::bind_all(collection, &sql).execute(&self.pool).await?;
        self.log(&sql, started);
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
