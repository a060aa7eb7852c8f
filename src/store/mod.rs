pub mod error;
pub mod memory;
pub mod postgres;
pub mod sql;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::query::{CompiledFilter, Projection, SortSpec, DEFAULT_SORT, ID_FIELD};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored record: a JSON object carrying at least an `id`.
pub type Document = Map<String, Value>;

/// Everything a bounded, sorted, projected read needs.
#[derive(Debug, Clone, Copy)]
pub struct FindOptions<'a> {
    pub filter: &'a CompiledFilter,
    pub projection: &'a Projection,
    pub sort: &'a SortSpec,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// The document/collection store behind every route.
///
/// Implementations validate field names before use and break sort ties on
/// `id` ascending so reads are deterministic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn count(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError>;

    async fn find(&self, collection: &str, options: &FindOptions<'_>) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Stores a document, assigning an `id` when it has none.
    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    /// Shallow-merges `changes` into the document; `None` when it does not exist.
    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &CompiledFilter) -> Result<Option<Document>, StoreError> {
        let sort = default_sort();
        let options = FindOptions {
            filter,
            projection: &Projection::All,
            sort: &sort,
            skip: 0,
            limit: Some(1),
        };
        Ok(self.find(collection, &options).await?.into_iter().next())
    }
}

/// Shared handle injected into requests as an extension.
#[derive(Clone)]
pub struct StoreHandle(pub Arc<dyn DocumentStore>);

/// Picks the backend: Postgres when a database URL is configured, memory otherwise.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(Arc::new(PgStore::connect(config).await?)),
        _ => {
            tracing::warn!("DATABASE_URL not set; using in-memory document store (data is not persisted)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub(crate) fn default_sort() -> SortSpec {
    crate::query::FilterOrder::parse([DEFAULT_SORT])
}

/// Text that loose comparisons treat as a number: optional sign, digits with an
/// optional fraction, optional exponent, surrounding spaces ignored. Both stores
/// use this grammar so text-held numbers compare the same everywhere.
pub fn numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim_matches(' ');
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mantissa_ok = digits(whole) && digits(fraction) && !(whole.is_empty() && fraction.is_empty());
    let exponent_ok = match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && digits(exp)
        }
    };
    if mantissa_ok && exponent_ok {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Copies the projected fields (plus `id`) out of a document. Dotted fields
/// keep their nesting.
pub fn project(document: &Document, projection: &Projection) -> Document {
    let fields = match projection {
        Projection::All => return document.clone(),
        Projection::Fields(fields) => fields,
    };
    let mut out = Document::new();
    if let Some(id) = document.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        copy_path(document, &mut out, field);
    }
    out
}

fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(inner)) = source.get(head) else { return };
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                copy_path(inner, nested, rest);
            }
        }
    }
}

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn numeric_text_grammar() {
        for text in ["8", " 12 ", "-3.5", "+4", "5.", ".5", "1e3", "2.5E-2"] {
            assert!(numeric_text(text).is_some(), "{}", text);
        }
        for text in ["", ".", "abc", "12a", "1e", "inf", "NaN", "--1", "1.2.3", "\t8"] {
            assert!(numeric_text(text).is_none(), "{}", text);
        }
        assert_eq!(numeric_text(" 10001 "), Some(10001.0));
    }

    #[test]
    fn projection_keeps_id_and_selected_fields() {
        let source = doc(json!({"id": "1", "name": "a", "email": "b", "role": "user"}));
        let projected = project(&source, &Projection::fields(["name", "email"]));
        assert_eq!(Value::Object(projected), json!({"id": "1", "name": "a", "email": "b"}));
    }

    #[test]
    fn projection_of_nested_fields() {
        let source = doc(json!({"id": "1", "location": {"city": "Boston", "state": "MA"}}));
        let projected = project(&source, &Projection::fields(["location.city", "missing"]));
        assert_eq!(Value::Object(projected), json!({"id": "1", "location": {"city": "Boston"}}));
    }

    #[test]
    fn lookup_follows_dots() {
        let source = doc(json!({"location": {"city": "Boston"}, "name": "x"}));
        assert_eq!(lookup(&source, "location.city"), Some(&json!("Boston")));
        assert_eq!(lookup(&source, "name.first"), None);
        assert_eq!(lookup(&source, "nope"), None);
    }
}
