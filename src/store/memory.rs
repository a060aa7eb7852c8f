use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{document_id, lookup, numeric_text, project, Document, DocumentStore, FindOptions, StoreError};
use crate::query::{
    validate_collection, validate_field, CompiledFilter, FilterOp, Operand, Predicate, SortDirection,
    SortSpec, ID_FIELD,
};

/// Process-local store used for tests and database-less runs.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(collection: &str, filter: &CompiledFilter) -> Result<(), StoreError> {
        validate_collection(collection)?;
        for field in filter.fields() {
            validate_field(field)?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError> {
        Self::check(collection, filter)?;
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches_filter(doc, filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find(&self, collection: &str, options: &FindOptions<'_>) -> Result<Vec<Document>, StoreError> {
        Self::check(collection, options.filter)?;
        for field in options.sort.fields() {
            validate_field(&field.field)?;
        }

        let mut matched: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| docs.iter().filter(|doc| matches_filter(doc, options.filter)).cloned().collect())
                .unwrap_or_default()
        };
        matched.sort_by(|a, b| compare_documents(a, b, options.sort));

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let take = options
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(matched
            .iter()
            .skip(skip)
            .take(take)
            .map(|doc| project(doc, options.projection))
            .collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned())
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

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
            return Err(StoreError::Duplicate { collection: collection.to_string(), id });
        }
        docs.push(document.clone());
        Ok(document)
    }

    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
        else {
            return Ok(None);
        };
        for (key, value) in changes {
            if key != ID_FIELD {
                doc.insert(key, value);
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        validate_collection(collection)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else { return Ok(false) };
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        Ok(docs.len() != before)
    }

    async fn delete_many(&self, collection: &str, filter: &CompiledFilter) -> Result<u64, StoreError> {
        Self::check(collection, filter)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else { return Ok(0) };
        let before = docs.len();
        docs.retain(|doc| !matches_filter(doc, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(crate) fn matches_filter(document: &Document, filter: &CompiledFilter) -> bool {
    filter.iter().all(|(field, predicates)| {
        let value = lookup(document, field);
        predicates.iter().all(|predicate| matches_predicate(value, predicate))
    })
}

/// Array fields match when any element does.
fn matches_predicate(value: Option<&Value>, predicate: &Predicate) -> bool {
    let Some(value) = value else { return false };
    if let Value::Array(items) = value {
        if let (FilterOp::Eq, Operand::Scalar(operand)) = (predicate.op, &predicate.operand) {
            if value == operand {
                return true;
            }
        }
        return items.iter().any(|item| matches_scalar(item, predicate));
    }
    matches_scalar(value, predicate)
}

fn matches_scalar(value: &Value, predicate: &Predicate) -> bool {
    match (&predicate.operand, predicate.op) {
        (Operand::Set(members), _) => members.iter().any(|member| loose_eq(value, member)),
        (Operand::Scalar(operand), FilterOp::Eq) => loose_eq(value, operand),
        (Operand::Scalar(operand), FilterOp::In) => loose_eq(value, operand),
        (Operand::Scalar(operand), op) => match compare_loose(value, operand) {
            Some(ordering) => match op {
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Gte => ordering != Ordering::Less,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
                FilterOp::Eq | FilterOp::In => ordering == Ordering::Equal,
            },
            None => false,
        },
    }
}

/// Equality that lets stored text meet an operand typed from the query string.
fn loose_eq(value: &Value, operand: &Value) -> bool {
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(text), Value::Number(_) | Value::Bool(_)) => *text == operand.to_string(),
        (Value::Number(_) | Value::Bool(_), Value::String(text)) => value.to_string() == *text,
        _ => value == operand,
    }
}

fn compare_loose(value: &Value, operand: &Value) -> Option<Ordering> {
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::String(text), Value::Number(b)) => numeric_text(text)?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(text)) => a.as_f64()?.partial_cmp(&numeric_text(text)?),
        _ => None,
    }
}

fn compare_documents(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for field in sort.fields() {
        let ordering = sort_order(lookup(a, &field.field), lookup(b, &field.field));
        let ordering = match field.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    if sort.contains(ID_FIELD) {
        return Ordering::Equal;
    }
    sort_order(a.get(ID_FIELD), b.get(ID_FIELD))
}

/// Total order over JSON values: missing, null, strings, numbers, booleans,
/// arrays, objects.
fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::Bool(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}
