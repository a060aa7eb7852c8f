use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::filter_order::FilterOrder;
use super::types::{Cardinality, CompiledFilter, CompiledQuery, Expansion, PageRequest, Predicate, DEFAULT_SORT};
use crate::store::{lookup, Document, DocumentStore, FindOptions, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageLink>,
}

impl Pagination {
    /// `next` exists while records remain past this window. `previous` is
    /// derived from the page number alone, even when an earlier page would
    /// now come back empty.
    pub fn compute(request: &PageRequest, total: u64) -> Self {
        let end = request.skip().saturating_add(request.limit);
        Self {
            next: (end < total).then(|| PageLink { page: request.page + 1, limit: request.limit }),
            previous: (request.page > 1).then(|| PageLink { page: request.page - 1, limit: request.limit }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Records in this page.
    pub count: usize,
    /// Records matching the filter, ignoring the window.
    pub total: u64,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Document>,
    pub meta: PageMeta,
}

/// Runs a compiled query against one collection: count, then the windowed
/// find, then the optional expansion.
///
/// Count and find are separate reads, so writes landing between them can make
/// `total` disagree with the page contents.
pub struct ResultPaginator<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    expansion: Option<&'a Expansion>,
}

impl<'a> ResultPaginator<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str) -> Self {
        Self { store, collection, expansion: None }
    }

    pub fn expand(mut self, expansion: &'a Expansion) -> Self {
        self.expansion = Some(expansion);
        self
    }

    pub async fn paginate(&self, query: &CompiledQuery) -> Result<Page, StoreError> {
        let total = self.store.count(self.collection, &query.filter).await?;

        let projection = match self.expansion {
            Some(expansion) => query.projection.including(&expansion.local_field),
            None => query.projection.clone(),
        };
        let options = FindOptions {
            filter: &query.filter,
            projection: &projection,
            sort: &query.sort,
            skip: query.page.skip(),
            limit: Some(query.page.limit),
        };
        let mut records = self.store.find(self.collection, &options).await?;

        if let Some(expansion) = self.expansion {
            populate(self.store, expansion, &mut records).await?;
            let requested = query.projection.includes(&expansion.local_field);
            if !requested && expansion.field != expansion.local_field {
                for record in &mut records {
                    record.remove(&expansion.local_field);
                }
            }
        }

        let meta = PageMeta {
            count: records.len(),
            total,
            pagination: Pagination::compute(&query.page, total),
        };
        Ok(Page { records, meta })
    }
}

/// Joins the related collection into `records` under `expansion.field` with a
/// single read. Records without a match get `null` (one) or `[]` (many).
pub async fn populate(
    store: &dyn DocumentStore,
    expansion: &Expansion,
    records: &mut [Document],
) -> Result<(), StoreError> {
    let mut keys: Vec<Value> = Vec::new();
    for record in records.iter() {
        if let Some(key) = lookup(record, &expansion.local_field) {
            if !key.is_null() && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let mut related: HashMap<String, Vec<Document>> = HashMap::new();
    if !keys.is_empty() {
        let filter = CompiledFilter::new().with(expansion.foreign_field.clone(), Predicate::in_set(keys));
        let projection = expansion.projection.including(&expansion.foreign_field);
        let sort = FilterOrder::parse([DEFAULT_SORT]);
        let options = FindOptions { filter: &filter, projection: &projection, sort: &sort, skip: 0, limit: None };
        for document in store.find(&expansion.collection, &options).await? {
            if let Some(key) = lookup(&document, &expansion.foreign_field) {
                related.entry(key.to_string()).or_default().push(document);
            }
        }
        if !expansion.projection.includes(&expansion.foreign_field) {
            for document in related.values_mut().flatten() {
                document.remove(&expansion.foreign_field);
            }
        }
    }

    for record in records.iter_mut() {
        let matches = lookup(record, &expansion.local_field)
            .and_then(|key| related.get(&key.to_string()))
            .cloned()
            .unwrap_or_default();
        let joined = match expansion.cardinality {
            Cardinality::One => matches.into_iter().next().map(Value::Object).unwrap_or(Value::Null),
            Cardinality::Many => Value::Array(matches.into_iter().map(Value::Object).collect()),
        };
        record.insert(expansion.field.clone(), joined);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryCompiler, RawQuery};
    use crate::store::{document_id, MemoryStore};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store
                .insert("bootcamps", doc(json!({
                    "id": format!("b{:02}", i),
                    "name": format!("Camp {:02}", i),
                    "averageCost": (i as u64) * 100,
                    "createdAt": format!("2024-01-{:02}T00:00:00.000Z", i + 1),
                })))
                .await
                .unwrap();
        }
        store
    }

    async fn run(store: &MemoryStore, query: &str) -> Page {
        let compiled = QueryCompiler::default().compile(&RawQuery::parse(query));
        ResultPaginator::new(store, "bootcamps").paginate(&compiled).await.unwrap()
    }

    #[test]
    fn links_follow_window() {
        let first = Pagination::compute(&PageRequest { page: 1, limit: 10 }, 25);
        assert_eq!(first.next, Some(PageLink { page: 2, limit: 10 }));
        assert_eq!(first.previous, None);

        let last = Pagination::compute(&PageRequest { page: 3, limit: 10 }, 25);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(PageLink { page: 2, limit: 10 }));

        let exact = Pagination::compute(&PageRequest { page: 2, limit: 10 }, 20);
        assert_eq!(exact.next, None);
    }

    #[test]
    fn previous_is_page_number_based_quirk() {
        // far past the end: nothing to show, yet a previous link is still offered
        let beyond = Pagination::compute(&PageRequest { page: 9, limit: 10 }, 25);
        assert_eq!(beyond.next, None);
        assert_eq!(beyond.previous, Some(PageLink { page: 8, limit: 10 }));
    }

    #[test]
    fn empty_links_are_omitted_from_json() {
        let json = serde_json::to_value(Pagination::compute(&PageRequest { page: 1, limit: 25 }, 3)).unwrap();
        assert_eq!(json, json!({}));
    }

    #[tokio::test]
    async fn pages_through_twenty_five_records() {
        let store = store_with(25).await;

        let page = run(&store, "limit=10").await;
        assert_eq!(page.records.len(), 10);
        assert_eq!(page.meta.count, 10);
        assert_eq!(page.meta.total, 25);
        assert_eq!(page.meta.pagination.next, Some(PageLink { page: 2, limit: 10 }));
        assert_eq!(page.meta.pagination.previous, None);

        let page = run(&store, "limit=10&page=3").await;
        assert_eq!(page.records.len(), 5);
        assert_eq!(page.meta.pagination.next, None);
        assert_eq!(page.meta.pagination.previous, Some(PageLink { page: 2, limit: 10 }));
        // newest first by default
        assert_eq!(document_id(&page.records[0]), Some("b04"));
        assert_eq!(document_id(&page.records[4]), Some("b00"));
    }

    #[tokio::test]
    async fn total_ignores_window() {
        let store = store_with(25).await;
        for query in ["averageCost[gte]=1000&limit=3", "averageCost[gte]=1000&page=4&limit=4", "averageCost[gte]=1000&page=99"] {
            let page = run(&store, query).await;
            assert_eq!(page.meta.total, 15, "query {}", query);
        }
    }

    #[tokio::test]
    async fn small_result_set_has_no_links() {
        let store = store_with(3).await;
        let page = run(&store, "").await;
        assert_eq!(page.meta.count, 3);
        assert_eq!(page.meta.pagination, Pagination::default());
    }

    async fn with_courses() -> MemoryStore {
        let store = store_with(2).await;
        for (id, title, bootcamp) in [("c1", "Front End", "b00"), ("c2", "Full Stack", "b00"), ("c3", "Data", "b01")] {
            store
                .insert("courses", doc(json!({
                    "id": id, "title": title, "bootcamp": bootcamp, "tuition": 1000,
                    "createdAt": "2024-02-01T00:00:00.000Z"
                })))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn expands_many_without_touching_totals() {
        let store = with_courses().await;
        let expansion = Expansion::many("courses", "courses").join("id", "bootcamp");
        let compiled = QueryCompiler::default().compile(&RawQuery::parse("sort=name&limit=1"));
        let page = ResultPaginator::new(&store, "bootcamps").expand(&expansion).paginate(&compiled).await.unwrap();

        assert_eq!(page.meta.total, 2);
        assert_eq!(page.records.len(), 1);
        let courses = page.records[0]["courses"].as_array().unwrap();
        let titles: Vec<&str> = courses.iter().filter_map(|c| c["title"].as_str()).collect();
        assert_eq!(titles, vec!["Front End", "Full Stack"]);
    }

    #[tokio::test]
    async fn expands_one_with_projection() {
        let store = with_courses().await;
        let expansion = Expansion::one("bootcamp", "bootcamps").select(["name"]);
        let compiled = QueryCompiler::default().compile(&RawQuery::parse("select=title&sort=title"));
        let page = ResultPaginator::new(&store, "courses").expand(&expansion).paginate(&compiled).await.unwrap();

        assert_eq!(page.records.len(), 3);
        assert_eq!(
            Value::Object(page.records[0].clone()),
            json!({"id": "c3", "title": "Data", "bootcamp": {"id": "b01", "name": "Camp 01"}})
        );
    }

    #[tokio::test]
    async fn local_field_fetched_for_join_is_removed() {
        let store = with_courses().await;
        let expansion = Expansion::many("courses", "courses").join("id", "bootcamp").select(["title"]);
        let compiled = QueryCompiler::default().compile(&RawQuery::parse("select=name&name=Camp%2001"));
        let page = ResultPaginator::new(&store, "bootcamps").expand(&expansion).paginate(&compiled).await.unwrap();

        assert_eq!(
            Value::Object(page.records[0].clone()),
            json!({"id": "b01", "name": "Camp 01", "courses": [{"id": "c3", "title": "Data"}]})
        );
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let store = store_with(1).await;
        let compiled = QueryCompiler::default().compile(&RawQuery::default());
        let result = ResultPaginator::new(&store, "bad collection").paginate(&compiled).await;
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
    }
}
