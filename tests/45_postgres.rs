//! Runs the same queries against Postgres and the memory store and expects
//! identical results. Skipped unless `DATABASE_URL` is set.

use anyhow::{anyhow, Result};
use devcamper_api::config::AppConfig;
use devcamper_api::query::{CompiledFilter, QueryCompiler, RawQuery, ResultPaginator};
use devcamper_api::store::{document_id, DocumentStore, MemoryStore, PgStore};
use serde_json::{json, Value};

fn fixtures() -> Vec<Value> {
    vec![
        json!({
            "id": "c1", "title": "Front End", "weeks": "8", "tuition": 8000, "housing": true,
            "careers": ["Web Development", "UI/UX"], "location": {"zipcode": "10001", "state": "NY"},
            "createdAt": "2020-01-01T00:00:01.000Z"
        }),
        json!({
            "id": "c2", "title": "Full Stack", "weeks": "12", "tuition": 10000, "housing": false,
            "careers": ["Web Development"], "location": {"zipcode": 2215, "state": "MA"},
            "createdAt": "2020-01-01T00:00:02.000Z"
        }),
        json!({
            "id": "c3", "title": "Data Science", "weeks": 6, "tuition": 12000.5, "housing": false,
            "careers": ["Data Science", "Business"], "location": {"zipcode": "02139", "state": "MA"},
            "createdAt": "2020-01-01T00:00:02.000Z"
        }),
        json!({
            "id": "c4", "title": "Mobile", "weeks": " 10 ", "tuition": "9000",
            "careers": "Mobile Development", "location": {"state": "CA"},
            "createdAt": "2020-01-01T00:00:03.000Z"
        }),
    ]
}

const QUERIES: &[&str] = &[
    "weeks=8",
    "weeks[lte]=4",
    "weeks[gte]=6",
    "weeks[gt]=9&weeks[lt]=12",
    "weeks[in]=8,12",
    "location.zipcode=10001",
    "location.zipcode=2215",
    "location.zipcode[gte]=10000",
    "location.zipcode[lt]=1",
    "careers=Web+Development",
    "careers[in]=Business,Mobile+Development",
    "careers[gte]=U",
    "tuition[gte]=9000&tuition[lte]=12000",
    "tuition[gt]=12000",
    "tuition=9000",
    "housing=true",
    "title[gt]=F",
    "location.state=MA&sort=title",
    "select=title&sort=-tuition",
    "limit=2&page=2",
];

async fn connect() -> Result<Option<PgStore>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres comparison");
        return Ok(None);
    };
    let mut database = AppConfig::development().database;
    database.url = Some(url);
    Ok(Some(PgStore::connect(&database).await?))
}

async fn seed(store: &dyn DocumentStore, collection: &str) -> Result<()> {
    for fixture in fixtures() {
        let document = fixture.as_object().cloned().ok_or_else(|| anyhow!("fixture must be an object"))?;
        store.insert(collection, document).await?;
    }
    Ok(())
}

fn page_ids(records: &[devcamper_api::store::Document]) -> Vec<String> {
    records.iter().filter_map(document_id).map(str::to_string).collect()
}

#[tokio::test]
async fn postgres_matches_memory_store() -> Result<()> {
    let Some(pg) = connect().await? else { return Ok(()) };
    let collection = format!("courses_{}", uuid::Uuid::new_v4().simple());
    let memory = MemoryStore::new();
    seed(&pg, &collection).await?;
    seed(&memory, &collection).await?;

    let compiler = QueryCompiler::default();
    let outcome = async {
        for query_string in QUERIES {
            let query = compiler.compile(&RawQuery::parse(query_string));
            let expected = ResultPaginator::new(&memory, &collection).paginate(&query).await?;
            let actual = ResultPaginator::new(&pg, &collection).paginate(&query).await?;
            assert_eq!(actual.meta, expected.meta, "meta differs for {}", query_string);
            assert_eq!(page_ids(&actual.records), page_ids(&expected.records), "ids differ for {}", query_string);
        }

        // text digits meet numeric operands on both stores
        let query = compiler.compile(&RawQuery::parse("weeks[gte]=6"));
        let page = ResultPaginator::new(&pg, &collection).paginate(&query).await?;
        assert_eq!(page.meta.total, 4);
        let query = compiler.compile(&RawQuery::parse("location.zipcode=10001"));
        let page = ResultPaginator::new(&pg, &collection).paginate(&query).await?;
        assert_eq!(page_ids(&page.records), vec!["c1".to_string()]);
        Ok::<_, anyhow::Error>(())
    }
    .await;

    pg.delete_many(&collection, &CompiledFilter::new()).await?;
    outcome
}

#[tokio::test]
async fn postgres_pages_past_bigint_range() -> Result<()> {
    let Some(pg) = connect().await? else { return Ok(()) };
    let collection = format!("courses_{}", uuid::Uuid::new_v4().simple());
    seed(&pg, &collection).await?;

    let compiler = QueryCompiler::default();
    let outcome = async {
        for query_string in ["page=1000000000000000000", "page=1000000000000000000&limit=1000", "page=18446744073709551615"] {
            let query = compiler.compile(&RawQuery::parse(query_string));
            let page = ResultPaginator::new(&pg, &collection).paginate(&query).await?;
            assert!(page.records.is_empty(), "{} returned records", query_string);
            assert_eq!(page.meta.total, 4);
            assert!(page.meta.pagination.next.is_none());
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    pg.delete_many(&collection, &CompiledFilter::new()).await?;
    outcome
}
