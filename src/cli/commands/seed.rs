use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::models::{bootcamp, course, timestamp, user};
use crate::query::{CompiledFilter, ID_FIELD};
use crate::store::{self, Document, DocumentStore};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Load users, bootcamps and courses from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json and courses.json", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp and course")]
    Destroy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: u64,
    pub bootcamps: u64,
    pub courses: u64,
}

impl SeedReport {
    fn to_json(self) -> Value {
        json!({
            "users": self.users,
            "bootcamps": self.bootcamps,
            "courses": self.courses
        })
    }
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    if config.database.url.is_none() {
        tracing::warn!("No DATABASE_URL configured; seeding the in-memory store has no lasting effect");
    }
    let store = store::connect(&config.database).await.context("failed to initialise document store")?;

    match cmd {
        SeedCommands::Import { dir } => {
            let report = import(store.as_ref(), &dir).await?;
            output_success(output_format, "Data Imported...", Some(report.to_json()))
        }
        SeedCommands::Destroy => {
            let report = destroy(store.as_ref()).await?;
            output_success(output_format, "Data Destroyed...", Some(report.to_json()))
        }
    }
}

/// Users first so bootcamp and course owners resolve, then bootcamps, then courses.
pub async fn import(store: &dyn DocumentStore, dir: &Path) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for raw in read_fixture(&dir.join("users.json"))? {
        store.insert(user::COLLECTION, prepare_user(raw)?).await?;
        report.users += 1;
    }
    for raw in read_fixture(&dir.join("bootcamps.json"))? {
        store.insert(bootcamp::COLLECTION, prepare_bootcamp(raw)).await?;
        report.bootcamps += 1;
    }
    for raw in read_fixture(&dir.join("courses.json"))? {
        store.insert(course::COLLECTION, prepare_common(raw)).await?;
        report.courses += 1;
    }

    tracing::info!(?report, "Seed import finished");
    Ok(report)
}

pub async fn destroy(store: &dyn DocumentStore) -> anyhow::Result<SeedReport> {
    let all = CompiledFilter::new();
    let report = SeedReport {
        bootcamps: store.delete_many(bootcamp::COLLECTION, &all).await?,
        courses: store.delete_many(course::COLLECTION, &all).await?,
        users: store.delete_many(user::COLLECTION, &all).await?,
    };
    tracing::info!(?report, "Seed destroy finished");
    Ok(report)
}

fn read_fixture(path: &Path) -> anyhow::Result<Vec<Document>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let values: Vec<Value> =
        serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array", path.display()))?;
    values
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("{} contains a non-object entry: {}", path.display(), other),
        })
        .collect()
}

/// `_id` becomes `id`; `createdAt` is filled when absent.
fn prepare_common(mut raw: Document) -> Document {
    if let Some(id) = raw.remove("_id") {
        raw.entry(ID_FIELD.to_string()).or_insert(id);
    }
    raw.entry("createdAt".to_string()).or_insert_with(|| Value::String(timestamp()));
    raw
}

fn prepare_bootcamp(raw: Document) -> Document {
    let mut document = prepare_common(raw);
    let slug = document.get("name").and_then(Value::as_str).map(bootcamp::slugify);
    if let Some(slug) = slug {
        document.entry("slug".to_string()).or_insert(Value::String(slug));
    }
    document
        .entry("photo".to_string())
        .or_insert_with(|| Value::String(bootcamp::DEFAULT_PHOTO.to_string()));
    document
}

/// Plain-text fixture passwords are hashed; emails are normalised for login lookups.
fn prepare_user(raw: Document) -> anyhow::Result<Document> {
    let mut document = prepare_common(raw);
    if let Some(Value::String(password)) = document.get("password") {
        let hash = hash_password(password)?;
        document.insert("password".to_string(), Value::String(hash));
    }
    if let Some(Value::String(email)) = document.get("email") {
        let email = user::normalize_email(email);
        document.insert("email".to_string(), Value::String(email));
    }
    document
        .entry("role".to_string())
        .or_insert_with(|| Value::String("user".to_string()));
    Ok(document)
}
