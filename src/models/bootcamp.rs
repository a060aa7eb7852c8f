use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{timestamp, to_document, Validator};
use crate::error::ApiError;
use crate::query::Expansion;
use crate::store::Document;

pub const COLLECTION: &str = "bootcamps";

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Create/update payload. Unknown keys are ignored; `slug`, `user` and
/// `createdAt` are server-owned.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub careers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    /// `partial` validates an update: only supplied fields are checked.
    pub fn validate(&self, partial: bool) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("name", self.name.as_deref(), partial, "Please add a name");
        v.max_len("name", self.name.as_deref().map(str::trim), 50, "Name cannot be more than 50 characters");
        v.required("description", self.description.as_deref(), partial, "Please add a description");
        v.max_len("description", self.description.as_deref(), 500, "Description cannot be more than 500 characters");
        v.required("address", self.address.as_deref(), partial, "Please add an address");
        v.max_len("phone", self.phone.as_deref(), 20, "Phone number cannot be longer than 20 numbers");

        if let Some(website) = &self.website {
            if !is_url(website) {
                v.fail("website", "Please provide a valid url");
            }
        }

        match &self.careers {
            None if !partial => v.fail("careers", "Please add at least one career"),
            Some(careers) if careers.is_empty() => v.fail("careers", "Please add at least one career"),
            Some(careers) => {
                if let Some(bad) = careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
                    v.fail("careers", format!("`{}` is not a valid career", bad));
                }
            }
            None => {}
        }

        if let Some(rating) = self.average_rating.as_ref().and_then(Number::as_f64) {
            if rating < 1.0 {
                v.fail("averageRating", "Rating must be at least 1");
            } else if rating > 10.0 {
                v.fail("averageRating", "Rating cannot be more than 10");
            }
        }

        v.finish()
    }

    /// Full document for a new bootcamp owned by `owner`.
    pub fn into_document(mut self, owner: &str) -> Result<Document, ApiError> {
        self.name = self.name.map(|name| name.trim().to_string());
        self.photo.get_or_insert_with(|| DEFAULT_PHOTO.to_string());
        self.housing.get_or_insert(false);
        self.job_assistance.get_or_insert(false);
        self.job_guarantee.get_or_insert(false);
        self.accept_gi.get_or_insert(false);

        let mut document = to_document(&self)?;
        if let Some(name) = &self.name {
            document.insert("slug".into(), Value::String(slugify(name)));
        }
        document.insert("user".into(), Value::String(owner.to_string()));
        document.insert("createdAt".into(), Value::String(timestamp()));
        Ok(document)
    }

    /// Changes to merge into an existing bootcamp; renaming refreshes the slug.
    pub fn into_changes(mut self) -> Result<Document, ApiError> {
        self.name = self.name.map(|name| name.trim().to_string());
        let mut changes = to_document(&self)?;
        if let Some(name) = &self.name {
            changes.insert("slug".into(), Value::String(slugify(name)));
        }
        Ok(changes)
    }
}

/// Lowercase words joined by `-`: "Devworks Bootcamp" → "devworks-bootcamp".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn is_url(text: &str) -> bool {
    match url::Url::parse(text) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().map_or(false, |h| h.contains('.')),
        Err(_) => false,
    }
}

/// Courses joined into listed bootcamps.
pub fn courses_expansion() -> Expansion {
    Expansion::many("courses", super::course::COLLECTION).join("id", "bootcamp")
}

pub fn owner(document: &Document) -> Option<&str> {
    document.get("user").and_then(Value::as_str)
}
