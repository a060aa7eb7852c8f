use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{timestamp, to_document, Validator};
use crate::error::ApiError;
use crate::query::Expansion;
use crate::store::Document;

pub const COLLECTION: &str = "courses";

pub const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Text ("8") or number, as supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weeks: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_available: Option<bool>,
}

impl CourseInput {
    pub fn validate(&self, partial: bool) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("title", self.title.as_deref(), partial, "Please add a course title");
        v.required("description", self.description.as_deref(), partial, "Please add a description");

        match &self.weeks {
            None if !partial => v.fail("weeks", "Please add number of weeks"),
            Some(Value::Number(_)) | None => {}
            Some(Value::String(text)) if !text.trim().is_empty() => {}
            Some(_) => v.fail("weeks", "Please add number of weeks"),
        }

        match self.tuition.as_ref().and_then(Number::as_f64) {
            None if !partial => v.fail("tuition", "Please add a tuition cost"),
            Some(cost) if cost < 0.0 => v.fail("tuition", "Tuition cannot be negative"),
            _ => {}
        }

        match self.minimum_skill.as_deref() {
            None if !partial => v.fail("minimumSkill", "Please add a minimum skill"),
            Some(skill) if !SKILLS.contains(&skill) => {
                v.fail("minimumSkill", "Minimum skill must be beginner, intermediate or advanced")
            }
            _ => {}
        }

        v.finish()
    }

    pub fn into_document(mut self, bootcamp_id: &str, owner: &str) -> Result<Document, ApiError> {
        self.scholarship_available.get_or_insert(false);
        let mut document = to_document(&self)?;
        document.insert("bootcamp".into(), Value::String(bootcamp_id.to_string()));
        document.insert("user".into(), Value::String(owner.to_string()));
        document.insert("createdAt".into(), Value::String(timestamp()));
        Ok(document)
    }

    pub fn into_changes(self) -> Result<Document, ApiError> {
        to_document(&self)
    }
}

/// Parent bootcamp joined into listed courses, name and description only.
pub fn bootcamp_expansion() -> Expansion {
    Expansion::one("bootcamp", super::bootcamp::COLLECTION).select(["name", "description"])
}
