use serde::Deserialize;
use serde_json::Value;

use super::{timestamp, Validator};
use crate::error::ApiError;
use crate::store::Document;
use crate::types::Role;

pub const COLLECTION: &str = "users";

/// Stored but never returned, selected, filtered or sorted on.
pub const HIDDEN_FIELDS: [&str; 1] = ["password"];

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("name", self.name.as_deref(), false, "Please add a name");
        validate_email(&mut v, self.email.as_deref(), false);
        validate_password(&mut v, "password", self.password.as_deref());
        if matches!(self.role, Some(role) if !role.is_self_assignable()) {
            v.fail("role", "Role must be user or publisher");
        }
        v.finish()
    }

    /// New user document; `password_hash` is already hashed.
    pub fn into_document(self, password_hash: String) -> Document {
        let mut document = Document::new();
        document.insert("name".into(), Value::String(self.name.unwrap_or_default().trim().to_string()));
        document.insert("email".into(), Value::String(normalize_email(self.email.as_deref().unwrap_or_default())));
        document.insert("role".into(), Value::String(self.role.unwrap_or_default().to_string()));
        document.insert("password".into(), Value::String(password_hash));
        document.insert("createdAt".into(), Value::String(timestamp()));
        document
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    /// Both present, or a 400.
    pub fn credentials(&self) -> Result<(String, &str), ApiError> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok((normalize_email(email), password))
            }
            _ => Err(ApiError::bad_request("Please provide an email and password")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDetailsInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateDetailsInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("name", self.name.as_deref(), true, "Please add a name");
        validate_email(&mut v, self.email.as_deref(), true);
        v.finish()
    }

    pub fn into_changes(self) -> Document {
        let mut changes = Document::new();
        if let Some(name) = self.name {
            changes.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(email) = self.email {
            changes.insert("email".into(), Value::String(normalize_email(&email)));
        }
        changes
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordInput {
    #[serde(alias = "currentpassword")]
    pub current_password: Option<String>,
    #[serde(alias = "password", alias = "newpassword")]
    pub new_password: Option<String>,
}

impl UpdatePasswordInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if self.current_password.as_deref().map_or(true, str::is_empty) {
            v.fail("currentPassword", "Please provide the current password");
        }
        validate_password(&mut v, "newPassword", self.new_password.as_deref());
        v.finish()
    }
}

fn validate_email(v: &mut Validator, email: Option<&str>, partial: bool) {
    v.required("email", email, partial, "Please add an email");
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        let valid = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
            None => false,
        };
        if !valid {
            v.fail("email", "Please add a valid email");
        }
    }
}

fn validate_password(v: &mut Validator, field: &str, password: Option<&str>) {
    match password {
        None | Some("") => v.fail(field, "Please add a password"),
        Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
            v.fail(field, format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH))
        }
        _ => {}
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strips hidden fields before a user leaves the service.
pub fn to_public(mut document: Document) -> Document {
    for field in HIDDEN_FIELDS {
        document.remove(field);
    }
    document
}

pub fn role_of(document: &Document) -> Role {
    document
        .get("role")
        .and_then(Value::as_str)
        .and_then(|role| role.parse().ok())
        .unwrap_or_default()
}

pub fn password_hash(document: &Document) -> Option<&str> {
    document.get("password").and_then(Value::as_str)
}
