#![allow(dead_code)]

use anyhow::{anyhow, Result};
use devcamper_api::auth::hash_password;
use devcamper_api::config::{self, AppConfig};
use devcamper_api::store::{Document, DocumentStore, MemoryStore};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub const PASSWORD: &str = "123456";

/// One in-process server per test, each with its own empty memory store.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

pub struct Reply {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub body: Value,
}

pub async fn spawn() -> Result<TestServer> {
    spawn_with(config::config()).await
}

/// Same as [`spawn`] with a caller-supplied configuration for the router layers.
pub async fn spawn_with(app_config: &AppConfig) -> Result<TestServer> {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn DocumentStore> = store.clone();
    let service = devcamper_api::app(shared, app_config).into_make_service_with_connect_info::<SocketAddr>();

    let port = portpicker::pick_unused_port().ok_or_else(|| anyhow!("no free port"))?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, service).await;
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
    };
    Ok(server)
}

impl TestServer {
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<Reply> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let res = request.send().await?;
        let status = res.status();
        let cookies = res
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let body = res.json::<Value>().await?;
        Ok(Reply { status, cookies, body })
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Reply> {
        self.call(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<Reply> {
        self.call(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<Reply> {
        self.call(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<Reply> {
        self.call(Method::DELETE, path, token, None).await
    }

    /// Registers through the API and returns the issued token.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let reply = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({"name": name, "email": email, "password": PASSWORD, "role": role}),
            )
            .await?;
        assert_eq!(reply.status, StatusCode::OK, "register failed: {}", reply.body);
        token_of(&reply)
    }

    /// Admins cannot self-register, so the account goes straight into the store.
    pub async fn admin(&self) -> Result<String> {
        let hash = hash_password(PASSWORD)?;
        self.insert(
            "users",
            json!({
                "name": "Admin Account",
                "email": "admin@devcamper.io",
                "role": "admin",
                "password": hash,
                "createdAt": "2019-01-01T00:00:00.000Z"
            }),
        )
        .await?;
        let reply = self
            .post("/api/v1/auth/login", None, json!({"email": "admin@devcamper.io", "password": PASSWORD}))
            .await?;
        token_of(&reply)
    }

    pub async fn insert(&self, collection: &str, value: Value) -> Result<Document> {
        let document = value.as_object().cloned().ok_or_else(|| anyhow!("fixture must be an object"))?;
        Ok(self.store.insert(collection, document).await?)
    }

    /// Bootcamp fixture with ascending `createdAt` so default ordering is predictable.
    pub async fn seed_bootcamp(&self, n: usize, extra: Value) -> Result<Document> {
        let mut document = json!({
            "id": format!("camp-{:02}", n),
            "name": format!("Bootcamp {:02}", n),
            "description": "Full stack web development",
            "address": "233 Bay State Rd Boston MA 02215",
            "careers": ["Web Development"],
            "averageCost": 1000 * n as u64,
            "housing": false,
            "user": "seed-owner",
            "createdAt": format!("2020-01-01T00:00:{:02}.000Z", n)
        });
        if let (Some(target), Some(extra)) = (document.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        self.insert("bootcamps", document).await
    }
}

pub fn token_of(reply: &Reply) -> Result<String> {
    reply.body["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no token in {}", reply.body))
}

pub fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|rec| rec["id"].as_str().map(str::to_string))
        .collect()
}

pub fn course(title: &str, tuition: u64) -> Value {
    json!({
        "title": title,
        "description": "Course description",
        "weeks": "8",
        "tuition": tuition,
        "minimumSkill": "beginner"
    })
}

pub fn bootcamp(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Full stack web development",
        "website": "https://devworks.com",
        "address": "233 Bay State Rd Boston MA 02215",
        "careers": ["Web Development", "UI/UX"],
        "averageCost": 10000
    })
}
