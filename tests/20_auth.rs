mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_issues_token_and_cookie() -> Result<()> {
    let server = common::spawn().await?;

    let reply = server
        .post(
            "/api/v1/auth/register",
            None,
            json!({"name": "John Doe", "email": "John@Gmail.com", "password": "123456", "role": "publisher"}),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::OK, "unexpected body: {}", reply.body);
    assert_eq!(reply.body["success"], true);
    let token = common::token_of(&reply)?;
    assert!(
        reply.cookies.iter().any(|c| c.starts_with(&format!("token={};", token)) && c.contains("HttpOnly")),
        "missing token cookie: {:?}",
        reply.cookies
    );

    let me = server.get("/api/v1/auth/me", Some(&token)).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "john@gmail.com");
    assert_eq!(me.body["data"]["role"], "publisher");
    assert!(me.body["data"].get("password").is_none(), "password leaked: {}", me.body);
    Ok(())
}

#[tokio::test]
async fn registration_rejects_bad_input() -> Result<()> {
    let server = common::spawn().await?;
    server.register("First", "dup@gmail.com", "user").await?;

    let duplicate = server
        .post("/api/v1/auth/register", None, json!({"name": "Second", "email": "DUP@gmail.com", "password": "123456"}))
        .await?;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["message"], "Duplicate field value entered");

    let admin = server
        .post(
            "/api/v1/auth/register",
            None,
            json!({"name": "Sneaky", "email": "sneaky@gmail.com", "password": "123456", "role": "admin"}),
        )
        .await?;
    assert_eq!(admin.status, StatusCode::BAD_REQUEST);

    let short = server
        .post("/api/v1/auth/register", None, json!({"name": "Short", "email": "short@gmail.com", "password": "123"}))
        .await?;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert!(short.body["field_errors"]["password"].is_string(), "unexpected body: {}", short.body);
    Ok(())
}

#[tokio::test]
async fn login_checks_credentials() -> Result<()> {
    let server = common::spawn().await?;
    server.register("Jane", "jane@gmail.com", "user").await?;

    let ok = server
        .post("/api/v1/auth/login", None, json!({"email": "Jane@Gmail.com", "password": common::PASSWORD}))
        .await?;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(common::token_of(&ok).is_ok());

    let wrong = server
        .post("/api/v1/auth/login", None, json!({"email": "jane@gmail.com", "password": "654321"}))
        .await?;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Incorrect Credentials");

    let unknown = server
        .post("/api/v1/auth/login", None, json!({"email": "nobody@gmail.com", "password": "123456"}))
        .await?;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let missing = server.post("/api/v1/auth/login", None, json!({"email": "jane@gmail.com"})).await?;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let server = common::spawn().await?;

    let none = server.get("/api/v1/auth/me", None).await?;
    assert_eq!(none.status, StatusCode::UNAUTHORIZED);
    assert_eq!(none.body["message"], "Not authorized to access this route");

    let forged = server.get("/api/v1/auth/me", Some("not.a.jwt")).await?;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cookie_authenticates_and_logout_clears_it() -> Result<()> {
    let server = common::spawn().await?;
    let token = server.register("Cookie Monster", "cookie@gmail.com", "user").await?;

    let res = server
        .client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .header(reqwest::header::COOKIE, format!("token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let logout = server.get("/api/v1/auth/logout", Some(&token)).await?;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["data"], json!({}));
    assert!(
        logout.cookies.iter().any(|c| c.starts_with("token=none;") && c.contains("Max-Age=0")),
        "cookie not cleared: {:?}",
        logout.cookies
    );

    let res = server
        .client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .header(reqwest::header::COOKIE, "token=none")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn update_details_and_password() -> Result<()> {
    let server = common::spawn().await?;
    let token = server.register("Old Name", "old@gmail.com", "user").await?;
    server.register("Other", "taken@gmail.com", "user").await?;

    let details = server
        .put("/api/v1/auth/updatedetails", Some(&token), json!({"name": "New Name", "role": "admin"}))
        .await?;
    assert_eq!(details.status, StatusCode::OK, "unexpected body: {}", details.body);
    assert_eq!(details.body["data"]["name"], "New Name");
    assert_eq!(details.body["data"]["role"], "user");
    assert!(details.body["data"].get("password").is_none());

    let clash = server
        .put("/api/v1/auth/updatedetails", Some(&token), json!({"email": "taken@gmail.com"}))
        .await?;
    assert_eq!(clash.status, StatusCode::BAD_REQUEST);

    let wrong = server
        .put(
            "/api/v1/auth/updatepassword",
            Some(&token),
            json!({"currentPassword": "bad-guess", "newPassword": "abcdef"}),
        )
        .await?;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Incorrect Password");

    let changed = server
        .put(
            "/api/v1/auth/updatepassword",
            Some(&token),
            json!({"currentPassword": common::PASSWORD, "newPassword": "abcdef"}),
        )
        .await?;
    assert_eq!(changed.status, StatusCode::OK, "unexpected body: {}", changed.body);
    assert!(common::token_of(&changed).is_ok());

    let old = server
        .post("/api/v1/auth/login", None, json!({"email": "old@gmail.com", "password": common::PASSWORD}))
        .await?;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = server
        .post("/api/v1/auth/login", None, json!({"email": "old@gmail.com", "password": "abcdef"}))
        .await?;
    assert_eq!(new.status, StatusCode::OK);
    Ok(())
}
