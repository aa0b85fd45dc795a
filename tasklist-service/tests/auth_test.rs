mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, spawn_app_with, TEST_PASSWORD, TEST_USERNAME};
use serde_json::json;

#[tokio::test]
async fn login_with_valid_credentials_returns_bearer_token() {
    let app = spawn_app();

    let (status, body) = app
        .post(
            "/login",
            json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);

    let token = body["token"].as_str().unwrap();
    assert_ne!(token, TEST_USERNAME);
    let claims = app.state.jwt.validate_access_token(token).unwrap();
    assert_eq!(claims.sub, TEST_USERNAME);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = spawn_app();

    let (status, body) = app
        .post(
            "/login",
            json!({ "username": TEST_USERNAME, "password": "wrong" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid username or password" }));
}

#[tokio::test]
async fn login_with_unknown_user_is_unauthorized() {
    let app = spawn_app();

    let (status, body) = app
        .post(
            "/login",
            json!({ "username": "suzuki", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid username or password" }));
}

#[tokio::test]
async fn login_username_must_match_exactly() {
    let app = spawn_app();

    let (status, body) = app
        .post(
            "/login",
            json!({ "username": TEST_USERNAME.to_uppercase(), "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid username or password" }));
}

#[tokio::test]
async fn malformed_login_body_is_invalid_request() {
    let app = spawn_app();

    let (status, body) = app.post_raw("/login", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid request" }));

    let (status, body) = app.post("/login", json!({ "username": TEST_USERNAME })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid request" }));

    let (status, body) = app
        .post("/login", json!({ "username": "", "password": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid request" }));
}

#[tokio::test]
async fn task_routes_are_open_by_default() {
    let app = spawn_app();

    let (status, _) = app.get("/tasklist").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn required_auth_rejects_missing_or_bad_tokens() {
    let app = spawn_app_with(true);

    let (status, _) = app.get("/tasklist").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(Method::GET, "/tasklist", None, Some("tanaka"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid or expired token" }));

    let (status, _) = app.get("/delete/1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn required_auth_accepts_token_from_login() {
    let app = spawn_app_with(true);

    let (status, body) = app
        .post(
            "/login",
            json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, "/tasklist", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = app
        .request(
            Method::POST,
            "/insert",
            Some(json!({ "tasks": [common::task_json("a", "高", 1)] }).to_string()),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn operational_routes_stay_open_when_auth_required() {
    let app = spawn_app_with(true);

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
}
