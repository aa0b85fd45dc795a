//! Common test utilities for tasklist-service integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use tasklist_service::config::{CorsConfig, DatabaseConfig, JwtConfig, TasklistConfig};
use tasklist_service::services::MockTaskStore;
use tasklist_service::startup::{build_router, AppState};
use tasklist_service::utils::{hash_password, Password};
use tower::util::ServiceExt;

static INIT: Once = Once::new();

pub const TEST_USERNAME: &str = "tanaka";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,tasklist_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(require_auth: bool) -> TasklistConfig {
    TasklistConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "tasklist-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 2,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret-test-secret-test-secret".to_string(),
            expiry_minutes: 60,
        },
        require_auth,
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

/// Router over an in-memory store seeded with one user.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MockTaskStore>,
    pub state: AppState,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(false)
}

pub fn spawn_app_with(require_auth: bool) -> TestApp {
    init_tracing();

    let store = Arc::new(MockTaskStore::new());
    let hash = hash_password(&Password::new(TEST_PASSWORD.to_string()))
        .expect("Failed to hash test password");
    store.add_user(TEST_USERNAME, hash);

    let state = AppState::new(test_config(require_auth), store.clone())
        .expect("Failed to build app state");
    let router = build_router(state.clone());

    TestApp {
        router,
        store,
        state,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body.to_string()), None)
            .await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body.to_string()), None)
            .await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Insert tasks through the API and return their ids.
    pub async fn seed_tasks(&self, titles: &[&str]) -> Vec<i64> {
        let tasks: Vec<Value> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                serde_json::json!({
                    "title": title,
                    "content": format!("{} の詳細", title),
                    "due": "2024-02-23",
                    "priority_name": "中",
                    "progress_id": 1,
                    "position": (i as f64 + 1.0) * 1000.0
                })
            })
            .collect();

        let (status, body) = self
            .post("/insert", serde_json::json!({ "tasks": tasks }))
            .await;
        assert_eq!(status, StatusCode::OK, "seed insert failed: {}", body);

        body["successInserts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["id"].as_i64().unwrap())
            .collect()
    }
}

pub fn task_json(title: &str, priority_name: &str, progress_id: i64) -> Value {
    serde_json::json!({
        "title": title,
        "content": "内容",
        "due": "2024-02-23T09:30:00Z",
        "priority_name": priority_name,
        "progress_id": progress_id,
        "position": 1000.0
    })
}
