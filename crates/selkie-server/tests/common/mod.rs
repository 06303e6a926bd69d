//! Shared fixtures for gateway integration tests

// not every test binary uses every helper
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use selkie_core::SelkieConfig;
use selkie_server::{api, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Admin key used by every test app
pub const ADMIN_KEY: &str = "integration-test-admin-key";

/// A router plus the state and tempdir backing it
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _dir: TempDir,
}

/// Build a fresh app over a temp data dir
pub fn test_app() -> TestApp {
    test_app_with_debounce(25)
}

/// Build a fresh app with a specific rebuild debounce
pub fn test_app_with_debounce(debounce_ms: u64) -> TestApp {
    let dir = TempDir::new().expect("tempdir");
    let config = SelkieConfig {
        bind_address: "127.0.0.1:0".to_string(),
        data_dir: dir.path().to_path_buf(),
        rebuild_debounce_ms: debounce_ms,
        admin_key: Some(ADMIN_KEY.to_string()),
    };
    let state = AppState::open(&config).expect("state");
    TestApp {
        router: api::router(state.clone()),
        state,
        _dir: dir,
    }
}

/// Send one request, returning status and parsed JSON body
pub async fn send(
    router: &Router,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

/// Register an agent through the admin tier, returning its API key
pub async fn register_agent(
    app: &TestApp,
    agent_id: &str,
    rate_limit: u32,
    max_authority: u8,
) -> String {
    let (status, body) = send(
        &app.router,
        "POST",
        "/admin/agents",
        &[("x-admin-key", ADMIN_KEY)],
        Some(serde_json::json!({
            "agent_id": agent_id,
            "name": format!("Agent {agent_id}"),
            "rate_limit": rate_limit,
            "max_authority": max_authority,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");
    body["api_key"].as_str().expect("api key").to_string()
}

/// Bearer header value for an agent key
pub fn bearer(key: &str) -> String {
    format!("Bearer {key}")
}
