//! End-to-end scenarios: write-through-rebuild round trips and the full
//! admission pipeline against one live state.

mod common;

use axum::http::StatusCode;
use common::{bearer, register_agent, send, test_app_with_debounce, ADMIN_KEY};
use serde_json::json;
use std::time::Duration;

/// Poll until the active snapshot reflects `log_len` or time out
async fn wait_for_index(app: &common::TestApp, log_len: usize) {
    for _ in 0..200 {
        if app.state.index.status().log_len == log_len && app.state.index.status().built {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "index never caught up to log_len {log_len}, status: {:?}",
        app.state.index.status()
    );
}

#[tokio::test]
async fn test_restricted_agent_full_scenario() {
    let app = test_app_with_debounce(25);

    // register an agent capped at authority 1
    let key = register_agent(&app, "fieldbot", 100, 1).await;
    let auth = bearer(&key);
    let headers = [("authorization", auth.as_str())];

    // constraint (authority 5) is rejected with 403
    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/write",
        &headers,
        Some(json!({
            "content": "all merges need review",
            "memory_type": "constraint",
            "rationale": "policy",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(app.state.log.len().await, 0);

    // observation (authority 1) succeeds and the log grows by one
    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/write",
        &headers,
        Some(json!({
            "content": "review queue empties by 3pm",
            "memory_type": "observation",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(app.state.log.len().await, 1);

    // the debounced background rebuild catches the index up
    wait_for_index(&app, 1).await;

    let (status, body) = send(&app.router, "GET", "/v1/stats", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["by_type"]["observation"], 1);
    assert_eq!(body["index"]["built"], true);
    assert_eq!(body["index"]["log_len"], 1);
}

#[tokio::test]
async fn test_write_then_search_round_trip() {
    let app = test_app_with_debounce(25);
    let key = register_agent(&app, "archivist", 100, 3).await;
    let auth = bearer(&key);
    let headers = [("authorization", auth.as_str())];

    let content = "the staging database lives on host db-stg-3";
    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/write",
        &headers,
        Some(json!({"content": content, "memory_type": "observation"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let memory_id = body["memory_id"].as_str().unwrap().to_string();

    wait_for_index(&app, 1).await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/search",
        &headers,
        Some(json!({"query": "staging database host"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert!(results.iter().any(|hit| hit["id"] == memory_id.as_str()));
}

#[tokio::test]
async fn test_burst_of_writes_coalesces_into_one_snapshot() {
    let app = test_app_with_debounce(100);
    let key = register_agent(&app, "burster", 100, 3).await;
    let auth = bearer(&key);
    let headers = [("authorization", auth.as_str())];

    for i in 0..5 {
        let (status, _) = send(
            &app.router,
            "POST",
            "/v1/write",
            &headers,
            Some(json!({
                "content": format!("burst note {i}"),
                "memory_type": "observation",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // all five writes land in one rebuilt snapshot
    wait_for_index(&app, 5).await;
    assert_eq!(app.state.index.status().entries, 5);
}

#[tokio::test]
async fn test_admin_rebuild_reflects_immediately() {
    let app = test_app_with_debounce(60_000);
    let key = register_agent(&app, "impatient", 100, 3).await;
    let auth = bearer(&key);
    let headers = [("authorization", auth.as_str())];

    send(
        &app.router,
        "POST",
        "/v1/write",
        &headers,
        Some(json!({"content": "needed right now", "memory_type": "observation"})),
    )
    .await;

    // debounce window is a minute out; force the build instead
    let (status, body) = send(
        &app.router,
        "POST",
        "/admin/rebuild",
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rebuilt");
    assert_eq!(body["index"]["log_len"], 1);

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/search",
        &headers,
        Some(json!({"query": "needed right now"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_context_sentinel() {
    let app = test_app_with_debounce(25);
    let key = register_agent(&app, "quiet", 100, 3).await;
    let auth = bearer(&key);
    let headers = [("authorization", auth.as_str())];

    // build over an empty log
    send(
        &app.router,
        "POST",
        "/admin/rebuild",
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/context",
        &headers,
        Some(json!({"query": "anything at all"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"], "");
}
