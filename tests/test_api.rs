//! Admin API integration tests — drive the router directly with
//! `tower::ServiceExt::oneshot`, no socket needed. Each test gets its own
//! tempdir-backed stores.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use bursar::envfile::EnvStore;
use bursar::points::{Ledger, PointsStore};
use bursar::server::{AppState, build_router};

const SAMPLE_ENV: &str = "\
# LLM keys
DASHSCOPE_API_KEY=sk-abc123456789

MONGODB_PORT=27017
";

fn router(dir: &TempDir) -> Router {
    let state = AppState {
        service_name: Arc::from("bursar-test"),
        env: Arc::new(EnvStore::open(dir.path().join(".env")).unwrap()),
        points: Arc::new(PointsStore::open(dir.path().join("points.json")).unwrap()),
        ledger: Arc::new(Ledger::open(dir.path().join("users.json")).unwrap()),
    };
    build_router(state)
}

fn seeded_router(dir: &TempDir) -> Router {
    std::fs::write(dir.path().join(".env"), SAMPLE_ENV).unwrap();
    router(dir)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match body {
        Some(v) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

#[tokio::test]
async fn health_reports_service() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bursar-test");
}

#[tokio::test]
async fn env_list_masks_sensitive_values() {
    let dir = TempDir::new().unwrap();
    let app = seeded_router(&dir);
    let (status, body) = send(&app, "GET", "/api/env", None).await;
    assert_eq!(status, StatusCode::OK);

    let llm_tab = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["category"] == "llm_key")
        .unwrap();
    let dash = llm_tab["variables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == "DASHSCOPE_API_KEY")
        .unwrap();
    assert_eq!(dash["is_set"], true);
    let shown = dash["value"].as_str().unwrap();
    assert!(shown.ends_with("6789"));
    assert!(!shown.contains("sk-abc"), "raw key leaked: {shown}");
}

#[tokio::test]
async fn env_edit_stays_staged_until_save() {
    let dir = TempDir::new().unwrap();
    let app = seeded_router(&dir);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/env/MONGODB_PORT",
        Some(json!({ "value": "27018" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // nothing on disk yet
    let on_disk = std::fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(on_disk, SAMPLE_ENV);

    let (status, body) = send(&app, "POST", "/api/env/save", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved"], true);
    assert!(body["backup"].as_str().unwrap().contains(".env.backup_"));

    let on_disk = std::fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(on_disk.contains("MONGODB_PORT=27018\n"));
    assert!(on_disk.contains("# LLM keys\n"));
}

#[tokio::test]
async fn invalid_port_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = seeded_router(&dir);
    let (status, body) = send(
        &app,
        "PUT",
        "/api/env/MONGODB_PORT",
        Some(json!({ "value": "70000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_value");
}

#[tokio::test]
async fn invalid_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    let (status, body) = send(
        &app,
        "PUT",
        "/api/env/lower_case",
        Some(json!({ "value": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_name");
}

#[tokio::test]
async fn export_returns_saved_file() {
    let dir = TempDir::new().unwrap();
    let app = seeded_router(&dir);
    let (status, body) = send(&app, "GET", "/api/env/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_str().unwrap(), SAMPLE_ENV);
}

#[tokio::test]
async fn quote_itemizes_the_cost() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    let (status, body) = send(
        &app,
        "POST",
        "/api/points/quote",
        Some(json!({ "level": 3, "provider": "dashscope", "model": "qwen-max" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["depth_points"], 3);
    assert_eq!(body["model_points"], 3);
    assert_eq!(body["total"], 6);
}

#[tokio::test]
async fn quote_rejects_bad_level() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    let (status, body) = send(&app, "POST", "/api/points/quote", Some(json!({ "level": 6 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_level");
}

#[tokio::test]
async fn toggles_drop_the_model_component() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/points/toggles",
        Some(json!({ "enable_research_depth_points": true, "enable_model_points": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "POST",
        "/api/points/quote",
        Some(json!({ "level": 3, "provider": "dashscope", "model": "qwen-max" })),
    )
    .await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn charge_deducts_then_refuses_overdraw() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "username": "alice", "points": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let charge = json!({
        "username": "alice", "level": 3,
        "provider": "dashscope", "model": "qwen-max",
    });

    let (status, body) = send(&app, "POST", "/api/analysis/charge", Some(charge.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["charged"], 6);
    assert_eq!(body["remaining"], 4);

    // 4 points left, next 6-point charge must fail without mutation
    let (status, body) = send(&app, "POST", "/api/analysis/charge", Some(charge)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "insufficient_points");

    let (_, users) = send(&app, "GET", "/api/users", None).await;
    let alice = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "alice")
        .unwrap();
    assert_eq!(alice["points"], 4);
}

#[tokio::test]
async fn admin_accounts_are_never_charged() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "username": "root", "role": "admin", "points": 2 })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/analysis/charge",
        Some(json!({
            "username": "root", "level": 5,
            "provider": "openai", "model": "gpt-4o",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["charged"], 0);
    assert_eq!(body["exempt"], true);
    assert_eq!(body["remaining"], 2);
}

#[tokio::test]
async fn charge_for_unknown_user_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    let (status, body) = send(
        &app,
        "POST",
        "/api/analysis/charge",
        Some(json!({ "username": "ghost", "level": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_user");
}

#[tokio::test]
async fn adjust_tops_up_a_balance() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);
    send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "username": "bob", "points": 1 })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users/bob/adjust",
        Some(json!({ "delta": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"], 10);
}

#[tokio::test]
async fn model_points_are_editable_at_runtime() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/points/models/dashscope/qwen-max",
        Some(json!({ "points": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "POST",
        "/api/points/quote",
        Some(json!({ "level": 1, "provider": "dashscope", "model": "qwen-max" })),
    )
    .await;
    assert_eq!(body["total"], 10);

    let (status, body) = send(&app, "DELETE", "/api/points/models/dashscope/qwen-max", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    // no entry and no provider default → model part is free
    let (_, body) = send(
        &app,
        "POST",
        "/api/points/quote",
        Some(json!({ "level": 1, "provider": "dashscope", "model": "qwen-max" })),
    )
    .await;
    assert_eq!(body["total"], 1);
}
