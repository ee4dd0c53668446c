//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Validation failures surface as 4xx JSON
//! bodies; blocking file writes run under `spawn_blocking`.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::envfile::{Category, EnvError, EnvVariable, mask};
use crate::points::{self, PointsError, Role};

use super::AppState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct SetValueRequest {
    value: String,
}

#[derive(Deserialize)]
pub(super) struct PointsValueRequest {
    points: u32,
}

#[derive(Deserialize)]
pub(super) struct TogglesRequest {
    enable_research_depth_points: bool,
    enable_model_points: bool,
}

#[derive(Deserialize)]
pub(super) struct QuoteRequest {
    level: u8,
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct CreateUserRequest {
    username: String,
    role: Option<Role>,
    #[serde(default)]
    points: u32,
}

#[derive(Deserialize)]
pub(super) struct AdjustRequest {
    delta: i64,
}

#[derive(Deserialize)]
pub(super) struct ChargeRequest {
    username: String,
    level: u8,
    provider: Option<String>,
    model: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn env_error_response(e: EnvError) -> Response {
    let (status, code) = match &e {
        EnvError::InvalidName(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_name"),
        EnvError::InvalidValue { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_value"),
        EnvError::File(_) => (StatusCode::INTERNAL_SERVER_ERROR, "file_error"),
    };
    (status, json_error(code, e)).into_response()
}

fn points_error_response(e: PointsError) -> Response {
    let (status, code) = match &e {
        PointsError::InvalidLevel(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_level"),
        PointsError::InsufficientPoints { .. } => {
            (StatusCode::PAYMENT_REQUIRED, "insufficient_points")
        }
        PointsError::UnknownUser(_) => (StatusCode::NOT_FOUND, "unknown_user"),
        PointsError::DuplicateUser(_) => (StatusCode::CONFLICT, "duplicate_user"),
        PointsError::File(_) | PointsError::Parse(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "file_error")
        }
    };
    (status, json_error(code, e)).into_response()
}

/// Variable as shown to the console — sensitive values masked here, at the
/// boundary, so the store itself keeps raw values.
fn display_variable(v: &EnvVariable) -> serde_json::Value {
    let shown = if v.sensitive {
        mask(&v.value)
    } else {
        v.value.clone()
    };
    json!({
        "name": v.name,
        "display_name": v.display_name,
        "description": v.description,
        "category": v.category,
        "value": shown,
        "is_set": v.is_set,
        "sensitive": v.sensitive,
        "default_value": v.default_value,
        "staged": v.staged,
    })
}

// ── Handlers: health ──────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let body = json!({
        "status": "ok",
        "service": state.service_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "staged_env_edits": state.env.staged_count(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

// ── Handlers: config editor ───────────────────────────────────────────────────

/// GET /api/env — category tabs with masked sensitive values.
pub(super) async fn env_list(State(state): State<AppState>) -> Response {
    let vars = state.env.variables();
    let tabs: Vec<serde_json::Value> = Category::all()
        .iter()
        .map(|cat| {
            let items: Vec<serde_json::Value> = vars
                .iter()
                .filter(|v| v.category == *cat)
                .map(display_variable)
                .collect();
            json!({ "category": cat, "label": cat.label(), "variables": items })
        })
        .collect();
    let body = json!({
        "categories": tabs,
        "staged_edits": state.env.staged_count(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// PUT /api/env/{key}
pub(super) async fn env_set(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetValueRequest>,
) -> Response {
    match state.env.set(&key, &req.value) {
        Ok(()) => (StatusCode::OK, Json(json!({ "name": key, "staged": true }))).into_response(),
        Err(e) => {
            warn!(%key, "env set rejected: {e}");
            env_error_response(e)
        }
    }
}

/// DELETE /api/env/{key} — stages an empty value; the record remains.
pub(super) async fn env_clear(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.env.clear(&key) {
        Ok(()) => (StatusCode::OK, Json(json!({ "name": key, "staged": true }))).into_response(),
        Err(e) => env_error_response(e),
    }
}

/// POST /api/env/{key}/reset — stages the catalog default.
pub(super) async fn env_reset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.env.reset(&key) {
        Ok(value) => (
            StatusCode::OK,
            Json(json!({ "name": key, "staged": true, "value": value })),
        )
            .into_response(),
        Err(e) => env_error_response(e),
    }
}

/// POST /api/env/save
pub(super) async fn env_save(State(state): State<AppState>) -> Response {
    let env = state.env.clone();
    match tokio::task::spawn_blocking(move || env.save()).await {
        Ok(Ok(backup)) => (
            StatusCode::OK,
            Json(json!({
                "saved": true,
                "backup": backup.map(|p| p.display().to_string()),
            })),
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!("env save failed: {e}");
            env_error_response(e)
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}

/// POST /api/env/discard
pub(super) async fn env_discard(State(state): State<AppState>) -> Response {
    state.env.discard();
    (StatusCode::OK, Json(json!({ "discarded": true }))).into_response()
}

/// GET /api/env/export — the saved file, staged edits excluded.
pub(super) async fn env_export(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.env.export(),
    )
        .into_response()
}

/// POST /api/env/import — the raw body replaces the whole file.
pub(super) async fn env_import(State(state): State<AppState>, body: String) -> Response {
    let env = state.env.clone();
    match tokio::task::spawn_blocking(move || env.import(&body)).await {
        Ok(Ok(backup)) => (
            StatusCode::OK,
            Json(json!({
                "imported": true,
                "backup": backup.map(|p| p.display().to_string()),
            })),
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!("env import failed: {e}");
            env_error_response(e)
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}

// ── Handlers: points configuration ────────────────────────────────────────────

/// GET /api/points
pub(super) async fn points_get(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.points.snapshot())).into_response()
}

/// POST /api/points/reload
pub(super) async fn points_reload(State(state): State<AppState>) -> Response {
    match state.points.reload() {
        Ok(()) => (StatusCode::OK, Json(state.points.snapshot())).into_response(),
        Err(e) => {
            warn!("points reload failed: {e}");
            points_error_response(e)
        }
    }
}

/// PUT /api/points/depth/{level}
pub(super) async fn points_set_depth(
    State(state): State<AppState>,
    Path(level): Path<u8>,
    Json(req): Json<PointsValueRequest>,
) -> Response {
    match state.points.set_depth_points(level, req.points) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "level": level, "points": req.points })),
        )
            .into_response(),
        Err(e) => points_error_response(e),
    }
}

/// PUT /api/points/models/{provider}/{model}
pub(super) async fn points_set_model(
    State(state): State<AppState>,
    Path((provider, model)): Path<(String, String)>,
    Json(req): Json<PointsValueRequest>,
) -> Response {
    match state.points.set_model_points(&provider, &model, req.points) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "provider": provider, "model": model, "points": req.points })),
        )
            .into_response(),
        Err(e) => points_error_response(e),
    }
}

/// DELETE /api/points/models/{provider}/{model}
pub(super) async fn points_delete_model(
    State(state): State<AppState>,
    Path((provider, model)): Path<(String, String)>,
) -> Response {
    match state.points.delete_model_points(&provider, &model) {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(e) => points_error_response(e),
    }
}

/// PUT /api/points/toggles
pub(super) async fn points_toggles(
    State(state): State<AppState>,
    Json(req): Json<TogglesRequest>,
) -> Response {
    match state
        .points
        .set_toggles(req.enable_research_depth_points, req.enable_model_points)
    {
        Ok(()) => (StatusCode::OK, Json(state.points.snapshot())).into_response(),
        Err(e) => points_error_response(e),
    }
}

/// POST /api/points/quote — itemized cost, no side effects.
pub(super) async fn points_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Response {
    let cfg = state.points.snapshot();
    match points::quote(&cfg, req.level, req.provider.as_deref(), req.model.as_deref()) {
        Ok(breakdown) => (StatusCode::OK, Json(breakdown)).into_response(),
        Err(e) => points_error_response(e),
    }
}

// ── Handlers: accounts and the charge flow ────────────────────────────────────

/// GET /api/users
pub(super) async fn users_list(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.ledger.list())).into_response()
}

/// POST /api/users
pub(super) async fn users_create(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Response {
    if req.username.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            json_error("invalid_username", "username must not be empty"),
        )
            .into_response();
    }
    let role = req.role.unwrap_or(Role::Member);
    match state.ledger.create(req.username.trim(), role, req.points) {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => points_error_response(e),
    }
}

/// POST /api/users/{username}/adjust
pub(super) async fn users_adjust(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<AdjustRequest>,
) -> Response {
    let ledger = state.ledger.clone();
    let name = username.clone();
    match tokio::task::spawn_blocking(move || ledger.adjust(&name, req.delta)).await {
        Ok(Ok(points)) => (
            StatusCode::OK,
            Json(json!({ "username": username, "points": points })),
        )
            .into_response(),
        Ok(Err(e)) => points_error_response(e),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}

/// PUT /api/users/{username}/points — overwrite a balance outright.
pub(super) async fn users_set_points(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<PointsValueRequest>,
) -> Response {
    match state.ledger.set_points(&username, req.points) {
        Ok(points) => (
            StatusCode::OK,
            Json(json!({ "username": username, "points": points })),
        )
            .into_response(),
        Err(e) => points_error_response(e),
    }
}

/// POST /api/analysis/charge — quote the cost, then deduct.
///
/// Admin accounts are exempt: the role check lives here so the ledger stays
/// a plain resource-accounting primitive. A deducted charge is not refunded
/// if the analysis later fails.
pub(super) async fn analysis_charge(
    State(state): State<AppState>,
    Json(req): Json<ChargeRequest>,
) -> Response {
    let Some(account) = state.ledger.get(&req.username) else {
        return (
            StatusCode::NOT_FOUND,
            json_error("unknown_user", format!("unknown user: {}", req.username)),
        )
            .into_response();
    };

    let cfg = state.points.snapshot();
    let breakdown =
        match points::quote(&cfg, req.level, req.provider.as_deref(), req.model.as_deref()) {
            Ok(b) => b,
            Err(e) => return points_error_response(e),
        };

    if account.role == Role::Admin || breakdown.total == 0 {
        let body = json!({
            "charged": 0,
            "remaining": account.points,
            "breakdown": breakdown,
            "exempt": account.role == Role::Admin,
        });
        return (StatusCode::OK, Json(body)).into_response();
    }

    let ledger = state.ledger.clone();
    let username = req.username.clone();
    let cost = breakdown.total;
    match tokio::task::spawn_blocking(move || ledger.deduct(&username, cost)).await {
        Ok(Ok(remaining)) => {
            let body = json!({
                "charged": cost,
                "remaining": remaining,
                "breakdown": breakdown,
                "exempt": false,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e @ PointsError::InsufficientPoints { .. })) => {
            warn!(username = %req.username, cost, "charge refused: {e}");
            let body = json!({
                "error": "insufficient_points",
                "message": e.to_string(),
                "breakdown": breakdown,
            });
            (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
        }
        Ok(Err(e)) => points_error_response(e),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}
