//! Axum admin API — serves the `/api/*` surface consumed by the web console.
//!
//! The existing [`CancellationToken`] is wired to axum's graceful shutdown,
//! so Ctrl-C drains in-flight requests before the process exits.
//!
//! ## URL layout
//!
//! ```text
//! GET    /api/health
//! GET    /api/env                               category tabs, masked values
//! PUT    /api/env/{key}                         validate + stage
//! DELETE /api/env/{key}                         stage empty value
//! POST   /api/env/{key}/reset                   stage catalog default
//! POST   /api/env/save                          backup + write
//! POST   /api/env/discard                       drop staged edits
//! GET    /api/env/export                        raw file body
//! POST   /api/env/import                        raw body; backup + replace
//! GET    /api/points                            current points config
//! POST   /api/points/reload
//! PUT    /api/points/depth/{level}
//! PUT    /api/points/models/{provider}/{model}
//! DELETE /api/points/models/{provider}/{model}
//! PUT    /api/points/toggles
//! POST   /api/points/quote
//! GET    /api/users
//! POST   /api/users
//! POST   /api/users/{username}/adjust
//! PUT    /api/users/{username}/points
//! POST   /api/analysis/charge                   quote, role check, deduct
//! ```

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::error::AppError;
use crate::envfile::EnvStore;
use crate::points::{Ledger, PointsStore};

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Service name reported by `/api/health` and used in log spans.
    pub service_name: Arc<str>,
    pub env: Arc<EnvStore>,
    pub points: Arc<PointsStore>,
    pub ledger: Arc<Ledger>,
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let service_name = state.service_name.clone();
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(service = %service_name, %bind_addr, "admin api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!(service = %service_name, "admin api shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health",                          get(api::health))
        // Config editor
        .route("/api/env",                             get(api::env_list))
        .route("/api/env/save",                        post(api::env_save))
        .route("/api/env/discard",                     post(api::env_discard))
        .route("/api/env/export",                      get(api::env_export))
        .route("/api/env/import",                      post(api::env_import))
        .route("/api/env/{key}",                       put(api::env_set).delete(api::env_clear))
        .route("/api/env/{key}/reset",                 post(api::env_reset))
        // Points configuration
        .route("/api/points",                          get(api::points_get))
        .route("/api/points/reload",                   post(api::points_reload))
        .route("/api/points/toggles",                  put(api::points_toggles))
        .route("/api/points/depth/{level}",            put(api::points_set_depth))
        .route("/api/points/models/{provider}/{model}",
            put(api::points_set_model).delete(api::points_delete_model))
        .route("/api/points/quote",                    post(api::points_quote))
        // Accounts and the charge flow
        .route("/api/users",                           get(api::users_list).post(api::users_create))
        .route("/api/users/{username}/adjust",         post(api::users_adjust))
        .route("/api/users/{username}/points",         put(api::users_set_points))
        .route("/api/analysis/charge",                 post(api::analysis_charge))
        .with_state(state)
}
