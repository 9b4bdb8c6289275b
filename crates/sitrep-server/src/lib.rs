//! HTTP server assembly for sitrep.
//!
//! Wires the SQLite-backed [`Reporting`] engine into the JSON API router,
//! with bearer-token authentication in front of every `/api` route.

pub mod auth;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use sitrep_core::engine::Reporting;
use sitrep_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through the auth middleware and all handlers.
#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<Reporting<SqliteStore>>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router. `/health` is open; everything under
/// `/api` requires a resolvable bearer token.
pub fn router(state: AppState) -> Router {
  let api = sitrep_api::api_router(state.engine.clone()).layer(
    middleware::from_fn_with_state(state.clone(), auth::authenticate),
  );

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ───────────────────────────────────────────────────────
