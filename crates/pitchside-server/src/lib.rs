//! HTTP backend for Pitchside.
//!
//! Serves the match REST API from [`pitchside_api`] over a SQLite store, with
//! request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use pitchside_core::store::MatchStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PITCHSIDE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/pitchside/matches.db") }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router for any [`MatchStore`].
pub fn router<S: MatchStore + 'static>(store: Arc<S>) -> Router {
  pitchside_api::api_router(store).layer(TraceLayer::new_for_http())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
