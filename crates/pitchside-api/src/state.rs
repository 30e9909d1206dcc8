//! Handlers for the clock checkpoint.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/matches/{id}/state` | 404 when the clock was never started |
//! | `PUT`    | `/matches/{id}/state` | Body: checkpoint; last writer wins |
//! | `DELETE` | `/matches/{id}/state` | Full reset: checkpoint and events |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use pitchside_core::{clock::Checkpoint, store::MatchStore};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /matches/{id}/state`
pub async fn get_state<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Checkpoint>, ApiError> {
  let checkpoint = store
    .load_checkpoint(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no clock state for match {id}")))?;
  Ok(Json(checkpoint))
}

/// `PUT /matches/{id}/state`
pub async fn put_state<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(checkpoint): Json<Checkpoint>,
) -> Result<StatusCode, ApiError> {
  store
    .save_checkpoint(id, checkpoint)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /matches/{id}/state`
pub async fn reset<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.clear_checkpoint(id).await.map_err(ApiError::store)?;
  store.clear_events(id).await.map_err(ApiError::store)?;
  tracing::info!(match_id = %id, "match clock and events reset");
  Ok(StatusCode::NO_CONTENT)
}
