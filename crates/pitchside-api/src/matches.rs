//! Handlers for the match summary.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/matches/{id}` | 404 if nothing was ever written |
//! | `PUT`  | `/matches/{id}/periods` | Body: period list (legacy shapes accepted); returns the match |
//! | `PUT`  | `/matches/{id}/score` | Body: `{"home_score":1,"away_score":0}` |
//! | `PUT`  | `/matches/{id}/status` | Body: `{"status":"live"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use pitchside_core::{
  event::Score,
  period::{PeriodSchedule, RawPeriod, normalize_periods},
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /matches/{id}`
pub async fn get_one<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MatchRecord>, ApiError> {
  let record = store
    .load_match(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("match {id} not found")))?;
  Ok(Json(record))
}

// ─── Periods ──────────────────────────────────────────────────────────────────

/// `PUT /matches/{id}/periods`
///
/// Entries may be bare names or structured objects; they are normalised and
/// validated before anything is written.
pub async fn put_periods<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(raw): Json<Vec<RawPeriod>>,
) -> Result<Json<MatchRecord>, ApiError> {
  let schedule = PeriodSchedule::new(normalize_periods(raw))?;
  let record = store
    .save_periods(id, schedule)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(match_id = %id, periods = record.periods.len(), "period schedule replaced");
  Ok(Json(record))
}

// ─── Score ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
  pub home_score: u32,
  pub away_score: u32,
}

/// `PUT /matches/{id}/score`
pub async fn put_score<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScoreBody>,
) -> Result<StatusCode, ApiError> {
  let score = Score {
    home: body.home_score,
    away: body.away_score,
  };
  store.save_score(id, score).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: MatchStatus,
}

/// `PUT /matches/{id}/status`: only forward moves, or a reset to
/// `scheduled`.
pub async fn put_status<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<StatusCode, ApiError> {
  let current = store
    .load_match(id)
    .await
    .map_err(ApiError::store)?
    .map(|m| m.status)
    .unwrap_or_default();
  if !current.can_transition_to(body.status) {
    return Err(ApiError::BadRequest(format!(
      "match status cannot go from {current} to {}",
      body.status
    )));
  }
  store
    .save_status(id, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
