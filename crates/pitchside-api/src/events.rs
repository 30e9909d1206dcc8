//! Handlers for `/matches/{id}/events`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/matches/{id}/events` | Ordered by minute, then recording order |
//! | `POST` | `/matches/{id}/events` | Body: [`Event`]; 201. Re-posting an id is a no-op |
//! | `DELETE` | `/matches/{id}/events` | Drops every event; the checkpoint is kept |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pitchside_core::{
  event::{Event, EventLog},
  store::MatchStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /matches/{id}/events`
pub async fn list<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError> {
  let events = store.list_events(id).await.map_err(ApiError::store)?;
  let log = EventLog::from_events(id, events);
  Ok(Json(log.chronological().into_iter().cloned().collect()))
}

/// `POST /matches/{id}/events`
pub async fn create<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(event): Json<Event>,
) -> Result<impl IntoResponse, ApiError> {
  event.check(id)?;
  store
    .append_event(event.clone())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `DELETE /matches/{id}/events`
pub async fn clear<S: MatchStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.clear_events(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
