//! The `MatchStore` trait, the backend of record for live match state.
//!
//! Implemented by the SQLite backend (`pitchside-store-sqlite`) on the server
//! and by the HTTP client in `pitchside-cli`. The officiating session depends
//! only on this abstraction.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  clock::Checkpoint,
  event::{Event, Score},
  period::{Period, PeriodSchedule},
  status::MatchStatus,
};

// ─── Read model ──────────────────────────────────────────────────────────────

/// Everything the backend keeps about a match besides its checkpoint and
/// events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
  pub match_id:               Uuid,
  pub status:                 MatchStatus,
  /// Empty until an official saves a schedule.
  pub periods:                Vec<Period>,
  /// Summary of the schedule, breaks included.
  pub total_duration_minutes: u32,
  pub score:                  Score,
  pub updated_at:             DateTime<Utc>,
}

impl MatchRecord {
  /// The saved schedule, if one was saved and it is still valid.
  pub fn schedule(&self) -> Option<PeriodSchedule> {
    if self.periods.is_empty() {
      return None;
    }
    PeriodSchedule::new(self.periods.clone())
      .inspect_err(|e| {
        tracing::warn!(match_id = %self.match_id, error = %e, "stored schedule is invalid");
      })
      .ok()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Persistence for one or more matches.
///
/// Writes are last-writer-wins; the store does not arbitrate between
/// officials. Matches are created implicitly by the first write.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks and axum handlers.
pub trait MatchStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `error` means the store refused the request itself, so repeating
  /// it unchanged will fail the same way. Transport failures are not
  /// rejections.
  fn is_rejection(error: &Self::Error) -> bool {
    let _ = error;
    false
  }

  // ── Match ─────────────────────────────────────────────────────────────

  /// Returns `None` if nothing has ever been written for `match_id`.
  fn load_match(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<Option<MatchRecord>, Self::Error>> + Send + '_;

  /// Replace the period schedule and refresh `total_duration_minutes`.
  fn save_periods(
    &self,
    match_id: Uuid,
    schedule: PeriodSchedule,
  ) -> impl Future<Output = Result<MatchRecord, Self::Error>> + Send + '_;

  fn save_score(
    &self,
    match_id: Uuid,
    score: Score,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn save_status(
    &self,
    match_id: Uuid,
    status: MatchStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Clock ─────────────────────────────────────────────────────────────

  /// Returns `None` when the match clock was never started (or was reset).
  fn load_checkpoint(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<Option<Checkpoint>, Self::Error>> + Send + '_;

  fn save_checkpoint(
    &self,
    match_id: Uuid,
    checkpoint: Checkpoint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn clear_checkpoint(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Record an event. Appending an `event_id` that is already stored is a
  /// no-op, so retries are safe.
  fn append_event(
    &self,
    event: Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All events for a match, ordered by minute then sequence.
  fn list_events(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  fn clear_events(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
