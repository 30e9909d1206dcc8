//! The boundary between the session and the backend of record.
//!
//! [`Reconciler`] turns store errors into [`LoadError`]/[`SaveError`] values,
//! and [`resolve`] decides whether a loaded checkpoint may replace the local
//! one.

use std::sync::Arc;

use pitchside_core::{
  clock::Checkpoint,
  event::{Event, Score},
  period::PeriodSchedule,
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
};
use uuid::Uuid;

use crate::error::{LoadError, SaveError};

// ─── Writes ──────────────────────────────────────────────────────────────────

/// One backend write, queued in the order the local change happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
  Checkpoint(Checkpoint),
  ClearCheckpoint,
  Event(Event),
  ClearEvents,
  Periods(PeriodSchedule),
  Score(Score),
  Status(MatchStatus),
}

impl Outbound {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Checkpoint(_) => "clock state",
      Self::ClearCheckpoint => "clock reset",
      Self::Event(_) => "event",
      Self::ClearEvents => "event log reset",
      Self::Periods(_) => "period schedule",
      Self::Score(_) => "score",
      Self::Status(_) => "match status",
    }
  }

  /// Whether a later write of the same kind makes this one redundant.
  /// Events and resets are never superseded, and neither is a return to
  /// `Scheduled`: the backend only accepts a move back to an earlier status
  /// through it.
  pub fn supersedes(&self, older: &Outbound) -> bool {
    matches!(
      (self, older),
      (Self::Checkpoint(_), Self::Checkpoint(_))
        | (Self::Periods(_), Self::Periods(_))
        | (Self::Score(_), Self::Score(_))
    ) || matches!(
      (self, older),
      (Self::Status(_), Self::Status(s)) if *s != MatchStatus::Scheduled
    )
  }

  /// Resets split the queue: nothing queued before one may be replaced by a
  /// write queued after it.
  pub fn is_barrier(&self) -> bool { matches!(self, Self::ClearCheckpoint | Self::ClearEvents) }
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// A match-scoped view of a [`MatchStore`].
pub struct Reconciler<S> {
  store:    Arc<S>,
  match_id: Uuid,
}

impl<S> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      match_id: self.match_id,
    }
  }
}

fn load_err<E: std::error::Error + Send + Sync + 'static>(what: &'static str) -> impl FnOnce(E) -> LoadError {
  move |e| LoadError {
    what,
    source: Box::new(e),
  }
}

impl<S: MatchStore> Reconciler<S> {
  pub fn new(store: Arc<S>, match_id: Uuid) -> Self { Self { store, match_id } }

  pub fn match_id(&self) -> Uuid { self.match_id }

  /// `Ok(None)` means the clock was never started.
  pub async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, LoadError> {
    self
      .store
      .load_checkpoint(self.match_id)
      .await
      .map_err(load_err("clock state"))
  }

  pub async fn load_match(&self) -> Result<Option<MatchRecord>, LoadError> {
    self
      .store
      .load_match(self.match_id)
      .await
      .map_err(load_err("match"))
  }

  pub async fn load_events(&self) -> Result<Vec<Event>, LoadError> {
    self
      .store
      .list_events(self.match_id)
      .await
      .map_err(load_err("events"))
  }

  pub async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), SaveError> {
    self.send(&Outbound::Checkpoint(checkpoint)).await
  }

  /// Issue a single queued write.
  pub async fn send(&self, op: &Outbound) -> Result<(), SaveError> {
    let id = self.match_id;
    let result = match op {
      Outbound::Checkpoint(cp) => self.store.save_checkpoint(id, *cp).await,
      Outbound::ClearCheckpoint => self.store.clear_checkpoint(id).await,
      Outbound::Event(e) => self.store.append_event(e.clone()).await,
      Outbound::ClearEvents => self.store.clear_events(id).await,
      Outbound::Periods(s) => self.store.save_periods(id, s.clone()).await.map(drop),
      Outbound::Score(s) => self.store.save_score(id, *s).await,
      Outbound::Status(s) => self.store.save_status(id, *s).await,
    };
    result.map_err(|e| SaveError {
      what:     op.label(),
      rejected: S::is_rejection(&e),
      source:   Box::new(e),
    })
  }
}

// ─── Conflict policy ─────────────────────────────────────────────────────────

/// What to do with a checkpoint that arrived from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
  /// The remote copy is newer; replace the local clock with it.
  Adopt(Checkpoint),
  /// The local clock is at least as new.
  KeepLocal,
  /// Local writes were still queued when the load arrived; the session is
  /// authoritative until they land.
  Discard,
}

/// Last confirmed save wins, except that a load never overrides local writes
/// that are still in flight.
pub fn resolve(
  local: Option<&Checkpoint>,
  remote: Option<&Checkpoint>,
  writes_in_flight: bool,
) -> Resolution {
  if writes_in_flight {
    return Resolution::Discard;
  }
  match (local, remote) {
    (_, None) => Resolution::KeepLocal,
    (None, Some(remote)) => Resolution::Adopt(*remote),
    (Some(local), Some(remote)) if remote.is_newer_than(local) => Resolution::Adopt(*remote),
    (Some(_), Some(_)) => Resolution::KeepLocal,
  }
}
