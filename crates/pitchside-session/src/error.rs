//! Error types for `pitchside-session`.
//!
//! Transport failures from the store never escape as raw errors: loads become
//! [`LoadError`], writes become [`SaveError`] and then a [`SyncWarning`] on
//! the session snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use pitchside_core::{clock::ClockState, AppendError, TransitionError, ValidationError};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The backend could not be read. "Nothing stored" is not a `LoadError`.
#[derive(Debug, Error)]
#[error("could not load {what}: {source}")]
pub struct LoadError {
  pub what:   &'static str,
  #[source]
  pub source: BoxError,
}

/// The backend refused or failed a write.
#[derive(Debug, Error)]
#[error("could not save {what}: {source}")]
pub struct SaveError {
  pub what:     &'static str,
  /// The backend understood the write and refused it; sending it again will
  /// not help.
  pub rejected: bool,
  #[source]
  pub source:   BoxError,
}

/// Errors returned to callers of a [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, Error)]
pub enum SessionError {
  #[error(transparent)]
  Transition(#[from] TransitionError),

  #[error(transparent)]
  Append(#[from] AppendError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// Goals are only recorded during a playing period.
  #[error("goals cannot be recorded while the clock is {0}")]
  NotInPlay(ClockState),

  #[error("goals cannot be recorded during a break")]
  DuringBreak,

  #[error("the session has shut down")]
  Closed,
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
  /// A local change has not reached the backend yet.
  Push,
  /// The backend refused a local change, which was dropped.
  Rejected,
  /// The backend could not be read; local state is unchanged.
  Pull,
}

/// A non-fatal sync problem, shown to the official until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
  pub direction: SyncDirection,
  pub what:      &'static str,
  pub message:   String,
  pub at:        DateTime<Utc>,
}

impl SyncWarning {
  pub fn from_save(err: &SaveError, at: DateTime<Utc>) -> Self {
    let direction = if err.rejected {
      SyncDirection::Rejected
    } else {
      SyncDirection::Push
    };
    Self {
      direction,
      what: err.what,
      message: err.source.to_string(),
      at,
    }
  }

  pub fn from_load(err: &LoadError, at: DateTime<Utc>) -> Self {
    Self {
      direction: SyncDirection::Pull,
      what: err.what,
      message: err.source.to_string(),
      at,
    }
  }
}

impl fmt::Display for SyncWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.direction {
      SyncDirection::Push => {
        write!(f, "{} saved locally but failed to sync: {}", self.what, self.message)
      }
      SyncDirection::Rejected => {
        write!(f, "{} was refused by the backend and not saved: {}", self.what, self.message)
      }
      SyncDirection::Pull => write!(f, "could not refresh {}: {}", self.what, self.message),
    }
  }
}
