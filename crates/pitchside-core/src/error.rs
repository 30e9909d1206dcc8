//! Error types for `pitchside-core`.

use thiserror::Error;

use crate::{clock::ClockState, event::EventKind};

/// A period schedule that cannot be used to run a match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("a schedule needs at least one period")]
  EmptySchedule,

  #[error("period {index} has a blank name")]
  BlankName { index: usize },

  #[error("period {index} lasts {minutes} minutes; allowed range is {min}..={max}")]
  DurationOutOfRange {
    index:   usize,
    minutes: u32,
    min:     u32,
    max:     u32,
  },

  #[error("period order indices must be 0..{expected}, found {found:?}")]
  NonContiguousOrder { expected: usize, found: Vec<u32> },

  #[error("no period at order index {0}")]
  NoSuchPeriod(u32),
}

/// An event rejected by [`EventLog::append`](crate::event::EventLog::append).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppendError {
  #[error("{kind} event is missing required field `{field}`")]
  MissingField {
    kind:  EventKind,
    field: &'static str,
  },

  #[error("{0} event must not name a team")]
  UnexpectedTeam(EventKind),

  #[error("{kind} event carries a mismatched detail payload")]
  MismatchedDetail { kind: EventKind },

  #[error("event minute {0} is not a finite, non-negative number")]
  InvalidMinute(f64),

  #[error("event belongs to match {found}, log is for match {expected}")]
  WrongMatch {
    expected: uuid::Uuid,
    found:    uuid::Uuid,
  },
}

/// A clock action that is not legal from the engine's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("cannot {action} while the clock is {from}")]
  Illegal {
    from:   ClockState,
    action: &'static str,
  },

  #[error("the period schedule cannot be edited while the clock is running")]
  ScheduleLocked,

  #[error("invalid schedule: {0}")]
  Schedule(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Append(#[from] AppendError),

  #[error(transparent)]
  Transition(#[from] TransitionError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
