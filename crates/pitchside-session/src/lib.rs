//! The officiating session for one live match.
//!
//! A session owns a [`ClockEngine`](pitchside_core::clock::ClockEngine) and an
//! [`EventLog`](pitchside_core::event::EventLog) inside a single actor task.
//! Actions arrive over a [`SessionHandle`]; state changes are applied locally
//! first and then written to the [`MatchStore`](pitchside_core::store::MatchStore)
//! through an ordered outbox. Sync failures never roll back local state; they
//! show up as [`SyncWarning`]s on the [`Snapshot`].

pub mod config;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod wall_clock;

mod outbox;

pub use config::SessionConfig;
pub use error::{LoadError, SaveError, SessionError, SyncDirection, SyncWarning};
pub use session::{
  CardColor, CardInput, GoalInput, ResetConfirmation, Session, SessionHandle, Snapshot,
  SubstitutionInput,
};
pub use wall_clock::{ManualClock, SystemClock, WallClock};

#[cfg(test)]
mod tests;
