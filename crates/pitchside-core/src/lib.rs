//! Core types for officiating a match in real time: the period schedule, the
//! clock engine, the event log, and the persistence trait.
//!
//! No HTTP, database or async-runtime dependencies. Every other crate
//! depends on this one.

pub mod clock;
pub mod error;
pub mod event;
pub mod period;
pub mod status;
pub mod store;

pub use error::{AppendError, Error, Result, TransitionError, ValidationError};
