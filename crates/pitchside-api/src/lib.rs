//! JSON REST API for pitchside.
//!
//! Exposes an axum [`Router`] backed by any
//! [`pitchside_core::store::MatchStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(pitchside_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod events;
pub mod matches;
pub mod state;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use pitchside_core::store::MatchStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: MatchStore + 'static,
{
  Router::new()
    // Match summary
    .route("/matches/{id}", get(matches::get_one::<S>))
    .route("/matches/{id}/periods", put(matches::put_periods::<S>))
    .route("/matches/{id}/score", put(matches::put_score::<S>))
    .route("/matches/{id}/status", put(matches::put_status::<S>))
    // Clock
    .route(
      "/matches/{id}/state",
      get(state::get_state::<S>)
        .put(state::put_state::<S>)
        .delete(state::reset::<S>),
    )
    // Events
    .route(
      "/matches/{id}/events",
      get(events::list::<S>)
        .post(events::create::<S>)
        .delete(events::clear::<S>),
    )
    .with_state(store)
}
