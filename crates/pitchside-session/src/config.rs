//! Session timing.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// How often the session ticks, saves and re-reads the backend.
///
/// Deserialises from seconds, e.g. `heartbeat_interval = 5`. Missing keys
/// take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Display refresh and rollover detection.
  #[serde(deserialize_with = "seconds")]
  pub tick_interval:      Duration,
  /// Checkpoint save while the clock runs, and retry of failed writes.
  #[serde(deserialize_with = "seconds")]
  pub heartbeat_interval: Duration,
  /// Background load of the remote checkpoint and events.
  #[serde(deserialize_with = "seconds")]
  pub reconcile_interval: Duration,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      tick_interval:      Duration::from_secs(1),
      heartbeat_interval: Duration::from_secs(5),
      reconcile_interval: Duration::from_secs(30),
    }
  }
}

fn seconds<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
  let secs = f64::deserialize(d)?;
  if secs <= 0.0 {
    return Err(serde::de::Error::custom("interval must be positive"));
  }
  Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
