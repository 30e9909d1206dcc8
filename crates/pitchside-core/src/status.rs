//! Coarse officiating status of a match.
//!
//! This is a separate axis from [`ClockState`](crate::clock::ClockState): a
//! `Live` match may have a running or a paused clock.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
  #[default]
  Scheduled,
  /// An official has opened the match for control; the clock has not started.
  Active,
  Live,
  Finished,
}

impl MatchStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::Active => "active",
      Self::Live => "live",
      Self::Finished => "finished",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "scheduled" => Self::Scheduled,
      "active" => Self::Active,
      "live" => Self::Live,
      "finished" => Self::Finished,
      _ => return None,
    })
  }

  /// Forward moves along `Scheduled → Active → Live → Finished`, skipping
  /// allowed. A reset back to `Scheduled` is always allowed.
  pub fn can_transition_to(self, next: MatchStatus) -> bool {
    next == Self::Scheduled || next.rank() >= self.rank()
  }

  fn rank(self) -> u8 {
    match self {
      Self::Scheduled => 0,
      Self::Active => 1,
      Self::Live => 2,
      Self::Finished => 3,
    }
  }
}

impl fmt::Display for MatchStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
