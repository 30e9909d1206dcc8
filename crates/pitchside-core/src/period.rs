//! Period schedule: the ordered timeline a match clock runs through.
//!
//! A schedule is a list of named periods, each either playing time or a
//! break. Order indices are always a contiguous, 0-based sequence; every
//! editing operation on [`PeriodSchedule`] renumbers to keep it that way.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Shortest period an official may configure, in minutes.
pub const MIN_PERIOD_MINUTES: u32 = 1;
/// Longest period an official may configure, in minutes.
pub const MAX_PERIOD_MINUTES: u32 = 120;

/// Duration given to name-only playing periods during legacy ingestion.
pub const LEGACY_PLAYING_MINUTES: u32 = 20;
/// Duration given to name-only break periods during legacy ingestion.
pub const LEGACY_BREAK_MINUTES: u32 = 10;

// ─── Period ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub period_id:        Uuid,
  pub name:             String,
  pub duration_minutes: u32,
  pub order_index:      u32,
  pub is_break:         bool,
}

impl Period {
  pub fn playing(name: impl Into<String>, duration_minutes: u32) -> Self {
    Self {
      period_id: Uuid::new_v4(),
      name: name.into(),
      duration_minutes,
      order_index: 0,
      is_break: false,
    }
  }

  pub fn break_period(name: impl Into<String>, duration_minutes: u32) -> Self {
    Self {
      is_break: true,
      ..Self::playing(name, duration_minutes)
    }
  }

  pub fn duration_ms(&self) -> u64 {
    u64::from(self.duration_minutes) * 60_000
  }
}

// ─── Free functions ──────────────────────────────────────────────────────────

/// Check a list of periods against the editing rules: non-empty, no blank
/// names, every duration within
/// [`MIN_PERIOD_MINUTES`]..=[`MAX_PERIOD_MINUTES`].
pub fn validate(periods: &[Period]) -> Result<(), ValidationError> {
  if periods.is_empty() {
    return Err(ValidationError::EmptySchedule);
  }
  for (index, p) in periods.iter().enumerate() {
    if p.name.trim().is_empty() {
      return Err(ValidationError::BlankName { index });
    }
    if !(MIN_PERIOD_MINUTES..=MAX_PERIOD_MINUTES).contains(&p.duration_minutes) {
      return Err(ValidationError::DurationOutOfRange {
        index,
        minutes: p.duration_minutes,
        min: MIN_PERIOD_MINUTES,
        max: MAX_PERIOD_MINUTES,
      });
    }
  }
  Ok(())
}

/// Sum of the durations of all non-break periods.
pub fn total_playing_minutes(periods: &[Period]) -> u32 {
  periods
    .iter()
    .filter(|p| !p.is_break)
    .map(|p| p.duration_minutes)
    .sum()
}

/// Sum of the durations of every period, breaks included.
pub fn total_duration_minutes(periods: &[Period]) -> u32 {
  periods.iter().map(|p| p.duration_minutes).sum()
}

// ─── Legacy ingestion ────────────────────────────────────────────────────────

/// A period as it may arrive from older match records: either a bare name or
/// a structured object with optional fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPeriod {
  Name(String),
  Structured {
    #[serde(default)]
    period_id:        Option<Uuid>,
    name:             String,
    #[serde(default, alias = "duration")]
    duration_minutes: Option<u32>,
    #[serde(default, alias = "order")]
    order_index:      Option<u32>,
    #[serde(default)]
    is_break:         Option<bool>,
  },
}

fn looks_like_break(name: &str) -> bool {
  let lower = name.to_lowercase();
  ["break", "interval", "half time", "halftime", "half-time"]
    .iter()
    .any(|marker| lower.contains(marker))
}

/// Normalise legacy period records into structured [`Period`]s.
///
/// Structured entries keep their relative `order_index` ordering (entries
/// without one sort after those with one, in arrival order); the result is
/// renumbered 0..n. Missing durations fall back to the legacy defaults.
pub fn normalize_periods(raw: Vec<RawPeriod>) -> Vec<Period> {
  let mut keyed: Vec<(u32, usize, Period)> = raw
    .into_iter()
    .enumerate()
    .map(|(arrival, r)| match r {
      RawPeriod::Name(name) => {
        let is_break = looks_like_break(&name);
        let period = if is_break {
          Period::break_period(name, LEGACY_BREAK_MINUTES)
        } else {
          Period::playing(name, LEGACY_PLAYING_MINUTES)
        };
        (u32::MAX, arrival, period)
      }
      RawPeriod::Structured {
        period_id,
        name,
        duration_minutes,
        order_index,
        is_break,
      } => {
        let is_break = is_break.unwrap_or_else(|| looks_like_break(&name));
        let default_minutes = if is_break {
          LEGACY_BREAK_MINUTES
        } else {
          LEGACY_PLAYING_MINUTES
        };
        let period = Period {
          period_id: period_id.unwrap_or_else(Uuid::new_v4),
          name,
          duration_minutes: duration_minutes.unwrap_or(default_minutes),
          order_index: 0,
          is_break,
        };
        (order_index.unwrap_or(u32::MAX), arrival, period)
      }
    })
    .collect();

  keyed.sort_by_key(|(order, arrival, _)| (*order, *arrival));
  keyed
    .into_iter()
    .enumerate()
    .map(|(i, (_, _, mut p))| {
      p.order_index = i as u32;
      p
    })
    .collect()
}

// ─── PeriodSchedule ──────────────────────────────────────────────────────────

/// A validated, ordered period list.
///
/// Index `i` of the schedule always holds the period with `order_index == i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Period>", into = "Vec<Period>")]
pub struct PeriodSchedule {
  periods: Vec<Period>,
}

impl PeriodSchedule {
  /// Build a schedule, sorting by `order_index` and requiring the indices to
  /// be exactly `0..periods.len()`.
  pub fn new(mut periods: Vec<Period>) -> Result<Self, ValidationError> {
    validate(&periods)?;
    periods.sort_by_key(|p| p.order_index);
    let contiguous = periods
      .iter()
      .enumerate()
      .all(|(i, p)| p.order_index as usize == i);
    if !contiguous {
      return Err(ValidationError::NonContiguousOrder {
        expected: periods.len(),
        found:    periods.iter().map(|p| p.order_index).collect(),
      });
    }
    Ok(Self { periods })
  }

  /// Build a schedule from periods given in timeline order, assigning
  /// `order_index` from position.
  pub fn from_sequence(periods: Vec<Period>) -> Result<Self, ValidationError> {
    let mut schedule = Self { periods };
    schedule.renumber();
    validate(&schedule.periods)?;
    Ok(schedule)
  }

  /// Futsal: two 20-minute halves around a 10-minute interval.
  pub fn futsal() -> Self {
    Self::preset([
      Period::playing("First Half", 20),
      Period::break_period("Half Time", 10),
      Period::playing("Second Half", 20),
    ])
  }

  /// Association football: two 45-minute halves around a 15-minute interval.
  pub fn traditional() -> Self {
    Self::preset([
      Period::playing("First Half", 45),
      Period::break_period("Half Time", 15),
      Period::playing("Second Half", 45),
    ])
  }

  fn preset<const N: usize>(periods: [Period; N]) -> Self {
    let mut schedule = Self { periods: periods.into() };
    schedule.renumber();
    schedule
  }

  /// Append a break and two 15-minute extra-time halves.
  pub fn with_extra_time(mut self) -> Self {
    self.periods.extend([
      Period::break_period("Extra Time Break", 5),
      Period::playing("Extra Time First Half", 15),
      Period::playing("Extra Time Second Half", 15),
    ]);
    self.renumber();
    self
  }

  pub fn periods(&self) -> &[Period] { &self.periods }

  pub fn len(&self) -> usize { self.periods.len() }

  pub fn is_empty(&self) -> bool { self.periods.is_empty() }

  pub fn get(&self, order: u32) -> Option<&Period> {
    self.periods.get(order as usize)
  }

  pub fn total_playing_minutes(&self) -> u32 {
    total_playing_minutes(&self.periods)
  }

  pub fn total_duration_minutes(&self) -> u32 {
    total_duration_minutes(&self.periods)
  }

  /// The first playing period at or after `order`.
  pub fn next_playing_from(&self, order: u32) -> Option<u32> {
    self
      .periods
      .iter()
      .skip(order as usize)
      .find(|p| !p.is_break)
      .map(|p| p.order_index)
  }

  // ── Editing ───────────────────────────────────────────────────────────────

  /// Append `period` at the end of the timeline.
  pub fn push(&mut self, period: Period) -> Result<(), ValidationError> {
    self.edit(|periods| {
      periods.push(period);
      Ok(())
    })
  }

  /// Remove the period at `order`, returning it.
  pub fn remove(&mut self, order: u32) -> Result<Period, ValidationError> {
    let mut removed = None;
    self.edit(|periods| {
      if order as usize >= periods.len() {
        return Err(ValidationError::NoSuchPeriod(order));
      }
      removed = Some(periods.remove(order as usize));
      Ok(())
    })?;
    removed.ok_or(ValidationError::NoSuchPeriod(order))
  }

  /// Move the period at `from` so it ends up at position `to`.
  pub fn move_period(&mut self, from: u32, to: u32) -> Result<(), ValidationError> {
    self.edit(|periods| {
      let len = periods.len() as u32;
      if from >= len {
        return Err(ValidationError::NoSuchPeriod(from));
      }
      if to >= len {
        return Err(ValidationError::NoSuchPeriod(to));
      }
      let p = periods.remove(from as usize);
      periods.insert(to as usize, p);
      Ok(())
    })
  }

  pub fn rename(&mut self, order: u32, name: impl Into<String>) -> Result<(), ValidationError> {
    let name = name.into();
    self.edit_one(order, |p| p.name = name)
  }

  pub fn set_duration(&mut self, order: u32, minutes: u32) -> Result<(), ValidationError> {
    self.edit_one(order, |p| p.duration_minutes = minutes)
  }

  pub fn set_break(&mut self, order: u32, is_break: bool) -> Result<(), ValidationError> {
    self.edit_one(order, |p| p.is_break = is_break)
  }

  fn edit_one(
    &mut self,
    order: u32,
    f: impl FnOnce(&mut Period),
  ) -> Result<(), ValidationError> {
    self.edit(|periods| {
      let p = periods
        .get_mut(order as usize)
        .ok_or(ValidationError::NoSuchPeriod(order))?;
      f(p);
      Ok(())
    })
  }

  /// Apply `f` to a scratch copy; commit only if the result still validates.
  fn edit(
    &mut self,
    f: impl FnOnce(&mut Vec<Period>) -> Result<(), ValidationError>,
  ) -> Result<(), ValidationError> {
    let mut scratch = self.periods.clone();
    f(&mut scratch)?;
    validate(&scratch)?;
    self.periods = scratch;
    self.renumber();
    Ok(())
  }

  fn renumber(&mut self) {
    for (i, p) in self.periods.iter_mut().enumerate() {
      p.order_index = i as u32;
    }
  }
}

impl TryFrom<Vec<Period>> for PeriodSchedule {
  type Error = ValidationError;

  fn try_from(periods: Vec<Period>) -> Result<Self, Self::Error> {
    Self::new(periods)
  }
}

impl From<PeriodSchedule> for Vec<Period> {
  fn from(s: PeriodSchedule) -> Self { s.periods }
}
