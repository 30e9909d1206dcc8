//! The match clock engine.
//!
//! The clock never counts on its own. Its whole state is a [`Checkpoint`]:
//! where the timeline stood at `last_updated_at`, and whether it was paused.
//! Everything shown to an official is re-derived from that checkpoint plus the
//! current wall-clock time, so a reload or a dropped connection loses nothing.
//!
//! All arithmetic is in whole milliseconds.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::TransitionError,
  event::{EventDetail, EventKind, NewEvent},
  period::PeriodSchedule,
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Where the clock is in its lifecycle. Derived from the checkpoint; never
/// stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
  NotStarted,
  Running,
  PausedInPlay,
  PausedAtBreak,
  Finished,
}

impl ClockState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NotStarted => "not_started",
      Self::Running => "running",
      Self::PausedInPlay => "paused_in_play",
      Self::PausedAtBreak => "paused_at_break",
      Self::Finished => "finished",
    }
  }

  pub fn is_paused(&self) -> bool {
    matches!(self, Self::PausedInPlay | Self::PausedAtBreak)
  }
}

impl fmt::Display for ClockState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Checkpoint ──────────────────────────────────────────────────────────────

/// The durable clock state for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
  /// Index into the period schedule.
  pub current_period_order: u32,
  pub elapsed_in_period_ms: u64,
  /// Playing time across all non-break periods, including the elapsed part
  /// of the current one.
  pub total_playing_ms:     u64,
  pub last_updated_at:      DateTime<Utc>,
  pub is_paused:            bool,
  #[serde(default)]
  pub finished:             bool,
  /// Bumped on every explicit transition. Orders competing writes.
  #[serde(default)]
  pub version:              u64,
}

impl Checkpoint {
  fn kickoff(now: DateTime<Utc>) -> Self {
    Self {
      current_period_order: 0,
      elapsed_in_period_ms: 0,
      total_playing_ms:     0,
      last_updated_at:      now,
      is_paused:            false,
      finished:             false,
      version:              1,
    }
  }

  /// Whether `self` was written after `other`: higher version first, then the
  /// later `last_updated_at` for heartbeats within one version.
  pub fn is_newer_than(&self, other: &Checkpoint) -> bool {
    (self.version, self.last_updated_at) > (other.version, other.last_updated_at)
  }

  /// The canonical event minute at this checkpoint.
  pub fn minute(&self) -> f64 { ms_to_minutes(self.total_playing_ms) }
}

pub fn ms_to_minutes(ms: u64) -> f64 { ms as f64 / 60_000.0 }

// ─── Display reading ─────────────────────────────────────────────────────────

/// A `MM:SS` clock face. Values are floored, never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
  pub minutes: u64,
  pub seconds: u64,
}

impl ClockReading {
  pub fn from_ms(ms: u64) -> Self {
    let total_seconds = ms / 1000;
    Self {
      minutes: total_seconds / 60,
      seconds: total_seconds % 60,
    }
  }
}

impl fmt::Display for ClockReading {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.minutes, self.seconds)
  }
}

// ─── Projection ──────────────────────────────────────────────────────────────

/// The live view of the clock at a given instant. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
  pub as_of:                  DateTime<Utc>,
  pub state:                  ClockState,
  pub period_index:           Option<u32>,
  pub period_name:            Option<String>,
  pub is_break:               bool,
  pub elapsed_in_period_ms:   u64,
  pub remaining_in_period_ms: u64,
  pub total_playing_ms:       u64,
  pub minute:                 f64,
}

impl Projection {
  pub fn period_clock(&self) -> ClockReading {
    ClockReading::from_ms(self.elapsed_in_period_ms)
  }

  pub fn match_clock(&self) -> ClockReading {
    ClockReading::from_ms(self.total_playing_ms)
  }
}

// ─── Rollover ────────────────────────────────────────────────────────────────

/// The outcome of carrying a running checkpoint forward to `now`.
struct Rollover {
  checkpoint: Checkpoint,
  /// Periods entered on the way, with the playing time at each boundary.
  entered:    Vec<(u32, u64)>,
  /// The schedule ran out during this advance.
  ran_out:    bool,
}

/// Carry `cp` forward by the wall-clock delta to `now`, rolling over as many
/// periods as the delta covers. Zero and negative deltas change nothing.
fn roll_forward(
  schedule: &PeriodSchedule,
  cp: Checkpoint,
  now: DateTime<Utc>,
) -> Rollover {
  let mut out = Rollover {
    checkpoint: cp,
    entered:    Vec::new(),
    ran_out:    false,
  };
  if cp.finished || cp.is_paused {
    return out;
  }
  let delta_ms = (now - cp.last_updated_at).num_milliseconds();
  if delta_ms <= 0 {
    return out;
  }

  let cp = &mut out.checkpoint;
  let mut budget = delta_ms as u64;

  loop {
    let Some(period) = schedule.get(cp.current_period_order) else {
      out.ran_out = true;
      break;
    };
    let left = period.duration_ms().saturating_sub(cp.elapsed_in_period_ms);
    if budget < left {
      cp.elapsed_in_period_ms += budget;
      if !period.is_break {
        cp.total_playing_ms += budget;
      }
      budget = 0;
      break;
    }

    budget -= left;
    if !period.is_break {
      cp.total_playing_ms += left;
    }
    cp.current_period_order += 1;
    cp.elapsed_in_period_ms = 0;
    if (cp.current_period_order as usize) < schedule.len() {
      out.entered.push((cp.current_period_order, cp.total_playing_ms));
    }
  }

  // Advance by exactly the consumed milliseconds: repeated ticks never drop
  // sub-millisecond remainders, and a finished match stays stamped with the
  // instant its schedule ran out.
  let consumed = delta_ms - budget as i64;
  out.checkpoint.last_updated_at += TimeDelta::milliseconds(consumed);
  if out.ran_out {
    close_at_end(schedule, &mut out.checkpoint);
  }
  out
}

/// Park a checkpoint on the last period, fully elapsed, and mark it finished.
fn close_at_end(schedule: &PeriodSchedule, cp: &mut Checkpoint) {
  let last = schedule.len().saturating_sub(1) as u32;
  cp.current_period_order = last;
  cp.elapsed_in_period_ms = schedule.get(last).map_or(0, |p| p.duration_ms());
  cp.is_paused = false;
  cp.finished = true;
}

fn is_desynced(schedule: &PeriodSchedule, cp: &Checkpoint) -> bool {
  !cp.finished && cp.current_period_order as usize >= schedule.len()
}

fn state_of(schedule: &PeriodSchedule, checkpoint: Option<&Checkpoint>) -> ClockState {
  let Some(cp) = checkpoint else {
    return ClockState::NotStarted;
  };
  if cp.finished {
    return ClockState::Finished;
  }
  if !cp.is_paused {
    return ClockState::Running;
  }
  match schedule.get(cp.current_period_order) {
    Some(p) if p.is_break => ClockState::PausedAtBreak,
    _ => ClockState::PausedInPlay,
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The clock state machine for one match.
///
/// Transitions take the wall-clock instant they happen at and return the
/// clock events they produce; appending those to an
/// [`EventLog`](crate::event::EventLog) is the caller's job.
#[derive(Debug, Clone)]
pub struct ClockEngine {
  schedule:   PeriodSchedule,
  checkpoint: Option<Checkpoint>,
}

impl ClockEngine {
  pub fn new(schedule: PeriodSchedule) -> Self {
    Self { schedule, checkpoint: None }
  }

  /// Resume from a persisted checkpoint. A checkpoint pointing past the end
  /// of the schedule is clamped to [`ClockState::Finished`].
  pub fn restore(schedule: PeriodSchedule, checkpoint: Option<Checkpoint>) -> Self {
    let mut engine = Self { schedule, checkpoint };
    engine.clamp_desync();
    engine
  }

  pub fn schedule(&self) -> &PeriodSchedule { &self.schedule }

  pub fn checkpoint(&self) -> Option<&Checkpoint> { self.checkpoint.as_ref() }

  pub fn state(&self) -> ClockState {
    state_of(&self.schedule, self.checkpoint.as_ref())
  }

  /// The live view at `now`, without committing anything.
  pub fn project(&self, now: DateTime<Utc>) -> Projection {
    let Some(cp) = self.checkpoint else {
      return Projection {
        as_of:                  now,
        state:                  ClockState::NotStarted,
        period_index:           None,
        period_name:            None,
        is_break:               false,
        elapsed_in_period_ms:   0,
        remaining_in_period_ms: self.schedule.get(0).map_or(0, |p| p.duration_ms()),
        total_playing_ms:       0,
        minute:                 0.0,
      };
    };

    let mut cp = cp;
    if is_desynced(&self.schedule, &cp) {
      close_at_end(&self.schedule, &mut cp);
    }
    let cp = roll_forward(&self.schedule, cp, now).checkpoint;
    let period = self.schedule.get(cp.current_period_order);
    Projection {
      as_of: now,
      state: state_of(&self.schedule, Some(&cp)),
      period_index: period.map(|p| p.order_index),
      period_name: period.map(|p| p.name.clone()),
      is_break: period.is_some_and(|p| p.is_break),
      elapsed_in_period_ms: cp.elapsed_in_period_ms,
      remaining_in_period_ms: period
        .map_or(0, |p| p.duration_ms().saturating_sub(cp.elapsed_in_period_ms)),
      total_playing_ms: cp.total_playing_ms,
      minute: cp.minute(),
    }
  }

  /// The canonical event minute at `now`.
  pub fn minute(&self, now: DateTime<Utc>) -> f64 { self.project(now).minute }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// `NotStarted → Running`, at period 0 with nothing elapsed.
  pub fn start(&mut self, now: DateTime<Utc>) -> Result<Vec<NewEvent>, TransitionError> {
    self.require(&[ClockState::NotStarted], "start")?;
    let cp = Checkpoint::kickoff(now);
    self.checkpoint = Some(cp);
    tracing::debug!(version = cp.version, "clock started");
    Ok(vec![NewEvent::clock(
      EventKind::Kickoff,
      0.0,
      now,
      self.period_detail(0),
    )])
  }

  /// Advance a running clock to `now`, rolling over finished periods.
  ///
  /// A no-op unless the clock is running and `now` is later than the last
  /// update.
  pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<NewEvent> {
    self.clamp_desync();
    let Some(cp) = self.checkpoint else {
      return Vec::new();
    };
    let rolled = roll_forward(&self.schedule, cp, now);
    self.checkpoint = Some(rolled.checkpoint);

    let mut events: Vec<NewEvent> = rolled
      .entered
      .iter()
      .map(|&(order, playing_ms)| {
        NewEvent::clock(
          EventKind::PeriodStart,
          ms_to_minutes(playing_ms),
          now,
          self.period_detail(order),
        )
      })
      .collect();

    if rolled.ran_out {
      tracing::info!("schedule complete; final whistle");
      events.push(NewEvent::clock(
        EventKind::FinalWhistle,
        rolled.checkpoint.minute(),
        now,
        EventDetail::None,
      ));
    }
    events
  }

  /// `Running → PausedInPlay` (or `PausedAtBreak` when the current period is
  /// a break). Elapsed time up to `now` is folded in first; if that runs the
  /// schedule out, the clock finishes instead.
  pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Vec<NewEvent>, TransitionError> {
    self.require(&[ClockState::Running], "pause")?;
    let mut events = self.tick(now);
    if let Some(cp) = self.checkpoint.as_mut().filter(|cp| !cp.finished) {
      cp.is_paused = true;
      cp.last_updated_at = now;
      cp.version += 1;
      events.push(NewEvent::clock(EventKind::Pause, cp.minute(), now, EventDetail::None));
    }
    Ok(events)
  }

  /// Leave a paused state.
  ///
  /// From `PausedInPlay` the same period continues. From `PausedAtBreak` the
  /// clock jumps to the next playing period with a fresh period clock. On an
  /// already running clock this does nothing.
  pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Vec<NewEvent>, TransitionError> {
    match self.require(
      &[
        ClockState::Running,
        ClockState::PausedInPlay,
        ClockState::PausedAtBreak,
      ],
      "resume",
    )? {
      ClockState::Running => Ok(Vec::new()),
      ClockState::PausedAtBreak => {
        let from = self.current_order() + 1;
        match self.schedule.next_playing_from(from) {
          Some(order) => Ok(vec![self.enter_period(order, false, now)]),
          None => Ok(vec![self.close(now)]),
        }
      }
      _ => {
        let Some(cp) = self.checkpoint.as_mut() else {
          return Ok(Vec::new());
        };
        cp.is_paused = false;
        cp.last_updated_at = now;
        cp.version += 1;
        Ok(vec![NewEvent::clock(
          EventKind::Resume,
          cp.minute(),
          now,
          EventDetail::None,
        )])
      }
    }
  }

  /// End the current period early and move to the next one, keeping the
  /// paused flag as it was. Finishes the match when no period follows.
  pub fn advance_period(
    &mut self,
    now: DateTime<Utc>,
  ) -> Result<Vec<NewEvent>, TransitionError> {
    self.require(
      &[
        ClockState::Running,
        ClockState::PausedInPlay,
        ClockState::PausedAtBreak,
      ],
      "advance the period",
    )?;
    let mut events = self.tick(now);
    if self.state() == ClockState::Finished {
      return Ok(events);
    }
    let next = self.current_order() + 1;
    let paused = self.checkpoint.is_some_and(|cp| cp.is_paused);
    if (next as usize) < self.schedule.len() {
      events.push(self.enter_period(next, paused, now));
    } else {
      events.push(self.close(now));
    }
    Ok(events)
  }

  /// Blow the final whistle now, whatever remains on the schedule.
  pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Vec<NewEvent>, TransitionError> {
    self.require(
      &[
        ClockState::Running,
        ClockState::PausedInPlay,
        ClockState::PausedAtBreak,
      ],
      "finish",
    )?;
    let mut events = self.tick(now);
    if self.state() != ClockState::Finished {
      events.push(self.close(now));
    }
    Ok(events)
  }

  /// Discard the checkpoint. The caller is responsible for confirming this
  /// with the official and for clearing the event log.
  pub fn reset(&mut self) {
    self.checkpoint = None;
  }

  /// Swap in an edited schedule. Refused while the clock is running.
  pub fn replace_schedule(&mut self, schedule: PeriodSchedule) -> Result<(), TransitionError> {
    if self.state() == ClockState::Running {
      return Err(TransitionError::ScheduleLocked);
    }
    self.schedule = schedule;
    Ok(())
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  fn require(
    &self,
    allowed: &[ClockState],
    action: &'static str,
  ) -> Result<ClockState, TransitionError> {
    let from = self.state();
    if allowed.contains(&from) {
      Ok(from)
    } else {
      Err(TransitionError::Illegal { from, action })
    }
  }

  fn current_order(&self) -> u32 {
    self.checkpoint.map_or(0, |cp| cp.current_period_order)
  }

  fn period_detail(&self, order: u32) -> EventDetail {
    self
      .schedule
      .get(order)
      .map_or(EventDetail::None, |p| EventDetail::Period {
        order,
        name: p.name.clone(),
      })
  }

  fn enter_period(&mut self, order: u32, paused: bool, now: DateTime<Utc>) -> NewEvent {
    let detail = self.period_detail(order);
    let cp = self
      .checkpoint
      .get_or_insert_with(|| Checkpoint::kickoff(now));
    cp.current_period_order = order;
    cp.elapsed_in_period_ms = 0;
    cp.is_paused = paused;
    cp.last_updated_at = now;
    cp.version += 1;
    NewEvent::clock(EventKind::PeriodStart, cp.minute(), now, detail)
  }

  fn close(&mut self, now: DateTime<Utc>) -> NewEvent {
    let cp = self
      .checkpoint
      .get_or_insert_with(|| Checkpoint::kickoff(now));
    cp.finished = true;
    cp.is_paused = false;
    cp.last_updated_at = now;
    cp.version += 1;
    NewEvent::clock(EventKind::FinalWhistle, cp.minute(), now, EventDetail::None)
  }

  /// Clamp a checkpoint whose period index no longer fits the schedule.
  fn clamp_desync(&mut self) {
    if let Some(cp) = self.checkpoint.as_mut()
      && is_desynced(&self.schedule, cp)
    {
      tracing::warn!(
        period = cp.current_period_order,
        schedule_len = self.schedule.len(),
        "checkpoint points past the end of the schedule; treating match as finished"
      );
      close_at_end(&self.schedule, cp);
    }
  }
}
