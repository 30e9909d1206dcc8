//! Session tests against an in-memory store, with tokio time paused and the
//! match clock driven by hand.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pitchside_core::{
  clock::{Checkpoint, ClockState},
  event::{Event, EventKind, GoalKind, Score, Side},
  period::{Period, PeriodSchedule},
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
  GoalInput, ManualClock, ResetConfirmation, Session, SessionConfig, SessionError,
  SessionHandle, SubstitutionInput, SyncDirection,
};

// ─── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum StoreError {
  #[error("network unreachable")]
  Offline,
  #[error("refused: {0}")]
  Refused(String),
}

#[derive(Default)]
struct State {
  records:     HashMap<Uuid, MatchRecord>,
  checkpoints: HashMap<Uuid, Checkpoint>,
  events:      HashMap<Uuid, Vec<Event>>,
}

#[derive(Default)]
struct MemoryStore {
  state:            Mutex<State>,
  offline:          AtomicBool,
  hold_checkpoints: AtomicBool,
  released:         Notify,
  checkpoint_saves: AtomicUsize,
  refuse_scores:    AtomicBool,
}

impl MemoryStore {
  fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

  fn hold_checkpoints(&self) { self.hold_checkpoints.store(true, Ordering::SeqCst); }

  fn release_checkpoints(&self) {
    self.hold_checkpoints.store(false, Ordering::SeqCst);
    self.released.notify_waiters();
  }

  fn refuse_scores(&self) { self.refuse_scores.store(true, Ordering::SeqCst); }

  fn check(&self) -> Result<(), StoreError> {
    if self.offline.load(Ordering::SeqCst) {
      Err(StoreError::Offline)
    } else {
      Ok(())
    }
  }

  fn saves(&self) -> usize { self.checkpoint_saves.load(Ordering::SeqCst) }

  fn seed_periods(&self, id: Uuid, schedule: &PeriodSchedule) {
    let mut state = self.state.lock().unwrap();
    let record = record_mut(&mut state, id);
    record.periods = schedule.periods().to_vec();
    record.total_duration_minutes = schedule.total_duration_minutes();
  }

  fn put_checkpoint(&self, id: Uuid, cp: Checkpoint) {
    self.state.lock().unwrap().checkpoints.insert(id, cp);
  }

  fn stored_checkpoint(&self, id: Uuid) -> Option<Checkpoint> {
    self.state.lock().unwrap().checkpoints.get(&id).copied()
  }

  fn stored_events(&self, id: Uuid) -> Vec<Event> {
    self
      .state
      .lock()
      .unwrap()
      .events
      .get(&id)
      .cloned()
      .unwrap_or_default()
  }

  fn stored_record(&self, id: Uuid) -> Option<MatchRecord> {
    self.state.lock().unwrap().records.get(&id).cloned()
  }
}

fn record_mut(state: &mut State, id: Uuid) -> &mut MatchRecord {
  state.records.entry(id).or_insert_with(|| MatchRecord {
    match_id:               id,
    status:                 MatchStatus::Scheduled,
    periods:                Vec::new(),
    total_duration_minutes: 0,
    score:                  Score::default(),
    updated_at:             Utc::now(),
  })
}

impl MatchStore for MemoryStore {
  type Error = StoreError;

  fn is_rejection(error: &StoreError) -> bool { matches!(error, StoreError::Refused(_)) }

  async fn load_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>, StoreError> {
    self.check()?;
    Ok(self.stored_record(match_id))
  }

  async fn save_periods(
    &self,
    match_id: Uuid,
    schedule: PeriodSchedule,
  ) -> Result<MatchRecord, StoreError> {
    self.check()?;
    self.seed_periods(match_id, &schedule);
    Ok(self.stored_record(match_id).unwrap())
  }

  async fn save_score(&self, match_id: Uuid, score: Score) -> Result<(), StoreError> {
    self.check()?;
    if self.refuse_scores.load(Ordering::SeqCst) {
      return Err(StoreError::Refused("score is locked".into()));
    }
    record_mut(&mut self.state.lock().unwrap(), match_id).score = score;
    Ok(())
  }

  async fn save_status(&self, match_id: Uuid, status: MatchStatus) -> Result<(), StoreError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();
    let record = record_mut(&mut state, match_id);
    if !record.status.can_transition_to(status) {
      return Err(StoreError::Refused(format!("{} -> {status}", record.status)));
    }
    record.status = status;
    Ok(())
  }

  async fn load_checkpoint(&self, match_id: Uuid) -> Result<Option<Checkpoint>, StoreError> {
    self.check()?;
    Ok(self.stored_checkpoint(match_id))
  }

  async fn save_checkpoint(&self, match_id: Uuid, checkpoint: Checkpoint) -> Result<(), StoreError> {
    loop {
      let released = self.released.notified();
      if !self.hold_checkpoints.load(Ordering::SeqCst) {
        break;
      }
      released.await;
    }
    self.check()?;
    self.put_checkpoint(match_id, checkpoint);
    self.checkpoint_saves.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn clear_checkpoint(&self, match_id: Uuid) -> Result<(), StoreError> {
    self.check()?;
    self.state.lock().unwrap().checkpoints.remove(&match_id);
    Ok(())
  }

  async fn append_event(&self, event: Event) -> Result<(), StoreError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();
    let events = state.events.entry(event.match_id).or_default();
    if !events.iter().any(|e| e.event_id == event.event_id) {
      events.push(event);
    }
    Ok(())
  }

  async fn list_events(&self, match_id: Uuid) -> Result<Vec<Event>, StoreError> {
    self.check()?;
    Ok(self.stored_events(match_id))
  }

  async fn clear_events(&self, match_id: Uuid) -> Result<(), StoreError> {
    self.check()?;
    self.state.lock().unwrap().events.remove(&match_id);
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 9, 19, 30, 0).unwrap() }

fn minutes(m: i64) -> TimeDelta { TimeDelta::minutes(m) }

fn halves() -> PeriodSchedule {
  PeriodSchedule::from_sequence(vec![
    Period::playing("First Half", 20),
    Period::break_period("Half Time", 5),
    Period::playing("Second Half", 20),
  ])
  .unwrap()
}

struct Fixture {
  id:    Uuid,
  store: Arc<MemoryStore>,
  clock: ManualClock,
}

impl Fixture {
  fn new() -> Self {
    Self {
      id:    Uuid::new_v4(),
      store: Arc::new(MemoryStore::default()),
      clock: ManualClock::new(t0()),
    }
  }

  fn with_halves() -> Self {
    let f = Self::new();
    f.store.seed_periods(f.id, &halves());
    f
  }

  async fn activate(&self) -> SessionHandle {
    Session::activate(
      self.id,
      Arc::clone(&self.store),
      Arc::new(self.clock.clone()),
      SessionConfig::default(),
    )
    .await
  }
}

/// Let every spawned task run to idle.
async fn settle() { tokio::time::sleep(Duration::from_millis(10)).await; }

fn kinds(events: &[Event]) -> Vec<EventKind> { events.iter().map(|e| e.kind).collect() }

// ─── Activation ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn new_match_gets_futsal_schedule_and_goes_active() {
  let f = Fixture::new();
  let session = f.activate().await;

  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.status, MatchStatus::Active);
  assert_eq!(snap.clock.state, ClockState::NotStarted);
  assert_eq!(snap.periods.len(), 3);
  assert!(snap.warnings.is_empty());

  settle().await;
  let record = f.store.stored_record(f.id).unwrap();
  assert_eq!(record.status, MatchStatus::Active);
  assert_eq!(record.total_duration_minutes, 50);
}

#[tokio::test(start_paused = true)]
async fn failed_activation_load_is_a_warning_and_is_retried() {
  let f = Fixture::with_halves();
  f.store.set_offline(true);
  let session = f.activate().await;

  let snap = session.snapshot().await.unwrap();
  assert!(!snap.warnings.is_empty());
  assert!(snap.warnings.iter().all(|w| w.direction == SyncDirection::Pull));
  assert_eq!(snap.periods[1].duration_minutes, 10, "falls back to futsal");

  f.store.set_offline(false);
  let snap = session.reconcile_now().await.unwrap();
  assert_eq!(snap.periods[1].duration_minutes, 5);
  assert_eq!(snap.status, MatchStatus::Active);
}

// ─── Clock ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn start_goes_live_and_persists() {
  let f = Fixture::with_halves();
  let session = f.activate().await;

  let events = session.start().await.unwrap();
  assert_eq!(kinds(&events), [EventKind::Kickoff]);
  settle().await;

  assert_eq!(f.store.stored_record(f.id).unwrap().status, MatchStatus::Live);
  assert_eq!(f.store.stored_checkpoint(f.id).unwrap().version, 1);
  assert_eq!(kinds(&f.store.stored_events(f.id)), [EventKind::Kickoff]);
}

#[tokio::test(start_paused = true)]
async fn rollover_through_the_whole_schedule() {
  let f = Fixture::new();
  let short = PeriodSchedule::from_sequence(vec![
    Period::playing("First", 1),
    Period::break_period("Break", 1),
    Period::playing("Second", 1),
  ])
  .unwrap();
  f.store.seed_periods(f.id, &short);
  let session = f.activate().await;

  session.start().await.unwrap();
  f.clock.advance(minutes(3) + TimeDelta::seconds(1));
  let snap = session.snapshot().await.unwrap();

  assert_eq!(snap.clock.state, ClockState::Finished);
  assert_eq!(snap.status, MatchStatus::Finished);
  assert_eq!(
    kinds(&snap.events),
    [
      EventKind::Kickoff,
      EventKind::PeriodStart,
      EventKind::PeriodStart,
      EventKind::FinalWhistle
    ]
  );
  assert_eq!(snap.clock.total_playing_ms, 120_000);
}

#[tokio::test(start_paused = true)]
async fn schedule_cannot_change_while_running() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();

  let err = session
    .update_periods(PeriodSchedule::traditional())
    .await
    .unwrap_err();
  assert!(matches!(err, SessionError::Transition(_)));

  session.pause().await.unwrap();
  session
    .update_periods(PeriodSchedule::traditional())
    .await
    .unwrap();
  settle().await;
  assert_eq!(f.store.stored_record(f.id).unwrap().total_duration_minutes, 105);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn goal_at_twelve_minutes_scores_for_home() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();

  f.clock.advance(minutes(12));
  let goal = session
    .record_goal(GoalInput::new(Side::Home, "p1"))
    .await
    .unwrap();
  assert_eq!(goal.kind, EventKind::Goal);
  assert!((goal.minute - 12.0).abs() < 1e-9);

  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.score, Score { home: 1, away: 0 });
  assert_eq!(
    snap.events.iter().filter(|e| e.kind == EventKind::Goal).count(),
    1
  );

  settle().await;
  assert_eq!(f.store.stored_record(f.id).unwrap().score, Score { home: 1, away: 0 });
  assert!(f.store.stored_events(f.id).contains(&goal));
}

#[tokio::test(start_paused = true)]
async fn own_goal_counts_for_the_opponent() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  f.clock.advance(minutes(3));

  session
    .record_goal(GoalInput::new(Side::Away, "4").with_kind(GoalKind::OwnGoal))
    .await
    .unwrap();
  assert_eq!(session.snapshot().await.unwrap().score, Score { home: 1, away: 0 });
}

#[tokio::test(start_paused = true)]
async fn goals_need_a_playing_period() {
  let f = Fixture::with_halves();
  let session = f.activate().await;

  let err = session
    .record_goal(GoalInput::new(Side::Home, "p1"))
    .await
    .unwrap_err();
  assert!(matches!(err, SessionError::NotInPlay(ClockState::NotStarted)));

  session.start().await.unwrap();
  f.clock.advance(minutes(21));
  let err = session
    .record_goal(GoalInput::new(Side::Home, "p1"))
    .await
    .unwrap_err();
  assert!(matches!(err, SessionError::DuringBreak));

  // Substitutions are fine at half time.
  let sub = session
    .record_substitution(SubstitutionInput {
      team:            Side::Home,
      player_out_id:   "7".into(),
      player_out_name: None,
      player_in_id:    "12".into(),
      player_in_name:  None,
    })
    .await
    .unwrap();
  assert!((sub.minute - 20.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn invalid_events_are_rejected_before_any_change() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();

  let err = session
    .record_goal(GoalInput::new(Side::Home, "  "))
    .await
    .unwrap_err();
  assert!(matches!(err, SessionError::Append(_)));
  assert_eq!(session.snapshot().await.unwrap().events.len(), 1);
}

// ─── Sync failures ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_save_during_pause_keeps_local_state() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  settle().await;

  f.clock.advance(minutes(10));
  f.store.set_offline(true);
  let events = session.pause().await.unwrap();
  assert_eq!(kinds(&events), [EventKind::Pause]);

  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.clock.state, ClockState::PausedInPlay);
  assert_eq!(snap.clock.elapsed_in_period_ms, 600_000);
  assert_eq!(snap.clock.total_playing_ms, 600_000);

  let mut updates = session.subscribe();
  let warned = updates
    .wait_for(|s| s.warnings.iter().any(|w| w.direction == SyncDirection::Push))
    .await
    .unwrap()
    .clone();
  assert!(warned.unsynced > 0);
  assert!(warned.warnings[0].to_string().contains("failed to sync"));

  // Still offline: resuming works from the local state.
  f.clock.advance(minutes(2));
  session.resume().await.unwrap();
  f.clock.advance(minutes(1));
  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.clock.state, ClockState::Running);
  assert_eq!(snap.clock.total_playing_ms, 660_000);

  // Back online; the heartbeat retries and the backend catches up.
  f.store.set_offline(false);
  tokio::time::sleep(Duration::from_secs(6)).await;
  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.unsynced, 0);
  assert_eq!(f.store.stored_checkpoint(f.id), snap.checkpoint);
  assert_eq!(
    kinds(&f.store.stored_events(f.id)),
    [EventKind::Kickoff, EventKind::Pause, EventKind::Resume]
  );

  session.dismiss_warnings().await.unwrap();
  assert!(session.snapshot().await.unwrap().warnings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_after_offline_reset_of_a_finished_match_syncs() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  f.clock.advance(minutes(3));
  session.finish().await.unwrap();
  settle().await;
  assert_eq!(f.store.stored_record(f.id).unwrap().status, MatchStatus::Finished);

  f.store.set_offline(true);
  session.reset(ResetConfirmation::confirmed()).await.unwrap();
  session.start().await.unwrap();
  settle().await;
  assert!(session.snapshot().await.unwrap().unsynced > 0);

  f.store.set_offline(false);
  f.clock.advance(minutes(1));
  tokio::time::sleep(Duration::from_secs(6)).await;

  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.unsynced, 0);
  assert!(snap.warnings.iter().all(|w| w.direction != SyncDirection::Rejected));
  assert_eq!(f.store.stored_record(f.id).unwrap().status, MatchStatus::Live);
  assert_eq!(f.store.stored_checkpoint(f.id), snap.checkpoint);
  assert_eq!(kinds(&f.store.stored_events(f.id)), [EventKind::Kickoff]);
}

#[tokio::test(start_paused = true)]
async fn refused_write_is_dropped_and_later_writes_still_sync() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  settle().await;

  f.store.refuse_scores();
  f.clock.advance(minutes(2));
  session
    .record_goal(GoalInput::new(Side::Home, "10"))
    .await
    .unwrap();
  f.clock.advance(minutes(1));
  session.pause().await.unwrap();
  settle().await;

  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.unsynced, 0);
  assert_eq!(snap.score, Score { home: 1, away: 0 });
  let refused: Vec<_> = snap
    .warnings
    .iter()
    .filter(|w| w.direction == SyncDirection::Rejected)
    .collect();
  assert_eq!(refused.len(), 1);
  assert_eq!(refused[0].what, "score");
  assert!(refused[0].to_string().contains("refused"));

  assert_eq!(f.store.stored_record(f.id).unwrap().score, Score::default());
  assert_eq!(f.store.stored_checkpoint(f.id), snap.checkpoint);
  assert_eq!(
    kinds(&f.store.stored_events(f.id)),
    [EventKind::Kickoff, EventKind::Goal, EventKind::Pause]
  );
}

// ─── Conflict policy ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn load_is_discarded_while_local_write_is_in_flight() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  settle().await;

  f.store.hold_checkpoints();
  f.clock.advance(minutes(1));
  session.pause().await.unwrap();

  let mut remote = f.store.stored_checkpoint(f.id).unwrap();
  remote.version = 99;
  remote.total_playing_ms = 30 * 60_000;
  f.store.put_checkpoint(f.id, remote);

  let snap = session.reconcile_now().await.unwrap();
  let local = snap.checkpoint.unwrap();
  assert_eq!(local.version, 2);
  assert!(local.is_paused);
  assert!(snap.unsynced > 0);

  f.store.release_checkpoints();
  settle().await;
  assert_eq!(f.store.stored_checkpoint(f.id), Some(local));
}

#[tokio::test(start_paused = true)]
async fn newer_remote_state_is_adopted_and_older_is_ignored() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  f.clock.advance(minutes(1));
  session.pause().await.unwrap();
  settle().await;

  let local = session.snapshot().await.unwrap().checkpoint.unwrap();

  let mut stale = local;
  stale.version = 1;
  stale.is_paused = false;
  f.store.put_checkpoint(f.id, stale);
  let snap = session.reconcile_now().await.unwrap();
  assert_eq!(snap.checkpoint, Some(local));

  let mut newer = local;
  newer.version = local.version + 1;
  newer.elapsed_in_period_ms = 5 * 60_000;
  newer.total_playing_ms = 5 * 60_000;
  f.store.put_checkpoint(f.id, newer);
  let snap = session.reconcile_now().await.unwrap();
  assert_eq!(snap.checkpoint, Some(newer));
  assert_eq!(snap.clock.total_playing_ms, 5 * 60_000);
}

// ─── Persistence round trip ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn paused_match_resumes_identically_in_a_new_session() {
  let f = Fixture::with_halves();
  let first = f.activate().await;
  first.start().await.unwrap();
  f.clock.advance(minutes(7));
  first.pause().await.unwrap();
  let before = first.snapshot().await.unwrap();
  first.deactivate().await.unwrap();

  f.clock.advance(minutes(3));
  let second = f.activate().await;
  let after = second.snapshot().await.unwrap();

  assert_eq!(after.clock.state, ClockState::PausedInPlay);
  assert_eq!(after.clock.total_playing_ms, before.clock.total_playing_ms);
  assert_eq!(after.clock.elapsed_in_period_ms, before.clock.elapsed_in_period_ms);
  assert_eq!(after.events, before.events);
  assert_eq!(after.status, MatchStatus::Live);
}

#[tokio::test(start_paused = true)]
async fn running_match_catches_up_after_reactivation() {
  let f = Fixture::with_halves();
  let first = f.activate().await;
  first.start().await.unwrap();
  f.clock.advance(minutes(7));
  first.deactivate().await.unwrap();

  f.clock.advance(minutes(3));
  let second = f.activate().await;
  let snap = second.snapshot().await.unwrap();
  assert_eq!(snap.clock.state, ClockState::Running);
  assert_eq!(snap.clock.total_playing_ms, 10 * 60_000);
  assert_eq!(snap.clock.period_index, Some(0));
}

// ─── Reset ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reset_clears_everything() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  f.clock.advance(minutes(4));
  session
    .record_goal(GoalInput::new(Side::Away, "9"))
    .await
    .unwrap();

  session.reset(ResetConfirmation::confirmed()).await.unwrap();
  let snap = session.snapshot().await.unwrap();
  assert_eq!(snap.clock.state, ClockState::NotStarted);
  assert!(snap.checkpoint.is_none());
  assert!(snap.events.is_empty());
  assert_eq!(snap.score, Score::default());
  assert_eq!(snap.status, MatchStatus::Scheduled);

  settle().await;
  assert!(f.store.stored_checkpoint(f.id).is_none());
  assert!(f.store.stored_events(f.id).is_empty());
  let record = f.store.stored_record(f.id).unwrap();
  assert_eq!(record.score, Score::default());
  assert_eq!(record.status, MatchStatus::Scheduled);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn heartbeat_saves_while_running() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  settle().await;
  let before = f.store.saves();

  f.clock.advance(minutes(1));
  tokio::time::sleep(Duration::from_secs(11)).await;
  assert!(f.store.saves() >= before + 2);
  assert_eq!(
    f.store.stored_checkpoint(f.id).unwrap().total_playing_ms,
    60_000
  );
}

#[tokio::test(start_paused = true)]
async fn deactivate_stops_all_timers() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  let other = session.clone();
  session.start().await.unwrap();
  settle().await;

  session.deactivate().await.unwrap();
  let saves = f.store.saves();
  tokio::time::sleep(Duration::from_secs(60)).await;
  assert_eq!(f.store.saves(), saves);

  assert!(matches!(other.start().await, Err(SessionError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_session() {
  let f = Fixture::with_halves();
  let session = f.activate().await;
  session.start().await.unwrap();
  settle().await;

  drop(session);
  settle().await;
  let saves = f.store.saves();
  tokio::time::sleep(Duration::from_secs(60)).await;
  assert_eq!(f.store.saves(), saves);
}
