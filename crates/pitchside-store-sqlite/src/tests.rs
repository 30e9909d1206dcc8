//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use pitchside_core::{
  clock::Checkpoint,
  event::{Event, EventDetail, EventKind, EventLog, GoalKind, NewEvent, Score, Side},
  period::{Period, PeriodSchedule},
  status::MatchStatus,
  store::MatchStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn kickoff() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 9, 19, 30, 0).unwrap() }

fn checkpoint(order: u32, elapsed_ms: u64, total_ms: u64, version: u64) -> Checkpoint {
  Checkpoint {
    current_period_order: order,
    elapsed_in_period_ms: elapsed_ms,
    total_playing_ms:     total_ms,
    last_updated_at:      kickoff() + chrono::TimeDelta::milliseconds(total_ms as i64),
    is_paused:            false,
    finished:             false,
    version,
  }
}

fn goal_at(log: &mut EventLog, team: Side, player: &str, minute: f64) -> Event {
  log
    .append(NewEvent::goal(team, player, None, GoalKind::Goal, None, minute, kickoff()))
    .unwrap()
    .clone()
}

// ─── Matches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_match_has_nothing_stored() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(s.load_match(id).await.unwrap().is_none());
  assert!(s.load_checkpoint(id).await.unwrap().is_none());
  assert!(s.list_events(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn saving_periods_creates_the_match() {
  let s = store().await;
  let id = Uuid::new_v4();

  let record = s.save_periods(id, PeriodSchedule::futsal()).await.unwrap();
  assert_eq!(record.match_id, id);
  assert_eq!(record.status, MatchStatus::Scheduled);
  assert_eq!(record.total_duration_minutes, 50);
  assert_eq!(record.periods.len(), 3);
  assert!(record.schedule().is_some());

  let loaded = s.load_match(id).await.unwrap().unwrap();
  let names: Vec<_> = loaded.periods.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, ["First Half", "Half Time", "Second Half"]);
  assert_eq!(loaded.periods, record.periods);
}

#[tokio::test]
async fn saving_periods_replaces_the_previous_schedule() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.save_periods(id, PeriodSchedule::traditional()).await.unwrap();

  let quarters = PeriodSchedule::from_sequence(vec![
    Period::playing("Q1", 10),
    Period::playing("Q2", 10),
    Period::playing("Q3", 10),
    Period::playing("Q4", 10),
  ])
  .unwrap();
  let record = s.save_periods(id, quarters.clone()).await.unwrap();

  assert_eq!(record.periods, quarters.periods());
  assert_eq!(record.total_duration_minutes, 40);
}

#[tokio::test]
async fn same_schedule_can_be_saved_for_two_matches() {
  let s = store().await;
  let schedule = PeriodSchedule::futsal();
  s.save_periods(Uuid::new_v4(), schedule.clone()).await.unwrap();
  s.save_periods(Uuid::new_v4(), schedule).await.unwrap();
}

#[tokio::test]
async fn score_and_status_are_stored() {
  let s = store().await;
  let id = Uuid::new_v4();

  s.save_status(id, MatchStatus::Live).await.unwrap();
  s.save_score(id, Score { home: 2, away: 1 }).await.unwrap();

  let record = s.load_match(id).await.unwrap().unwrap();
  assert_eq!(record.status, MatchStatus::Live);
  assert_eq!(record.score, Score { home: 2, away: 1 });
  assert!(record.periods.is_empty());
  assert!(record.schedule().is_none());
}

// ─── Checkpoints ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn checkpoint_round_trips() {
  let s = store().await;
  let id = Uuid::new_v4();
  let mut cp = checkpoint(2, 61_500, 1_261_500, 4);
  cp.is_paused = true;

  s.save_checkpoint(id, cp).await.unwrap();
  assert_eq!(s.load_checkpoint(id).await.unwrap(), Some(cp));
}

#[tokio::test]
async fn last_checkpoint_write_wins() {
  let s = store().await;
  let id = Uuid::new_v4();

  s.save_checkpoint(id, checkpoint(0, 5_000, 5_000, 3)).await.unwrap();
  // Older versions are not rejected; the store does not arbitrate.
  let older = checkpoint(0, 1_000, 1_000, 1);
  s.save_checkpoint(id, older).await.unwrap();

  assert_eq!(s.load_checkpoint(id).await.unwrap(), Some(older));
}

#[tokio::test]
async fn clearing_a_checkpoint() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.save_checkpoint(id, checkpoint(0, 0, 0, 1)).await.unwrap();
  s.clear_checkpoint(id).await.unwrap();
  assert!(s.load_checkpoint(id).await.unwrap().is_none());
  // The match row survives.
  assert!(s.load_match(id).await.unwrap().is_some());
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_round_trip_with_payloads() {
  let s = store().await;
  let id = Uuid::new_v4();
  let mut log = EventLog::new(id);

  let sub = log
    .append(NewEvent::substitution(
      Side::Away,
      ("7".into(), Some("Ruiz".into())),
      ("14".into(), None),
      33.5,
      kickoff(),
    ))
    .unwrap()
    .clone();
  let kickoff_event = log
    .append(NewEvent::clock(EventKind::Kickoff, 0.0, kickoff(), EventDetail::None))
    .unwrap()
    .clone();

  s.append_event(sub.clone()).await.unwrap();
  s.append_event(kickoff_event.clone()).await.unwrap();

  let listed = s.list_events(id).await.unwrap();
  assert_eq!(listed, vec![kickoff_event, sub]);
}

#[tokio::test]
async fn appending_twice_is_a_no_op() {
  let s = store().await;
  let id = Uuid::new_v4();
  let mut log = EventLog::new(id);
  let goal = goal_at(&mut log, Side::Home, "9", 12.0);

  s.append_event(goal.clone()).await.unwrap();
  s.append_event(goal.clone()).await.unwrap();

  assert_eq!(s.list_events(id).await.unwrap(), vec![goal]);
}

#[tokio::test]
async fn events_list_by_minute_then_sequence() {
  let s = store().await;
  let id = Uuid::new_v4();
  let mut log = EventLog::new(id);
  let late = goal_at(&mut log, Side::Home, "9", 30.0);
  let tie_a = goal_at(&mut log, Side::Away, "4", 12.0);
  let tie_b = goal_at(&mut log, Side::Home, "10", 12.0);

  for e in [&tie_b, &late, &tie_a] {
    s.append_event(e.clone()).await.unwrap();
  }

  let ids: Vec<_> = s
    .list_events(id)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.event_id)
    .collect();
  assert_eq!(ids, [tie_a.event_id, tie_b.event_id, late.event_id]);
}

#[tokio::test]
async fn events_are_scoped_to_their_match() {
  let s = store().await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  s.append_event(goal_at(&mut EventLog::new(a), Side::Home, "9", 1.0))
    .await
    .unwrap();
  s.append_event(goal_at(&mut EventLog::new(b), Side::Away, "4", 2.0))
    .await
    .unwrap();

  s.clear_events(a).await.unwrap();
  assert!(s.list_events(a).await.unwrap().is_empty());
  assert_eq!(s.list_events(b).await.unwrap().len(), 1);
}

#[tokio::test]
async fn open_on_disk_persists_across_reopen() {
  let dir = std::env::temp_dir().join(format!("pitchside-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("matches.db");
  let id = Uuid::new_v4();
  let cp = checkpoint(0, 90_000, 90_000, 2);

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.save_checkpoint(id, cp).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.load_checkpoint(id).await.unwrap(), Some(cp));
  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_input_is_a_rejection_and_storage_faults_are_not() {
  let invalid = crate::Error::Validation(pitchside_core::ValidationError::EmptySchedule);
  assert!(SqliteStore::is_rejection(&invalid));

  let corrupt = crate::Error::DateParse("yesterday".into());
  assert!(!SqliteStore::is_rejection(&corrupt));
}
