//! The session actor and its handle.
//!
//! One tokio task owns the engine, the event log and all timers for a single
//! match. [`SessionHandle`] methods send it commands and await the reply, so
//! every action and every tick is serialised onto that task.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use pitchside_core::{
  clock::{Checkpoint, ClockEngine, ClockState, Projection},
  event::{Event, EventKind, EventLog, GoalKind, NewEvent, Score, Side},
  period::{Period, PeriodSchedule},
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
  TransitionError,
};
use tokio::{
  sync::{mpsc, oneshot, watch},
  task::JoinHandle,
  time::{self, Instant, Interval, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
  config::SessionConfig,
  error::{LoadError, Result, SessionError, SyncWarning},
  outbox::Outbox,
  reconcile::{resolve, Outbound, Reconciler, Resolution},
  wall_clock::WallClock,
};

/// Oldest warnings are dropped past this many.
const MAX_WARNINGS: usize = 20;

const COMMAND_BUFFER: usize = 32;

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
  pub team:             Side,
  pub player_id:        String,
  pub player_name:      Option<String>,
  pub kind:             GoalKind,
  pub assist_player_id: Option<String>,
}

impl GoalInput {
  pub fn new(team: Side, player_id: impl Into<String>) -> Self {
    Self {
      team,
      player_id: player_id.into(),
      player_name: None,
      kind: GoalKind::Goal,
      assist_player_id: None,
    }
  }

  pub fn with_kind(mut self, kind: GoalKind) -> Self {
    self.kind = kind;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardColor {
  Yellow,
  Red,
}

impl CardColor {
  fn kind(self) -> EventKind {
    match self {
      Self::Yellow => EventKind::YellowCard,
      Self::Red => EventKind::RedCard,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardInput {
  pub team:        Side,
  pub color:       CardColor,
  pub player_id:   String,
  pub player_name: Option<String>,
  pub reason:      Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionInput {
  pub team:            Side,
  pub player_out_id:   String,
  pub player_out_name: Option<String>,
  pub player_in_id:    String,
  pub player_in_name:  Option<String>,
}

/// Proof that the official confirmed a reset. A reset clears the clock and
/// every recorded event, so callers must ask before building one.
#[derive(Debug)]
pub struct ResetConfirmation {
  _confirmed: (),
}

impl ResetConfirmation {
  pub fn confirmed() -> Self { Self { _confirmed: () } }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything a display needs, as of one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
  pub match_id:   Uuid,
  pub status:     MatchStatus,
  pub clock:      Projection,
  pub checkpoint: Option<Checkpoint>,
  pub periods:    Vec<Period>,
  /// Ordered by minute, ties in recording order.
  pub events:     Vec<Event>,
  pub score:      Score,
  pub warnings:   Vec<SyncWarning>,
  /// Writes applied locally that the backend has not confirmed.
  pub unsynced:   usize,
}

impl Snapshot {
  /// Goals may be recorded only while a playing period is on the clock.
  pub fn goals_allowed(&self) -> bool {
    matches!(self.clock.state, ClockState::Running | ClockState::PausedInPlay)
      && !self.clock.is_break
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
  Start(Reply<Vec<Event>>),
  Pause(Reply<Vec<Event>>),
  Resume(Reply<Vec<Event>>),
  AdvancePeriod(Reply<Vec<Event>>),
  Finish(Reply<Vec<Event>>),
  Reset(ResetConfirmation, Reply<()>),
  RecordGoal(GoalInput, Reply<Event>),
  RecordCard(CardInput, Reply<Event>),
  RecordSubstitution(SubstitutionInput, Reply<Event>),
  RecordTimeout(Side, Reply<Event>),
  UpdatePeriods(PeriodSchedule, Reply<()>),
  ReconcileNow(Reply<Snapshot>),
  DismissWarnings(Reply<()>),
  Snapshot(Reply<Snapshot>),
  Deactivate(Reply<()>),
}

/// A background read of the backend, tagged with the local generation it
/// was requested at.
struct Loaded {
  seq:        u64,
  generation: u64,
  checkpoint: std::result::Result<Option<Checkpoint>, LoadError>,
  events:     std::result::Result<Vec<Event>, LoadError>,
  record:     Option<std::result::Result<Option<MatchRecord>, LoadError>>,
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Cheap to clone. The session stops once every handle is dropped or
/// [`deactivate`](Self::deactivate) is called.
#[derive(Clone)]
pub struct SessionHandle {
  match_id:  Uuid,
  commands:  mpsc::Sender<Command>,
  snapshots: watch::Receiver<Snapshot>,
}

impl SessionHandle {
  pub fn match_id(&self) -> Uuid { self.match_id }

  async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    self
      .commands
      .send(make(tx))
      .await
      .map_err(|_| SessionError::Closed)?;
    rx.await.map_err(|_| SessionError::Closed)?
  }

  // ── Clock ─────────────────────────────────────────────────────────────────

  pub async fn start(&self) -> Result<Vec<Event>> { self.request(Command::Start).await }

  pub async fn pause(&self) -> Result<Vec<Event>> { self.request(Command::Pause).await }

  pub async fn resume(&self) -> Result<Vec<Event>> { self.request(Command::Resume).await }

  pub async fn advance_period(&self) -> Result<Vec<Event>> {
    self.request(Command::AdvancePeriod).await
  }

  pub async fn finish(&self) -> Result<Vec<Event>> { self.request(Command::Finish).await }

  /// Clear the clock, the event log and the score, locally and remotely.
  pub async fn reset(&self, confirmation: ResetConfirmation) -> Result<()> {
    self
      .request(|reply| Command::Reset(confirmation, reply))
      .await
  }

  // ── Events ────────────────────────────────────────────────────────────────

  pub async fn record_goal(&self, goal: GoalInput) -> Result<Event> {
    self.request(|reply| Command::RecordGoal(goal, reply)).await
  }

  pub async fn record_card(&self, card: CardInput) -> Result<Event> {
    self.request(|reply| Command::RecordCard(card, reply)).await
  }

  pub async fn record_substitution(&self, sub: SubstitutionInput) -> Result<Event> {
    self
      .request(|reply| Command::RecordSubstitution(sub, reply))
      .await
  }

  pub async fn record_timeout(&self, team: Side) -> Result<Event> {
    self.request(|reply| Command::RecordTimeout(team, reply)).await
  }

  // ── Schedule and sync ─────────────────────────────────────────────────────

  /// Replace the period schedule. Rejected while the clock is running.
  pub async fn update_periods(&self, schedule: PeriodSchedule) -> Result<()> {
    self
      .request(|reply| Command::UpdatePeriods(schedule, reply))
      .await
  }

  /// Load the backend state now and apply it under the conflict policy.
  pub async fn reconcile_now(&self) -> Result<Snapshot> {
    self.request(Command::ReconcileNow).await
  }

  pub async fn dismiss_warnings(&self) -> Result<()> {
    self.request(Command::DismissWarnings).await
  }

  pub async fn snapshot(&self) -> Result<Snapshot> { self.request(Command::Snapshot).await }

  /// A receiver that sees a fresh snapshot after every tick and action.
  pub fn subscribe(&self) -> watch::Receiver<Snapshot> { self.snapshots.clone() }

  /// Stop timers, flush pending writes once, and shut the session down.
  pub async fn deactivate(self) -> Result<()> { self.request(Command::Deactivate).await }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The actor state. Only reachable through a [`SessionHandle`].
pub struct Session<S> {
  match_id:          Uuid,
  reconciler:        Reconciler<S>,
  clock:             Arc<dyn WallClock>,
  config:            SessionConfig,
  engine:            ClockEngine,
  log:               EventLog,
  status:            MatchStatus,
  /// Whether the backend's schedule has been seen at least once.
  schedule_loaded:   bool,
  outbox:            Outbox,
  warnings:          Vec<SyncWarning>,
  /// Bumped on every local change; loads requested earlier are discarded.
  generation:        u64,
  timers_dirty:      bool,
  reconcile_task:    Option<JoinHandle<()>>,
  reconcile_seq:     u64,
  /// Callers of `reconcile_now`, keyed by the load that will answer them.
  reconcile_waiters: Vec<(u64, Reply<Snapshot>)>,
  loads_tx:          mpsc::UnboundedSender<Loaded>,
  snapshots:         watch::Sender<Snapshot>,
}

impl<S: MatchStore + 'static> Session<S> {
  /// Load the match from `store` and start officiating it.
  ///
  /// Load failures do not prevent activation: the session starts from
  /// whatever could be read, records a warning, and retries in the
  /// background.
  pub async fn activate(
    match_id: Uuid,
    store: Arc<S>,
    clock: Arc<dyn WallClock>,
    config: SessionConfig,
  ) -> SessionHandle {
    let reconciler = Reconciler::new(store, match_id);
    let now = clock.now();
    let mut warnings = Vec::new();
    let mut note = |e: LoadError| {
      tracing::warn!(%match_id, error = %e, "load failed during activation");
      warnings.push(SyncWarning::from_load(&e, now));
    };

    let record = reconciler.load_match().await;
    let checkpoint = reconciler.load_checkpoint().await;
    let events = reconciler.load_events().await;

    let (schedule_loaded, remote_schedule, status) = match record {
      Ok(Some(record)) => (true, record.schedule(), record.status),
      Ok(None) => (true, None, MatchStatus::Scheduled),
      Err(e) => {
        note(e);
        (false, None, MatchStatus::Scheduled)
      }
    };
    let checkpoint_loaded = checkpoint.is_ok();
    let checkpoint = checkpoint.unwrap_or_else(|e| {
      note(e);
      None
    });
    let events = events.unwrap_or_else(|e| {
      note(e);
      Vec::new()
    });

    let needs_schedule_save = schedule_loaded && remote_schedule.is_none();
    let schedule = remote_schedule.unwrap_or_else(PeriodSchedule::futsal);
    let engine = ClockEngine::restore(schedule, checkpoint);
    let log = EventLog::from_events(match_id, events);

    let (warnings_tx, warnings_rx) = mpsc::unbounded_channel();
    let outbox = Outbox::spawn(reconciler.clone(), Arc::clone(&clock), warnings_tx);
    let (loads_tx, loads_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);

    let initial = build_snapshot(match_id, status, &engine, &log, &warnings, 0, now);
    let (snapshots, snapshots_rx) = watch::channel(initial);

    let mut session = Session {
      match_id,
      reconciler,
      clock,
      config,
      engine,
      log,
      status,
      schedule_loaded,
      outbox,
      warnings,
      generation: 0,
      timers_dirty: false,
      reconcile_task: None,
      reconcile_seq: 0,
      reconcile_waiters: Vec::new(),
      loads_tx,
      snapshots,
    };

    if needs_schedule_save {
      session
        .outbox
        .push(Outbound::Periods(session.engine.schedule().clone()));
    }
    if schedule_loaded {
      session.set_status(MatchStatus::Active);
    }
    if !schedule_loaded || !checkpoint_loaded {
      session.spawn_reconcile();
    }

    tracing::info!(
      %match_id,
      state = %session.engine.state(),
      events = session.log.len(),
      "officiating session activated"
    );

    tokio::spawn(session.run(commands_rx, loads_rx, warnings_rx));

    SessionHandle {
      match_id,
      commands: commands_tx,
      snapshots: snapshots_rx,
    }
  }

  async fn run(
    mut self,
    mut commands: mpsc::Receiver<Command>,
    mut loads: mpsc::UnboundedReceiver<Loaded>,
    mut warnings: mpsc::UnboundedReceiver<SyncWarning>,
  ) {
    let mut tick = every(self.config.tick_interval, false);
    let mut heartbeat = every(self.config.heartbeat_interval, true);
    let mut reconcile = every(self.config.reconcile_interval, true);

    let deactivated = loop {
      tokio::select! {
        cmd = commands.recv() => match cmd {
          Some(Command::Deactivate(reply)) => break Some(reply),
          Some(cmd) => self.handle(cmd),
          None => break None,
        },
        _ = tick.tick() => self.on_tick(),
        _ = heartbeat.tick() => self.on_heartbeat(),
        _ = reconcile.tick() => {
          self.spawn_reconcile();
        }
        Some(loaded) = loads.recv() => self.apply_load(loaded),
        Some(warning) = warnings.recv() => self.push_warning(warning),
      }

      if std::mem::take(&mut self.timers_dirty) {
        tick.reset();
        heartbeat.reset();
      }
      self.publish();
    };

    self.shutdown().await;
    if let Some(reply) = deactivated {
      let _ = reply.send(Ok(()));
    }
  }

  fn handle(&mut self, cmd: Command) {
    let now = self.clock.now();
    match cmd {
      Command::Start(reply) => {
        let _ = reply.send(self.transition(now, ClockEngine::start));
      }
      Command::Pause(reply) => {
        let _ = reply.send(self.transition(now, ClockEngine::pause));
      }
      Command::Resume(reply) => {
        let _ = reply.send(self.transition(now, ClockEngine::resume));
      }
      Command::AdvancePeriod(reply) => {
        let _ = reply.send(self.transition(now, ClockEngine::advance_period));
      }
      Command::Finish(reply) => {
        let _ = reply.send(self.transition(now, ClockEngine::finish));
      }
      Command::Reset(_confirmed, reply) => {
        self.reset();
        let _ = reply.send(Ok(()));
      }
      Command::RecordGoal(goal, reply) => {
        let _ = reply.send(self.record_goal(now, goal));
      }
      Command::RecordCard(card, reply) => {
        let minute = self.current_minute(now);
        let event = NewEvent::card(
          card.color.kind(),
          card.team,
          card.player_id,
          card.player_name,
          card.reason,
          minute,
          now,
        );
        let _ = reply.send(self.append(event));
      }
      Command::RecordSubstitution(sub, reply) => {
        let minute = self.current_minute(now);
        let event = NewEvent::substitution(
          sub.team,
          (sub.player_out_id, sub.player_out_name),
          (sub.player_in_id, sub.player_in_name),
          minute,
          now,
        );
        let _ = reply.send(self.append(event));
      }
      Command::RecordTimeout(team, reply) => {
        let minute = self.current_minute(now);
        let _ = reply.send(self.append(NewEvent::timeout(team, minute, now)));
      }
      Command::UpdatePeriods(schedule, reply) => {
        let _ = reply.send(self.update_periods(now, schedule));
      }
      Command::ReconcileNow(reply) => {
        let seq = self.spawn_reconcile();
        self.reconcile_waiters.push((seq, reply));
      }
      Command::DismissWarnings(reply) => {
        self.warnings.clear();
        let _ = reply.send(Ok(()));
      }
      Command::Snapshot(reply) => {
        self.catch_up(now);
        let _ = reply.send(Ok(self.snapshot(now)));
      }
      Command::Deactivate(reply) => {
        // Handled by the run loop; never dispatched here.
        let _ = reply.send(Ok(()));
      }
    }
  }

  // ── Clock ─────────────────────────────────────────────────────────────────

  /// Commit elapsed time to the engine, recording any rollover events.
  fn catch_up(&mut self, now: DateTime<Utc>) {
    let emitted = self.engine.tick(now);
    if !emitted.is_empty() {
      self.record_clock_events(emitted);
      self.checkpoint_changed();
    }
  }

  fn transition(
    &mut self,
    now: DateTime<Utc>,
    action: fn(&mut ClockEngine, DateTime<Utc>) -> std::result::Result<Vec<NewEvent>, TransitionError>,
  ) -> Result<Vec<Event>> {
    self.catch_up(now);
    let emitted = action(&mut self.engine, now)?;
    let events = self.record_clock_events(emitted);
    self.checkpoint_changed();
    Ok(events)
  }

  fn record_clock_events(&mut self, emitted: Vec<NewEvent>) -> Vec<Event> {
    let mut out = Vec::with_capacity(emitted.len());
    for new in emitted {
      let event = match self.log.append(new) {
        Ok(event) => event.clone(),
        Err(e) => {
          tracing::warn!(match_id = %self.match_id, error = %e, "dropping invalid clock event");
          continue;
        }
      };
      match event.kind {
        EventKind::Kickoff => self.set_status(MatchStatus::Live),
        EventKind::FinalWhistle => self.set_status(MatchStatus::Finished),
        _ => {}
      }
      self.outbox.push(Outbound::Event(event.clone()));
      out.push(event);
    }
    out
  }

  /// Queue the current checkpoint after an explicit change.
  fn checkpoint_changed(&mut self) {
    self.generation += 1;
    if let Some(cp) = self.engine.checkpoint() {
      self.outbox.push(Outbound::Checkpoint(*cp));
    }
  }

  fn on_tick(&mut self) {
    let now = self.clock.now();
    self.catch_up(now);
  }

  fn on_heartbeat(&mut self) {
    let now = self.clock.now();
    self.catch_up(now);
    if self.engine.state() == ClockState::Running
      && let Some(cp) = self.engine.checkpoint()
    {
      self.outbox.push(Outbound::Checkpoint(*cp));
    }
    self.outbox.retry();
  }

  fn reset(&mut self) {
    self.engine.reset();
    self.log.clear();
    self.outbox.push(Outbound::ClearCheckpoint);
    self.outbox.push(Outbound::ClearEvents);
    self.outbox.push(Outbound::Score(Score::default()));
    self.set_status(MatchStatus::Scheduled);
    self.generation += 1;
    self.timers_dirty = true;
    tracing::info!(match_id = %self.match_id, "match reset");
  }

  fn update_periods(&mut self, now: DateTime<Utc>, schedule: PeriodSchedule) -> Result<()> {
    self.catch_up(now);
    self.engine.replace_schedule(schedule.clone())?;
    self.outbox.push(Outbound::Periods(schedule));
    self.schedule_loaded = true;
    self.generation += 1;
    self.timers_dirty = true;
    Ok(())
  }

  // ── Events ────────────────────────────────────────────────────────────────

  fn current_minute(&mut self, now: DateTime<Utc>) -> f64 {
    self.catch_up(now);
    self.engine.minute(now)
  }

  fn record_goal(&mut self, now: DateTime<Utc>, goal: GoalInput) -> Result<Event> {
    self.catch_up(now);
    let projection = self.engine.project(now);
    match projection.state {
      ClockState::Running | ClockState::PausedInPlay => {}
      other => return Err(SessionError::NotInPlay(other)),
    }
    if projection.is_break {
      return Err(SessionError::DuringBreak);
    }

    let event = self.append(NewEvent::goal(
      goal.team,
      goal.player_id,
      goal.player_name,
      goal.kind,
      goal.assist_player_id,
      projection.minute,
      now,
    ))?;
    self.outbox.push(Outbound::Score(self.log.score()));
    Ok(event)
  }

  fn append(&mut self, new: NewEvent) -> Result<Event> {
    let event = self.log.append(new)?.clone();
    self.outbox.push(Outbound::Event(event.clone()));
    self.generation += 1;
    tracing::debug!(
      match_id = %self.match_id,
      kind = %event.kind,
      minute = event.minute,
      "event recorded"
    );
    Ok(event)
  }

  fn set_status(&mut self, next: MatchStatus) {
    if next != self.status && self.status.can_transition_to(next) {
      self.status = next;
      self.outbox.push(Outbound::Status(next));
    }
  }

  // ── Reconcile ─────────────────────────────────────────────────────────────

  /// Start a background load unless one is running. Returns the sequence
  /// number of the load whose result will be applied next.
  fn spawn_reconcile(&mut self) -> u64 {
    if self
      .reconcile_task
      .as_ref()
      .is_some_and(|task| !task.is_finished())
    {
      return self.reconcile_seq;
    }
    self.reconcile_seq += 1;
    let seq = self.reconcile_seq;
    let reconciler = self.reconciler.clone();
    let tx = self.loads_tx.clone();
    let generation = self.generation;
    let want_record = !self.schedule_loaded;

    self.reconcile_task = Some(tokio::spawn(async move {
      let checkpoint = reconciler.load_checkpoint().await;
      let events = reconciler.load_events().await;
      let record = if want_record {
        Some(reconciler.load_match().await)
      } else {
        None
      };
      let _ = tx.send(Loaded {
        seq,
        generation,
        checkpoint,
        events,
        record,
      });
    }));
    seq
  }

  fn apply_load(&mut self, loaded: Loaded) {
    let now = self.clock.now();
    let in_flight = loaded.generation != self.generation || self.outbox.pending() > 0;

    match loaded.checkpoint {
      Ok(remote) => match resolve(self.engine.checkpoint(), remote.as_ref(), in_flight) {
        Resolution::Adopt(cp) => {
          tracing::info!(
            match_id = %self.match_id,
            version = cp.version,
            "adopting newer clock state from backend"
          );
          self.engine = ClockEngine::restore(self.engine.schedule().clone(), Some(cp));
          self.timers_dirty = true;
        }
        Resolution::KeepLocal => {}
        Resolution::Discard => {
          tracing::debug!(
            match_id = %self.match_id,
            unsynced = self.outbox.pending(),
            "discarding load; local writes in flight"
          );
        }
      },
      Err(e) => self.push_warning(SyncWarning::from_load(&e, now)),
    }

    if !in_flight {
      match loaded.events {
        Ok(events) => {
          let added = self.log.merge(events);
          if added > 0 {
            tracing::info!(match_id = %self.match_id, added, "merged events from backend");
          }
        }
        Err(e) => self.push_warning(SyncWarning::from_load(&e, now)),
      }

      match loaded.record {
        Some(Ok(Some(record))) => self.adopt_record(record),
        Some(Ok(None)) => {
          self.schedule_loaded = true;
          self
            .outbox
            .push(Outbound::Periods(self.engine.schedule().clone()));
        }
        Some(Err(e)) => self.push_warning(SyncWarning::from_load(&e, now)),
        None => {}
      }
    }

    self.catch_up(now);
    let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.reconcile_waiters)
      .into_iter()
      .partition(|(seq, _)| *seq <= loaded.seq);
    self.reconcile_waiters = waiting;
    for (_, waiter) in ready {
      let _ = waiter.send(Ok(self.snapshot(now)));
    }
  }

  /// First successful read of the match after a failed activation load.
  fn adopt_record(&mut self, record: MatchRecord) {
    self.schedule_loaded = true;
    if let Some(schedule) = record.schedule() {
      if let Err(e) = self.engine.replace_schedule(schedule) {
        tracing::warn!(match_id = %self.match_id, error = %e, "keeping local schedule");
      } else {
        self.timers_dirty = true;
      }
    }
    if self.status == MatchStatus::Scheduled {
      self.status = record.status;
    }
    self.set_status(MatchStatus::Active);
  }

  // ── Output ────────────────────────────────────────────────────────────────

  fn push_warning(&mut self, warning: SyncWarning) {
    self.warnings.push(warning);
    if self.warnings.len() > MAX_WARNINGS {
      let excess = self.warnings.len() - MAX_WARNINGS;
      self.warnings.drain(..excess);
    }
  }

  fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
    build_snapshot(
      self.match_id,
      self.status,
      &self.engine,
      &self.log,
      &self.warnings,
      self.outbox.pending(),
      now,
    )
  }

  fn publish(&self) {
    let now = self.clock.now();
    self.snapshots.send_replace(self.snapshot(now));
  }

  async fn shutdown(mut self) {
    if let Some(task) = self.reconcile_task.take() {
      task.abort();
    }
    let now = self.clock.now();
    self.catch_up(now);
    if self.engine.state() == ClockState::Running
      && let Some(cp) = self.engine.checkpoint()
    {
      self.outbox.push(Outbound::Checkpoint(*cp));
    }
    self.publish();
    let unsynced = self.outbox.pending();
    self.outbox.close().await;
    tracing::info!(match_id = %self.match_id, unsynced, "officiating session closed");
  }
}

fn build_snapshot(
  match_id: Uuid,
  status: MatchStatus,
  engine: &ClockEngine,
  log: &EventLog,
  warnings: &[SyncWarning],
  unsynced: usize,
  now: DateTime<Utc>,
) -> Snapshot {
  Snapshot {
    match_id,
    status,
    clock: engine.project(now),
    checkpoint: engine.checkpoint().copied(),
    periods: engine.schedule().periods().to_vec(),
    events: log.chronological().into_iter().cloned().collect(),
    score: log.score(),
    warnings: warnings.to_vec(),
    unsynced,
  }
}

/// An interval that skips missed ticks. Delayed intervals first fire one
/// period from now.
fn every(period: Duration, delayed: bool) -> Interval {
  let period = period.max(Duration::from_millis(1));
  let mut interval = if delayed {
    time::interval_at(Instant::now() + period, period)
  } else {
    time::interval(period)
  };
  interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
  interval
}
