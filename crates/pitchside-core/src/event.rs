//! Match events and the append-only event log.
//!
//! Events are immutable once appended. Scores are never stored alongside
//! them; [`EventLog::score`] re-derives the tally from the goal events every
//! time it is asked.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppendError;

// ─── Kinds ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  Goal,
  YellowCard,
  RedCard,
  Substitution,
  Timeout,
  Kickoff,
  PeriodStart,
  Pause,
  Resume,
  FinalWhistle,
}

impl EventKind {
  /// The discriminant string used on the wire and in the `kind` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Goal => "goal",
      Self::YellowCard => "yellow_card",
      Self::RedCard => "red_card",
      Self::Substitution => "substitution",
      Self::Timeout => "timeout",
      Self::Kickoff => "kickoff",
      Self::PeriodStart => "period_start",
      Self::Pause => "pause",
      Self::Resume => "resume",
      Self::FinalWhistle => "final_whistle",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "goal" => Self::Goal,
      "yellow_card" => Self::YellowCard,
      "red_card" => Self::RedCard,
      "substitution" => Self::Substitution,
      "timeout" => Self::Timeout,
      "kickoff" => Self::Kickoff,
      "period_start" => Self::PeriodStart,
      "pause" => Self::Pause,
      "resume" => Self::Resume,
      "final_whistle" => Self::FinalWhistle,
      _ => return None,
    })
  }

  /// Events produced by the clock itself rather than by play on the pitch.
  pub fn is_clock_event(&self) -> bool {
    matches!(
      self,
      Self::Kickoff | Self::PeriodStart | Self::Pause | Self::Resume | Self::FinalWhistle
    )
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  Home,
  Away,
}

impl Side {
  pub fn opponent(self) -> Self {
    match self {
      Self::Home => Self::Away,
      Self::Away => Self::Home,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Home => "home",
      Self::Away => "away",
    }
  }
}

impl fmt::Display for Side {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
  #[default]
  Goal,
  Penalty,
  OwnGoal,
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Type-specific data attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetail {
  #[default]
  None,
  Goal {
    #[serde(default)]
    goal_kind:        GoalKind,
    assist_player_id: Option<String>,
  },
  Card {
    reason: Option<String>,
  },
  Substitution {
    player_out_id:   String,
    player_out_name: Option<String>,
    player_in_id:    String,
    player_in_name:  Option<String>,
  },
  Period {
    order: u32,
    name:  String,
  },
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A recorded occurrence in a match. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:        Uuid,
  pub match_id:        Uuid,
  pub kind:            EventKind,
  /// Playing-time minute the event happened at; fractional.
  pub minute:          f64,
  pub team:            Option<Side>,
  pub player_id:       Option<String>,
  pub player_name:     Option<String>,
  pub description:     String,
  #[serde(default)]
  pub additional_info: EventDetail,
  /// Insertion order within the match; breaks ties between equal minutes.
  pub sequence:        u64,
  pub recorded_at:     DateTime<Utc>,
}

impl Event {
  /// Re-apply the append rules to an event recorded elsewhere, e.g. one
  /// posted to the backend.
  pub fn check(&self, match_id: Uuid) -> Result<(), AppendError> {
    if self.match_id != match_id {
      return Err(AppendError::WrongMatch {
        expected: match_id,
        found:    self.match_id,
      });
    }
    NewEvent {
      kind:            self.kind,
      minute:          self.minute,
      team:            self.team,
      player_id:       self.player_id.clone(),
      player_name:     self.player_name.clone(),
      description:     self.description.clone(),
      additional_info: self.additional_info.clone(),
      recorded_at:     self.recorded_at,
    }
    .validated()
    .map(drop)
  }
}

/// Input to [`EventLog::append`]. Identity, match and sequence are assigned
/// by the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
  pub kind:            EventKind,
  pub minute:          f64,
  pub team:            Option<Side>,
  pub player_id:       Option<String>,
  pub player_name:     Option<String>,
  /// Left empty to have the log generate one.
  pub description:     String,
  pub additional_info: EventDetail,
  pub recorded_at:     DateTime<Utc>,
}

impl NewEvent {
  /// A clock event (kickoff, pause, period start, ...). Carries no team.
  pub fn clock(
    kind: EventKind,
    minute: f64,
    at: DateTime<Utc>,
    detail: EventDetail,
  ) -> Self {
    Self {
      kind,
      minute,
      team: None,
      player_id: None,
      player_name: None,
      description: String::new(),
      additional_info: detail,
      recorded_at: at,
    }
  }

  pub fn goal(
    team: Side,
    player_id: impl Into<String>,
    player_name: Option<String>,
    goal_kind: GoalKind,
    assist_player_id: Option<String>,
    minute: f64,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      kind: EventKind::Goal,
      minute,
      team: Some(team),
      player_id: Some(player_id.into()),
      player_name,
      description: String::new(),
      additional_info: EventDetail::Goal {
        goal_kind,
        assist_player_id,
      },
      recorded_at: at,
    }
  }

  pub fn card(
    kind: EventKind,
    team: Side,
    player_id: impl Into<String>,
    player_name: Option<String>,
    reason: Option<String>,
    minute: f64,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      kind,
      minute,
      team: Some(team),
      player_id: Some(player_id.into()),
      player_name,
      description: String::new(),
      additional_info: EventDetail::Card { reason },
      recorded_at: at,
    }
  }

  pub fn substitution(
    team: Side,
    player_out: (String, Option<String>),
    player_in: (String, Option<String>),
    minute: f64,
    at: DateTime<Utc>,
  ) -> Self {
    let (player_out_id, player_out_name) = player_out;
    let (player_in_id, player_in_name) = player_in;
    Self {
      kind: EventKind::Substitution,
      minute,
      team: Some(team),
      player_id: Some(player_in_id.clone()),
      player_name: player_in_name.clone(),
      description: String::new(),
      additional_info: EventDetail::Substitution {
        player_out_id,
        player_out_name,
        player_in_id,
        player_in_name,
      },
      recorded_at: at,
    }
  }

  pub fn timeout(team: Side, minute: f64, at: DateTime<Utc>) -> Self {
    Self {
      kind: EventKind::Timeout,
      minute,
      team: Some(team),
      player_id: None,
      player_name: None,
      description: String::new(),
      additional_info: EventDetail::None,
      recorded_at: at,
    }
  }

  /// Check the per-kind required fields, filling in a default payload where
  /// one is implied by the kind.
  fn validated(mut self) -> Result<Self, AppendError> {
    if !self.minute.is_finite() || self.minute < 0.0 {
      return Err(AppendError::InvalidMinute(self.minute));
    }
    let kind = self.kind;
    let missing = |field| AppendError::MissingField { kind, field };

    match kind {
      EventKind::Goal | EventKind::YellowCard | EventKind::RedCard => {
        self.team.ok_or_else(|| missing("team"))?;
        if self.player_id.as_deref().is_none_or(|p| p.trim().is_empty()) {
          return Err(missing("player_id"));
        }
        self.additional_info = match (kind, self.additional_info) {
          (EventKind::Goal, EventDetail::None) => EventDetail::Goal {
            goal_kind:        GoalKind::Goal,
            assist_player_id: None,
          },
          (_, EventDetail::None) => EventDetail::Card { reason: None },
          (EventKind::Goal, d @ EventDetail::Goal { .. }) => d,
          (EventKind::YellowCard | EventKind::RedCard, d @ EventDetail::Card { .. }) => d,
          _ => return Err(AppendError::MismatchedDetail { kind }),
        };
      }
      EventKind::Substitution => {
        self.team.ok_or_else(|| missing("team"))?;
        match &self.additional_info {
          EventDetail::Substitution {
            player_out_id,
            player_in_id,
            ..
          } => {
            if player_out_id.trim().is_empty() {
              return Err(missing("player_out_id"));
            }
            if player_in_id.trim().is_empty() {
              return Err(missing("player_in_id"));
            }
          }
          EventDetail::None => return Err(missing("additional_info")),
          _ => return Err(AppendError::MismatchedDetail { kind }),
        }
      }
      EventKind::Timeout => {
        self.team.ok_or_else(|| missing("team"))?;
        if self.additional_info != EventDetail::None {
          return Err(AppendError::MismatchedDetail { kind });
        }
      }
      EventKind::Kickoff
      | EventKind::PeriodStart
      | EventKind::Pause
      | EventKind::Resume
      | EventKind::FinalWhistle => {
        if self.team.is_some() {
          return Err(AppendError::UnexpectedTeam(kind));
        }
        if !matches!(self.additional_info, EventDetail::None | EventDetail::Period { .. }) {
          return Err(AppendError::MismatchedDetail { kind });
        }
      }
    }

    if self.description.trim().is_empty() {
      self.description = describe(&self);
    }
    Ok(self)
  }
}

fn describe(e: &NewEvent) -> String {
  let who = e
    .player_name
    .as_deref()
    .or(e.player_id.as_deref())
    .unwrap_or("unknown player");
  let side = e.team.map(|s| s.as_str()).unwrap_or_default();
  match (&e.kind, &e.additional_info) {
    (EventKind::Goal, EventDetail::Goal { goal_kind: GoalKind::OwnGoal, .. }) => {
      format!("Own goal by {who} ({side})")
    }
    (EventKind::Goal, EventDetail::Goal { goal_kind: GoalKind::Penalty, .. }) => {
      format!("Penalty scored by {who} ({side})")
    }
    (EventKind::Goal, _) => format!("Goal by {who} ({side})"),
    (EventKind::YellowCard, _) => format!("Yellow card for {who} ({side})"),
    (EventKind::RedCard, _) => format!("Red card for {who} ({side})"),
    (
      EventKind::Substitution,
      EventDetail::Substitution {
        player_out_id,
        player_out_name,
        player_in_id,
        player_in_name,
      },
    ) => format!(
      "Substitution ({side}): {} off, {} on",
      player_out_name.as_deref().unwrap_or(player_out_id),
      player_in_name.as_deref().unwrap_or(player_in_id),
    ),
    (EventKind::Substitution, _) => format!("Substitution ({side})"),
    (EventKind::Timeout, _) => format!("Timeout called by {side}"),
    (EventKind::Kickoff, _) => "Kickoff".to_owned(),
    (EventKind::PeriodStart, EventDetail::Period { name, .. }) => format!("{name} started"),
    (EventKind::PeriodStart, _) => "Period started".to_owned(),
    (EventKind::Pause, _) => "Clock paused".to_owned(),
    (EventKind::Resume, _) => "Clock resumed".to_owned(),
    (EventKind::FinalWhistle, _) => "Final whistle".to_owned(),
  }
}

// ─── Goals and score ─────────────────────────────────────────────────────────

/// A goal as read out of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
  pub event_id:         Uuid,
  pub player_id:        String,
  /// The side the scorer plays for.
  pub team:             Side,
  /// The side whose score the goal counts toward. Differs from `team` only
  /// for own goals.
  pub credited_to:      Side,
  pub minute:           f64,
  pub kind:             GoalKind,
  pub assist_player_id: Option<String>,
}

impl Goal {
  fn from_event(e: &Event) -> Option<Self> {
    if e.kind != EventKind::Goal {
      return None;
    }
    let team = e.team?;
    let (kind, assist_player_id) = match &e.additional_info {
      EventDetail::Goal {
        goal_kind,
        assist_player_id,
      } => (*goal_kind, assist_player_id.clone()),
      _ => (GoalKind::Goal, None),
    };
    let credited_to = match kind {
      GoalKind::OwnGoal => team.opponent(),
      GoalKind::Goal | GoalKind::Penalty => team,
    };
    Some(Self {
      event_id: e.event_id,
      player_id: e.player_id.clone().unwrap_or_default(),
      team,
      credited_to,
      minute: e.minute,
      kind,
      assist_player_id,
    })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  pub home: u32,
  pub away: u32,
}

impl Score {
  pub fn for_side(&self, side: Side) -> u32 {
    match side {
      Side::Home => self.home,
      Side::Away => self.away,
    }
  }
}

impl fmt::Display for Score {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} - {}", self.home, self.away)
  }
}

// ─── EventLog ────────────────────────────────────────────────────────────────

/// The authoritative, append-only list of events for one match.
#[derive(Debug, Clone)]
pub struct EventLog {
  match_id:      Uuid,
  events:        Vec<Event>,
  ids:           HashSet<Uuid>,
  next_sequence: u64,
}

impl EventLog {
  pub fn new(match_id: Uuid) -> Self {
    Self {
      match_id,
      events: Vec::new(),
      ids: HashSet::new(),
      next_sequence: 0,
    }
  }

  /// Build a log from events loaded from the backend, in whatever order they
  /// arrived.
  pub fn from_events(match_id: Uuid, events: impl IntoIterator<Item = Event>) -> Self {
    let mut log = Self::new(match_id);
    log.merge(events);
    log
  }

  pub fn match_id(&self) -> Uuid { self.match_id }

  /// Validate and append a new event, returning the stored copy.
  pub fn append(&mut self, input: NewEvent) -> Result<&Event, AppendError> {
    let input = input.validated()?;
    let event = Event {
      event_id:        Uuid::new_v4(),
      match_id:        self.match_id,
      kind:            input.kind,
      minute:          input.minute,
      team:            input.team,
      player_id:       input.player_id,
      player_name:     input.player_name,
      description:     input.description,
      additional_info: input.additional_info,
      sequence:        self.next_sequence,
      recorded_at:     input.recorded_at,
    };
    self.next_sequence += 1;
    self.ids.insert(event.event_id);
    self.events.push(event);
    Ok(&self.events[self.events.len() - 1])
  }

  /// Fold in already-recorded events (e.g. fetched from the backend),
  /// skipping ones already present or belonging to another match. Returns how
  /// many were added.
  ///
  /// Incoming events keep their relative order but never reuse a sequence
  /// number already taken in this log; colliding ones are moved past the end.
  pub fn merge(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
    let mut incoming: Vec<Event> = events.into_iter().collect();
    incoming.sort_by(|a, b| {
      a.sequence
        .cmp(&b.sequence)
        .then(a.recorded_at.cmp(&b.recorded_at))
    });
    let mut added = 0;
    for mut e in incoming {
      if e.match_id != self.match_id {
        tracing::warn!(
          event_id = %e.event_id,
          match_id = %e.match_id,
          "ignoring event recorded for another match"
        );
        continue;
      }
      if !self.ids.insert(e.event_id) {
        continue;
      }
      e.sequence = e.sequence.max(self.next_sequence);
      self.next_sequence = e.sequence + 1;
      self.events.push(e);
      added += 1;
    }
    added
  }

  /// Events in insertion order.
  pub fn events(&self) -> &[Event] { &self.events }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  /// Events ordered for display: by minute, ties broken by insertion order.
  pub fn chronological(&self) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = self.events.iter().collect();
    sorted.sort_by(|a, b| {
      a.minute
        .total_cmp(&b.minute)
        .then(a.sequence.cmp(&b.sequence))
    });
    sorted
  }

  /// Every goal in the log, in insertion order.
  pub fn goals(&self) -> impl Iterator<Item = Goal> + '_ {
    self.events.iter().filter_map(Goal::from_event)
  }

  /// Goals counting toward `side`. Own goals count for the opponent of the
  /// scorer.
  pub fn goals_for(&self, side: Side) -> impl Iterator<Item = Goal> + '_ {
    self.goals().filter(move |g| g.credited_to == side)
  }

  pub fn score(&self) -> Score {
    Score {
      home: self.goals_for(Side::Home).count() as u32,
      away: self.goals_for(Side::Away).count() as u32,
    }
  }

  /// Drop every event. Only a full match reset does this.
  pub fn clear(&mut self) {
    self.events.clear();
    self.ids.clear();
    self.next_sequence = 0;
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 4, 15, 0, 0).unwrap() }

  fn log() -> EventLog { EventLog::new(Uuid::new_v4()) }

  fn goal(team: Side, player: &str, kind: GoalKind, minute: f64) -> NewEvent {
    NewEvent::goal(team, player, None, kind, None, minute, at())
  }

  #[test]
  fn goal_is_appended_with_generated_description() {
    let mut l = log();
    let e = l
      .append(NewEvent::goal(
        Side::Home,
        "p1",
        Some("Ricardinho".into()),
        GoalKind::Goal,
        None,
        12.0,
        at(),
      ))
      .unwrap();
    assert_eq!(e.kind, EventKind::Goal);
    assert_eq!(e.minute, 12.0);
    assert_eq!(e.description, "Goal by Ricardinho (home)");
    assert_eq!(l.score(), Score { home: 1, away: 0 });
  }

  #[test]
  fn goal_without_player_is_rejected() {
    let mut l = log();
    let mut input = goal(Side::Home, "p1", GoalKind::Goal, 3.0);
    input.player_id = None;
    assert_eq!(
      l.append(input).unwrap_err(),
      AppendError::MissingField {
        kind:  EventKind::Goal,
        field: "player_id",
      }
    );

    let mut input = goal(Side::Home, "p1", GoalKind::Goal, 3.0);
    input.team = None;
    assert!(matches!(
      l.append(input),
      Err(AppendError::MissingField { field: "team", .. })
    ));
    assert!(l.is_empty());
  }

  #[test]
  fn clock_events_must_not_carry_a_team() {
    let mut l = log();
    let mut input = NewEvent::clock(EventKind::Pause, 1.0, at(), EventDetail::None);
    input.team = Some(Side::Away);
    assert_eq!(
      l.append(input).unwrap_err(),
      AppendError::UnexpectedTeam(EventKind::Pause)
    );
  }

  #[test]
  fn substitution_needs_both_players() {
    let mut l = log();
    let input = NewEvent::substitution(
      Side::Away,
      ("9".into(), None),
      (" ".into(), None),
      30.0,
      at(),
    );
    assert!(matches!(
      l.append(input),
      Err(AppendError::MissingField { field: "player_in_id", .. })
    ));

    let mut bare = NewEvent::timeout(Side::Away, 30.0, at());
    bare.kind = EventKind::Substitution;
    assert!(matches!(
      l.append(bare),
      Err(AppendError::MissingField { field: "additional_info", .. })
    ));
  }

  #[test]
  fn negative_or_nan_minutes_are_rejected() {
    let mut l = log();
    assert!(matches!(
      l.append(NewEvent::timeout(Side::Home, -0.5, at())),
      Err(AppendError::InvalidMinute(_))
    ));
    assert!(matches!(
      l.append(NewEvent::timeout(Side::Home, f64::NAN, at())),
      Err(AppendError::InvalidMinute(_))
    ));
  }

  #[test]
  fn own_goal_counts_for_the_opponent() {
    let mut l = log();
    l.append(goal(Side::Home, "p1", GoalKind::Goal, 1.0)).unwrap();
    l.append(goal(Side::Home, "p4", GoalKind::OwnGoal, 2.0)).unwrap();
    l.append(goal(Side::Away, "p8", GoalKind::Penalty, 3.0)).unwrap();

    assert_eq!(l.score(), Score { home: 1, away: 2 });
    let away: Vec<_> = l.goals_for(Side::Away).map(|g| g.player_id).collect();
    assert_eq!(away, ["p4", "p8"]);
  }

  #[test]
  fn goal_counts_always_partition_the_goal_list() {
    let mut l = log();
    let sides = [Side::Home, Side::Away];
    let kinds = [GoalKind::Goal, GoalKind::OwnGoal, GoalKind::Penalty];
    for i in 0..17 {
      let side = sides[i % 2];
      let kind = kinds[i % 3];
      l.append(goal(side, "p", kind, i as f64)).unwrap();
      if i % 4 == 0 {
        l.append(NewEvent::timeout(side, i as f64, at())).unwrap();
      }

      let home = l.goals_for(Side::Home).count();
      let away = l.goals_for(Side::Away).count();
      assert_eq!(home + away, l.goals().count());
      assert_eq!(l.score(), Score { home: home as u32, away: away as u32 });
    }
  }

  #[test]
  fn goals_for_is_restartable() {
    let mut l = log();
    l.append(goal(Side::Home, "p1", GoalKind::Goal, 1.0)).unwrap();
    assert_eq!(l.goals_for(Side::Home).count(), 1);
    assert_eq!(l.goals_for(Side::Home).count(), 1);
    l.append(goal(Side::Home, "p2", GoalKind::Goal, 2.0)).unwrap();
    assert_eq!(l.goals_for(Side::Home).count(), 2);
  }

  #[test]
  fn chronological_sorts_by_minute_then_insertion() {
    let mut l = log();
    l.append(NewEvent::timeout(Side::Home, 5.0, at())).unwrap();
    l.append(goal(Side::Away, "late", GoalKind::Goal, 9.0)).unwrap();
    l.append(goal(Side::Home, "early", GoalKind::Goal, 2.5)).unwrap();
    l.append(NewEvent::timeout(Side::Away, 5.0, at())).unwrap();

    let order: Vec<_> = l
      .chronological()
      .iter()
      .map(|e| (e.minute, e.team))
      .collect();
    assert_eq!(
      order,
      [
        (2.5, Some(Side::Home)),
        (5.0, Some(Side::Home)),
        (5.0, Some(Side::Away)),
        (9.0, Some(Side::Away)),
      ]
    );
  }

  #[test]
  fn merge_tolerates_out_of_order_and_duplicates() {
    let mut source = log();
    for m in [1.0, 4.0, 8.0] {
      source.append(NewEvent::timeout(Side::Home, m, at())).unwrap();
    }
    let mut arrived = source.events().to_vec();
    arrived.reverse();
    arrived.push(arrived[0].clone());

    let mut stranger = arrived[0].clone();
    stranger.match_id = Uuid::new_v4();
    stranger.event_id = Uuid::new_v4();
    arrived.push(stranger);

    let mut loaded = EventLog::from_events(source.match_id(), arrived);
    assert_eq!(loaded.len(), 3);
    let minutes: Vec<_> = loaded.chronological().iter().map(|e| e.minute).collect();
    assert_eq!(minutes, [1.0, 4.0, 8.0]);

    let next = loaded.append(NewEvent::timeout(Side::Away, 9.0, at())).unwrap();
    assert_eq!(next.sequence, 3);
  }

  #[test]
  fn merged_events_never_share_a_sequence_with_local_ones() {
    let mut remote = log();
    let first = remote
      .append(NewEvent::timeout(Side::Home, 2.0, at()))
      .unwrap()
      .clone();
    let second = remote
      .append(NewEvent::timeout(Side::Away, 2.0, at()))
      .unwrap()
      .clone();

    let mut local = EventLog::new(remote.match_id());
    for _ in 0..3 {
      local.append(NewEvent::timeout(Side::Home, 2.0, at())).unwrap();
    }
    assert_eq!(local.merge([second.clone(), first.clone()]), 2);

    let mut sequences: Vec<_> = local.events().iter().map(|e| e.sequence).collect();
    sequences.sort_unstable();
    sequences.dedup();
    assert_eq!(sequences, [0, 1, 2, 3, 4]);

    let ordered: Vec<_> = local.chronological().iter().map(|e| e.event_id).collect();
    assert_eq!(&ordered[3..], [first.event_id, second.event_id]);
    assert_eq!(
      local.append(NewEvent::timeout(Side::Away, 3.0, at())).unwrap().sequence,
      5
    );
  }

  #[test]
  fn clear_empties_the_log() {
    let mut l = log();
    l.append(goal(Side::Home, "p1", GoalKind::Goal, 1.0)).unwrap();
    l.clear();
    assert!(l.is_empty());
    assert_eq!(l.score(), Score::default());
  }

  #[test]
  fn check_rejects_foreign_or_malformed_events() {
    let mut l = log();
    let goal = l
      .append(goal(Side::Home, "p1", GoalKind::Goal, 3.0))
      .unwrap()
      .clone();
    assert_eq!(goal.check(l.match_id()), Ok(()));

    let other = Uuid::new_v4();
    assert!(matches!(goal.check(other), Err(AppendError::WrongMatch { .. })));

    let mut teamless = goal.clone();
    teamless.team = None;
    assert_eq!(
      teamless.check(l.match_id()),
      Err(AppendError::MissingField {
        kind:  EventKind::Goal,
        field: "team",
      })
    );
  }
}
