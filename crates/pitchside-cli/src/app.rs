//! Application state machine and key dispatcher.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pitchside_core::{clock::ClockState, event::{GoalKind, Side}};
use pitchside_session::{
  CardColor, CardInput, GoalInput, ResetConfirmation, SessionError, SessionHandle, Snapshot,
  SubstitutionInput,
};
use tokio::sync::watch;

// ─── Mode ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
  Goal(GoalKind),
  Card(CardColor),
  Substitution,
}

impl PromptAction {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Goal(GoalKind::Goal) => "Goal",
      Self::Goal(GoalKind::Penalty) => "Penalty",
      Self::Goal(GoalKind::OwnGoal) => "Own goal",
      Self::Card(CardColor::Yellow) => "Yellow card",
      Self::Card(CardColor::Red) => "Red card",
      Self::Substitution => "Substitution",
    }
  }

  pub fn hint(&self) -> &'static str {
    match self {
      Self::Substitution => "out-id [name] > in-id [name]",
      _ => "player-id [name]",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  /// Typing the player(s) for an event.
  Prompt { action: PromptAction, input: String },
  /// Waiting for `y` before a reset.
  ConfirmReset,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub mode:         Mode,

  /// Team the next event is recorded for.
  pub side:         Side,

  /// Latest state published by the session.
  pub snapshot:     Snapshot,

  /// Scroll offset within the event list.
  pub event_scroll: usize,

  /// One-line message shown in the status bar.
  pub status_msg:   String,

  handle:           SessionHandle,
  updates:          watch::Receiver<Snapshot>,
}

impl App {
  pub fn new(handle: SessionHandle) -> Self {
    let updates = handle.subscribe();
    let snapshot = updates.borrow().clone();
    Self {
      mode: Mode::Normal,
      side: Side::Home,
      snapshot,
      event_scroll: 0,
      status_msg: String::new(),
      handle,
      updates,
    }
  }

  /// Pick up the newest snapshot, if the session published one.
  pub fn refresh(&mut self) {
    match self.updates.has_changed() {
      Ok(true) => self.snapshot = self.updates.borrow_and_update().clone(),
      Ok(false) => {}
      Err(_) => self.status_msg = "Session closed.".into(),
    }
  }

  /// Stop the session, flushing pending writes.
  pub async fn shutdown(self) -> anyhow::Result<()> {
    match self.handle.deactivate().await {
      Ok(()) | Err(SessionError::Closed) => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    match std::mem::replace(&mut self.mode, Mode::Normal) {
      Mode::Normal => self.handle_normal_key(key).await,
      Mode::Prompt { action, input } => self.handle_prompt_key(key, action, input).await,
      Mode::ConfirmReset => self.handle_confirm_key(key).await,
    }
  }

  async fn handle_normal_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      // Clock
      KeyCode::Char(' ') => self.toggle_clock().await?,
      KeyCode::Char('n') => {
        let result = self.handle.advance_period().await;
        self.report("Next period", result)?;
      }
      KeyCode::Char('f') => {
        let result = self.handle.finish().await;
        self.report("Final whistle", result)?;
      }
      KeyCode::Char('R') => {
        self.mode = Mode::ConfirmReset;
      }

      // Team
      KeyCode::Char('1') => self.side = Side::Home,
      KeyCode::Char('2') => self.side = Side::Away,

      // Events
      KeyCode::Char('g') => self.open_goal_prompt(GoalKind::Goal),
      KeyCode::Char('p') => self.open_goal_prompt(GoalKind::Penalty),
      KeyCode::Char('o') => self.open_goal_prompt(GoalKind::OwnGoal),
      KeyCode::Char('y') => self.open_prompt(PromptAction::Card(CardColor::Yellow)),
      KeyCode::Char('r') => self.open_prompt(PromptAction::Card(CardColor::Red)),
      KeyCode::Char('s') => self.open_prompt(PromptAction::Substitution),
      KeyCode::Char('t') => {
        let result = self.handle.record_timeout(self.side).await;
        self.report("Timeout", result)?;
      }

      // Sync
      KeyCode::Char('u') => {
        let result = self.handle.reconcile_now().await;
        if let Some(snapshot) = self.report("Refresh", result)? {
          self.snapshot = snapshot;
        }
      }
      KeyCode::Char('w') => {
        let result = self.handle.dismiss_warnings().await;
        self.report("Warnings cleared", result)?;
      }

      // Event list
      KeyCode::Down | KeyCode::Char('j') => {
        if self.event_scroll + 1 < self.snapshot.events.len() {
          self.event_scroll += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.event_scroll = self.event_scroll.saturating_sub(1);
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_prompt_key(
    &mut self,
    key: KeyEvent,
    action: PromptAction,
    mut input: String,
  ) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Esc => self.status_msg = format!("{} cancelled.", action.label()),
      KeyCode::Enter => self.submit(action, &input).await?,
      KeyCode::Backspace => {
        input.pop();
        self.mode = Mode::Prompt { action, input };
      }
      KeyCode::Char(c) => {
        input.push(c);
        self.mode = Mode::Prompt { action, input };
      }
      _ => self.mode = Mode::Prompt { action, input },
    }
    Ok(true)
  }

  async fn handle_confirm_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
      let result = self.handle.reset(ResetConfirmation::confirmed()).await;
      self.report("Match reset", result)?;
      self.event_scroll = 0;
    } else {
      self.status_msg = "Reset cancelled.".into();
    }
    Ok(true)
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  async fn toggle_clock(&mut self) -> anyhow::Result<()> {
    let (label, result) = match self.snapshot.clock.state {
      ClockState::NotStarted => ("Kickoff", self.handle.start().await),
      ClockState::Running => ("Paused", self.handle.pause().await),
      ClockState::PausedInPlay | ClockState::PausedAtBreak => {
        ("Resumed", self.handle.resume().await)
      }
      ClockState::Finished => {
        self.status_msg = "Match is finished; press R to reset.".into();
        return Ok(());
      }
    };
    self.report(label, result).map(drop)
  }

  fn open_goal_prompt(&mut self, kind: GoalKind) {
    if !self.snapshot.goals_allowed() {
      self.status_msg = "Goals can only be recorded during a playing period.".into();
      return;
    }
    self.open_prompt(PromptAction::Goal(kind));
  }

  fn open_prompt(&mut self, action: PromptAction) {
    self.mode = Mode::Prompt {
      action,
      input: String::new(),
    };
  }

  async fn submit(&mut self, action: PromptAction, input: &str) -> anyhow::Result<()> {
    let side = self.side;
    let result = match action {
      PromptAction::Goal(kind) => {
        let Some((player_id, player_name)) = parse_player(input) else {
          return self.reprompt(action, input);
        };
        let mut goal = GoalInput::new(side, player_id).with_kind(kind);
        goal.player_name = player_name;
        self.handle.record_goal(goal).await
      }
      PromptAction::Card(color) => {
        let Some((player_id, player_name)) = parse_player(input) else {
          return self.reprompt(action, input);
        };
        let card = CardInput {
          team: side,
          color,
          player_id,
          player_name,
          reason: None,
        };
        self.handle.record_card(card).await
      }
      PromptAction::Substitution => {
        let Some(((out_id, out_name), (in_id, in_name))) = parse_substitution(input) else {
          return self.reprompt(action, input);
        };
        let sub = SubstitutionInput {
          team:            side,
          player_out_id:   out_id,
          player_out_name: out_name,
          player_in_id:    in_id,
          player_in_name:  in_name,
        };
        self.handle.record_substitution(sub).await
      }
    };
    self.report(action.label(), result).map(drop)
  }

  fn reprompt(&mut self, action: PromptAction, input: &str) -> anyhow::Result<()> {
    self.status_msg = format!("Expected {}", action.hint());
    self.mode = Mode::Prompt {
      action,
      input: input.to_string(),
    };
    Ok(())
  }

  /// Show the outcome of a session call in the status bar. Only a closed
  /// session is fatal.
  fn report<T>(
    &mut self,
    label: &str,
    result: Result<T, SessionError>,
  ) -> anyhow::Result<Option<T>> {
    match result {
      Ok(value) => {
        self.status_msg = format!("{label}.");
        Ok(Some(value))
      }
      Err(SessionError::Closed) => Err(SessionError::Closed.into()),
      Err(e) => {
        tracing::debug!(error = %e, "{label} rejected");
        self.status_msg = format!("{label}: {e}");
        Ok(None)
      }
    }
  }
}

// ─── Input parsing ────────────────────────────────────────────────────────────

/// `"10 Ana Souza"` → `("10", Some("Ana Souza"))`. The id is required.
pub fn parse_player(input: &str) -> Option<(String, Option<String>)> {
  let input = input.trim();
  let (id, name) = match input.split_once(char::is_whitespace) {
    Some((id, name)) => (id, Some(name.trim().to_string())),
    None => (input, None),
  };
  if id.is_empty() {
    return None;
  }
  Some((id.to_string(), name.filter(|n| !n.is_empty())))
}

type Player = (String, Option<String>);

/// `"7 Jones > 14 Brown"`: player going off, then player coming on.
pub fn parse_substitution(input: &str) -> Option<(Player, Player)> {
  let (out, on) = input.split_once('>')?;
  Some((parse_player(out)?, parse_player(on)?))
}
