//! TUI rendering; orchestrates all panes.

pub mod events;
pub mod periods;
pub mod scoreboard;

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, Mode};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Length(7), // scoreboard
      Constraint::Min(0),    // periods + events
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  scoreboard::draw(f, rows[1], app);
  draw_body(f, rows[2], app);
  draw_status(f, rows[3], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let snapshot = &app.snapshot;
  let left = Span::styled(
    format!(" pitchside  match {}", snapshot.match_id),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );

  let (sync_text, sync_color) = if !snapshot.warnings.is_empty() {
    (format!("{} sync warning(s) ", snapshot.warnings.len()), Color::Yellow)
  } else if snapshot.unsynced > 0 {
    (format!("{} pending ", snapshot.unsynced), Color::Gray)
  } else {
    ("synced ".to_string(), Color::Green)
  };
  let right = Span::styled(
    format!("{}  {sync_text}", snapshot.status),
    Style::default().fg(sync_color),
  );

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
    .split(area);

  periods::draw(f, cols[0], app);
  events::draw(f, cols[1], app);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let side = app.side.as_str().to_uppercase();
  let (mode_label, text) = match &app.mode {
    Mode::Prompt { action, input } => (
      "INPUT".to_string(),
      format!("{} ({side}) {}: {input}_", action.label(), action.hint()),
    ),
    Mode::ConfirmReset => (
      "RESET".to_string(),
      "Clear the clock and every event? y confirm, any other key cancels".to_string(),
    ),
    Mode::Normal => {
      let text = if let Some(warning) = app.snapshot.warnings.last() {
        format!("{warning}  (w dismiss)")
      } else if app.status_msg.is_empty() {
        "space clock  n next  f final  1/2 team  g/p/o goal  y/r card  s sub  t timeout  \
         u refresh  R reset  q quit"
          .to_string()
      } else {
        app.status_msg.clone()
      };
      (side, text)
    }
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let text_span = Span::styled(format!("  {text}"), Style::default().fg(Color::Gray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, text_span])).style(Style::default().bg(Color::Black)),
    area,
  );
}
