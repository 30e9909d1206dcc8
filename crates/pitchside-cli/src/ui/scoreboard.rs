//! Scoreboard pane: score, clock faces, and period.

use pitchside_core::{
  clock::{ClockReading, ClockState},
  event::Side,
};
use ratatui::{
  Frame,
  layout::{Alignment, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let snapshot = &app.snapshot;
  let clock = &snapshot.clock;

  let state_color = match clock.state {
    ClockState::Running => Color::Green,
    ClockState::PausedInPlay | ClockState::PausedAtBreak => Color::Yellow,
    ClockState::Finished => Color::Red,
    ClockState::NotStarted => Color::DarkGray,
  };

  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(state_color))
    .title(format!(" {} ", clock.state));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let team_style = |side: Side| {
    if app.side == side {
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    }
  };

  let period = match (&clock.period_name, clock.is_break) {
    (Some(name), true) => format!("{name} (break)"),
    (Some(name), false) => name.clone(),
    (None, _) => "-".to_string(),
  };

  let lines = vec![
    Line::from(vec![
      Span::styled("HOME ", team_style(Side::Home)),
      Span::styled(
        format!("{}", snapshot.score),
        Style::default()
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      ),
      Span::styled(" AWAY", team_style(Side::Away)),
    ]),
    Line::from(""),
    Line::from(Span::styled(
      format!(
        "{}   {} left",
        clock.period_clock(),
        ClockReading::from_ms(clock.remaining_in_period_ms)
      ),
      Style::default()
        .fg(state_color)
        .add_modifier(Modifier::BOLD),
    )),
    Line::from(Span::styled(
      format!("{period}   match {}   minute {:.1}", clock.match_clock(), clock.minute),
      Style::default().fg(Color::Gray),
    )),
  ];

  f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}
