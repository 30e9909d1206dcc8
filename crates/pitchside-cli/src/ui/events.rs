//! Event list pane.

use pitchside_core::event::{Event, EventKind};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let events = &app.snapshot.events;

  let block = Block::default()
    .title(format!(" Events ({}) ", events.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  if events.is_empty() {
    f.render_widget(
      Paragraph::new("No events yet.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let lines: Vec<Line> = events
    .iter()
    .skip(app.event_scroll)
    .map(event_line)
    .collect();
  f.render_widget(Paragraph::new(lines), inner);
}

fn event_line(event: &Event) -> Line<'_> {
  let color = match event.kind {
    EventKind::Goal => Color::Green,
    EventKind::YellowCard => Color::Yellow,
    EventKind::RedCard => Color::Red,
    kind if kind.is_clock_event() => Color::DarkGray,
    _ => Color::White,
  };
  let team = event
    .team
    .map(|t| t.as_str().to_uppercase())
    .unwrap_or_default();

  Line::from(vec![
    Span::styled(
      format!("{:>5.1}' ", event.minute),
      Style::default().fg(Color::DarkGray),
    ),
    Span::styled(format!("{team:<5}"), Style::default().fg(Color::Cyan)),
    Span::styled(event.description.as_str(), Style::default().fg(color)),
  ])
}
