//! Period list pane.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let snapshot = &app.snapshot;
  let current = snapshot.clock.period_index;

  let block = Block::default()
    .title(" Periods ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let lines: Vec<Line> = snapshot
    .periods
    .iter()
    .map(|p| {
      let is_current = current == Some(p.order_index);
      let marker = if is_current { "▶ " } else { "  " };
      let style = match (is_current, p.is_break) {
        (true, _) => Style::default()
          .fg(Color::Cyan)
          .add_modifier(Modifier::BOLD),
        (false, true) => Style::default().fg(Color::DarkGray),
        (false, false) => Style::default(),
      };
      Line::from(vec![
        Span::styled(format!("{marker}{:<16}", p.name), style),
        Span::styled(
          format!("{:>3} min", p.duration_minutes),
          Style::default().fg(Color::DarkGray),
        ),
      ])
    })
    .collect();

  f.render_widget(Paragraph::new(lines), inner);
}
