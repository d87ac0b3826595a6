use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides the view's shortcuts
pub struct HeaderInfo<'a> {
  pub host: &'a str,
  pub view: &'a str,
  pub online: bool,
  /// Keys with a request or retry outstanding
  pub fetching: usize,
}

/// Draw the header bar with logo, context, connectivity and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let separator = Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" storefront ", Style::default().fg(Color::Cyan).bold()),
    separator.clone(),
    Span::styled(format!(" {} ", info.host), Style::default().fg(Color::White)),
    separator.clone(),
    Span::styled(format!(" {} ", info.view), Style::default().fg(Color::Yellow).bold()),
    separator,
    if info.online {
      Span::styled(" online ", Style::default().fg(Color::Green))
    } else {
      Span::styled(" offline ", Style::default().fg(Color::Red).bold())
    },
  ];

  if info.fetching > 0 {
    spans.push(Span::styled(
      format!("⟳ {} ", info.fetching),
      Style::default().fg(Color::Yellow),
    ));
  }

  spans.push(Span::raw(" "));

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host part of a URL, for display
pub fn extract_domain(url: &str) -> &str {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url);
  rest.split('/').next().unwrap_or(rest)
}
