use chrono::{DateTime, Utc};
use ratatui::prelude::*;

use crate::query::QuerySnapshot;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// "just now", "42s ago", "5m ago", "3h ago"
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - then).num_seconds().max(0);
  match secs {
    0..=4 => "just now".to_string(),
    5..=59 => format!("{}s ago", secs),
    60..=3599 => format!("{}m ago", secs / 60),
    _ => format!("{}h ago", secs / 3600),
  }
}

/// One-line summary of a query: freshness, background activity and the last
/// error. Errors are shown alongside data, never instead of it.
pub fn query_status_line<T>(snapshot: &QuerySnapshot<T>) -> Line<'static> {
  let mut spans = Vec::new();

  if let Some(updated) = snapshot.updated_at {
    spans.push(Span::styled(
      format!(" updated {}", format_age(updated, Utc::now())),
      Style::default().fg(Color::DarkGray),
    ));
    if snapshot.is_stale {
      spans.push(Span::styled(" (stale)", Style::default().fg(Color::DarkGray)));
    }
  }

  if snapshot.is_fetching && snapshot.data.is_some() {
    spans.push(Span::styled(" refreshing...", Style::default().fg(Color::Yellow)));
  }

  if let Some(error) = &snapshot.error {
    spans.push(Span::styled(
      format!(" {}", error),
      Style::default().fg(Color::Red),
    ));
  }

  Line::from(spans)
}
