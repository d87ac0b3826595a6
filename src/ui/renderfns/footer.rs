use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use tokio::time::Instant;

use std::time::Duration;

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

/// Short-lived notice shown in the footer
#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub kind: ToastKind,
  expires_at: Instant,
}

impl Toast {
  pub fn success(message: impl Into<String>) -> Self {
    Self::new(message, ToastKind::Success)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(message, ToastKind::Error)
  }

  fn new(message: impl Into<String>, kind: ToastKind) -> Self {
    Self {
      message: message.into(),
      kind,
      expires_at: Instant::now() + TOAST_TTL,
    }
  }

  pub fn is_expired(&self, now: Instant) -> bool {
    now >= self.expires_at
  }
}

/// Draw the footer: the current toast, or the breadcrumb when there is none
pub fn draw_footer(frame: &mut Frame, area: Rect, toast: Option<&Toast>, breadcrumb: &str) {
  let line = match toast {
    Some(toast) => {
      let (icon, color) = match toast.kind {
        ToastKind::Success => ("✓", Color::Green),
        ToastKind::Error => ("✗", Color::Red),
      };
      Line::from(Span::styled(
        format!(" {} {}", icon, toast.message),
        Style::default().fg(color).bold(),
      ))
    }
    None => Line::from(Span::styled(
      format!(" {}", breadcrumb),
      Style::default().fg(Color::Cyan),
    )),
  };

  frame.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_toast_expires() {
    let toast = Toast::success("saved");
    assert!(!toast.is_expired(Instant::now()));

    tokio::time::advance(TOAST_TTL).await;
    assert!(toast.is_expired(Instant::now()));
  }
}
