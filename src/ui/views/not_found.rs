use crate::query::QueryClient;
use crate::ui::view::{Screen, ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Shown for commands that name no screen
pub struct NotFoundView {
  command: String,
}

impl NotFoundView {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }
}

impl View for NotFoundView {
  fn handle_key(&mut self, key: KeyEvent, _ctx: &mut ViewContext) -> ViewAction {
    match key.code {
      KeyCode::Enter | KeyCode::Esc | KeyCode::Char('p') => ViewAction::Navigate(Screen::Products),
      KeyCode::Char('q') => ViewAction::Quit,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _queries: &QueryClient) {
    let text = vec![
      Line::from(""),
      Line::from(Span::styled("404", Style::default().fg(Color::Red).bold())),
      Line::from(""),
      Line::from(format!("Page not found: {}", self.command)),
      Line::from(""),
      Line::from(Span::styled(
        "Press Enter to go back to products",
        Style::default().fg(Color::DarkGray),
      )),
    ];

    let paragraph = Paragraph::new(text)
      .alignment(Alignment::Center)
      .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));
    frame.render_widget(paragraph, area);
  }

  fn title(&self) -> String {
    "Not found".to_string()
  }

  fn screen(&self) -> Screen {
    Screen::NotFound(self.command.clone())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("Enter", "products").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
