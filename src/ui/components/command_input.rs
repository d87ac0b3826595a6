use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command, CommandAction};
use crate::ui::view::Screen;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_ROWS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  Run(CommandAction),
  /// Text that names no command, trimmed and lower-cased
  Unknown(String),
  Cancelled,
}

/// The `:` palette. Opened by the app with the screen it was opened from,
/// which ranks that screen's own command last.
#[derive(Debug, Clone)]
pub struct CommandInput {
  input: TextInput,
  /// Screen shown when the palette opened; `None` while closed
  origin: Option<Screen>,
  selected: usize,
}

impl Default for CommandInput {
  fn default() -> Self {
    Self::new()
  }
}

impl CommandInput {
  pub fn new() -> Self {
    Self {
      input: TextInput::new(),
      origin: None,
      selected: 0,
    }
  }

  pub fn is_active(&self) -> bool {
    self.origin.is_some()
  }

  pub fn open(&mut self, from: Screen) {
    self.input.clear();
    self.selected = 0;
    self.origin = Some(from);
  }

  fn close(&mut self) {
    self.input.clear();
    self.selected = 0;
    self.origin = None;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    match &self.origin {
      Some(origin) => commands::suggest(self.input.value(), origin),
      None => Vec::new(),
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.is_active() {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = self.resolve();
        self.close();
        KeyResult::Event(event)
      }
      KeyCode::Tab | KeyCode::Down => {
        self.step(1);
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.step(-1);
        KeyResult::Handled
      }
      _ => match self.input.handle_key(key) {
        InputResult::Consumed => {
          self.selected = 0;
          KeyResult::Handled
        }
        InputResult::NotHandled => KeyResult::NotHandled,
        InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
      },
    }
  }

  fn step(&mut self, delta: isize) {
    let count = self.suggestions().len().min(MAX_ROWS);
    if count > 0 {
      self.selected = (self.selected as isize + delta).rem_euclid(count as isize) as usize;
    }
  }

  /// An exact name or alias wins over the highlighted row
  fn resolve(&self) -> CommandEvent {
    if let Some(cmd) = commands::lookup(self.input.value()) {
      return CommandEvent::Run(cmd.action);
    }
    if let Some(cmd) = self.suggestions().get(self.selected) {
      return CommandEvent::Run(cmd.action);
    }
    let text = self.input.value().trim().to_lowercase();
    if text.is_empty() {
      CommandEvent::Cancelled
    } else {
      CommandEvent::Unknown(text)
    }
  }

  fn row(cmd: &Command, here: bool) -> ListItem<'static> {
    let mut spans = vec![
      Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
      Span::styled(
        format!("{:<18}", cmd.aliases.join(" ")),
        Style::default().fg(Color::DarkGray),
      ),
      Span::raw(cmd.description),
    ];
    if here {
      spans.push(Span::styled(" (open)", Style::default().fg(Color::Green)));
    }
    ListItem::new(Line::from(spans))
  }

  /// Draw the palette over the top of `area` while it is open
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(origin) = &self.origin else {
      return;
    };

    let suggestions = self.suggestions();
    let rows = suggestions.len().min(MAX_ROWS) as u16;
    let popup = Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2).min(72), rows + 3)
      .intersection(area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Go to ")
      .title_bottom(Line::from(" Tab next · Enter run · Esc close ").right_aligned());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    if inner.height == 0 {
      return;
    }

    let [prompt, list] = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let (before, after) = self.input.split_at_cursor();
    frame.render_widget(
      Paragraph::new(Line::from(vec![
        Span::styled(":", Style::default().fg(Color::Yellow)),
        Span::raw(before),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::raw(after),
      ])),
      prompt,
    );

    if suggestions.is_empty() || list.height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_ROWS)
      .map(|cmd| Self::row(cmd, cmd.opens(origin)))
      .collect();
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White)),
      list,
      &mut state,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn opened(from: Screen, text: &str) -> CommandInput {
    let mut input = CommandInput::new();
    input.open(from);
    for c in text.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
    input
  }

  #[test]
  fn test_closed_palette_ignores_keys() {
    let mut input = CommandInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('u'))), KeyResult::NotHandled);
    assert!(input.suggestions().is_empty());
  }

  #[test]
  fn test_alias_runs_its_command() {
    let mut input = opened(Screen::Products, "u");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(CommandAction::Users))
    );
    assert!(!input.is_active());
  }

  #[test]
  fn test_empty_enter_picks_first_other_screen() {
    let mut input = opened(Screen::Products, "");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(CommandAction::AddProduct))
    );
  }

  #[test]
  fn test_tab_wraps_around_suggestions() {
    let mut input = opened(Screen::Users, "");
    input.handle_key(key(KeyCode::BackTab));
    // Last row is the screen the palette was opened from
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(CommandAction::Users))
    );
  }

  #[test]
  fn test_exact_name_beats_highlighted_row() {
    let mut input = opened(Screen::Users, "add");
    input.handle_key(key(KeyCode::Down));
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Run(CommandAction::AddProduct))
    );
  }

  #[test]
  fn test_unknown_text_is_reported() {
    let mut input = opened(Screen::Products, " Checkout ");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Unknown("checkout".to_string()))
    );
  }

  #[test]
  fn test_escape_closes() {
    let mut input = opened(Screen::AddProduct, "add");
    assert_eq!(
      input.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
    assert!(!input.is_active());
  }
}
