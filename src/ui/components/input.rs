use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, continue input mode
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start with `value`, cursor at the end
  pub fn with_value(value: impl Into<String>) -> Self {
    let buffer = value.into();
    let cursor = buffer.chars().count();
    Self { buffer, cursor }
  }

  pub fn value(&self) -> &str {
    &self.buffer
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  fn len(&self) -> usize {
    self.buffer.chars().count()
  }

  /// Byte offset of the character at `index`
  fn byte_at(&self, index: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(index)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.buffer.clone()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let at = self.byte_at(self.cursor);
          self.buffer.remove(at);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.cursor < self.len() {
          let at = self.byte_at(self.cursor);
          self.buffer.remove(at);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.len());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.len();
        InputResult::Consumed
      }
      KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.cursor = self.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Clear line before cursor
        let at = self.byte_at(self.cursor);
        self.buffer.replace_range(..at, "");
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Delete word before cursor
        let at = self.byte_at(self.cursor);
        let start = self.buffer[..at]
          .trim_end()
          .rfind(' ')
          .map(|i| i + 1)
          .unwrap_or(0);
        self.buffer.replace_range(start..at, "");
        self.cursor = self.buffer[..start].chars().count();
        InputResult::Consumed
      }
      KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => InputResult::NotHandled,
      KeyCode::Char(c) => {
        let at = self.byte_at(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Text before and after the cursor, for rendering
  pub fn split_at_cursor(&self) -> (&str, &str) {
    self.buffer.split_at(self.byte_at(self.cursor))
  }
}
