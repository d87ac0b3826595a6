use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::query::ValidationErrors;
use crate::shop::{ProductForm, CATEGORIES};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  Title,
  Price,
  Description,
  Category,
  Image,
}

impl FormField {
  pub const ALL: [FormField; 5] = [
    FormField::Title,
    FormField::Price,
    FormField::Description,
    FormField::Category,
    FormField::Image,
  ];

  /// Field name used in validation errors
  pub fn name(&self) -> &'static str {
    match self {
      FormField::Title => "title",
      FormField::Price => "price",
      FormField::Description => "description",
      FormField::Category => "category",
      FormField::Image => "image",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      FormField::Title => "Product Title",
      FormField::Price => "Price ($)",
      FormField::Description => "Description",
      FormField::Category => "Category",
      FormField::Image => "Image URL",
    }
  }

  fn index(&self) -> usize {
    Self::ALL.iter().position(|f| f == self).unwrap_or(0)
  }

  fn next(&self) -> Self {
    Self::ALL[(self.index() + 1) % Self::ALL.len()]
  }

  fn prev(&self) -> Self {
    Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

/// Events emitted by the form that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submitted(ProductForm),
  Cancelled,
}

/// Add-product form: four text fields plus a category selector.
///
/// After the first submit the form re-validates on every edit, so field
/// errors clear as soon as they are fixed.
#[derive(Debug, Clone)]
pub struct ProductFormInput {
  title: TextInput,
  price: TextInput,
  description: TextInput,
  image: TextInput,
  category: Option<usize>,
  focus: FormField,
  errors: ValidationErrors,
  revalidate: bool,
  submitting: bool,
}

impl Default for ProductFormInput {
  fn default() -> Self {
    Self {
      title: TextInput::new(),
      price: TextInput::new(),
      description: TextInput::new(),
      image: TextInput::new(),
      category: None,
      focus: FormField::Title,
      errors: ValidationErrors::new(),
      revalidate: false,
      submitting: false,
    }
  }
}

impl ProductFormInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn value(&self) -> ProductForm {
    ProductForm {
      title: self.title.value().to_string(),
      price: self.price.value().to_string(),
      description: self.description.value().to_string(),
      category: self
        .category
        .map(|i| CATEGORIES[i].to_string())
        .unwrap_or_default(),
      image: self.image.value().to_string(),
    }
  }

  pub fn focus(&self) -> FormField {
    self.focus
  }

  pub fn errors(&self) -> &ValidationErrors {
    &self.errors
  }

  pub fn set_errors(&mut self, errors: ValidationErrors) {
    self.errors = errors;
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  /// Back to an empty form
  pub fn reset(&mut self) {
    *self = Self::default();
  }

  fn text_input(&mut self, field: FormField) -> Option<&mut TextInput> {
    match field {
      FormField::Title => Some(&mut self.title),
      FormField::Price => Some(&mut self.price),
      FormField::Description => Some(&mut self.description),
      FormField::Image => Some(&mut self.image),
      FormField::Category => None,
    }
  }

  fn cycle_category(&mut self, forward: bool) {
    let n = CATEGORIES.len();
    self.category = Some(match (self.category, forward) {
      (None, true) => 0,
      (None, false) => n - 1,
      (Some(i), true) => (i + 1) % n,
      (Some(i), false) => (i + n - 1) % n,
    });
    self.edited();
  }

  fn edited(&mut self) {
    if self.revalidate {
      self.errors = self.value().validate().err().unwrap_or_default();
    }
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    self.revalidate = true;
    KeyResult::Event(FormEvent::Submitted(self.value()))
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if key.code == KeyCode::Esc {
      return KeyResult::Event(FormEvent::Cancelled);
    }
    if self.submitting {
      return KeyResult::Handled;
    }

    match key.code {
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return self.submit();
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focus = self.focus.next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.prev();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        if self.focus == FormField::Image {
          return self.submit();
        }
        self.focus = self.focus.next();
        return KeyResult::Handled;
      }
      _ => {}
    }

    if self.focus == FormField::Category {
      return match key.code {
        KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('l') => {
          self.cycle_category(true);
          KeyResult::Handled
        }
        KeyCode::Left | KeyCode::Char('h') => {
          self.cycle_category(false);
          KeyResult::Handled
        }
        _ => KeyResult::NotHandled,
      };
    }

    let focus = self.focus;
    let Some(input) = self.text_input(focus) else {
      return KeyResult::NotHandled;
    };
    match input.handle_key(key) {
      InputResult::Consumed => {
        self.edited();
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::NotHandled,
      InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints(
        FormField::ALL
          .iter()
          .map(|_| Constraint::Length(4))
          .chain(std::iter::once(Constraint::Min(0))),
      )
      .split(area);

    for (field, row) in FormField::ALL.iter().zip(rows.iter()) {
      self.render_field(frame, *row, *field);
    }

    let hint = if self.submitting {
      Span::styled("Adding product...", Style::default().fg(Color::Yellow))
    } else {
      Span::styled(
        "Tab/↑↓: field  ←→: category  Enter on last field or Ctrl-S: add product  Esc: cancel",
        Style::default().fg(Color::DarkGray),
      )
    };
    if let Some(footer) = rows.last() {
      frame.render_widget(Paragraph::new(Line::from(hint)), *footer);
    }
  }

  fn render_field(&self, frame: &mut Frame, area: Rect, field: FormField) {
    let focused = self.focus == field;
    let error = self.errors.for_field(field.name());

    let border_color = match (focused, error.is_some()) {
      (_, true) => Color::Red,
      (true, false) => Color::Yellow,
      (false, false) => Color::DarkGray,
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Length(1)])
      .split(area);

    let block = Block::default()
      .title(format!(" {} ", field.label()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border_color));

    let content = match field {
      FormField::Category => {
        let label = self.category.map(|i| CATEGORIES[i]).unwrap_or("Select a category");
        Line::from(vec![
          Span::styled("< ", Style::default().fg(Color::DarkGray)),
          Span::raw(label),
          Span::styled(" >", Style::default().fg(Color::DarkGray)),
        ])
      }
      _ => {
        let input = match field {
          FormField::Title => &self.title,
          FormField::Price => &self.price,
          FormField::Description => &self.description,
          _ => &self.image,
        };
        if focused {
          let (before, after) = input.split_at_cursor();
          Line::from(vec![
            Span::raw(before),
            Span::styled("_", Style::default().fg(Color::Yellow)),
            Span::raw(after),
          ])
        } else {
          Line::from(input.value())
        }
      }
    };

    frame.render_widget(Paragraph::new(content).block(block), chunks[0]);

    if let Some(message) = error {
      frame.render_widget(
        Paragraph::new(Span::styled(format!(" {}", message), Style::default().fg(Color::Red))),
        chunks[1],
      );
    }
  }
}
