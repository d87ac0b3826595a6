use crate::query::{FetchError, MutationState, QueryClient};
use crate::shop::Product;
use crate::ui::components::{FormEvent, KeyResult, ProductFormInput};
use crate::ui::view::{Screen, ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders};

/// Add-product form. The write itself is owned by the app so it survives
/// leaving this screen.
pub struct AddProductView {
  form: ProductFormInput,
}

impl AddProductView {
  pub fn new(pending: bool) -> Self {
    let mut form = ProductFormInput::new();
    form.set_submitting(pending);
    Self { form }
  }
}

impl View for AddProductView {
  fn handle_key(&mut self, key: KeyEvent, _ctx: &mut ViewContext) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(form)) => ViewAction::AddProduct(form),
      KeyResult::Event(FormEvent::Cancelled) => ViewAction::Navigate(Screen::Products),
      KeyResult::Handled | KeyResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _queries: &QueryClient) {
    let block = Block::default()
      .title(" Add New Product ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    self.form.render(frame, inner);
  }

  fn title(&self) -> String {
    "Add product".to_string()
  }

  fn screen(&self) -> Screen {
    Screen::AddProduct
  }

  fn captures_text(&self) -> bool {
    true
  }

  fn on_mutation(&mut self, state: &MutationState<Product>) {
    match state {
      MutationState::Pending => self.form.set_submitting(true),
      MutationState::Success(_) => self.form.reset(),
      MutationState::Error(FetchError::Validation(errors)) => {
        self.form.set_submitting(false);
        self.form.set_errors(errors.clone());
      }
      MutationState::Error(_) | MutationState::Idle => self.form.set_submitting(false),
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Ctrl-S", "add product").with_priority(20),
      ShortcutInfo::new("Esc", "cancel").with_priority(30),
    ]
  }
}
