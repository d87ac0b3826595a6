use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::commands;
use crate::config::QueryPresets;
use crate::query::{MutationState, QueryClient};
use crate::shop::{Product, ProductForm, StoreClient};

/// A keyboard shortcut hint for display in the status bar
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Top-level screens reachable through commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  Products,
  Users,
  AddProduct,
  NotFound(String),
}

impl Screen {
  /// Screen a command name or alias opens
  pub fn from_command(name: &str) -> Self {
    commands::lookup(name)
      .and_then(|cmd| cmd.action.screen())
      .unwrap_or_else(|| Screen::NotFound(name.trim().to_lowercase()))
  }
}

/// What a view's queries and writes go through
pub struct ViewContext<'a> {
  pub queries: &'a mut QueryClient,
  pub store: &'a StoreClient,
  pub presets: &'a QueryPresets,
}

/// Actions that a view can request in response to user input
#[derive(Debug, PartialEq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Replace the current screen
  Navigate(Screen),
  /// Validate and send a new product
  AddProduct(ProductForm),
  Quit,
}

/// Trait for view behavior
///
/// Views subscribe to the queries they show when created and must release
/// them in [`leave`](View::leave) so unobserved entries can be collected.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut ViewContext) -> ViewAction;

  /// Render the view from the current cache state
  fn render(&mut self, frame: &mut Frame, area: Rect, queries: &QueryClient);

  /// Label shown in the header
  fn title(&self) -> String;

  fn screen(&self) -> Screen;

  /// Whether every printable key is text input, so ':' must not open the
  /// command prompt
  fn captures_text(&self) -> bool {
    false
  }

  /// Called before the view is replaced
  fn leave(self: Box<Self>, _queries: &mut QueryClient) {}

  /// Called whenever the add-product write changes state
  fn on_mutation(&mut self, _state: &MutationState<Product>) {}

  /// Keyboard shortcuts to display in the status bar
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
