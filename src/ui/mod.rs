pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Header, content and footer rows of the screen
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(area);
  (chunks[0], chunks[1], chunks[2])
}

/// Keep the selection inside a list that may have shrunk after a refetch
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
