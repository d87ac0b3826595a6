use crate::query::{QueryClient, QueryObserver};
use crate::shop::{users_key, User};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{query_status_line, truncate};
use crate::ui::view::{Screen, ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::subscribe_users;

/// Sample users from the random user API, refetchable by hand
pub struct UsersView {
  observer: QueryObserver<Vec<User>>,
  list_state: ListState,
}

impl UsersView {
  pub fn new(ctx: &mut ViewContext) -> Self {
    Self {
      observer: subscribe_users(ctx),
      list_state: ListState::default(),
    }
  }
}

impl View for UsersView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut ViewContext) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => {
        ctx.queries.refetch(&users_key());
      }
      KeyCode::Char('p') | KeyCode::Esc => return ViewAction::Navigate(Screen::Products),
      KeyCode::Char('q') => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, queries: &QueryClient) {
    let snapshot = queries.snapshot(&self.observer);
    let users: &[User] = snapshot.data.as_deref().map(|v| v.as_slice()).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, users.len());

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(1)])
      .split(area);

    let title = if snapshot.is_loading() {
      " Users (loading...) ".to_string()
    } else {
      format!(" Users ({}) ", users.len())
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if users.is_empty() {
      let content = match &snapshot.error {
        Some(e) => format!("{}. Press 'r' to refetch.", e),
        None if snapshot.is_loading() => "Loading users...".to_string(),
        None => "No users.".to_string(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else {
      let items: Vec<ListItem> = users
        .iter()
        .map(|user| {
          ListItem::new(Line::from(vec![
            Span::styled(
              format!("{:<24}", truncate(&user.display_name(), 24)),
              Style::default().fg(Color::Cyan).bold(),
            ),
            Span::raw(" "),
            Span::raw(truncate(&user.email, 40)),
            Span::raw(" "),
            Span::styled(user.phone.clone(), Style::default().fg(Color::DarkGray)),
          ]))
        })
        .collect();

      let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, chunks[0], &mut self.list_state);
    }

    frame.render_widget(Paragraph::new(query_status_line(&snapshot)), chunks[1]);
  }

  fn title(&self) -> String {
    "Users".to_string()
  }

  fn screen(&self) -> Screen {
    Screen::Users
  }

  fn leave(self: Box<Self>, queries: &mut QueryClient) {
    queries.unsubscribe(self.observer);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refetch").with_priority(20),
      ShortcutInfo::new("p", "products").with_priority(30),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ui::views::fixtures::{offline_store, presets};
  use crossterm::event::KeyModifiers;

  #[tokio::test]
  async fn test_r_refetches_users() {
    let mut queries = QueryClient::new();
    let store = offline_store();
    let presets = presets();
    let mut ctx = ViewContext {
      queries: &mut queries,
      store: &store,
      presets: &presets,
    };

    let mut view = UsersView::new(&mut ctx);
    let first = ctx.queries.cache().get(&users_key()).and_then(|e| e.in_flight());
    assert!(first.is_some());

    view.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE), &mut ctx);
    let second = ctx.queries.cache().get(&users_key()).and_then(|e| e.in_flight());
    assert!(second.is_some());
    assert_ne!(first, second);
  }
}
