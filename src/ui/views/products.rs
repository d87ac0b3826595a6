use crate::query::{QueryClient, QueryObserver, QuerySnapshot};
use crate::shop::{products_key, Product, ProductSort};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{query_status_line, truncate};
use crate::ui::view::{Screen, ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

use super::subscribe_products;

/// Product catalogue, sortable
pub struct ProductsView {
  sort: ProductSort,
  observer: QueryObserver<Vec<Product>>,
  list_state: ListState,
}

impl ProductsView {
  pub fn new(ctx: &mut ViewContext, sort: ProductSort) -> Self {
    Self {
      sort,
      observer: subscribe_products(ctx, sort),
      list_state: ListState::default(),
    }
  }

  /// Move to the next sort mode, observing its key instead of the old one
  fn cycle_sort(&mut self, ctx: &mut ViewContext) {
    let sort = self.sort.next();
    let observer = subscribe_products(ctx, sort);
    let old = std::mem::replace(&mut self.observer, observer);
    ctx.queries.unsubscribe(old);
    debug!(sort = %sort, "products sort changed");
    self.sort = sort;
    self.list_state.select(Some(0));
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, snapshot: &QuerySnapshot<Vec<Product>>) {
    let products: &[Product] = snapshot.data.as_deref().map(|v| v.as_slice()).unwrap_or(&[]);
    ensure_valid_selection(&mut self.list_state, products.len());

    let title = if snapshot.is_loading() {
      format!(" Products [{}] (loading...) ", self.sort.label())
    } else {
      format!(
        " Products [{}] ({} products available) ",
        self.sort.label(),
        products.len()
      )
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if products.is_empty() {
      let content = if snapshot.is_loading() {
        "Loading products..."
      } else if snapshot.is_error() {
        "Failed to load products. Press 'r' to retry."
      } else {
        "No products found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = products
      .iter()
      .map(|product| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:>10}", format!("${:.2}", product.price)),
            Style::default().fg(Color::Green),
          ),
          Span::raw("  "),
          Span::styled(
            format!("★ {:.1}", product.rating.rate),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw("  "),
          Span::styled(
            format!("{:<18}", truncate(&product.category, 18)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(truncate(&product.title, 60)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect, snapshot: &QuerySnapshot<Vec<Product>>) {
    let selected = self
      .list_state
      .selected()
      .and_then(|i| snapshot.data.as_ref()?.get(i).cloned());
    let Some(product) = selected else {
      return;
    };

    let text = vec![
      Line::from(Span::styled(product.title.clone(), Style::default().bold())),
      Line::from(vec![
        Span::styled(format!("${:.2}", product.price), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(
          format!("★ {:.1} ({} reviews)", product.rating.rate, product.rating.count),
          Style::default().fg(Color::Yellow),
        ),
      ]),
      Line::from(Span::styled(product.image.clone(), Style::default().fg(Color::DarkGray))),
      Line::from(""),
      Line::from(product.description.clone()),
    ];

    let paragraph = Paragraph::new(text)
      .block(Block::default().borders(Borders::ALL).title(" Details "))
      .wrap(ratatui::widgets::Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }
}

impl View for ProductsView {
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut ViewContext) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('s') => self.cycle_sort(ctx),
      KeyCode::Char('r') => {
        ctx.queries.refetch(&products_key(self.sort));
      }
      KeyCode::Char('a') => return ViewAction::Navigate(Screen::AddProduct),
      KeyCode::Char('u') => return ViewAction::Navigate(Screen::Users),
      KeyCode::Char('q') => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, queries: &QueryClient) {
    let snapshot = queries.snapshot(&self.observer);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(5), Constraint::Length(8), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0], &snapshot);
    self.render_detail(frame, chunks[1], &snapshot);
    frame.render_widget(Paragraph::new(query_status_line(&snapshot)), chunks[2]);
  }

  fn title(&self) -> String {
    "Products".to_string()
  }

  fn screen(&self) -> Screen {
    Screen::Products
  }

  fn leave(self: Box<Self>, queries: &mut QueryClient) {
    queries.unsubscribe(self.observer);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("s", "sort").with_priority(20),
      ShortcutInfo::new("r", "refetch").with_priority(30),
      ShortcutInfo::new("a", "add").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
