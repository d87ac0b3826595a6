use crate::commands::CommandAction;
use crate::config::{Config, QueryPresets};
use crate::event::{Event, EventHandler};
use crate::query::{FetchError, Mutation, MutationState, QueryClient};
use crate::shop::{all_products, Product, ProductForm, ProductSort, StoreClient};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::footer::Toast;
use crate::ui::renderfns::header::{extract_domain, HeaderInfo};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{Screen, View, ViewAction, ViewContext};
use crate::ui::views::{AddProductView, NotFoundView, ProductsView, UsersView};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Current screen
  view: Box<dyn View>,

  /// Cache and fetch scheduling for every screen
  queries: QueryClient,

  store: StoreClient,
  presets: QueryPresets,

  /// The add-product write, kept here so it outlives the form screen
  add_product: Mutation<Product>,

  /// Command input with autocomplete (after pressing :)
  command: CommandInput,

  toast: Option<Toast>,

  /// Product store host, shown in the header
  host: String,

  probe_interval: Duration,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, initial: Screen) -> Result<Self> {
    let store = StoreClient::new(
      &config.api.products_url,
      &config.api.users_url,
      config.api.user_count,
      config.api.timeout(),
    )?;
    let presets = config.presets();
    let mut queries = QueryClient::new();

    let view = build_view(
      initial,
      &mut ViewContext {
        queries: &mut queries,
        store: &store,
        presets: &presets,
      },
      false,
    );

    Ok(Self {
      view,
      queries,
      store,
      presets,
      add_product: Mutation::new(vec![all_products()]),
      command: CommandInput::new(),
      toast: None,
      host: extract_domain(&config.api.products_url).to_string(),
      probe_interval: config.connectivity.probe_interval(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    events.spawn_probe(self.store.probe_target().clone(), self.probe_interval);

    let result = self.main_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even if the loop failed
    disable_raw_mode()?;
    stdout().execute(DisableFocusChange)?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal
        .draw(|frame| self.draw(frame))
        .map_err(|e| eyre!("Failed to draw frame: {}", e))?;

      tokio::select! {
        event = events.next() => match event {
          Some(event) => self.handle_event(event),
          None => break,
        },
        // Fetch results land in the cache as soon as they arrive
        _ = self.queries.next_outcome() => {}
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::FocusGained => self.queries.set_focused(true),
      Event::FocusLost => self.queries.set_focused(false),
      Event::Connectivity(online) => {
        self.queries.set_online(online);
        self.toast = Some(if online {
          Toast::success("Back online")
        } else {
          Toast::error("You are offline")
        });
      }
    }
  }

  fn tick(&mut self) {
    self.queries.poll();
    self.queries.tick();

    if self.add_product.poll(&mut self.queries) {
      self.write_settled();
    }

    if self.toast.as_ref().is_some_and(|t| t.is_expired(Instant::now())) {
      self.toast = None;
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(action)) => self.run_command(action),
        KeyResult::Event(CommandEvent::Unknown(text)) => {
          info!(command = %text, "unknown command");
          self.navigate(Screen::NotFound(text));
        }
        _ => {}
      }
      return;
    }

    if key.code == KeyCode::Char(':') && !self.view.captures_text() {
      self.command.open(self.view.screen());
      return;
    }

    let action = {
      let mut ctx = ViewContext {
        queries: &mut self.queries,
        store: &self.store,
        presets: &self.presets,
      };
      self.view.handle_key(key, &mut ctx)
    };
    self.apply(action);
  }

  fn run_command(&mut self, action: CommandAction) {
    info!(command = ?action, "command");
    match action.screen() {
      Some(screen) => self.navigate(screen),
      None => self.should_quit = true,
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Navigate(screen) => self.navigate(screen),
      ViewAction::AddProduct(form) => self.submit_product(form),
      ViewAction::Quit => self.should_quit = true,
    }
  }

  /// Swap screens. The new screen subscribes before the old one lets go,
  /// so keys both of them observe never lose their last observer.
  fn navigate(&mut self, screen: Screen) {
    let next = build_view(
      screen,
      &mut ViewContext {
        queries: &mut self.queries,
        store: &self.store,
        presets: &self.presets,
      },
      self.add_product.is_pending(),
    );
    let previous = std::mem::replace(&mut self.view, next);
    previous.leave(&mut self.queries);
  }

  fn submit_product(&mut self, form: ProductForm) {
    let store = self.store.clone();
    let started = self.add_product.mutate_validated(form.validate(), move |product| async move {
      store.add_product(&product).await
    });
    if started {
      info!("adding product");
    }
    self.view.on_mutation(self.add_product.state());
  }

  fn write_settled(&mut self) {
    match self.add_product.state() {
      MutationState::Success(product) => {
        self.toast = Some(Toast::success(format!(
          "Product \"{}\" has been added successfully!",
          product.title
        )));
      }
      MutationState::Error(FetchError::Validation(_)) => {}
      MutationState::Error(e) => {
        self.toast = Some(Toast::error(format!("Error: {}", e)));
      }
      MutationState::Idle | MutationState::Pending => {}
    }
    self.view.on_mutation(self.add_product.state());
  }

  fn draw(&mut self, frame: &mut Frame) {
    let (header, body, footer) = ui::layout(frame.area());

    let title = self.view.title();
    draw_header(
      frame,
      header,
      &HeaderInfo {
        host: &self.host,
        view: &title,
        online: self.queries.is_online(),
        fetching: self.queries.fetching_count(),
      },
      &self.view.shortcuts(),
    );

    self.view.render(frame, body, &self.queries);
    self.command.render_overlay(frame, body);

    let breadcrumb = if self.add_product.is_pending() {
      format!("{} · adding product...", title)
    } else {
      title
    };
    draw_footer(frame, footer, self.toast.as_ref(), &breadcrumb);
  }
}

fn build_view(screen: Screen, ctx: &mut ViewContext, write_pending: bool) -> Box<dyn View> {
  match screen {
    Screen::Products => Box::new(ProductsView::new(ctx, ProductSort::Default)),
    Screen::Users => Box::new(UsersView::new(ctx)),
    Screen::AddProduct => Box::new(AddProductView::new(write_pending)),
    Screen::NotFound(name) => Box::new(NotFoundView::new(name)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shop::{products_key, users_key};

  fn test_config() -> Config {
    let mut config = Config::default();
    // Nothing listens here; fetches fail fast
    config.api.products_url = "http://127.0.0.1:9".to_string();
    config.api.users_url = "http://127.0.0.1:9/api/".to_string();
    config
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn subscribers(app: &App, key: &crate::query::QueryKey) -> usize {
    app
      .queries
      .cache()
      .get(key)
      .map(|e| e.subscriber_count())
      .unwrap_or(0)
  }

  #[tokio::test]
  async fn test_starts_on_requested_screen() {
    let app = App::new(test_config(), Screen::Users).unwrap();
    assert_eq!(app.view.title(), "Users");
    assert_eq!(subscribers(&app, &users_key()), 1);
    assert_eq!(app.host, "127.0.0.1:9");
  }

  #[tokio::test]
  async fn test_navigation_releases_previous_screen() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    let products = products_key(ProductSort::Default);
    assert_eq!(subscribers(&app, &products), 1);

    app.navigate(Screen::Users);
    assert_eq!(subscribers(&app, &products), 0);
    assert_eq!(subscribers(&app, &users_key()), 1);
    // Kept for gc_time, not evicted
    assert!(app.queries.cache().contains(&products));
  }

  #[tokio::test]
  async fn test_navigating_to_same_screen_keeps_observer() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.navigate(Screen::Products);
    assert_eq!(subscribers(&app, &products_key(ProductSort::Default)), 1);
  }

  #[tokio::test]
  async fn test_command_mode_switches_screens() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.handle_key(key(KeyCode::Char(':')));
    for c in "users".chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.view.title(), "Users");
  }

  #[tokio::test]
  async fn test_unknown_command_shows_not_found() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.handle_key(key(KeyCode::Char(':')));
    for c in "checkout".chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.view.screen(), Screen::NotFound("checkout".to_string()));

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.view.title(), "Products");
  }

  #[tokio::test]
  async fn test_form_keeps_colon_as_text() {
    let mut app = App::new(test_config(), Screen::AddProduct).unwrap();
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command.is_active());
  }

  #[tokio::test]
  async fn test_invalid_form_never_sends() {
    let mut app = App::new(test_config(), Screen::AddProduct).unwrap();
    app.submit_product(ProductForm::default());

    assert!(!app.add_product.is_pending());
    assert!(matches!(
      app.add_product.error(),
      Some(FetchError::Validation(errors)) if errors.len() == 5
    ));
    assert!(app.toast.is_none());
  }

  #[tokio::test]
  async fn test_quit_command_and_ctrl_c() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.run_command(CommandAction::Quit);
    assert!(app.should_quit);

    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_connectivity_events_reach_query_client() {
    let mut app = App::new(test_config(), Screen::Products).unwrap();
    app.handle_event(Event::Connectivity(false));
    assert!(!app.queries.is_online());
    assert!(app.toast.is_some());

    app.handle_event(Event::Connectivity(true));
    assert!(app.queries.is_online());
  }
}
