use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::http::HttpClient;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal window gained focus
  FocusGained,
  /// Terminal window lost focus
  FocusLost,
  /// Result of a reachability probe changed
  Connectivity(bool),
  /// Periodic tick for timers and toasts
  Tick,
}

/// Event handler that produces events from terminal input, a tick timer and
/// a connectivity probe
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let terminal_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      let event = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::FocusGained) => Event::FocusGained,
          Ok(CrosstermEvent::FocusLost) => Event::FocusLost,
          _ => continue,
        }
      } else {
        Event::Tick
      };

      if terminal_tx.send(event).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Probe `target` every `interval` and report online/offline changes.
  /// The app starts out assuming it is online.
  pub fn spawn_probe(&self, target: HttpClient, interval: Duration) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let mut online = true;
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

      loop {
        ticker.tick().await;
        let reachable = target.reachable().await;
        if reachable == online {
          continue;
        }

        online = reachable;
        info!(online, host = %target.base_url(), "connectivity changed");
        if tx.send(Event::Connectivity(online)).is_err() {
          break;
        }
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
