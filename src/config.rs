use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::query::{QueryOptions, RetryPolicy};
use crate::shop::{products_options, users_options};

const PRODUCTS_URL_ENV: &str = "STOREFRONT_PRODUCTS_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub queries: QueriesConfig,
  pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Base URL of the product store (`/products` is appended)
  pub products_url: String,
  /// Endpoint of the random user API
  pub users_url: String,
  /// Number of users requested per fetch
  pub user_count: u32,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      products_url: "https://fakestoreapi.com".to_string(),
      users_url: "https://randomuser.me/api/".to_string(),
      user_count: 3,
      timeout_secs: 15,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Per-query overrides on top of the built-in presets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
  pub products: QueryOverrides,
  pub users: QueryOverrides,
}

/// Optional replacements for individual query options. Durations are in
/// seconds; a `refetch_interval_secs` of 0 turns interval refetching off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryOverrides {
  pub stale_secs: Option<u64>,
  pub gc_secs: Option<u64>,
  pub refetch_interval_secs: Option<u64>,
  pub refetch_on_window_focus: Option<bool>,
  pub refetch_on_reconnect: Option<bool>,
  pub refetch_on_mount: Option<bool>,
  /// Retries after a failed fetch, with exponential backoff
  pub retry: Option<u32>,
}

impl QueryOverrides {
  pub fn apply(&self, mut options: QueryOptions) -> QueryOptions {
    if let Some(secs) = self.stale_secs {
      options = options.with_stale_time(Duration::from_secs(secs));
    }
    if let Some(secs) = self.gc_secs {
      options = options.with_gc_time(Duration::from_secs(secs));
    }
    if let Some(secs) = self.refetch_interval_secs {
      let interval = (secs > 0).then(|| Duration::from_secs(secs));
      options = options.with_refetch_interval(interval);
    }
    if let Some(enabled) = self.refetch_on_window_focus {
      options = options.with_refetch_on_window_focus(enabled);
    }
    if let Some(enabled) = self.refetch_on_reconnect {
      options = options.with_refetch_on_reconnect(enabled);
    }
    if let Some(enabled) = self.refetch_on_mount {
      options = options.with_refetch_on_mount(enabled);
    }
    if let Some(retries) = self.retry {
      let retry = if retries == 0 {
        RetryPolicy::never()
      } else {
        RetryPolicy::exponential(retries)
      };
      options = options.with_retry(retry);
    }
    options
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
  /// Seconds between reachability probes of the product store
  pub probe_interval_secs: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_interval_secs: 15,
    }
  }
}

impl ConnectivityConfig {
  pub fn probe_interval(&self) -> Duration {
    Duration::from_secs(self.probe_interval_secs.max(1))
  }
}

/// Options each storefront query is subscribed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPresets {
  pub products: QueryOptions,
  pub users: QueryOptions,
}

impl Config {
  /// Built-in query options with this file's overrides applied
  pub fn presets(&self) -> QueryPresets {
    QueryPresets {
      products: self.queries.products.apply(products_options()),
      users: self.queries.users.apply(users_options()),
    }
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./storefront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront/config.yaml
  ///
  /// Both APIs are public, so running without a file uses the defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        info!("no config file found, using defaults");
        Self::default()
      }
    };

    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("storefront.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to an empty map
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(PRODUCTS_URL_ENV).filter(|u| !u.trim().is_empty()) {
      self.api.products_url = url;
    }
  }
}
