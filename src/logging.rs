use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "storefront=info";
const LOG_FILE: &str = "storefront.log";

/// Send logs to a file, since the terminal belongs to the UI.
///
/// The returned guard flushes the writer when dropped; keep it alive for the
/// life of the program.
pub fn init(log_file: Option<&Path>) -> Result<WorkerGuard> {
  let path = match log_file {
    Some(p) => p.to_path_buf(),
    None => default_log_path()?,
  };
  let (dir, file_name) = split_path(&path)?;

  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&dir, file_name);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}

fn default_log_path() -> Result<PathBuf> {
  let data_dir = dirs::data_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(data_dir.join("storefront").join(LOG_FILE))
}

fn split_path(path: &Path) -> Result<(PathBuf, &std::ffi::OsStr)> {
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  };
  Ok((dir, file_name))
}
