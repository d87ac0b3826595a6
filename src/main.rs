use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

use storefront::ui::view::Screen;
use storefront::{app, config, logging};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "A terminal storefront with a stale-while-revalidate query cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log file (default: $XDG_DATA_HOME/storefront/storefront.log)
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Screen to open on start
  #[arg(long, default_value = "products", value_parser = ["products", "users", "add"])]
  view: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(args.log_file.as_deref())?;
  info!(version = env!("CARGO_PKG_VERSION"), "starting storefront");

  let config = config::Config::load(args.config.as_deref())?;

  let mut app = app::App::new(config, Screen::from_command(&args.view))?;
  app.run().await?;

  Ok(())
}
