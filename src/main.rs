mod app;
mod backend;
mod catalog;
mod completion;
mod config;
mod constants;
mod dispatch;
mod error;
mod input;
mod model;
mod pagination;
mod poller;
mod posts;
mod selection;
#[cfg(test)]
mod testing;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::{App, Services};
use config::Config;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Backend base URL (overrides the config file)
  #[arg(long)]
  api_url: Option<String>,

  /// Path to the config file (default: platform config dir)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log level for the log file: 'error', 'warn', 'info', 'debug' or 'trace'
  #[arg(long, default_value = "info")]
  log_level: String,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a daily file; the terminal belongs to the UI. The guard flushes on drop.
fn init_logging(level: &str) -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "tubeblog")?;
  let appender = tracing_appender::rolling::daily(dirs.data_local_dir().join("logs"), "tubeblog.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("tubeblog={}", level)));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "tubeblog", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging(&args.log_level);

  let mut config = match &args.config {
    Some(path) => Config::load_from(path),
    None => Config::load(),
  };
  config.api_url_override = args.api_url;
  info!(version = env!("CARGO_PKG_VERSION"), config = %config.display_path(), "tubeblog: starting");
  let services = Services::from_config(&config).context("Failed to set up HTTP clients")?;

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, App::new(config, services)).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("tubeblog: exiting");
  app.end_session();
  Ok(())
}
