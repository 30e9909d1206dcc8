//! `pitchside`: terminal officiating console for a live match.
//!
//! # Usage
//!
//! ```
//! pitchside --url http://localhost:8080 --match 6f1c0a4e-...
//! pitchside --config ~/.config/pitchside/config.toml --log-file /tmp/pitchside.log
//! ```

mod app;
mod client;
mod ui;

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::{Context, Result, anyhow};
use app::App;
use clap::Parser;
use client::ApiClient;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use pitchside_session::{Session, SessionConfig, SystemClock};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pitchside", about = "Terminal console for officiating a live match")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the pitchside server (default: http://localhost:8080).
  #[arg(long, env = "PITCHSIDE_URL")]
  url: Option<String>,

  /// Id of the match to officiate.
  #[arg(short, long = "match", env = "PITCHSIDE_MATCH")]
  match_id: Option<Uuid>,

  /// Write logs to this file. The terminal belongs to the UI, so nothing is
  /// logged without it.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize)]
struct ConfigFile {
  #[serde(default)]
  url:             Option<String>,
  #[serde(default)]
  match_id:        Option<Uuid>,
  #[serde(default)]
  log_file:        Option<PathBuf>,
  #[serde(default = "default_timeout_secs")]
  request_timeout: u64,
  #[serde(default)]
  session:         SessionConfig,
}

fn default_timeout_secs() -> u64 { 10 }

impl Default for ConfigFile {
  fn default() -> Self {
    Self {
      url:             None,
      match_id:        None,
      log_file:        None,
      request_timeout: default_timeout_secs(),
      session:         SessionConfig::default(),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override the config file, which overrides defaults.
  let base_url = args
    .url
    .or(file_cfg.url)
    .unwrap_or_else(|| "http://localhost:8080".to_string());
  let match_id = args
    .match_id
    .or(file_cfg.match_id)
    .ok_or_else(|| anyhow!("no match given; pass --match <uuid>"))?;

  if let Some(path) = args.log_file.or(file_cfg.log_file) {
    init_logging(&path)?;
  }

  let client = ApiClient::new(base_url.clone(), Duration::from_secs(file_cfg.request_timeout))?;
  tracing::info!(%match_id, url = %base_url, "activating match");
  let handle = Session::activate(
    match_id,
    Arc::new(client),
    Arc::new(SystemClock),
    file_cfg.session,
  )
  .await;
  let mut app = App::new(handle);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore the terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  let shutdown = app.shutdown().await;
  run_result.and(shutdown)
}

fn init_logging(path: &Path) -> Result<()> {
  let file = File::options()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(std::sync::Mutex::new(file))
    .init();
  Ok(())
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.refresh();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}
