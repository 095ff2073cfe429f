//! Otto TUI - a terminal client for the Otto turn-report service.
//!
//! Signs the user in, keeps the session across restarts and shows the
//! protected dashboard only while the session is authenticated.

mod app;
mod cli;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use otto_core::Config;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "otto.log";

const USAGE: &str = "Usage: otto [--status | --login | --logout | --toggle-route-logging]";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr for the one-shot commands
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Open the daily log file under `dir`, creating the directory if needed
fn open_log_file(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Log to a daily file in the cache directory so output never
/// lands on the alternate screen. Without a usable log file, events are
/// discarded.
fn init_tui_tracing() -> Option<WorkerGuard> {
    let log_dir = Config::load()
        .and_then(|config| config.cache_dir())
        .unwrap_or_else(|_| PathBuf::from("."));

    match open_log_file(&log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(env_filter())
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::sink))
                .with(env_filter())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        init_cli_tracing();
        return match command.as_str() {
            "--status" => cli::status().await,
            "--login" => cli::login().await,
            "--logout" => cli::logout(),
            "--toggle-route-logging" => cli::toggle_route_logging().await,
            "--help" | "-h" => {
                println!("{}", USAGE);
                Ok(())
            }
            other => anyhow::bail!("Unknown argument: {}\n{}", other, USAGE),
        };
    }

    // Initialize logging
    let _log_guard = init_tui_tracing();
    info!("Otto TUI starting");

    // Create app before touching the terminal so config errors print normally
    let mut app = App::new()?;
    app.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Otto TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if key.kind == KeyEventKind::Press && handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
