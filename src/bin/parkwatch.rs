//! parkwatch - remote occupancy board and zone marking tool
//!
//! # Architecture
//!
//! The board uses an event-driven architecture with three main components:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Board Client Task**: Keeps the subscription to the daemon and forwards occupancy updates
//! 3. **Main Event Loop**: Processes events, updates state, and renders the UI
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.
//!
//! # Usage
//!
//! ```text
//! parkwatch                          # Board for the daemon on 127.0.0.1:5000
//! parkwatch --addr 10.0.0.5:5000     # Board for a remote daemon
//! parkwatch mark parking.mp4 -o zones.toml   # Mark zones on the first frame
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event as CrosstermEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use parkwatch_tui::input::{handle_key_event, Action, Event};
use parkwatch_tui::terminal::{cleanup_terminal, setup_terminal, Tui};
use parkwatch_tui::{ui, App, BoardClient, BoardClientConfig, MarkSession};
use parkwatchd::config::ADDR_ENV;
use parkwatchd::server::DEFAULT_LISTEN_ADDR;
use parkwatchd::source::{FrameSelector, FrameSource, SourceOptions};

// ============================================================================
// CLI Arguments
// ============================================================================

/// parkwatch - live parking zone occupancy
#[derive(Parser, Debug)]
#[command(name = "parkwatch")]
#[command(about = "Watch parking zone occupancy pushed by parkwatchd")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Daemon address
    #[arg(long, short = 'a', env = ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    addr: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark zones by clicking corners on the first frame of a source
    Mark {
        /// Frame source: device index, stream URL, video file or image directory
        source: String,

        /// Write the zone file here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Frame width for ffmpeg-decoded sources
        #[arg(long)]
        width: Option<u32>,

        /// Frame height for ffmpeg-decoded sources
        #[arg(long)]
        height: Option<u32>,

        /// ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<String>,
    },
}

// ============================================================================
// Keyboard Input Task
// ============================================================================

/// Spawns a task that polls for keyboard input and sends events to the channel.
///
/// crossterm's event polling is synchronous, so each poll runs on the
/// blocking pool with a short timeout to keep cancellation responsive.
fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Renders, waits up to one tick for an event, applies it. Repeats until
/// quit or cancellation.
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    // Redraw at least this often so the disconnected timer stays current
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match tokio::time::timeout(tick_rate, event_rx.recv()).await {
            Ok(Some(received_event)) => match received_event {
                Event::Key(key) => {
                    if handle_key_event(key, app) == Action::Quit {
                        info!("User requested quit");
                        cancel_token.cancel();
                        break;
                    }
                }
                Event::Resize(_width, _height) => {
                    debug!("Terminal resized");
                }
                Event::DaemonConnected { client_id } => {
                    info!(client_id = %client_id, "Subscribed to daemon");
                    app.mark_connected();
                }
                Event::Update(occupancy) => {
                    debug!(zones = occupancy.len(), "Received occupancy update");
                    app.apply_update(occupancy);
                }
                Event::DaemonDisconnected => {
                    warn!("Daemon disconnected");
                    app.mark_disconnected();
                }
            },
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            // Tick
            Err(_) => {}
        }

        if app.should_quit {
            cancel_token.cancel();
            break;
        }

        if cancel_token.is_cancelled() {
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Log directory: `$XDG_STATE_HOME/parkwatch`, else `~/.local/state/parkwatch`.
fn get_log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("parkwatch"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/parkwatch"))
}

/// Opens `name` in the log directory for appending.
///
/// Warnings go to stderr before the terminal is taken over, so users can
/// see why logging might be unavailable.
fn create_log_file(name: &str) -> Option<std::fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join(name);

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

/// Logs go to a file: stderr would corrupt the alternate screen.
fn init_logging(name: &str) {
    match create_log_file(name) {
        Some(file) => {
            let filter = EnvFilter::from_default_env()
                .add_directive(
                    "parkwatch_tui=info"
                        .parse()
                        .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO)),
                )
                .add_directive(
                    "parkwatch=info"
                        .parse()
                        .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO)),
                );

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
}

// ============================================================================
// Mark Tool
// ============================================================================

fn run_mark(
    source: &str,
    output: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    ffmpeg: Option<String>,
) -> Result<()> {
    let defaults = SourceOptions::default();
    let options = SourceOptions {
        width: width.unwrap_or(defaults.width),
        height: height.unwrap_or(defaults.height),
        ffmpeg: ffmpeg.unwrap_or(defaults.ffmpeg),
    };

    let selector = FrameSelector::parse(source)?;
    let reader = selector
        .open(&options)
        .with_context(|| format!("Failed to open frame source {selector}"))?;
    let Some(frame) = FrameSource::new(reader).next_frame() else {
        bail!("Could not read a frame from {selector}");
    };
    info!(
        source = %selector,
        width = frame.width(),
        height = frame.height(),
        "Marking on first frame"
    );

    let session = MarkSession::new(frame).run()?;
    if session.zones().is_empty() {
        eprintln!("No zones marked.");
    }
    let toml = session.to_toml()?;

    match output {
        Some(path) => {
            fs::write(&path, toml)
                .with_context(|| format!("Failed to write zone file {}", path.display()))?;
            eprintln!("Wrote {} zones to {}", session.zones().len(), path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Mark {
        source,
        output,
        width,
        height,
        ffmpeg,
    }) = args.command
    {
        init_logging("mark.log");
        // The session owns the terminal; keep it off the async workers
        return tokio::task::spawn_blocking(move || run_mark(&source, output, width, height, ffmpeg))
            .await
            .context("Mark tool panicked")?;
    }

    init_logging("board.log");
    info!(addr = %args.addr, "parkwatch board starting");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal(false) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let mut app = App::new();

    let config = BoardClientConfig {
        addr: args.addr,
        ..Default::default()
    };
    let client = BoardClient::new(config, event_tx.clone(), cancel_token.clone());
    let client_handle = tokio::spawn(async move {
        client.run().await;
    });

    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx, &cancel_token).await;

    cancel_token.cancel();

    let _ = tokio::time::timeout(Duration::from_millis(100), client_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    // Always restore, even on error
    if let Err(e) = cleanup_terminal(&mut terminal, false) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("parkwatch board stopped");

    result
}
