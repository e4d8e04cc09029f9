//! parkwatch daemon - frame pipeline, local view and occupancy push server
//!
//! # Usage
//!
//! ```bash
//! # Run with the local view in this terminal
//! parkwatchd start --zones zones.toml --source parking.mp4 --replay detections.jsonl
//!
//! # Run headless in the background, settings from a config file
//! PARKWATCH_CONFIG=/etc/parkwatch.toml parkwatchd start -d
//!
//! # Validate configuration and zones without starting
//! parkwatchd check --config parkwatch.toml
//!
//! # Stop the daemon / check it is running
//! parkwatchd stop
//! parkwatchd status
//!
//! # Enable debug logging
//! RUST_LOG=parkwatchd=debug parkwatchd start --headless ...
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use parkwatch_core::{StateStore, ZoneRegistry};
use parkwatch_tui::LocalView;
use parkwatchd::config::{ConfigOverrides, DaemonConfig, DetectorSpec, ADDR_ENV, CONFIG_ENV};
use parkwatchd::hub::spawn_hub;
use parkwatchd::producer::Producer;
use parkwatchd::publisher::ChangePublisher;
use parkwatchd::server::{DaemonServer, DEFAULT_LISTEN_ADDR};
use parkwatchd::shutdown::join_thread;
use parkwatchd::source::FrameSource;

/// How long shutdown waits for the local view to restore the terminal.
const VIEW_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// parkwatch daemon - parking zone occupancy from a camera feed
#[derive(Parser, Debug)]
#[command(name = "parkwatchd", version, about)]
struct Args {
    /// Daemon config file (TOML)
    #[arg(long, short = 'c', global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background, implies --headless)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Do not take over the terminal with the local view
        #[arg(long)]
        headless: bool,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
    /// Validate configuration and zones, print a summary and exit
    Check {
        #[command(flatten)]
        options: RunOptions,
    },
}

/// Settings that override the config file.
#[derive(ClapArgs, Debug, Default)]
struct RunOptions {
    /// Address to accept subscribers on
    #[arg(long, env = ADDR_ENV)]
    listen: Option<String>,

    /// Zone file (TOML)
    #[arg(long)]
    zones: Option<PathBuf>,

    /// Frame source: device index, stream URL, video file or image directory
    #[arg(long)]
    source: Option<String>,

    /// Detection process command line (program and arguments)
    #[arg(long, num_args = 1.., allow_hyphen_values = true, conflicts_with = "replay")]
    detector: Option<Vec<String>>,

    /// Replay recorded detections from a JSON-lines file
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    confidence: Option<f32>,

    /// IoU threshold for overlapping detections
    #[arg(long)]
    overlap: Option<f32>,

    /// Pause after each frame, in milliseconds
    #[arg(long)]
    cycle_delay_ms: Option<u64>,

    /// Frame width for ffmpeg-decoded sources
    #[arg(long)]
    width: Option<u32>,

    /// Frame height for ffmpeg-decoded sources
    #[arg(long)]
    height: Option<u32>,

    /// ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<String>,
}

impl RunOptions {
    fn into_overrides(self) -> ConfigOverrides {
        let detector = match (self.detector, self.replay) {
            (Some(command), _) => Some(DetectorSpec::Process { command }),
            (None, Some(path)) => Some(DetectorSpec::Replay { path }),
            (None, None) => None,
        };
        ConfigOverrides {
            listen: self.listen,
            zones: self.zones,
            source: self.source,
            detector,
            confidence: self.confidence,
            overlap: self.overlap,
            cycle_delay_ms: self.cycle_delay_ms,
            frame_width: self.width,
            frame_height: self.height,
            ffmpeg: self.ffmpeg,
        }
    }
}

fn state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("parkwatch")
}

fn pid_file_path() -> PathBuf {
    state_dir().join("parkwatchd.pid")
}

fn log_file_path() -> PathBuf {
    state_dir().join("parkwatchd.log")
}

fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

fn is_daemon_running() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        remove_pid_file();
    }
    None
}

fn stop_daemon(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let pid = i32::try_from(pid).context("PID out of range")?;
        // SAFETY: kill(2) with a plain PID and signal has no memory effects
        let result = unsafe { libc::kill(pid, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

fn load_config(path: Option<&Path>, options: RunOptions) -> Result<(DaemonConfig, ZoneRegistry)> {
    let config = DaemonConfig::load(path, options.into_overrides())
        .context("Invalid configuration")?;
    let zones = config
        .load_zones()
        .with_context(|| format!("Invalid zone file {}", config.zones_path.display()))?;
    // Logging is not set up yet; say it on the terminal
    if let Some(warning) = zone_warning(&zones) {
        eprintln!("Warning: {warning}");
    }
    Ok((config, zones))
}

fn zone_warning(zones: &ZoneRegistry) -> Option<&'static str> {
    zones
        .is_empty()
        .then_some("zone file defines no zones; every update will be an empty map")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Command::Start {
        daemon: false,
        headless: false,
        options: RunOptions::default(),
    });

    match command {
        Command::Start {
            daemon,
            headless,
            options,
        } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'parkwatchd stop' to stop it first.");
                process::exit(1);
            }

            // Resolve everything before forking so errors reach the terminal
            let (config, zones) = load_config(args.config.as_deref(), options)?;

            if daemon {
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon(config, zones, daemon || headless, daemon);

            remove_pid_file();

            result
        }
        Command::Stop => {
            if let Some(pid) = is_daemon_running() {
                println!("Stopping daemon (PID {pid})...");
                stop_daemon(pid)?;

                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Daemon stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }

                eprintln!("Daemon did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Daemon is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = is_daemon_running() {
                println!("Daemon is running (PID {pid})");
                let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
                println!("Address: {addr}");
                println!("Log: {}", log_file_path().display());
                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
        Command::Check { options } => {
            let (config, zones) = load_config(args.config.as_deref(), options)?;
            print_summary(&config, &zones);
            Ok(())
        }
    }
}

fn print_summary(config: &DaemonConfig, zones: &ZoneRegistry) {
    println!("Configuration OK");
    println!("  listen:     {}", config.listen);
    println!("  source:     {} ({})", config.source, config.source.kind());
    match &config.detector {
        DetectorSpec::Process { command } => println!("  detector:   process `{}`", command.join(" ")),
        DetectorSpec::Replay { path } => println!("  detector:   replay {}", path.display()),
    }
    println!(
        "  thresholds: confidence {} / overlap {}",
        config.thresholds.confidence, config.thresholds.overlap
    );
    println!("  zones:      {} from {}", zones.len(), config.zones_path.display());
    for zone in zones {
        println!("    {} ({} points)", zone.id, zone.polygon.len());
    }
}

fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = stdout.try_clone().context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("parkwatchd=info".parse()?)
        .add_directive("parkwatch_core=info".parse()?)
        .add_directive("parkwatch_protocol=info".parse()?)
        .add_directive("parkwatch_tui=info".parse()?))
}

/// Headless: stderr (the log file once daemonized). With the local view
/// the terminal is taken, so logs go to the log file instead.
fn init_logging(headless: bool, daemonized: bool) -> Result<()> {
    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter()?)
            .with_ansi(!daemonized)
            .init();
        return Ok(());
    }

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn run_daemon(
    config: DaemonConfig,
    zones: ZoneRegistry,
    headless: bool,
    daemonized: bool,
) -> Result<()> {
    init_logging(headless, daemonized)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        zones = zones.len(),
        "parkwatch daemon starting"
    );
    if let Some(warning) = zone_warning(&zones) {
        warn!("{warning}");
    }

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let zones = Arc::new(zones);
    let store = StateStore::new(&zones);
    let hub = spawn_hub(store.clone());

    let server = DaemonServer::bind(config.listen, hub.clone(), cancel_token.clone())
        .await
        .context("Failed to start push server")?;

    let reader = config
        .source
        .open(&config.source_options)
        .with_context(|| format!("Failed to open frame source {}", config.source))?;
    let detector = config
        .detector
        .open(config.thresholds)
        .context("Failed to start detector")?;

    let producer = Producer::new(
        FrameSource::new(reader),
        detector,
        Arc::clone(&zones),
        ChangePublisher::new(store.clone(), hub),
        cancel_token.clone(),
    )
    .with_cycle_delay(config.cycle_delay)
    .spawn()
    .context("Failed to start producer thread")?;

    // Detached: the producer logs its own exit, and the process may exit
    // while it is blocked in a read or a detect call. The transport keeps
    // serving the last state after it stops.
    drop(producer);

    let view = if headless {
        None
    } else {
        Some(
            LocalView::new(store, cancel_token.clone())
                .spawn()
                .context("Failed to start local view")?,
        )
    };

    let result = server.run().await;
    cancel_token.cancel();

    if let Some(view) = view {
        match join_thread(view, VIEW_SHUTDOWN_TIMEOUT).await {
            Some(Ok(Ok(()))) => {}
            Some(Ok(Err(e))) => warn!(error = %e, "Local view ended with error"),
            Some(Err(_)) => error!("Local view thread panicked"),
            None => warn!("Local view did not stop in time"),
        }
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("parkwatch daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
