//! Companion Daemon
//!
//! One overlay process per host session. It owns the engine, listens on the
//! session socket for forwarded hook events, and hands rendered frames to
//! the platform layer.
//!
//! # Usage
//!
//! ```bash
//! # Run for a session
//! companion-daemon --session 3f2a9c
//!
//! # With a custom plugin root and faster ticks
//! companion-daemon --session dev --plugin-root ./plugin --tick-ms 16
//! ```
//!
//! # Signals
//!
//! - SIGTERM / SIGINT: graceful shutdown
//! - SIGHUP: re-read `settings-fx.json`

mod server;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use companion_core::notifier::DEFAULT_DISPATCH_CAPACITY;
use companion_core::{
    channel, load_config_from_path, run, Companion, CompanionHandle, ConfigOverrides,
    DispatchNotifier, LogPlatform, Settings,
};

use server::EventServer;

/// Companion Daemon - animated overlay for one host session
#[derive(Parser, Debug)]
#[command(name = "companion-daemon")]
#[command(about = "Desktop companion overlay daemon")]
#[command(version)]
struct Args {
    /// Host session identifier (names the socket and PID file)
    #[arg(short, long, env = "COMPANION_SESSION", value_name = "ID")]
    session: String,

    /// Config file path
    #[arg(short, long, env = "COMPANION_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Plugin root holding settings-fx.json and themes/
    #[arg(long, value_name = "PATH")]
    plugin_root: Option<PathBuf>,

    /// Directory for sockets and PID files
    #[arg(long, value_name = "PATH")]
    socket_dir: Option<PathBuf>,

    /// Tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Seed for speech bubble selection (random if unset)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "COMPANION_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(companion_core::default_config_path);
    let mut config = load_config_from_path(config_path.as_deref())
        .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(root) = args.plugin_root.clone() {
        overrides = overrides.with_plugin_root(root);
    }
    if let Some(dir) = args.socket_dir.clone() {
        overrides = overrides.with_socket_dir(dir);
    }
    if let Some(ms) = args.tick_ms {
        overrides = overrides.with_tick_interval_ms(ms);
    }
    overrides.apply(&mut config);

    let socket_path = config.socket_path(&args.session)?;
    let pid_path = config.pid_path(&args.session)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        session = %args.session,
        plugin_root = ?config.plugin_root,
        socket = ?socket_path,
        source = %config.source(),
        "Starting companion daemon"
    );

    check_existing_daemon(&pid_path)?;
    write_pid_file(&pid_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run_daemon(&args, &config, socket_path));

    remove_pid_file(&pid_path);

    if let Err(ref e) = result {
        error!(error = %e, "Daemon exited with error");
    }
    info!("Companion daemon stopped");
    result
}

/// Everything that needs the tokio runtime
async fn run_daemon(
    args: &Args,
    config: &companion_core::RuntimeConfig,
    socket_path: PathBuf,
) -> Result<()> {
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let companion = Companion::load(&config.plugin_root, rng, Instant::now());
    debug!(
        interval = ?config.tick_interval,
        theme = %companion.theme().name(),
        "Engine ready"
    );

    let server = EventServer::new(socket_path);
    let listener = server.bind()?;

    let (handle, rx) = channel(config.event_capacity);
    let (notifier, worker) = DispatchNotifier::spawn(LogPlatform::default(), DEFAULT_DISPATCH_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(false);

    let serving = tokio::spawn(EventServer::serve(listener, handle.clone(), stop_rx.clone()));
    let signals = spawn_signal_handler(stop_tx.clone(), handle, config.settings_path())?;

    let mut stop_wait = stop_rx;
    let shutdown = async move {
        let _ = stop_wait.wait_for(|stop| *stop).await;
    };

    // Without a configured override the period follows the settings document
    let reason = run(companion, rx, notifier, config.tick_interval, shutdown).await;
    info!(?reason, "Runtime loop finished");

    let _ = stop_tx.send(true);
    signals.abort();
    if let Err(e) = serving.await {
        warn!(error = %e, "Socket server task failed");
    }
    server.cleanup();

    if let Err(e) = worker.await {
        warn!(error = %e, "Notifier worker failed");
    }

    Ok(())
}

/// Initialize logging with tracing-subscriber
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("companion_daemon={level},companion_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Install signal handlers and forward them to the loop
fn spawn_signal_handler(
    stop_tx: watch::Sender<bool>,
    handle: CompanionHandle,
    settings_path: PathBuf,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to register SIGHUP handler")?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    let _ = stop_tx.send(true);
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    let _ = stop_tx.send(true);
                    break;
                }
                _ = sighup.recv() => {
                    info!(path = ?settings_path, "Received SIGHUP, reloading settings");
                    let settings = Settings::load(&settings_path);
                    if handle.reload(settings).await.is_err() {
                        break;
                    }
                }
            }
        }
    }))
}

/// Write PID file
fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create PID directory: {parent:?}"))?;
    }

    let pid = std::process::id();
    fs::write(path, pid.to_string())
        .with_context(|| format!("Failed to write PID file: {path:?}"))?;

    debug!(pid = pid, path = ?path, "Wrote PID file");
    Ok(())
}

/// Remove PID file
fn remove_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(error = %e, path = ?path, "Failed to remove PID file");
        } else {
            debug!(path = ?path, "Removed PID file");
        }
    }
}

/// Refuse to start when another daemon owns this session
///
/// A PID file whose process is gone is stale and gets removed.
fn check_existing_daemon(pid_path: &Path) -> Result<()> {
    let Some(pid) = read_pid(pid_path) else {
        return Ok(());
    };

    if process_alive(pid) {
        anyhow::bail!(
            "Daemon already running for this session (PID {pid}). \
             Stop it first or remove {}",
            pid_path.display()
        );
    }

    warn!(pid = pid, "Removing stale PID file");
    let _ = fs::remove_file(pid_path);
    Ok(())
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn process_alive(pid: i32) -> bool {
    // 0 and negatives address process groups, never a single daemon
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks that the process exists
    unsafe { libc::kill(pid, 0) == 0 }
}
