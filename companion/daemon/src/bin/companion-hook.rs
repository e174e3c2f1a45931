//! Hook Forwarder
//!
//! Invoked by the host tool for every lifecycle hook. Reads the hook payload
//! from stdin and writes it as one line to the session's daemon socket.
//!
//! It never fails the host: every problem is logged to stderr and the
//! process still exits 0.
//!
//! ```bash
//! echo '{"hook_event_name":"Stop","session_id":"3f2a9c"}' | companion-hook
//!
//! # Payloads without an event name
//! echo '{}' | companion-hook --event session-start --session 3f2a9c
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use companion_core::{load_config_from_path, ConfigOverrides};

/// Forward one hook event to the companion daemon
#[derive(Parser, Debug)]
#[command(name = "companion-hook")]
#[command(about = "Forward a host hook event to the companion daemon")]
#[command(version)]
struct Args {
    /// Event name, used when the payload carries none
    #[arg(short, long, value_name = "NAME")]
    event: Option<String>,

    /// Session identifier, used when the payload carries none
    #[arg(short, long, env = "COMPANION_SESSION", value_name = "ID")]
    session: Option<String>,

    /// Config file path
    #[arg(short, long, env = "COMPANION_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for sockets
    #[arg(long, value_name = "PATH")]
    socket_dir: Option<PathBuf>,

    /// Give up on the daemon after this many milliseconds
    #[arg(long, default_value = "500", value_name = "MS")]
    timeout_ms: u64,

    /// Log level (stderr)
    #[arg(short, long, env = "COMPANION_HOOK_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("companion_hook={},companion_core={}", args.log_level, args.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let timeout = Duration::from_millis(args.timeout_ms);
    match tokio::time::timeout(timeout, forward(&args)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %format!("{e:#}"), "Hook event not delivered"),
        Err(_) => warn!(?timeout, "Timed out delivering hook event"),
    }
}

async fn forward(args: &Args) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read stdin")?;

    let payload = prepare_payload(&input, args.event.as_deref())?;

    let session = payload
        .get("session_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| args.session.clone())
        .context("No session id in payload or environment")?;

    let config_path = args.config.clone().or_else(companion_core::default_config_path);
    let mut config = load_config_from_path(config_path.as_deref())?;
    if let Some(dir) = args.socket_dir.clone() {
        ConfigOverrides::new().with_socket_dir(dir).apply(&mut config);
    }
    let socket_path = config.socket_path(&session)?;

    let mut line = serde_json::to_string(&payload)?;
    line.push('\n');

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .with_context(|| format!("Daemon not listening on {}", socket_path.display()))?;
    stream.write_all(line.as_bytes()).await?;
    stream.shutdown().await?;

    debug!(session = %session, bytes = line.len(), "Forwarded hook event");
    Ok(())
}

/// Parse stdin and fill in the event name from `--event` when missing
fn prepare_payload(input: &str, event: Option<&str>) -> Result<Value> {
    let mut payload: Value = if input.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(input).context("Hook payload is not JSON")?
    };

    let Value::Object(map) = &mut payload else {
        anyhow::bail!("Hook payload is not a JSON object");
    };

    let has_name = ["hook_event_name", "event_name"]
        .iter()
        .any(|key| map.get(*key).and_then(Value::as_str).is_some_and(|s| !s.is_empty()));
    if !has_name {
        if let Some(name) = event {
            map.insert("hook_event_name".to_string(), Value::String(name.to_string()));
        }
    }

    Ok(payload)
}
