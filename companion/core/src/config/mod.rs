//! Runtime Configuration
//!
//! Process-level options for the daemon and hook binaries, loaded from
//! `~/.config/companion/companion.toml`. Character behaviour lives in the
//! settings document instead (see [`crate::settings`]).
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`COMPANION_ROOT`, `COMPANION_SOCKET_DIR`,
//!    `COMPANION_TICK_MS`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [runtime]
//! plugin_root = "/home/me/.local/share/companion"
//! tick_interval_ms = 33
//! event_capacity = 128
//!
//! [paths]
//! socket_dir = "/run/user/1000/companion"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{clamp_tick_interval_ms, SETTINGS_FILE_NAME};

/// Default capacity of the command channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Structures
// =============================================================================

/// `[runtime]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeToml {
    /// Directory holding `settings-fx.json` and `themes/`
    pub plugin_root: Option<PathBuf>,
    /// Tick period, overriding the settings document
    pub tick_interval_ms: Option<u64>,
    /// Command channel capacity
    pub event_capacity: Option<usize>,
}

/// `[paths]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsToml {
    /// Directory for session sockets and PID files
    pub socket_dir: Option<PathBuf>,
}

/// Root of `companion.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    /// Runtime options
    pub runtime: RuntimeToml,
    /// Filesystem locations
    pub paths: PathsToml,
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Effective runtime configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Directory holding `settings-fx.json` and `themes/`
    pub plugin_root: PathBuf,
    /// Directory for session sockets and PID files
    pub socket_dir: PathBuf,
    /// Tick period override; `None` defers to the settings document
    pub tick_interval: Option<Duration>,
    /// Command channel capacity
    pub event_capacity: usize,
    /// File the values were read from, if any
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_root: default_plugin_root(),
            socket_dir: default_socket_dir(),
            tick_interval: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RuntimeConfig {
    /// Where the effective values came from (highest layer that set one)
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Path of the settings document
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.plugin_root.join(SETTINGS_FILE_NAME)
    }

    /// Socket for `session_id`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an unusable session id.
    pub fn socket_path(&self, session_id: &str) -> Result<PathBuf, ConfigError> {
        validate_session_id(session_id)?;
        Ok(self.socket_dir.join(format!("sock-{session_id}.sock")))
    }

    /// PID file for `session_id`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an unusable session id.
    pub fn pid_path(&self, session_id: &str) -> Result<PathBuf, ConfigError> {
        validate_session_id(session_id)?;
        Ok(self.socket_dir.join(format!("overlay-{session_id}.pid")))
    }
}

/// Session ids become file names, so only a safe subset is accepted
fn validate_session_id(session_id: &str) -> Result<(), ConfigError> {
    let ok = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "session id {session_id:?} must be 1-128 characters of [A-Za-z0-9_-]"
        )))
    }
}

/// Default config file path (`$XDG_CONFIG_HOME/companion/companion.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("companion").join("companion.toml"))
}

/// Default plugin root (`$XDG_DATA_HOME/companion`)
#[must_use]
pub fn default_plugin_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("companion")
}

/// Default socket directory
///
/// Uses `XDG_RUNTIME_DIR` if available, otherwise `/tmp/companion-$UID/`
#[must_use]
pub fn default_socket_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("companion")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/companion-{uid}"))
    }
}

/// Load configuration from the default path
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    let mut config = RuntimeConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;
            let toml_config: CompanionToml = toml::from_str(&content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.to_path_buf());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

/// Tick period from a millisecond value, clamped like the settings document
fn tick_interval(ms: u64) -> Duration {
    Duration::from_millis(clamp_tick_interval_ms(ms))
}

fn apply_toml_config(config: &mut RuntimeConfig, toml: &CompanionToml) {
    if let Some(ref root) = toml.runtime.plugin_root {
        config.plugin_root.clone_from(root);
    }
    if let Some(ms) = toml.runtime.tick_interval_ms {
        config.tick_interval = Some(tick_interval(ms));
    }
    if let Some(capacity) = toml.runtime.event_capacity {
        config.event_capacity = capacity.max(1);
    }
    if let Some(ref dir) = toml.paths.socket_dir {
        config.socket_dir.clone_from(dir);
    }
}

fn apply_env_config(config: &mut RuntimeConfig) {
    if let Ok(root) = std::env::var("COMPANION_ROOT") {
        config.plugin_root = PathBuf::from(root);
        config.source = ConfigSource::Env;
    }
    if let Ok(dir) = std::env::var("COMPANION_SOCKET_DIR") {
        config.socket_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Ok(ms) = std::env::var("COMPANION_TICK_MS") {
        match ms.parse::<u64>() {
            Ok(ms) => {
                config.tick_interval = Some(tick_interval(ms));
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(value = %ms, error = %e, "Ignoring invalid COMPANION_TICK_MS"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Plugin root override
    pub plugin_root: Option<PathBuf>,
    /// Socket directory override
    pub socket_dir: Option<PathBuf>,
    /// Tick interval override (milliseconds)
    pub tick_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set plugin root override
    #[must_use]
    pub fn with_plugin_root(mut self, path: PathBuf) -> Self {
        self.plugin_root = Some(path);
        self
    }

    /// Set socket directory override
    #[must_use]
    pub fn with_socket_dir(mut self, path: PathBuf) -> Self {
        self.socket_dir = Some(path);
        self
    }

    /// Set tick interval override
    #[must_use]
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if self.plugin_root.is_some() || self.socket_dir.is_some() || self.tick_interval_ms.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref root) = self.plugin_root {
            config.plugin_root.clone_from(root);
        }
        if let Some(ref dir) = self.socket_dir {
            config.socket_dir.clone_from(dir);
        }
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval = Some(tick_interval(ms));
        }
    }
}
