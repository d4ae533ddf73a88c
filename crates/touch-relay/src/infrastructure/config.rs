//! TOML configuration for the relay binary.
//!
//! Read from `$XDG_CONFIG_HOME/touch-relay/config.toml` (or
//! `~/.config/touch-relay/config.toml`), or from an explicit path.
//!
//! # Example
//!
//! ```toml
//! [device]
//! path = "/dev/input/event2"
//! protocol = "type-b"
//! identity = "randomized"
//!
//! [display]
//! width = 1080
//! height = 2340
//!
//! [timing]
//! settle_ms = 200
//! frame_interval_ms = 15
//! idle_poll_ms = 10
//!
//! [gesture]
//! max_move_distance = 10
//! min_point_count = 2
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field has a default (`#[serde(default = ...)]`), so a missing file,
//! a missing section and a missing key all behave the same way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touch_core::{DisplaySize, ProtocolKind, SwipeParams};

use crate::application::error::RelayError;
use crate::application::injector::InjectorOptions;
use crate::application::session::SessionOptions;
use crate::infrastructure::device::uinput::IdentityMode;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source selection and virtual device presentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Source node to relay.  The first qualifying node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub protocol: ProtocolKind,
    #[serde(default)]
    pub identity: IdentityMode,
}

/// Display coordinates the injector API accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_display_width")]
    pub width: u32,
    #[serde(default = "default_display_height")]
    pub height: u32,
}

/// Delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Pause after creating the virtual device.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause after each synthetic frame.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Longest wait of a relay thread before it re-checks for shutdown.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

/// Swipe interpolation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureConfig {
    #[serde(default = "default_max_move_distance")]
    pub max_move_distance: u32,
    #[serde(default = "default_min_point_count")]
    pub min_point_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_display_width() -> u32 {
    1080
}
fn default_display_height() -> u32 {
    2340
}
fn default_settle_ms() -> u64 {
    200
}
fn default_frame_interval_ms() -> u64 {
    15
}
fn default_idle_poll_ms() -> u64 {
    10
}
fn default_max_move_distance() -> u32 {
    SwipeParams::default().max_move_distance
}
fn default_min_point_count() -> u32 {
    SwipeParams::default().min_point_count
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            height: default_display_height(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            max_move_distance: default_max_move_distance(),
            min_point_count: default_min_point_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl RelayConfig {
    /// Session tunables derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidDisplaySize`] for a zero display
    /// dimension.
    pub fn session_options(&self) -> Result<SessionOptions, RelayError> {
        Ok(SessionOptions {
            protocol: self.device.protocol,
            injector: InjectorOptions {
                display: DisplaySize::new(self.display.width, self.display.height)?,
                frame_interval: Duration::from_millis(self.timing.frame_interval_ms),
                swipe: SwipeParams {
                    max_move_distance: self.gesture.max_move_distance,
                    min_point_count: self.gesture.min_point_count,
                },
            },
            idle_poll: Duration::from_millis(self.timing.idle_poll_ms),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Directory holding the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither
/// `XDG_CONFIG_HOME` nor `HOME` is set.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Full path to the default config file.
///
/// # Errors
///
/// See [`config_dir`].
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the configuration from `path`, or from [`config_file_path`] when
/// `path` is `None`.  A missing file yields `RelayConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found"
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RelayConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Renders `config` as TOML, e.g. to print a starting config file.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn render_config(config: &RelayConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

fn platform_config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("touch-relay"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
