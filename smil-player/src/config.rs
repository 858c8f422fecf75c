//! Configuration management for the smil-player daemon
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--document`, `--config`)
//! 2. Environment variables (`SMIL_DOCUMENT`, `SMIL_PLAYER_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! The TOML file is bootstrap only; the application must restart to pick up
//! changes to it. Everything that changes at runtime lives in the document.

use crate::error::{Error, Result};
use serde::Deserialize;
use smil_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};
use smil_common::timing::{DEFAULT_AWAIT, DEFAULT_DOWNLOAD_RETRY, DEFAULT_REFRESH_SECONDS, TICK};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to the JSON timing document
    #[serde(default)]
    pub document_path: Option<PathBuf>,

    /// Fallback staleness interval when the document omits `refresh`
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scheduler timing knobs
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Sleep injected when a sequential array has nothing playable
    #[serde(default = "default_await_ms")]
    pub default_await_ms: u64,

    /// Signal polling interval for waits and countdowns
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long the tracing renderer pretends a video runs
    #[serde(default = "default_simulated_video_seconds")]
    pub simulated_video_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    #[serde(default)]
    pub level: Option<String>,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            document_path: None,
            refresh_seconds: default_refresh_seconds(),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_await_ms: default_await_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            simulated_video_seconds: default_simulated_video_seconds(),
        }
    }
}

fn default_refresh_seconds() -> u64 {
    DEFAULT_REFRESH_SECONDS
}

fn default_await_ms() -> u64 {
    DEFAULT_AWAIT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    TICK.as_millis() as u64
}

fn default_simulated_video_seconds() -> u64 {
    10
}

impl TomlConfig {
    /// Discover and load the bootstrap config; defaults when no file exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Using config file {}", path.display());
                Ok(load_toml(&path)?)
            }
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Document path: CLI (or its env fallback) beats the TOML value
    pub fn resolve_document_path(&self, cli_document: Option<&Path>) -> Result<PathBuf> {
        cli_document
            .map(Path::to_path_buf)
            .or_else(|| self.document_path.clone())
            .ok_or_else(|| {
                Error::Config("no document given (use --document, SMIL_DOCUMENT or document_path)".to_string())
            })
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            default_await: Duration::from_millis(self.playback.default_await_ms),
            poll_interval: Duration::from_millis(self.playback.poll_interval_ms.max(1)),
            download_retry: DEFAULT_DOWNLOAD_RETRY,
            refresh_seconds: self.refresh_seconds,
        }
    }
}

/// Runtime timing settings handed to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSettings {
    pub default_await: Duration,
    pub poll_interval: Duration,
    /// Delay before retrying a failed document load
    pub download_retry: Duration,
    /// Staleness interval for documents that do not set `refresh`
    pub refresh_seconds: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_await: DEFAULT_AWAIT,
            poll_interval: TICK,
            download_retry: DEFAULT_DOWNLOAD_RETRY,
            refresh_seconds: DEFAULT_REFRESH_SECONDS,
        }
    }
}
