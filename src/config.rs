// src/config.rs
// Client configuration management

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AresError, Result};

/// Environment variable overriding the backend base URL
pub const BACKEND_URL_ENV: &str = "ARES_BACKEND_URL";

/// Client configuration loaded from ~/.ares/config.json
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (REST and realtime share it)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Session storage file, defaults to ~/.ares/storage.json
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    /// Chat REPL history file (relative to ~/.ares/)
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// Seconds between carousel slides
    #[serde(default = "default_carousel_interval")]
    pub carousel_interval_secs: u64,

    /// Optional REST request timeout; unset means requests never time out
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Realtime reconnection policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Backoff settings for the realtime channel
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failures (unbounded when unset)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_history_file() -> String {
    "history".to_string()
}

fn default_carousel_interval() -> u64 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (zero-based), capped at the max delay
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            storage_path: None,
            history_file: default_history_file(),
            carousel_interval_secs: default_carousel_interval(),
            request_timeout_secs: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from ~/.ares/config.json, then apply environment overrides.
    ///
    /// A missing file yields defaults. A file that cannot be parsed is an error.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path)?,
            Ok(_) => Self::default(),
            Err(e) => {
                warn!("Falling back to default config: {}", e);
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AresError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded client config");
        Ok(config)
    }

    /// Apply `ARES_BACKEND_URL` if set and non-empty
    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var(BACKEND_URL_ENV).ok().filter(|v| !v.trim().is_empty()) {
            self.backend_url = url;
        }
    }

    /// Get the ~/.ares directory path
    pub fn ares_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AresError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".ares"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::ares_dir()?.join("config.json"))
    }

    /// Session storage path, honoring the configured override
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::ares_dir()?.join("storage.json")),
        }
    }

    /// Get the REPL history file path
    pub fn history_path(&self) -> Result<PathBuf> {
        Ok(Self::ares_dir()?.join(&self.history_file))
    }

    pub fn carousel_interval(&self) -> Duration {
        Duration::from_secs(self.carousel_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
