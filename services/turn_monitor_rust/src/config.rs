//! Configuration for turn_monitor_rust
//!
//! Two layers: [`ServiceConfig`] comes from the environment once at startup;
//! [`MonitorConfig`] is the JSON file re-read on every cycle so the target
//! game and chat can change without a restart.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use terra_rust_core::DEFAULT_GAME_URL;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub monitor_config_path: PathBuf,
    pub game_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,

    /// Skip TLS certificate verification on chat relay calls.
    pub notify_accept_invalid_certs: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let monitor_config_path = PathBuf::from(
            env::var("TERRAMONITOR_CONFIG").unwrap_or_else(|_| "terramonitor.json".to_string()),
        );

        let game_url = env::var("TERRA_GAME_URL").unwrap_or_else(|_| DEFAULT_GAME_URL.to_string());

        let poll_interval_secs =
            parse_u64_env("POLL_INTERVAL_SECS", 5).context("POLL_INTERVAL_SECS")?;
        if poll_interval_secs == 0 {
            return Err(anyhow!("POLL_INTERVAL_SECS must be > 0"));
        }

        let http_timeout_secs =
            parse_u64_env("HTTP_TIMEOUT_SECS", 10).context("HTTP_TIMEOUT_SECS")?;

        let notify_accept_invalid_certs = parse_bool_env("NOTIFY_ACCEPT_INVALID_CERTS", false);

        Ok(Self {
            monitor_config_path,
            game_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            notify_accept_invalid_certs,
        })
    }
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key).ok().map(|v| is_truthy(&v)).unwrap_or(default)
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

// ============================================================================
// Live monitor config
// ============================================================================

/// Contents of the monitor config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// Chat relay base URL
    pub url: String,
    #[serde(rename = "chatid")]
    pub chat_id: String,
    pub game_name: String,
}

impl MonitorConfig {
    /// Read and validate the config file. Nothing is applied on failure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let cfg: MonitorConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if cfg.url.trim().is_empty() {
            return Err(ConfigError::Invalid("url"));
        }
        if cfg.game_name.trim().is_empty() {
            return Err(ConfigError::Invalid("game_name"));
        }

        Ok(cfg)
    }

    /// POST target for notifications: chat id appended to the base url.
    pub fn notify_target(&self) -> String {
        format!("{}{}", self.url, self.chat_id)
    }
}
