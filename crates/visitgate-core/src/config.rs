//! Configuration resolution for visitgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/visitgate/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schedule::CivilClock;

/// Complete visitgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// HTTP server and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Civil timezone every access window is evaluated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fixed UTC offset, `+HH:MM` or `-HH:MM`.
    pub utc_offset: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: "-03:00".to_string(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the configured offset into a clock.
    pub fn clock(&self) -> Result<CivilClock> {
        CivilClock::from_offset_str(&self.utc_offset)
    }
}

/// Lazy maintenance (finalization + reminders) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How far ahead of a window start reminders go out.
    pub reminder_lookahead_minutes: u32,
    /// Minimum seconds between two maintenance passes. 0 runs on every request.
    pub min_interval_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            reminder_lookahead_minutes: 15,
            min_interval_secs: 0,
        }
    }
}

/// Reminder delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    /// Email relay endpoint receiving reminder payloads. Log-only when unset.
    pub webhook_url: Option<String>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    // An explicitly named file must exist
    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config);

    // Reject a bad offset at startup rather than on the first request
    config.schedule.clock()?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path for the server.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("visitgate.db"))
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("visitgate"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    // Merge server config
    if overlay.server.database_path.is_some() {
        base.server.database_path = overlay.server.database_path;
    }
    base.server.listen_addr = overlay.server.listen_addr;
    base.server.log_level = overlay.server.log_level;

    base.schedule = overlay.schedule;
    base.lifecycle = overlay.lifecycle;

    if overlay.notifications.webhook_url.is_some() {
        base.notifications.webhook_url = overlay.notifications.webhook_url;
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("VISITGATE_LISTEN_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.listen_addr = addr;
        }
    }
    if let Ok(val) = std::env::var("VISITGATE_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("VISITGATE_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Ok(val) = std::env::var("VISITGATE_UTC_OFFSET") {
        config.schedule.utc_offset = val;
    }
    if let Ok(val) = std::env::var("VISITGATE_REMINDER_LOOKAHEAD_MINUTES") {
        if let Ok(n) = val.parse() {
            config.lifecycle.reminder_lookahead_minutes = n;
        }
    }
    if let Ok(val) = std::env::var("VISITGATE_WEBHOOK_URL") {
        config.notifications.webhook_url = Some(val);
    }
}
