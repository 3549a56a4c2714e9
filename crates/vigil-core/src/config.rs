//! Vigil configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VigilError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub mute: MuteConfig,
}

impl VigilConfig {
    /// Load config from the default path (~/.vigil/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VigilError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VigilError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vigil")
            .join("config.toml")
    }
}

/// Discord connection + admin reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Empty means the binary cannot start.
    #[serde(default)]
    pub bot_token: String,
    /// User who receives admin DM notices (0 = disabled).
    #[serde(default)]
    pub admin_user_id: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self { bot_token: String::new(), admin_user_id: 0 }
    }
}

/// Voice watchdog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// The monitored participant (0 = watchdog disabled).
    #[serde(default)]
    pub target_user_id: u64,
    /// Active window start hour, 0-24.
    #[serde(default = "default_start_hour")]
    pub active_start_hour: u32,
    /// Active window end hour, 0-24; the window is [start, end).
    #[serde(default = "default_end_hour")]
    pub active_end_hour: u32,
    /// Grace period between a departure and the re-check, in seconds.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
    /// Name of the text channel that receives sweep reports.
    #[serde(default = "default_report_channel")]
    pub report_channel: String,
    /// IANA timezone for the active window. Unparseable values fall back
    /// to UTC at startup.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_start_hour() -> u32 { 1 }
fn default_end_hour() -> u32 { 6 }
fn default_grace_secs() -> u64 { 300 }
fn default_report_channel() -> String { "voice-log".into() }
fn default_timezone() -> String { "Asia/Tokyo".into() }

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            target_user_id: 0,
            active_start_hour: default_start_hour(),
            active_end_hour: default_end_hour(),
            grace_secs: default_grace_secs(),
            report_channel: default_report_channel(),
            timezone: default_timezone(),
        }
    }
}

/// Machine-code channel filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Channel restricted to machine-code posts (0 = filter disabled).
    #[serde(default)]
    pub code_channel_id: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { code_channel_id: 0 }
    }
}

/// Scheduled notification-mute settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteConfig {
    /// Channel names whose notifications are suppressed.
    #[serde(default)]
    pub channel_names: Vec<String>,
    /// Local hour of the daily mute pass.
    #[serde(default = "default_mute_hour")]
    pub daily_hour: u32,
}

fn default_mute_hour() -> u32 { 16 }

impl Default for MuteConfig {
    fn default() -> Self {
        Self { channel_names: Vec::new(), daily_hour: default_mute_hour() }
    }
}
