//! Hearth configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HearthError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HearthConfig {
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

impl HearthConfig {
    /// Load config from the default path (~/.hearth/config.toml).
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
            .map_err(|e| HearthError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HearthError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HearthError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Hearth home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hearth")
    }
}

/// Reminder engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// SQLite file for the reminder store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// SQLite file the host app keeps tasks/users in (read-only here).
    #[serde(default = "default_app_db_path")]
    pub app_db_path: String,
    /// Dispatch loop cadence. Must stay short enough that a reminder due
    /// "now" goes out within roughly one interval.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Wall-clock hour (UTC) the daily digest fires at.
    #[serde(default = "default_digest_hour")]
    pub digest_hour: u32,
    /// Wall-clock hour (UTC) the overdue check fires at.
    #[serde(default = "default_overdue_hour")]
    pub overdue_hour: u32,
}

fn default_db_path() -> String {
    HearthConfig::home_dir()
        .join("reminders.db")
        .to_string_lossy()
        .into_owned()
}
fn default_app_db_path() -> String {
    HearthConfig::home_dir()
        .join("hearth.db")
        .to_string_lossy()
        .into_owned()
}
fn default_poll_interval() -> u64 {
    30
}
fn default_digest_hour() -> u32 {
    8
}
fn default_overdue_hour() -> u32 {
    18
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            app_db_path: default_app_db_path(),
            poll_interval_secs: default_poll_interval(),
            digest_hour: default_digest_hour(),
            overdue_hour: default_overdue_hour(),
        }
    }
}

/// SMTP channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from_name() -> String {
    "Hearth".into()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_address: String::new(),
            from_name: default_from_name(),
            username: String::new(),
            password: String::new(),
        }
    }
}
