use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TaskdeckError};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Directory holding the key-value files (tasks, categories, security)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// "dueDate" (default), "priority", "createdAt", "title"
    #[serde(default = "default_sort")]
    pub default_sort: String,
    /// "all" (default), "completed", "incomplete" or a category name
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_sort: default_sort(),
            default_filter: default_filter(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.taskdeck".into()
}

fn default_sort() -> String {
    "dueDate".into()
}

fn default_filter() -> String {
    "all".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatisticsConfig {
    /// "week" (default), "month", "all"
    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            default_timeframe: default_timeframe(),
        }
    }
}

fn default_timeframe() -> String {
    "week".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Defaults to reminders.json inside the data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders_file: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            reminders_file: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TaskdeckError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TaskdeckError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("taskdeck").join("config.toml"))
    }

    pub fn data_dir(&self) -> PathBuf {
        expand(&self.general.data_dir)
    }

    pub fn reminders_path(&self) -> PathBuf {
        match self.notifications.reminders_file {
            Some(ref path) => expand(path),
            None => self.data_dir().join("reminders.json"),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
