use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};
use tracing::debug;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/chat";
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1500;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
pub const BACKEND_URL_ENV: &str = "LEARNCHAT_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            max_message_length: default_max_message_length(),
            refresh_interval_secs: default_refresh_interval_secs(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    /// A missing file yields defaults; the backend URL env var wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path()?,
        };

        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            serde_json::from_str(&config_content)
                .with_context(|| format!("Failed to parse config {}", config_path.display()))?
        } else {
            debug!(path = %config_path.display(), "Config::load: no config file, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend_url = url;
            }
        }

        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    /// Age-label refresh cadence, never shorter than one second
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("learnchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // The env override is process-global, so the tests that look at
    // backend_url run with it unset and never set it themselves.

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.max_message_length, 1500);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_message_length": 200, "log_level": "debug"}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_message_length, 200);
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            refresh_interval_secs: 30,
            max_message_length: 42,
            ..Config::default()
        };
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.refresh_interval_secs, 30);
        assert_eq!(loaded.max_message_length, 42);
    }

    #[test]
    fn test_zero_refresh_interval_is_clamped() {
        let config = Config {
            refresh_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
