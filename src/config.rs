//! Client configuration loaded from TOML
//!
//! Lookup order: an explicit path, then `~/.fx-reconcile/config.toml`, then
//! built-in defaults. A file that exists but cannot be read or parsed is
//! reported and ignored.

use crate::error::{FxError, Result};
use crate::interval::Interval;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings for talking to the rate service and writing exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub default_interval: Interval,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn config_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fx-reconcile")
}

fn default_output_dir() -> PathBuf {
    config_home().join("exports")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            default_interval: Interval::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl ClientConfig {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        config_home().join("config.toml")
    }

    /// Strict parse; unknown intervals and malformed TOML are errors
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| FxError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Lenient load used by the CLI; never fails
    pub fn load(path: Option<&Path>) -> Self {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if explicit {
                log::warn!("Config file {} not found, using defaults", path.display());
            }
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.output_dir)
    }
}
