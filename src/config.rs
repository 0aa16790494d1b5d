//! Application configuration
//!
//! ```toml
//! data_dir = "/home/me/.local/share/cardwise"
//!
//! [review]
//! default_review_cap = 10
//! default_learn_cap = 20
//! max_undo_depth = 50
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::models::{DEFAULT_LEARN_CAP, DEFAULT_REVIEW_CAP};
use crate::flashcards::session::SessionOptions;

const APP_DIR: &str = "cardwise";
const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Review defaults applied to new decks and sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub default_review_cap: u32,
    pub default_learn_cap: u32,
    /// Ratings a session remembers for undo; unset keeps them all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_undo_depth: Option<usize>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_review_cap: DEFAULT_REVIEW_CAP,
            default_learn_cap: DEFAULT_LEARN_CAP,
            max_undo_depth: None,
        }
    }
}

impl ReviewConfig {
    /// Session options for a run looking `lookahead_days` ahead
    pub fn session_options(&self, lookahead_days: u32) -> SessionOptions {
        SessionOptions {
            lookahead_days,
            max_undo_depth: self.max_undo_depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where decks, cards and quotas are stored
    pub data_dir: PathBuf,
    pub review: ReviewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|p| p.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".cardwise"));

        Self {
            data_dir,
            review: ReviewConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file does not exist
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Ok(path) => path,
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        log::debug!("Loading config from {}", path.display());
        Self::load(&path)
    }
}
