//! Lootledger Settings
//!
//! The ledger client's configuration file and [`LedgerConfig`]. The
//! effective config is assembled once at startup (defaults, then the JSON
//! file, then `LOOTLEDGER_*` variables) and never re-read.

mod ledger;

pub use ledger::{LedgerConfig, ENV_PREFIX};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use lootledger_keystore::default_config_dir_for;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(String),
    #[error("Failed to write settings: {0}")]
    WriteError(String),
    #[error("Failed to parse settings: {0}")]
    ParseError(String),
    #[error("Failed to create directory: {0}")]
    CreateDirError(String),
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A JSON config file and its parsed contents.
///
/// ```ignore
/// let settings: Settings<LedgerConfig> = Settings::load_or_default("lootledger", None)?;
/// ```
pub struct Settings<T> {
    pub config: T,
    path: PathBuf,
}

impl<T: Serialize + DeserializeOwned + Default> Settings<T> {
    /// Read the file at `custom_path` (or the service's default location).
    /// A missing file is written out with defaults so operators can edit it.
    pub fn load_or_default(service: &str, custom_path: Option<&Path>) -> Result<Self> {
        let path = match custom_path {
            Some(p) => p.to_path_buf(),
            None => default_settings_path(service),
        };

        if path.exists() {
            debug!(path = %path.display(), "Reading ledger settings");
            let content = fs::read_to_string(&path)
                .map_err(|e| SettingsError::ReadError(e.to_string()))?;
            let config: T = serde_json::from_str(&content)
                .map_err(|e| SettingsError::ParseError(e.to_string()))?;
            Ok(Self { config, path })
        } else {
            debug!(path = %path.display(), "No settings file, writing defaults");
            let settings = Self {
                config: T::default(),
                path,
            };
            settings.save()?;
            Ok(settings)
        }
    }

    /// Write the config back as pretty JSON, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::CreateDirError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| SettingsError::WriteError(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| SettingsError::WriteError(e.to_string()))
    }

    /// Where the file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `settings.json` inside the service's platform config directory.
pub fn default_settings_path(service: &str) -> PathBuf {
    default_config_dir_for(service).join("settings.json")
}
