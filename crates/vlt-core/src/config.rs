//! vlt configuration
//!
//! Configuration file: ~/.config/vlt/config.yaml
//!
//! ```yaml
//! database: /path/to/vault.db
//! hooks:
//!   post_write: ["git", "-C", "/path/to/backup", "commit", "-am", "vlt"]
//!   post_read: []
//! ```

use crate::paths::{Paths, DATABASE_ENV};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Vault database location (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Commands run around vault operations
    #[serde(default)]
    pub hooks: Hooks,
}

/// Hook commands, each an argv vector. Empty means disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hooks {
    /// Run after any command that modifies the vault
    #[serde(default)]
    pub post_write: Vec<String>,

    /// Run after a secret payload has been printed
    #[serde(default)]
    pub post_read: Vec<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Paths::new().config_file())
    }

    /// Load configuration from a specific path, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the database path: environment, then config, then default
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = std::env::var_os(DATABASE_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }

        self.database
            .clone()
            .unwrap_or_else(|| Paths::new().database())
    }
}
