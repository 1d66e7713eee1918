//! Standard paths used by vlt

use std::path::PathBuf;

/// Environment variable overriding the vault database location
pub const DATABASE_ENV: &str = "VLT_DATABASE";

/// Standard vlt paths
pub struct Paths {
    /// Data directory (~/.local/share/vlt)
    pub data: PathBuf,
    /// Config directory (~/.config/vlt)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("vlt");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vlt");

        Self { data, config }
    }

    /// Default vault database file
    pub fn database(&self) -> PathBuf {
        self.data.join("vault.db")
    }

    /// Default configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.yaml")
    }
}
