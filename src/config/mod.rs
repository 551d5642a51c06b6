//! # Configuration Management Module
//!
//! Centralized TOML configuration for the kit subsystem with defaults and
//! light validation.
//!
//! ## Configuration Structure
//!
//! - [`KitsConfig`] - where kit definitions and user profiles live, and the
//!   redemption policy defaults
//! - [`InventoryConfig`] - sizes of the player inventory and the kit editor
//! - [`LoggingConfig`] - logging and debugging settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kitredeem::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Kits live in {}", config.kits.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [kits]
//! data_dir = "./data"
//! must_get_all = false
//! record_usage_on_override = true
//! drop_rejected = true
//!
//! [inventory]
//! editor_slots = 36
//!
//! [logging]
//! level = "info"
//! file = "kitredeem.log"
//! ```
//!
//! Policy values are turned into a [`crate::kits::PolicySettings`] and swapped
//! into the engine as a whole on reload.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub kits: KitsConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitsConfig {
    /// Directory holding `kits.json` and its backup
    pub data_dir: String,
    /// Optional override for the sled profile database; defaults to `<data_dir>/profiles`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_db_path: Option<String>,
    /// Roll back the whole redemption unless every stack fits
    #[serde(default)]
    pub must_get_all: bool,
    /// Timestamp usage even for administrative overrides that skip the checks
    #[serde(default = "default_true")]
    pub record_usage_on_override: bool,
    /// Drop rejected stacks at the player's feet after a partial redemption
    #[serde(default = "default_true")]
    pub drop_rejected: bool,
}

impl KitsConfig {
    pub fn profiles_path(&self) -> PathBuf {
        match &self.profiles_db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("profiles"),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Slots shown by the kit editor container
    pub editor_slots: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            editor_slots: 36,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.kits.data_dir.trim().is_empty() {
            return Err(anyhow!("kits.data_dir must not be empty"));
        }
        if self.inventory.editor_slots == 0 {
            return Err(anyhow!("inventory.editor_slots must be at least 1"));
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            kits: KitsConfig {
                data_dir: "./data".to_string(),
                profiles_db_path: None,
                must_get_all: false,
                record_usage_on_override: true,
                drop_rejected: true,
            },
            inventory: InventoryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("kitredeem.log".to_string()),
                security_file: Some("kitredeem-security.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn default_config_round_trips_through_toml() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("utf8 path");

        Config::create_default(path).await.expect("write default");
        let loaded = Config::load(path).await.expect("load");
        assert_eq!(loaded.kits.data_dir, "./data");
        assert!(!loaded.kits.must_get_all);
        assert!(loaded.kits.record_usage_on_override);
        assert_eq!(loaded.inventory.editor_slots, 36);
        assert_eq!(loaded.log_level(), log::LevelFilter::Info);
    }

    #[tokio::test]
    async fn missing_optional_sections_use_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[kits]\ndata_dir = \"kits\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .expect("write");

        let loaded = Config::load(path.to_str().expect("utf8 path"))
            .await
            .expect("load");
        assert!(loaded.kits.drop_rejected);
        assert_eq!(loaded.inventory.editor_slots, 36);
        assert_eq!(loaded.kits.profiles_path(), PathBuf::from("kits").join("profiles"));
        assert_eq!(loaded.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn zero_editor_slots_is_rejected() {
        let mut config = Config::default();
        config.inventory.editor_slots = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn retired_inventory_slots_key_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[kits]\ndata_dir = \"kits\"\n\n[inventory]\nslots = 0\neditor_slots = 27\n\n[logging]\nlevel = \"info\"\n",
        )
        .expect("write");

        let loaded = Config::load(path.to_str().expect("utf8 path"))
            .await
            .expect("load");
        assert_eq!(loaded.inventory.editor_slots, 27);
    }
}
