//! Application configuration, read from a TOML file.
//!
//! ```toml
//! page_size = 10
//! invoice_page_size = 5
//! payment_page_size = 5
//! lab_order_page_size = 20
//! storage_path = "/home/clinic/.config/dentist/preferences.json"
//! log_filter = "info,store_framework=debug"
//! ```
//!
//! Every key is optional. The file itself is optional too: [`ClinicConfig::from_env`] falls
//! back to defaults when `CLINIC_STORES_CONFIG` is unset.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store_framework::{JsonFileStorage, KeyValueStore, MemoryStorage, StorageError};
use thiserror::Error;
use tracing::debug;

/// Names the environment variable holding the config file path.
pub const CONFIG_ENV: &str = "CLINIC_STORES_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Page size of every paginated list without its own setting.
    pub page_size: u32,
    pub invoice_page_size: u32,
    pub payment_page_size: u32,
    pub lab_order_page_size: u32,
    /// Durable storage file. Without one, nothing survives a restart.
    pub storage_path: Option<PathBuf>,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            invoice_page_size: 5,
            payment_page_size: 5,
            lab_order_page_size: 20,
            storage_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ClinicConfig {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        Ok(config.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        debug!(path = %path.display(), ?config, "Configuration loaded");
        Ok(config)
    }

    /// Loads the file named by `CLINIC_STORES_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Opens the configured durable storage.
    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>, StorageError> {
        Ok(match &self.storage_path {
            Some(path) => Arc::new(JsonFileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        })
    }

    fn normalized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.invoice_page_size = self.invoice_page_size.max(1);
        self.payment_page_size = self.payment_page_size.max(1);
        self.lab_order_page_size = self.lab_order_page_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ClinicConfig::parse("").unwrap(), ClinicConfig::default());
    }

    #[test]
    fn partial_file_overrides_and_clamps() {
        let config = ClinicConfig::parse("page_size = 25\ninvoice_page_size = 0\n").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.invoice_page_size, 1);
        assert_eq!(config.payment_page_size, 5);
        assert_eq!(config.lab_order_page_size, 20);
    }

    #[test]
    fn lab_orders_page_separately() {
        let config = ClinicConfig::parse("page_size = 8
lab_order_page_size = 0
").unwrap();
        assert_eq!(config.page_size, 8);
        assert_eq!(config.lab_order_page_size, 1);

        let config = ClinicConfig::parse("lab_order_page_size = 50").unwrap();
        assert_eq!(config.lab_order_page_size, 50);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn bad_types_are_rejected() {
        assert!(matches!(
            ClinicConfig::parse("page_size = \"ten\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file_and_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.toml");
        let storage = dir.path().join("prefs.json");
        std::fs::write(
            &path,
            format!("storage_path = {:?}\nlog_filter = \"debug\"\n", storage),
        )
        .unwrap();

        let config = ClinicConfig::load(&path).unwrap();
        assert_eq!(config.storage_path.as_deref(), Some(storage.as_path()));
        assert_eq!(config.log_filter, "debug");

        let opened = config.open_storage().unwrap();
        opened.set("k", "v").unwrap();
        assert!(storage.exists());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            ClinicConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
