//! Configuration for RecipeSync
//!
//! Typed configuration mapping to a YAML file, with loading, defaults and
//! persistence. The two remote descriptors keep their legacy comma-joined
//! persisted form inside the YAML so existing settings carry over.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::RemoteDescriptor;
use crate::domain::identity::DeviceIdentity;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity of this device; generated on first run
    pub device: DeviceIdentity,
    /// Read-only recipe repository ("data source"), legacy comma-joined form
    pub data_source: String,
    /// Synchronized database+images target ("data store"), legacy form
    pub data_store: String,
    /// Directory holding this device's own database bundle and pictures
    pub local_replica: PathBuf,
    pub logging: LoggingConfig,
}

/// Logging / tracing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "recipesync-device".into());
        Self {
            device: DeviceIdentity::new(hostname),
            data_source: RemoteDescriptor::default().to_field_string(),
            data_store: RemoteDescriptor::default().to_field_string(),
            local_replica: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("recipesync"),
            logging: LoggingConfig {
                level: "info".into(),
            },
        }
    }
}

impl Config {
    /// Default config path: `~/.config/recipesync/config.yaml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipesync")
            .join("config.yaml")
    }

    /// Load configuration from a YAML file at `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Persist to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parsed data-source descriptor
    pub fn data_source_descriptor(&self) -> anyhow::Result<RemoteDescriptor> {
        Ok(RemoteDescriptor::parse(&self.data_source)?)
    }

    /// Parsed data-store descriptor
    pub fn data_store_descriptor(&self) -> anyhow::Result<RemoteDescriptor> {
        Ok(RemoteDescriptor::parse(&self.data_store)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptors_parse() {
        let config = Config::default();
        assert!(config.data_source_descriptor().is_ok());
        assert!(config.data_store_descriptor().is_ok());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.data_store = RemoteDescriptor {
            host: "nas.local".into(),
            netbios_name: "NAS".into(),
            group: "WORKGROUP".into(),
            user_name: "cook".into(),
            password: "pw".into(),
            share: "recipes".into(),
            path: "sync".into(),
        }
        .to_field_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.device, config.device);
        assert_eq!(
            loaded.data_store_descriptor().unwrap().host,
            "nas.local"
        );
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.logging.level, "info");
    }
}
