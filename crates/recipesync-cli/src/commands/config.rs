//! Config command - view and manage RecipeSync configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use recipesync_core::config::Config;
use recipesync_core::domain::RemoteDescriptor;

use crate::output::OutputFormat;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g. "device.name", "data_store")
        key: String,
        /// New value
        value: String,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(format).await,
            ConfigCommand::Set { key, value } => self.execute_set(key, value, format).await,
        }
    }

    async fn execute_show(&self, format: OutputFormat) -> Result<()> {
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            format.payload(&json);
        } else {
            format.success(&format!("Configuration ({})", config_path.display()));
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                format.detail(line);
            }
        }
        Ok(())
    }

    async fn execute_set(&self, key: &str, value: &str, format: OutputFormat) -> Result<()> {
        let config_path = Config::default_path();
        let mut config = Config::load_or_default(&config_path);

        info!(key = %key, "Setting configuration value");

        apply_config_value(&mut config, key, value)?;
        config
            .save(&config_path)
            .context("Failed to save configuration")?;

        format.payload(&serde_json::json!({ "set": key }));
        if !format.is_json() {
            format.success(&format!("Set {key}"));
        }
        Ok(())
    }
}

/// Applies a dot-notation key to the typed config
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "device.name" => config.device.name = value.to_string(),
        "data_source" => {
            RemoteDescriptor::parse(value).context("Invalid data source descriptor")?;
            config.data_source = value.to_string();
        }
        "data_store" => {
            RemoteDescriptor::parse(value).context("Invalid data store descriptor")?;
            config.data_store = value.to_string();
        }
        "local_replica" => config.local_replica = PathBuf::from(value),
        "logging.level" => config.logging.level = value.to_string(),
        _ => anyhow::bail!("Unknown configuration key: {key}"),
    }
    Ok(())
}
