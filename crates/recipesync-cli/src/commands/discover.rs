//! Discover command - scan the local network for reachable devices

use anyhow::Result;
use clap::Args;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Broadcast a discovery probe and list the devices that answered
#[derive(Debug, Args)]
pub struct DiscoverCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl DiscoverCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let devices = facade.discover_devices().await?;

        if format.is_json() {
            format.payload(&serde_json::json!({ "devices": devices }));
            return Ok(());
        }

        if devices.is_empty() {
            format.warn("No devices answered");
        } else {
            format.success(&format!("{} device(s) found", devices.len()));
            for device in &devices {
                format.detail(device);
            }
        }
        Ok(())
    }
}
