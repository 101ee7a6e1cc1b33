//! Compare command - last-updated precedence between device and store

use anyhow::Result;
use clap::Args;

use recipesync_core::domain::Comparison;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Compare the device's update marker against the store's
#[derive(Debug, Args)]
pub struct CompareCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl CompareCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let outcome = facade.compare_last_updated().await?;
        facade.end_session().await?;

        if format.is_json() {
            format.payload(&serde_json::json!({
                "comparison": format!("{:?}", outcome.comparison),
                "last_updated_by": outcome.last_updated_by,
            }));
            return Ok(());
        }

        match outcome.comparison {
            Comparison::DeviceNewer => format.success("This device is newer"),
            Comparison::RemoteNewer => format.success(&format!(
                "The store is newer (last updated by {})",
                outcome.last_updated_by
            )),
            Comparison::Equal => format.success("Replicas carry the same timestamp"),
            Comparison::RemoteMarkerMissing => {
                format.warn("No readable update marker on the store")
            }
        }
        Ok(())
    }
}
