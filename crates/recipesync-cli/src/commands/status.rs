//! Status command - lock ownership and update precedence at a glance

use anyhow::Result;
use clap::Args;

use recipesync_core::domain::Comparison;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Show who holds the store lock and which replica is newer
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let access = facade.lock().await?;
        let outcome = facade.compare_last_updated().await?;
        // A status query only releases a lock it took itself; deleting a
        // foreign lock record would break the mutual exclusion.
        if access.by_me {
            facade.unlock().await?;
        }
        facade.end_session().await?;

        if format.is_json() {
            format.payload(&serde_json::json!({
                "device": config.device.name,
                "access": access,
                "comparison": format!("{:?}", outcome.comparison),
                "last_updated_by": outcome.last_updated_by,
            }));
            return Ok(());
        }

        format.success(&format!("Device: {}", config.device));
        if access.locked && !access.by_me {
            format.warn(&format!("Store locked by {}", access.owner_name));
        }
        match outcome.comparison {
            Comparison::DeviceNewer => {
                format.detail("This device holds the newest data; push to publish it")
            }
            Comparison::RemoteNewer => format.detail(&format!(
                "The store holds newer data (last updated by {}); pull to apply it",
                outcome.last_updated_by
            )),
            Comparison::Equal => format.detail("Replicas are in sync"),
            Comparison::RemoteMarkerMissing => {
                format.warn("The store carries no readable update marker")
            }
        }
        Ok(())
    }
}
