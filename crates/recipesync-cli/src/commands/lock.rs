//! Lock / unlock commands - manual control of the store lock

use anyhow::Result;
use clap::Args;

use recipesync_core::domain::AccessStatus;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Acquire the store lock for this device
#[derive(Debug, Args)]
pub struct LockCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl LockCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let access = facade.lock().await?;
        facade.end_session().await?;
        report(format, &access);
        Ok(())
    }
}

/// Release the store lock held by this device
#[derive(Debug, Args)]
pub struct UnlockCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl UnlockCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let access = facade.unlock().await?;
        facade.end_session().await?;
        report(format, &access);
        Ok(())
    }
}

fn report(format: OutputFormat, access: &AccessStatus) {
    if format.is_json() {
        format.payload(&serde_json::json!({ "access": access }));
        return;
    }
    if !access.locked {
        format.success("Store is unlocked");
    } else if access.by_me {
        format.success("Store locked by this device");
    } else {
        format.warn(&format!("Store locked by {}", access.owner_name));
    }
}
