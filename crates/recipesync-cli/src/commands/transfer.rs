//! Push / pull commands - whole-database transfers
//!
//! `push` takes the lock, verifies precedence, copies the database bundle
//! and the image set to the store and releases the lock. `pull` is the
//! mirror image, refusing outright when the store bundle is incomplete.

use anyhow::Result;
use clap::Args;

use recipesync_core::domain::Comparison;
use recipesync_engine::Direction;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Publish this device's database and images to the store
#[derive(Debug, Args)]
pub struct PushCommand {
    /// Push even when the store looks newer
    #[arg(long)]
    pub force: bool,

    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl PushCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let access = facade.lock().await?;
        if !access.by_me {
            format.error(&format!("Store is locked by {}", access.owner_name));
            facade.end_session().await?;
            anyhow::bail!("store lock held by another device");
        }

        let outcome = facade.compare_last_updated().await?;
        if outcome.comparison == Comparison::RemoteNewer && !self.force {
            format.error(&format!(
                "The store holds newer data (last updated by {}); pull first or pass --force",
                outcome.last_updated_by
            ));
            facade.unlock().await?;
            facade.end_session().await?;
            anyhow::bail!("store is newer than this device");
        }

        facade.copy_database(Direction::Push).await?;
        let images = facade.copy_all_images(Direction::Push).await?;
        facade.unlock().await?;
        facade.end_session().await?;

        format.payload(&serde_json::json!({ "pushed": true, "images": images }));
        if !format.is_json() {
            format.success(&format!("Database and {images} image(s) pushed"));
        }
        Ok(())
    }
}

/// Apply the store's database and images to this device
#[derive(Debug, Args)]
pub struct PullCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl PullCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let access = facade.lock().await?;
        if !access.by_me {
            format.error(&format!("Store is locked by {}", access.owner_name));
            facade.end_session().await?;
            anyhow::bail!("store lock held by another device");
        }

        facade.check_database_files().await?;
        facade.copy_database(Direction::Pull).await?;
        let images = facade.copy_all_images(Direction::Pull).await?;
        facade.unlock().await?;
        facade.end_session().await?;

        format.payload(&serde_json::json!({ "pulled": true, "images": images }));
        if !format.is_json() {
            format.success(&format!("Database and {images} image(s) pulled"));
        }
        Ok(())
    }
}
