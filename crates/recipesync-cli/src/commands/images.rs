//! Images command - diff-based image sync and listing

use anyhow::Result;
use clap::Subcommand;

use recipesync_engine::Direction;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// Image-set subcommands
#[derive(Debug, Subcommand)]
pub enum ImagesCommand {
    /// Copy images missing on either side
    Sync {
        /// Use alternate config file
        #[arg(long)]
        config: Option<String>,
    },
    /// List the images stored remotely
    List {
        /// Use alternate config file
        #[arg(long)]
        config: Option<String>,
    },
}

impl ImagesCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ImagesCommand::Sync { config } => execute_sync(config, format).await,
            ImagesCommand::List { config } => execute_list(config, format).await,
        }
    }
}

async fn execute_sync(config: &Option<String>, format: OutputFormat) -> Result<()> {
    let config = load_config(config);
    let facade = store_facade(&config)?;

    let pushed = facade.sync_images(Direction::Push).await?;
    let pulled = facade.sync_images(Direction::Pull).await?;
    facade.end_session().await?;

    format.payload(&serde_json::json!({ "pushed": pushed, "pulled": pulled }));
    if !format.is_json() {
        format.success(&format!("{pushed} image(s) pushed, {pulled} pulled"));
    }
    Ok(())
}

async fn execute_list(config: &Option<String>, format: OutputFormat) -> Result<()> {
    let config = load_config(config);
    let facade = store_facade(&config)?;

    let names = facade.fetch_image_names().await?;
    facade.end_session().await?;

    if format.is_json() {
        format.payload(&serde_json::json!({ "images": names }));
        return Ok(());
    }

    if names.is_empty() {
        format.warn("No images on the store");
    } else {
        format.success(&format!("{} image(s)", names.len()));
        for name in &names {
            format.detail(name);
        }
    }
    Ok(())
}
