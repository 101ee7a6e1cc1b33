//! Shares command - list the shares exported by the configured store

use anyhow::Result;
use clap::Args;

use crate::context::{load_config, store_facade};
use crate::output::OutputFormat;

/// List shares on the configured data store host
#[derive(Debug, Args)]
pub struct SharesCommand {
    /// Use alternate config file
    #[arg(long)]
    pub config: Option<String>,
}

impl SharesCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let config = load_config(&self.config);
        let facade = store_facade(&config)?;

        let shares = facade.list_shares().await?;
        facade.end_session().await?;

        if format.is_json() {
            format.payload(&serde_json::json!({ "shares": shares }));
            return Ok(());
        }

        if shares.is_empty() {
            format.warn("No shares visible");
        } else {
            format.success(&format!("{} share(s)", shares.len()));
            for share in &shares {
                format.detail(share);
            }
        }
        Ok(())
    }
}
