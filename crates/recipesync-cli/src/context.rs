//! Shared setup for commands that talk to the data store
//!
//! Builds a [`Facade`] for the configured data store. The backend is picked
//! from the descriptor shape: a `host` means the network-share client, an
//! empty one means the cloud-folder client.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};

use recipesync_core::config::Config;
use recipesync_core::domain::AccessStatus;
use recipesync_core::ports::RemoteFileClient;
use recipesync_engine::{Facade, FacadeConfig, LocalStore};
use recipesync_remote::{BroadcastDiscovery, FolderClient, ShareClient};

pub fn load_config(path_override: &Option<String>) -> Config {
    let path = match path_override {
        Some(path) => PathBuf::from(path),
        None => Config::default_path(),
    };
    Config::load_or_default(&path)
}

/// Facade over the configured data store
pub fn store_facade(config: &Config) -> Result<Facade> {
    let descriptor = config
        .data_store_descriptor()
        .context("Invalid data store configuration")?;

    let share_backed = !descriptor.host.is_empty();
    let (backend, client): (&'static str, Arc<dyn RemoteFileClient>) = if share_backed {
        ("share", Arc::new(ShareClient::new()))
    } else {
        ("cloud", Arc::new(FolderClient::new()))
    };

    Ok(Facade::new(FacadeConfig {
        backend,
        client,
        descriptor,
        identity: config.device.clone(),
        local: LocalStore::new(&config.local_replica),
        status: Arc::new(RwLock::new(AccessStatus::default())),
        events: None,
        discovery: Some(Arc::new(BroadcastDiscovery::new())),
        connect_timeout: if share_backed {
            FacadeConfig::share_timeout()
        } else {
            None
        },
    }))
}
