//! Corruption-safe bulk transfers
//!
//! Moves the database bundle and the image set between the local replica
//! and the remote, one file at a time through an explicit worklist - never
//! a parallel fan-out, which would interleave chunked operations on the
//! single open connection.
//!
//! Ordering is what makes an interrupted transfer safe without rollback:
//! the marker is the first file deleted and the last file written in BOTH
//! directions, so no reader can pair a fresh marker with a partially
//! written database. Pulls additionally pre-check that the whole manifest
//! is present remotely and refuse (reporting the missing set) rather than
//! partially applying.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, info};

use recipesync_core::domain::{
    AccessStatus, DeviceIdentity, EngineError, LastUpdatedRecord, DB_MANIFEST, MARKER_FILE,
    PICTURES_DIR,
};
use recipesync_core::ports::{BytesChunkSource, EngineEvent, RemoteFileClient};

use crate::local::LocalStore;

/// Transfer direction, device-relative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local replica to remote
    Push,
    /// Remote replica to local
    Pull,
}

/// Moves the database bundle and images between replicas
pub struct TransferEngine {
    client: Arc<dyn RemoteFileClient>,
    local: LocalStore,
    identity: DeviceIdentity,
    status: Arc<RwLock<AccessStatus>>,
    events: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl TransferEngine {
    pub fn new(
        client: Arc<dyn RemoteFileClient>,
        local: LocalStore,
        identity: DeviceIdentity,
        status: Arc<RwLock<AccessStatus>>,
        events: Option<mpsc::UnboundedSender<EngineEvent>>,
    ) -> Self {
        Self {
            client,
            local,
            identity,
            status,
            events,
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(ref events) = self.events {
            let _ = events.send(event);
        }
    }

    fn set_updating(&self, updating: bool) {
        let snapshot = {
            let mut status = self.status.write().expect("access status poisoned");
            status.updating = updating;
            status.clone()
        };
        self.emit(EngineEvent::AccessChanged(snapshot));
    }

    fn image_path(name: &str) -> String {
        format!("{PICTURES_DIR}/{name}")
    }

    // -----------------------------------------------------------------------
    // Database bundle
    // -----------------------------------------------------------------------

    /// Confirms every manifest file is readable on the remote; reports the
    /// full missing set otherwise
    pub async fn preflight_database(&self) -> Result<(), EngineError> {
        let mut missing = Vec::new();
        for name in DB_MANIFEST {
            let stat = self
                .client
                .stat(name)
                .await
                .map_err(EngineError::Other)?;
            if !stat.is_regular_file() {
                missing.push(name.to_string());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::RemoteFileMissing { missing })
        }
    }

    /// Pushes the database bundle to the remote
    ///
    /// Requires the lock invariant (`locked && by_me`). Deletes the remote
    /// manifest first (marker first), then writes the data files, then the
    /// fresh marker last - locally and remotely. Returns the marker written.
    pub async fn push_database(&self) -> Result<LastUpdatedRecord, EngineError> {
        if !self.status.read().expect("access status poisoned").may_push() {
            return Err(EngineError::LockRequired);
        }

        self.set_updating(true);
        let result = self.push_database_inner().await;
        self.set_updating(false);
        result
    }

    async fn push_database_inner(&self) -> Result<LastUpdatedRecord, EngineError> {
        // Deletion worklist, one completion driving the next. The manifest
        // lists the marker first, which invalidates the remote before any
        // data file disappears.
        for name in DB_MANIFEST {
            debug!(name, "Deleting remote manifest file");
            self.client
                .delete_file(name)
                .await
                .map_err(EngineError::Other)?;
        }

        for name in DB_MANIFEST.iter().filter(|name| **name != MARKER_FILE) {
            let data = self.local.read_file_or_empty(name).await?;
            let bytes = data.len() as u64;
            debug!(name, bytes, "Writing remote manifest file");
            self.client
                .write_file(name, Box::new(BytesChunkSource::new(data)))
                .await
                .map_err(EngineError::Other)?;
            self.emit(EngineEvent::FileTransferred {
                name: name.to_string(),
                bytes,
            });
        }

        // Marker last: only a fully written bundle ever looks fresh.
        let record = LastUpdatedRecord::now(&self.identity);
        self.local.write_marker(&record).await?;
        self.client
            .write_file(
                MARKER_FILE,
                Box::new(BytesChunkSource::new(record.to_wire().into_bytes())),
            )
            .await
            .map_err(EngineError::Other)?;

        info!(marker = %record.to_wire(), "Database pushed");
        Ok(record)
    }

    /// Pulls the database bundle from the remote
    ///
    /// Pre-checks the whole manifest and refuses on any missing file;
    /// otherwise deletes local targets first, applies the data files, and
    /// writes the marker's local copy last (byte-identical to the remote).
    pub async fn pull_database(&self) -> Result<(), EngineError> {
        self.preflight_database().await?;

        self.set_updating(true);
        let result = self.pull_database_inner().await;
        self.set_updating(false);
        result
    }

    async fn pull_database_inner(&self) -> Result<(), EngineError> {
        for name in DB_MANIFEST {
            self.local.delete_file(name).await?;
        }

        for name in DB_MANIFEST.iter().filter(|name| **name != MARKER_FILE) {
            let data = self
                .client
                .read_file(name, None)
                .await
                .map_err(EngineError::Other)?;
            let bytes = data.len() as u64;
            debug!(name, bytes, "Applying remote manifest file");
            self.local.write_file(name, &data).await?;
            self.emit(EngineEvent::FileTransferred {
                name: name.to_string(),
                bytes,
            });
        }

        // The local marker is written verbatim from the remote artifact,
        // and only after every data file landed.
        let marker = self
            .client
            .read_file(MARKER_FILE, None)
            .await
            .map_err(EngineError::Other)?;
        self.local.write_file(MARKER_FILE, &marker).await?;

        info!("Database pulled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Image set
    // -----------------------------------------------------------------------

    async fn remote_image_names(&self) -> Result<Vec<String>, EngineError> {
        let stat = self
            .client
            .stat(PICTURES_DIR)
            .await
            .map_err(EngineError::Other)?;
        if !stat.exists {
            return Ok(Vec::new());
        }
        let mut names = self
            .client
            .list_directory(PICTURES_DIR)
            .await
            .map_err(EngineError::Other)?;
        names.sort();
        Ok(names)
    }

    /// Replaces the whole image set on the target side: deletes every
    /// existing image there one by one, then copies every source image.
    /// Returns the number of images copied.
    pub async fn copy_all_images(&self, direction: Direction) -> Result<u32, EngineError> {
        self.set_updating(true);
        let result = self.copy_all_images_inner(direction).await;
        self.set_updating(false);
        result
    }

    async fn copy_all_images_inner(&self, direction: Direction) -> Result<u32, EngineError> {
        match direction {
            Direction::Push => {
                for name in self.remote_image_names().await? {
                    self.client
                        .delete_file(&Self::image_path(&name))
                        .await
                        .map_err(EngineError::Other)?;
                }
                self.client
                    .create_directory(PICTURES_DIR)
                    .await
                    .map_err(EngineError::Other)?;

                let names = self.local.image_names().await?;
                let mut copied = 0u32;
                for name in names {
                    self.push_one_image(&name).await?;
                    copied += 1;
                }
                info!(copied, "All images pushed");
                Ok(copied)
            }
            Direction::Pull => {
                for name in self.local.image_names().await? {
                    self.local.delete_image(&name).await?;
                }

                let names = self.remote_image_names().await?;
                let mut copied = 0u32;
                for name in names {
                    self.pull_one_image(&name).await?;
                    copied += 1;
                }
                info!(copied, "All images pulled");
                Ok(copied)
            }
        }
    }

    /// Diff-based image sync: copies only the images missing on the target
    /// side. Images are independent units with no ordering constraint, but
    /// transfers stay serialized through the same one-at-a-time worklist.
    pub async fn sync_images(&self, direction: Direction) -> Result<u32, EngineError> {
        self.set_updating(true);
        let result = self.sync_images_inner(direction).await;
        self.set_updating(false);
        result
    }

    async fn sync_images_inner(&self, direction: Direction) -> Result<u32, EngineError> {
        let local: BTreeSet<String> = self.local.image_names().await?.into_iter().collect();
        let remote: BTreeSet<String> = self.remote_image_names().await?.into_iter().collect();

        match direction {
            Direction::Push => {
                self.client
                    .create_directory(PICTURES_DIR)
                    .await
                    .map_err(EngineError::Other)?;
                let mut copied = 0u32;
                for name in local.difference(&remote) {
                    self.push_one_image(name).await?;
                    copied += 1;
                }
                info!(copied, "Missing images pushed");
                Ok(copied)
            }
            Direction::Pull => {
                let mut copied = 0u32;
                for name in remote.difference(&local) {
                    self.pull_one_image(name).await?;
                    copied += 1;
                }
                info!(copied, "Missing images pulled");
                Ok(copied)
            }
        }
    }

    async fn push_one_image(&self, name: &str) -> Result<(), EngineError> {
        let data = self.local.read_image(name).await?;
        let bytes = data.len() as u64;
        self.client
            .write_file(
                &Self::image_path(name),
                Box::new(BytesChunkSource::new(data)),
            )
            .await
            .map_err(EngineError::Other)?;
        self.emit(EngineEvent::FileTransferred {
            name: name.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn pull_one_image(&self, name: &str) -> Result<(), EngineError> {
        let data = self
            .client
            .read_file(&Self::image_path(name), None)
            .await
            .map_err(EngineError::Other)?;
        let bytes = data.len() as u64;
        self.local.write_image(name, &data).await?;
        self.emit(EngineEvent::FileTransferred {
            name: name.to_string(),
            bytes,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Single-image operations
    // -----------------------------------------------------------------------

    pub async fn fetch_image(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.client
            .read_file(&Self::image_path(name), None)
            .await
            .map_err(EngineError::Other)
    }

    pub async fn save_image_data(&self, name: &str, data: Vec<u8>) -> Result<(), EngineError> {
        self.client
            .create_directory(PICTURES_DIR)
            .await
            .map_err(EngineError::Other)?;
        self.client
            .write_file(
                &Self::image_path(name),
                Box::new(BytesChunkSource::new(data)),
            )
            .await
            .map_err(EngineError::Other)
    }

    pub async fn delete_image(&self, name: &str) -> Result<(), EngineError> {
        self.client
            .delete_file(&Self::image_path(name))
            .await
            .map_err(EngineError::Other)
    }

    pub async fn fetch_image_names(&self) -> Result<Vec<String>, EngineError> {
        self.remote_image_names().await
    }
}
