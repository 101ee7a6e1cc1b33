//! Cooperative file-based mutual exclusion
//!
//! The lock is a two-field text artifact at the remote root. Absence means
//! unlocked; creating it takes ownership. Ownership requires BOTH the
//! device name and the device id to match, which defends against two
//! devices sharing a name.
//!
//! ## Known limitation
//!
//! The acquire path is read-then-create with no atomicity on the remote
//! filesystem: two devices racing an absent lock can both observe absence
//! and both "succeed". No remote primitive (atomic rename, compare-and-set)
//! is available on either backend, so the window is accepted and documented
//! rather than papered over.

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use recipesync_core::domain::{
    AccessStatus, DeviceIdentity, EngineError, LockParse, LockRecord, LOCK_FILE,
};
use recipesync_core::ports::{BytesChunkSource, RemoteFileClient};

/// Implements acquire/release over the lock artifact and maintains the
/// shared [`AccessStatus`] record consumed by the UI layer
pub struct LockCoordinator {
    client: Arc<dyn RemoteFileClient>,
    identity: DeviceIdentity,
    status: Arc<RwLock<AccessStatus>>,
}

impl LockCoordinator {
    pub fn new(
        client: Arc<dyn RemoteFileClient>,
        identity: DeviceIdentity,
        status: Arc<RwLock<AccessStatus>>,
    ) -> Self {
        Self {
            client,
            identity,
            status,
        }
    }

    fn publish(&self, owner_name: String, locked: bool, by_me: bool) -> AccessStatus {
        let mut status = self.status.write().expect("access status poisoned");
        status.owner_name = owner_name;
        status.locked = locked;
        status.by_me = by_me;
        status.clone()
    }

    /// Attempts to take (or confirm) the lock; returns the resulting status
    ///
    /// - Absent lock file: create it as `(name,id)` and become owner.
    /// - Present, well-formed: `by_me` iff both fields match this device;
    ///   the artifact is never rewritten (idempotent re-acquire).
    /// - Present, empty: corruption treated as absence; self-heal by
    ///   creating a fresh record.
    /// - Present, non-empty malformed: might be a real, if garbled,
    ///   competing lock - left untouched, reported as not ours.
    pub async fn acquire(&self) -> Result<AccessStatus, EngineError> {
        let stat = self
            .client
            .stat(LOCK_FILE)
            .await
            .map_err(EngineError::Other)?;

        if !stat.exists {
            return self.take_ownership().await;
        }

        let content = self
            .client
            .read_file(LOCK_FILE, None)
            .await
            .map_err(EngineError::Other)?;
        let content = String::from_utf8_lossy(&content).into_owned();

        match LockRecord::parse(&content) {
            LockParse::Parsed(record) => {
                let by_me = self.identity.matches(&record.owner_name, &record.owner_id);
                if by_me {
                    debug!("Lock already held by this device");
                } else {
                    info!(owner = %record.owner_name, "Lock held by another device");
                }
                Ok(self.publish(record.owner_name, true, by_me))
            }
            LockParse::Empty => {
                warn!("Empty lock artifact; treating as absent and taking ownership");
                self.take_ownership().await
            }
            LockParse::Malformed => {
                warn!(content = %content, "Malformed lock artifact left untouched");
                Ok(self.publish(String::new(), true, false))
            }
        }
    }

    async fn take_ownership(&self) -> Result<AccessStatus, EngineError> {
        let record = LockRecord::for_device(&self.identity);
        self.client
            .write_file(
                LOCK_FILE,
                Box::new(BytesChunkSource::new(record.to_wire().into_bytes())),
            )
            .await
            .map_err(EngineError::Other)?;
        info!(device = %self.identity.name, "Lock acquired");
        Ok(self.publish(self.identity.name.clone(), true, true))
    }

    /// Deletes the lock artifact; absence-on-delete is success
    pub async fn release(&self) -> Result<AccessStatus, EngineError> {
        self.client
            .delete_file(LOCK_FILE)
            .await
            .map_err(EngineError::Other)?;
        info!("Lock released");
        Ok(self.publish(String::new(), false, false))
    }
}
