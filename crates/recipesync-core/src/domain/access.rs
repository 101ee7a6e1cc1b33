//! Shared device-access status record
//!
//! One `AccessStatus` exists per backend, wrapped in `Arc<RwLock<..>>` and
//! injected into the lock coordinator, the transfer engine and any UI-layer
//! consumer. The UI reads it to tint and gate controls; only the lock
//! coordinator and the transfer-initiation path mutate it.

use serde::Serialize;

/// Process-wide view of who holds the remote lock and whether a transfer
/// is in flight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessStatus {
    /// Name of the device currently holding the lock, if any
    pub owner_name: String,
    /// True when a lock record exists on the remote
    pub locked: bool,
    /// True when the lock record matches the local device identity exactly
    pub by_me: bool,
    /// True while a push or pull is in flight
    pub updating: bool,
}

impl AccessStatus {
    /// True when this device is allowed to push its database
    pub fn may_push(&self) -> bool {
        self.locked && self.by_me
    }

    /// Clears all fields; used on disconnect and on failure paths
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
