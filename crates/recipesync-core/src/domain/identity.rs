//! Local device identity
//!
//! Lock ownership is decided by comparing BOTH the device name and the
//! device UUID against the lock artifact; the UUID defends against two
//! devices configured with the same human-readable name.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the local device, persisted in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Human-readable device name (shown in lock/marker artifacts)
    pub name: String,
    /// Stable unique id, generated once at first launch
    pub id: Uuid,
}

impl DeviceIdentity {
    /// Creates an identity with a freshly generated UUID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
        }
    }

    /// True when a lock artifact's `(owner_name, owner_id)` pair matches
    /// this device exactly
    pub fn matches(&self, owner_name: &str, owner_id: &Uuid) -> bool {
        self.name == owner_name && self.id == *owner_id
    }
}

impl Display for DeviceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
