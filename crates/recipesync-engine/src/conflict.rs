//! Replica precedence via the last-updated markers
//!
//! Compares the local and remote `last_updated.txt` artifacts. Ordering is
//! plain epoch-second comparison of the fixed-format timestamps; anything
//! unreadable or unparseable on either side degrades the comparison to
//! [`Comparison::RemoteMarkerMissing`] with the "last updated by" name
//! falling back to the unknown sentinel. The resolver only decides; the
//! caller combines the outcome with the lock invariant (push) or the
//! manifest pre-flight (pull).

use std::sync::Arc;

use tracing::debug;

use recipesync_core::domain::{
    Comparison, EngineError, LastUpdatedRecord, MARKER_FILE, UNKNOWN_DEVICE,
};
use recipesync_core::ports::RemoteFileClient;

use crate::local::LocalStore;

/// Comparison result plus the name recovered from the remote marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOutcome {
    pub comparison: Comparison,
    /// Device named by the remote marker, or `"unknown"` when it could not
    /// be recovered
    pub last_updated_by: String,
}

/// Compares the local and remote markers
pub struct ConflictResolver {
    client: Arc<dyn RemoteFileClient>,
    local: LocalStore,
}

impl ConflictResolver {
    pub fn new(client: Arc<dyn RemoteFileClient>, local: LocalStore) -> Self {
        Self { client, local }
    }

    async fn read_remote_marker(&self) -> Option<LastUpdatedRecord> {
        let stat = self.client.stat(MARKER_FILE).await.ok()?;
        if !stat.is_regular_file() {
            return None;
        }
        let bytes = self.client.read_file(MARKER_FILE, None).await.ok()?;
        LastUpdatedRecord::parse(&String::from_utf8_lossy(&bytes))
    }

    /// Decides replica precedence
    pub async fn compare(&self) -> Result<CompareOutcome, EngineError> {
        let remote = self.read_remote_marker().await;
        let local = self.local.read_marker().await;

        // A degraded comparison always reports the unknown sentinel, even
        // when the remote marker alone was readable.
        let (comparison, last_updated_by) = match (&local, &remote) {
            (Some(local), Some(remote)) => {
                let ours = local.timestamp.and_utc().timestamp();
                let theirs = remote.timestamp.and_utc().timestamp();
                let ordering = if ours > theirs {
                    Comparison::DeviceNewer
                } else if ours < theirs {
                    Comparison::RemoteNewer
                } else {
                    Comparison::Equal
                };
                (ordering, remote.device_name.clone())
            }
            // Either side unreadable or unparseable.
            _ => (Comparison::RemoteMarkerMissing, UNKNOWN_DEVICE.to_string()),
        };

        debug!(
            ?comparison,
            local = ?local.as_ref().map(|r| r.timestamp),
            remote = ?remote.as_ref().map(|r| r.timestamp),
            "Marker comparison"
        );

        Ok(CompareOutcome {
            comparison,
            last_updated_by,
        })
    }
}
