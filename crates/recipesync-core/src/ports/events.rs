//! Engine notification events
//!
//! UI-layer collaborators observe the engine through a single sum-typed
//! event stream instead of a many-method delegate. Consumers match on the
//! variants they care about and ignore the rest; dropping the receiver
//! silently disables notifications (sends are best-effort).

use crate::domain::access::AccessStatus;
use crate::domain::artifacts::Comparison;

/// Notifications emitted by the facades as commands complete
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A session was established against the named backend
    SessionStarted { backend: &'static str },
    /// The session ended (explicitly or on teardown)
    SessionEnded { backend: &'static str },
    /// The shared access status changed (lock taken/released, transfer
    /// started/finished)
    AccessChanged(AccessStatus),
    /// A marker comparison completed
    Compared {
        outcome: Comparison,
        last_updated_by: String,
    },
    /// A file finished transferring in either direction
    FileTransferred { name: String, bytes: u64 },
    /// Device discovery finished with the sorted name list
    DiscoveryFinished { devices: Vec<String> },
}
