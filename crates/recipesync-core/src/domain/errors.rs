//! Engine error taxonomy
//!
//! Every facade operation reports success or one of these failures to its
//! caller. The queue itself never halts on an error; a failed command still
//! advances to the next one.

use thiserror::Error;

/// Errors surfaced by the external store engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Could not reach or authenticate against the remote target
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The share connect attempt exceeded its guard timer
    #[error("Connection timed out after {0} seconds")]
    Timeout(u64),

    /// A command that needs an open session ran without one and the
    /// transparent re-establishment also failed
    #[error("No active session")]
    SessionNotActive,

    /// One or more manifest files are missing on the remote; a pull is
    /// refused rather than partially applied
    #[error("Remote files missing: {missing:?}")]
    RemoteFileMissing {
        /// Names of the manifest files that failed the pre-flight check
        missing: Vec<String>,
    },

    /// A lock or marker artifact had content that could not be parsed.
    /// Non-empty malformed content is never overwritten.
    #[error("Malformed artifact '{artifact}': {content:?}")]
    MalformedArtifact { artifact: String, content: String },

    /// The remote lock is held by a different device identity
    #[error("Lock held by {owner}")]
    LockHeldByOther { owner: String },

    /// Pushing the database requires holding the lock
    #[error("Push refused: lock not held by this device")]
    LockRequired,

    /// A persisted descriptor string did not have exactly seven fields
    #[error("Malformed remote descriptor: {0:?}")]
    MalformedDescriptor(String),

    /// Command was discarded from the queue before being dispatched
    #[error("Command cancelled before dispatch")]
    Cancelled,

    /// The share wire protocol returned something unexpected
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Local or remote I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Adapter-level failure without a more specific classification
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// True for failures that the facade repairs with a single transparent
    /// session re-establishment. Everything else is terminal for the command.
    pub fn is_session_drop(&self) -> bool {
        matches!(self, Self::SessionNotActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_missing_set() {
        let err = EngineError::RemoteFileMissing {
            missing: vec!["recipes.sqlite".into(), "last_updated.txt".into()],
        };
        let text = err.to_string();
        assert!(text.contains("recipes.sqlite"));
        assert!(text.contains("last_updated.txt"));
    }

    #[test]
    fn session_drop_classification() {
        assert!(EngineError::SessionNotActive.is_session_drop());
        assert!(!EngineError::Cancelled.is_session_drop());
        assert!(!EngineError::Timeout(60).is_session_drop());
    }
}
