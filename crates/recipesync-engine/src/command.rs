//! The facade command set
//!
//! Every public operation is a tagged [`Command`] variant carrying its own
//! typed payload and a oneshot completion channel. Commands live in the
//! queue from enqueue until their handler resolves the completion; the
//! caller observes exactly one resolution per command, including when the
//! queue discards it before dispatch.

use tokio::sync::oneshot;

use recipesync_core::domain::{AccessStatus, EngineError};

use crate::conflict::CompareOutcome;
pub use crate::transfer::Direction;

/// Completion channel for a command's typed result
pub type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// One queued operation against a backend
pub enum Command {
    // Session control
    StartSession { reply: Reply<()> },
    EndSession { reply: Reply<()> },

    // Lock control
    AcquireLock { reply: Reply<AccessStatus> },
    ReleaseLock { reply: Reply<AccessStatus> },

    // Precedence
    CompareLastUpdated { reply: Reply<CompareOutcome> },
    CheckDatabaseFiles { reply: Reply<()> },

    // Bulk transfer
    CopyDatabase { direction: Direction, reply: Reply<()> },
    CopyAllImages { direction: Direction, reply: Reply<u32> },
    SyncImages { direction: Direction, reply: Reply<u32> },

    // Single images
    FetchImage { name: String, reply: Reply<Vec<u8>> },
    SaveImage { name: String, data: Vec<u8>, reply: Reply<()> },
    DeleteImage { name: String, reply: Reply<()> },
    FetchImageNames { reply: Reply<Vec<String>> },

    // Configuration-time browsing
    DiscoverDevices { reply: Reply<Vec<String>> },
    ListShares { reply: Reply<Vec<String>> },
    ListDirectory { path: String, reply: Reply<Vec<String>> },

    // Read-only recipe repository scanning
    ListRepositoryEntries { reply: Reply<Vec<String>> },
    FetchRepositoryFile { name: String, reply: Reply<Vec<u8>> },
}

impl Command {
    /// Short tag for logging
    pub fn tag(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "start_session",
            Self::EndSession { .. } => "end_session",
            Self::AcquireLock { .. } => "acquire_lock",
            Self::ReleaseLock { .. } => "release_lock",
            Self::CompareLastUpdated { .. } => "compare_last_updated",
            Self::CheckDatabaseFiles { .. } => "check_database_files",
            Self::CopyDatabase { .. } => "copy_database",
            Self::CopyAllImages { .. } => "copy_all_images",
            Self::SyncImages { .. } => "sync_images",
            Self::FetchImage { .. } => "fetch_image",
            Self::SaveImage { .. } => "save_image",
            Self::DeleteImage { .. } => "delete_image",
            Self::FetchImageNames { .. } => "fetch_image_names",
            Self::DiscoverDevices { .. } => "discover_devices",
            Self::ListShares { .. } => "list_shares",
            Self::ListDirectory { .. } => "list_directory",
            Self::ListRepositoryEntries { .. } => "list_repository_entries",
            Self::FetchRepositoryFile { .. } => "fetch_repository_file",
        }
    }

    /// True for commands that need an open session before dispatch.
    /// Session control itself and discovery (a pre-connection scan) run
    /// without one.
    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            Self::StartSession { .. } | Self::EndSession { .. } | Self::DiscoverDevices { .. }
        )
    }

    pub fn is_start_session(&self) -> bool {
        matches!(self, Self::StartSession { .. })
    }

    /// Resolves the completion with a failure, consuming the command.
    /// A dropped receiver is fine; the caller stopped listening.
    pub fn fail(self, err: EngineError) {
        match self {
            Self::StartSession { reply } | Self::EndSession { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::AcquireLock { reply } | Self::ReleaseLock { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::CompareLastUpdated { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::CheckDatabaseFiles { reply } => {
                let _ = reply.send(Err(err));
            }
            Self::CopyDatabase { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::CopyAllImages { reply, .. } | Self::SyncImages { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::FetchImage { reply, .. } | Self::FetchRepositoryFile { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::SaveImage { reply, .. } | Self::DeleteImage { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::FetchImageNames { reply }
            | Self::DiscoverDevices { reply }
            | Self::ListShares { reply }
            | Self::ListDirectory { reply, .. }
            | Self::ListRepositoryEntries { reply } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_commands_do_not_require_a_session() {
        let (tx, _rx) = oneshot::channel();
        assert!(!Command::StartSession { reply: tx }.requires_session());
        let (tx, _rx) = oneshot::channel();
        assert!(!Command::EndSession { reply: tx }.requires_session());
        let (tx, _rx) = oneshot::channel();
        assert!(!Command::DiscoverDevices { reply: tx }.requires_session());
    }

    #[test]
    fn remote_operations_require_a_session() {
        let (tx, _rx) = oneshot::channel();
        assert!(Command::AcquireLock { reply: tx }.requires_session());
        let (tx, _rx) = oneshot::channel();
        assert!(Command::CopyDatabase {
            direction: Direction::Push,
            reply: tx
        }
        .requires_session());
    }

    #[tokio::test]
    async fn fail_resolves_the_completion() {
        let (tx, rx) = oneshot::channel();
        Command::AcquireLock { reply: tx }.fail(EngineError::Cancelled);
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
