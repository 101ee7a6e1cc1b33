//! RecipeSync remote adapters
//!
//! Two implementations of the [`RemoteFileClient`] port:
//! - [`FolderClient`] - a cloud-drive-backed folder mounted into the local
//!   filesystem, driven through `tokio::fs`
//! - [`ShareClient`] - a network share reached over a small framed JSON
//!   remote-file protocol
//!
//! plus the time-boxed device [`discovery`] scan used by the share backend
//! during configuration.
//!
//! [`RemoteFileClient`]: recipesync_core::ports::RemoteFileClient

pub mod discovery;
pub mod folder;
pub mod protocol;
pub mod share;

pub use discovery::{discover_devices, BroadcastDiscovery, DiscoveryHandle, DISCOVERY_WINDOW};
pub use folder::FolderClient;
pub use share::ShareClient;
