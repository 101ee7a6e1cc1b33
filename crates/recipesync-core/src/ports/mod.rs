//! Port definitions (hexagonal architecture)

pub mod events;
pub mod remote_file_client;

pub use events::EngineEvent;
pub use remote_file_client::{
    BytesChunkSource, ChunkSource, DeviceDiscovery, ProgressFn, RemoteFileClient, RemoteStat,
};
