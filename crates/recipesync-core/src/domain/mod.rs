//! Domain entities and wire-format artifacts

pub mod access;
pub mod artifacts;
pub mod descriptor;
pub mod errors;
pub mod identity;
pub mod manifest;

pub use access::AccessStatus;
pub use artifacts::{Comparison, LastUpdatedRecord, LockParse, LockRecord, UNKNOWN_DEVICE};
pub use descriptor::RemoteDescriptor;
pub use errors::EngineError;
pub use identity::DeviceIdentity;
pub use manifest::{
    is_accepted_repository_name, CHUNK_SIZE, DB_MANIFEST, LOCK_FILE, MARKER_FILE, PICTURES_DIR,
};
