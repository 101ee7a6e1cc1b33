//! RecipeSync Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal core of the external store
//! synchronization engine:
//! - **Domain entities** - `DeviceIdentity`, `RemoteDescriptor`, `LockRecord`,
//!   `LastUpdatedRecord`, `AccessStatus`, the database manifest
//! - **Port definitions** - `RemoteFileClient` implemented by the cloud-folder
//!   and network-share adapters, plus the `EngineEvent` notification channel
//! - **Configuration** - typed YAML config with persisted remote descriptors
//!
//! The domain module holds pure logic with no I/O; adapters live in
//! `recipesync-remote` and the queue/engine in `recipesync-engine`.

pub mod config;
pub mod domain;
pub mod ports;
