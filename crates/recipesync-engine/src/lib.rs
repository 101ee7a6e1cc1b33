//! RecipeSync engine - the external store synchronization core
//!
//! Layered leaf to root:
//! - [`local`] - the local replica (database bundle + pictures folder)
//! - [`session`] - connect/disconnect lifecycle for one remote target
//! - [`lock`] - the cooperative file-based mutual-exclusion protocol
//! - [`conflict`] - last-updated marker comparison
//! - [`transfer`] - corruption-safe multi-file transfers in both directions
//! - [`command`] / [`facade`] - the public queue-backed operation surface
//!
//! One [`Facade`] exists per backend (cloud folder, network share). Every
//! remote operation is enqueued as a [`Command`] and dispatched strictly
//! FIFO; at most one remote operation is ever in flight per backend.

pub mod command;
pub mod conflict;
pub mod facade;
pub mod local;
pub mod lock;
pub mod session;
pub mod transfer;

pub use command::{Command, Direction};
pub use conflict::CompareOutcome;
pub use facade::{Facade, FacadeConfig};
pub use local::LocalStore;
