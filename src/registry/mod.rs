//! Admin API group registry.
//!
//! # Data Flow
//! ```text
//! Subsystem start/close
//!     → store.rs register/unregister (single mutex)
//!     → notifier.rs pushes a ChangeEvent
//!     → watcher (admin server) drains events
//!     → store.rs list() → sorted snapshot → rebuilt route table
//! ```
//!
//! # Design Decisions
//! - One `Arc<Registry>` is built at startup and handed to every subsystem
//! - Duplicate registration overwrites and is logged as an anomaly
//! - Full change queue either blocks or drops, per `registry.overflow`

pub mod group;
pub mod notifier;
pub mod store;

use thiserror::Error;

pub use group::{handler, EndpointDescriptor, GroupDescriptor, Handler};
pub use notifier::{ChangeEvent, ChangeEvents, ChangeNotifier};
pub use store::{Registration, Registry};

/// Errors reported by the registry. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("group {0} not found")]
    GroupNotFound(String),

    #[error("invalid endpoint path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}
