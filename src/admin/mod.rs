//! Admin API subsystem.
//!
//! # Data Flow
//! ```text
//! request
//!     → set/propagate x-request-id → trace → timeout → [bearer auth]
//!     → routes.rs dispatch → current route table (ArcSwap)
//!     → handler registered by some subsystem
//!
//! registry change event
//!     → server.rs watcher → registry.list() → routes.rs rebuild → swap
//! ```
//!
//! # Design Decisions
//! - The admin server registers its own endpoints like any other subsystem
//! - Route table is rebuilt wholesale from the sorted listing, so the
//!   result only depends on registry contents
//! - Auth, when configured, covers every admin endpoint

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod server;

pub use handlers::{ADMIN_GROUP, YAML_CONTENT_TYPE};
pub use routes::RouteTable;
pub use server::{AdminError, AdminServer};
