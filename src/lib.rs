//! Gateway control plane library.
//!
//! Admin API group registry plus the lifecycle coordinator that supervises
//! the gateway's subsystems.

pub mod admin;
pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use config::schema::GatewayConfig;
pub use lifecycle::{Coordinator, LifecycleHandle};
pub use registry::Registry;
