//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (coordinator.rs):
//!     start each Subsystem in order → collect Done signals
//!     start failure → unwind started ones → subsystem-specific exit code
//!
//! Supervision (coordinator.rs):
//!     race all Done signals + operator stop request
//!     first event → Stopping → stop/close in reverse order → Stopped
//!
//! Signals (signals.rs):
//!     1st SIGHUP/SIGINT/SIGTERM/SIGQUIT → LifecycleHandle::request_stop
//!     2nd → exit(255) immediately
//! ```
//!
//! # Design Decisions
//! - Only the first event decides the exit narrative
//! - `stop`/`close` are bounded by `lifecycle.stop_timeout_secs`; on timeout
//!   shutdown moves on to the next subsystem
//! - A forced exit skips every remaining `stop`/`close`

pub mod coordinator;
pub mod exit;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod subsystem;

pub use coordinator::Coordinator;
pub use exit::{ExitCause, ExitReport};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{InterruptHandler, Interrupt};
pub use state::{LifecycleHandle, LifecycleState};
pub use subsystem::{done_channel, BoxError, Done, DoneSender, Subsystem, Termination};
