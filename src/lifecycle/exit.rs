//! Process exit codes and the exit narrative.

use std::fmt;

pub const EXIT_OK: u8 = 0;
/// A running subsystem stopped with an error.
pub const EXIT_SUBSYSTEM_ERROR: u8 = 1;
/// Configuration could not be loaded or logging could not be installed.
pub const EXIT_CONFIG: u8 = 2;
/// The admin transport could not be constructed.
pub const EXIT_ADMIN_INIT: u8 = 3;
pub const EXIT_ENGINE_START: u8 = 4;
pub const EXIT_ADMIN_START: u8 = 5;
/// Second operator interrupt; cleanup skipped.
pub const EXIT_FORCED: u8 = 255;

/// The event that ended the run. Only the first event counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCause {
    StartupFailed { subsystem: String, error: String },
    Failed { subsystem: String, error: String },
    Exited { subsystem: String },
    OperatorRequest,
}

impl ExitCause {
    /// Subsystem named by the narrative, if any.
    pub fn subsystem(&self) -> Option<&str> {
        match self {
            ExitCause::StartupFailed { subsystem, .. }
            | ExitCause::Failed { subsystem, .. }
            | ExitCause::Exited { subsystem } => Some(subsystem),
            ExitCause::OperatorRequest => None,
        }
    }
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCause::StartupFailed { subsystem, error } => {
                write!(f, "start {subsystem} failed: {error}")
            }
            ExitCause::Failed { subsystem, error } => {
                write!(f, "exit from {subsystem} due to error: {error}")
            }
            ExitCause::Exited { subsystem } => write!(f, "exit from {subsystem} without error"),
            ExitCause::OperatorRequest => write!(f, "exit due to operator request"),
        }
    }
}

/// Outcome of a coordinator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub cause: ExitCause,
    pub code: u8,
}
