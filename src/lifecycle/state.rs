//! Process lifecycle state, shared by the coordinator, the interrupt
//! handler and the liveness endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle phases. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Running,
    StopRequested,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Whether the process still reports itself as alive.
    pub fn is_live(self) -> bool {
        self < LifecycleState::Stopping
    }
}

/// Cloneable handle onto the shared lifecycle state.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    state: Arc<watch::Sender<LifecycleState>>,
    force_exit: Arc<AtomicBool>,
}

impl LifecycleHandle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Running);
        Self {
            state: Arc::new(state),
            force_exit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Ask the coordinator to stop. Never blocks. Returns `false` if the
    /// process was already past `Running`.
    pub fn request_stop(&self) -> bool {
        self.advance(LifecycleState::StopRequested)
    }

    /// Move forward to `next`; moving backwards is ignored.
    pub(crate) fn advance(&self, next: LifecycleState) -> bool {
        self.state.send_if_modified(|state| {
            if *state < next {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn mark_force_exit(&self) {
        self.force_exit.store(true, Ordering::SeqCst);
    }

    /// Set once a second interrupt escalated to immediate termination.
    pub fn force_exit_requested(&self) -> bool {
        self.force_exit.load(Ordering::SeqCst)
    }
}

impl Default for LifecycleHandle {
    fn default() -> Self {
        Self::new()
    }
}
