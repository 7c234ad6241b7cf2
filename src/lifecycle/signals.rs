//! OS signal handling.
//!
//! # Responsibilities
//! - Forward SIGHUP, SIGINT, SIGTERM and SIGQUIT into one channel
//! - Escalate: the first interrupt requests a graceful stop, the second
//!   terminates the process on the spot
//!
//! # Design Decisions
//! - All four signals count the same; SIGHUP does not reload
//! - One task owns the escalation state, so no counter is shared
//! - The forced path calls the terminator synchronously and runs no cleanup

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::lifecycle::exit::EXIT_FORCED;
use crate::lifecycle::state::LifecycleHandle;

/// An operator request to stop the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Hangup,
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interrupt::Hangup => "SIGHUP",
            Interrupt::Interrupt => "SIGINT",
            Interrupt::Terminate => "SIGTERM",
            Interrupt::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Escalation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escalation {
    #[default]
    Idle,
    StopRequested,
}

/// What to do about an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    RequestStop,
    ForceExit,
}

impl Escalation {
    pub fn on_interrupt(&mut self) -> EscalationAction {
        match self {
            Escalation::Idle => {
                *self = Escalation::StopRequested;
                EscalationAction::RequestStop
            }
            Escalation::StopRequested => EscalationAction::ForceExit,
        }
    }
}

/// Ends the process with the given status. Must not return in production.
pub type Terminator = Arc<dyn Fn(u8) + Send + Sync>;

/// Terminator that calls [`std::process::exit`]: no destructors, no
/// pending shutdown work.
pub fn process_exit() -> Terminator {
    Arc::new(|code| std::process::exit(i32::from(code)))
}

/// Consumes interrupts and drives the escalation policy.
pub struct InterruptHandler {
    lifecycle: LifecycleHandle,
    terminate: Terminator,
    escalation: Escalation,
}

impl InterruptHandler {
    pub fn new(lifecycle: LifecycleHandle, terminate: Terminator) -> Self {
        Self {
            lifecycle,
            terminate,
            escalation: Escalation::default(),
        }
    }

    /// Run until the interrupt source closes or the process is forced out.
    pub async fn run(mut self, mut interrupts: mpsc::Receiver<Interrupt>) {
        while let Some(interrupt) = interrupts.recv().await {
            match self.escalation.on_interrupt() {
                EscalationAction::RequestStop => {
                    tracing::info!(signal = %interrupt, "Signal received, shutting down");
                    if !self.lifecycle.request_stop() {
                        tracing::debug!("Shutdown already in progress");
                    }
                }
                EscalationAction::ForceExit => {
                    tracing::warn!(signal = %interrupt, "Signal received again, terminating immediately");
                    self.lifecycle.mark_force_exit();
                    (self.terminate)(EXIT_FORCED);
                    return;
                }
            }
        }
    }
}

/// Install OS signal listeners and forward them into a channel.
#[cfg(unix)]
pub fn listen() -> std::io::Result<mpsc::Receiver<Interrupt>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = hangup.recv() => Interrupt::Hangup,
                Some(()) = interrupt.recv() => Interrupt::Interrupt,
                Some(()) = terminate.recv() => Interrupt::Terminate,
                Some(()) = quit.recv() => Interrupt::Quit,
                else => break,
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    });

    tracing::debug!("Signal handlers installed (SIGHUP, SIGINT, SIGTERM, SIGQUIT)");
    Ok(rx)
}

/// Install OS signal listeners and forward them into a channel.
#[cfg(not(unix))]
pub fn listen() -> std::io::Result<mpsc::Receiver<Interrupt>> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(Interrupt::Interrupt).await.is_err() {
                break;
            }
        }
    });
    Ok(rx)
}
