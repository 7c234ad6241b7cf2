//! Subsystem supervision.
//!
//! # Responsibilities
//! - Start subsystems in order, unwinding on the first start failure
//! - Race every `done` signal and the operator stop request
//! - Stop and close everything in reverse start order
//! - Map the first event to an exit code

use std::future::Future;
use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt};
use tokio::sync::watch;

use crate::lifecycle::exit::{ExitCause, ExitReport, EXIT_OK, EXIT_SUBSYSTEM_ERROR};
use crate::lifecycle::state::{LifecycleHandle, LifecycleState};
use crate::lifecycle::subsystem::{Subsystem, Termination};
use crate::observability::metrics;

enum Event {
    Terminated(Termination),
    StopRequested,
}

struct Supervised {
    subsystem: Box<dyn Subsystem>,
    startup_exit_code: u8,
}

/// Runs a fixed set of subsystems until the first one stops or an operator
/// asks for a stop.
pub struct Coordinator {
    units: Vec<Supervised>,
    lifecycle: LifecycleHandle,
    stop_timeout: Option<Duration>,
}

impl Coordinator {
    /// `stop_timeout` bounds each `stop` and `close` call; `None` waits
    /// indefinitely.
    pub fn new(lifecycle: LifecycleHandle, stop_timeout: Option<Duration>) -> Self {
        Self {
            units: Vec::new(),
            lifecycle,
            stop_timeout,
        }
    }

    /// Add a subsystem. Subsystems start in the order they are added.
    /// `startup_exit_code` is the process status used if its `start` fails.
    pub fn supervise(mut self, subsystem: impl Subsystem + 'static, startup_exit_code: u8) -> Self {
        self.units.push(Supervised {
            subsystem: Box::new(subsystem),
            startup_exit_code,
        });
        self
    }

    pub fn lifecycle(&self) -> &LifecycleHandle {
        &self.lifecycle
    }

    pub async fn run(mut self) -> ExitReport {
        let mut pending: Vec<BoxFuture<'static, Event>> = Vec::with_capacity(self.units.len() + 1);

        for index in 0..self.units.len() {
            let name = self.units[index].subsystem.name().to_string();
            match self.units[index].subsystem.start().await {
                Ok(done) => {
                    tracing::info!(subsystem = %name, "Subsystem started");
                    pending.push(
                        async move {
                            let error = done.wait().await.err();
                            Event::Terminated(Termination {
                                subsystem: name,
                                error,
                            })
                        }
                        .boxed(),
                    );
                }
                Err(error) => {
                    tracing::error!(subsystem = %name, error = %error, "Subsystem failed to start");
                    metrics::record_subsystem_exit(&name, "start_failed");
                    let code = self.units[index].startup_exit_code;
                    self.lifecycle.advance(LifecycleState::Stopping);
                    self.unwind(index).await;
                    self.lifecycle.advance(LifecycleState::Stopped);
                    return ExitReport {
                        cause: ExitCause::StartupFailed {
                            subsystem: name,
                            error: error.to_string(),
                        },
                        code,
                    };
                }
            }
        }

        pending.push(stop_requested(self.lifecycle.subscribe()).boxed());

        let (first, _, late) = future::select_all(pending).await;
        self.lifecycle.advance(LifecycleState::Stopping);

        let report = match first {
            Event::Terminated(Termination {
                subsystem,
                error: Some(error),
            }) => {
                metrics::record_subsystem_exit(&subsystem, "error");
                ExitReport {
                    cause: ExitCause::Failed {
                        subsystem,
                        error: error.to_string(),
                    },
                    code: EXIT_SUBSYSTEM_ERROR,
                }
            }
            Event::Terminated(Termination {
                subsystem,
                error: None,
            }) => {
                metrics::record_subsystem_exit(&subsystem, "clean");
                ExitReport {
                    cause: ExitCause::Exited { subsystem },
                    code: EXIT_OK,
                }
            }
            Event::StopRequested => ExitReport {
                cause: ExitCause::OperatorRequest,
                code: EXIT_OK,
            },
        };

        if report.code == EXIT_OK {
            tracing::info!(cause = %report.cause, "Shutting down");
        } else {
            tracing::warn!(cause = %report.cause, "Shutting down");
        }

        self.unwind(self.units.len()).await;
        self.consume_late(late).await;

        self.lifecycle.advance(LifecycleState::Stopped);
        tracing::info!(code = report.code, "All subsystems stopped");
        report
    }

    /// Stop then close the first `started` subsystems, last started first.
    async fn unwind(&self, started: usize) {
        for unit in self.units[..started].iter().rev() {
            let name = unit.subsystem.name();
            self.bounded(name, "stop", unit.subsystem.stop()).await;
            self.bounded(name, "close", unit.subsystem.close()).await;
        }
    }

    async fn bounded(&self, subsystem: &str, step: &'static str, call: impl Future<Output = ()>) {
        match self.stop_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, call).await.is_err() {
                    tracing::warn!(
                        subsystem = %subsystem,
                        step,
                        timeout_secs = limit.as_secs_f64(),
                        "Timed out, continuing shutdown"
                    );
                }
            }
            None => call.await,
        }
    }

    /// Collect terminations that lost the race. They never change the exit
    /// narrative.
    async fn consume_late(&self, late: Vec<BoxFuture<'static, Event>>) {
        let collect = future::join_all(late);
        let events = match self.stop_timeout {
            Some(limit) => match tokio::time::timeout(limit, collect).await {
                Ok(events) => events,
                Err(_) => {
                    tracing::warn!("Some subsystems did not report termination");
                    return;
                }
            },
            None => collect.await,
        };

        for event in events {
            if let Event::Terminated(termination) = event {
                match termination.error {
                    Some(error) => tracing::debug!(
                        subsystem = %termination.subsystem,
                        error = %error,
                        "Subsystem stopped with error after shutdown began"
                    ),
                    None => tracing::debug!(
                        subsystem = %termination.subsystem,
                        "Subsystem stopped"
                    ),
                }
            }
        }
    }
}

async fn stop_requested(mut state: watch::Receiver<LifecycleState>) -> Event {
    if state
        .wait_for(|state| *state != LifecycleState::Running)
        .await
        .is_err()
    {
        future::pending::<()>().await;
    }
    Event::StopRequested
}
