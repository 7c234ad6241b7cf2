//! Uniform contract for supervised subsystems.

use async_trait::async_trait;
use tokio::sync::oneshot;

/// Runtime failure cause reported by a subsystem.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Create the one-shot pair a subsystem hands back from `start`.
pub fn done_channel() -> (DoneSender, Done) {
    let (tx, rx) = oneshot::channel();
    (DoneSender { tx }, Done { rx })
}

/// Fires exactly once, when the subsystem stops running.
#[derive(Debug)]
pub struct Done {
    rx: oneshot::Receiver<Result<(), BoxError>>,
}

impl Done {
    /// Wait for termination. A sender dropped without reporting counts as
    /// an abnormal stop.
    pub async fn wait(self) -> Result<(), BoxError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err("terminated without reporting a result".into()),
        }
    }
}

/// Held by the subsystem's run task.
#[derive(Debug)]
pub struct DoneSender {
    tx: oneshot::Sender<Result<(), BoxError>>,
}

impl DoneSender {
    /// Report termination. Consumes the sender so it can only fire once.
    pub fn finish(self, result: Result<(), BoxError>) {
        let _ = self.tx.send(result);
    }
}

/// A subsystem stopped running, cleanly or not.
#[derive(Debug)]
pub struct Termination {
    pub subsystem: String,
    pub error: Option<BoxError>,
}

/// An independently startable, stoppable long-running unit.
#[async_trait]
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    /// Initialize and begin running. Returns once long-running work has
    /// been spawned. An error means the subsystem never ran.
    async fn start(&mut self) -> Result<Done, BoxError>;

    /// Begin an orderly shutdown. Idempotent; returns once initiated.
    async fn stop(&self);

    /// Release resources after `stop`. Idempotent.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_done_carries_result() {
        let (tx, done) = done_channel();
        tx.finish(Err("listener closed".into()));
        assert_eq!(done.wait().await.unwrap_err().to_string(), "listener closed");
    }

    #[tokio::test]
    async fn test_dropped_sender_is_abnormal() {
        let (tx, done) = done_channel();
        drop(tx);
        assert!(done.wait().await.is_err());
    }
}
