//! Shared utilities for lifecycle and admin API integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gateway_control::lifecycle::{done_channel, BoxError, Done, DoneSender, Subsystem};

/// Ordered record of lifecycle calls shared by several mocks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Lets a test end a mock subsystem's run from outside.
#[derive(Clone, Default)]
pub struct Trigger(Arc<Mutex<Option<DoneSender>>>);

impl Trigger {
    /// Report termination; `None` means a clean exit.
    pub fn finish(&self, error: Option<&str>) {
        if let Some(tx) = self.0.lock().unwrap().take() {
            tx.finish(match error {
                Some(message) => Err(message.to_string().into()),
                None => Ok(()),
            });
        }
    }
}

/// Subsystem whose behaviour is scripted by the test.
pub struct MockSubsystem {
    name: String,
    log: CallLog,
    trigger: Trigger,
    fail_start: Option<String>,
    stop_delay: Option<Duration>,
    stop_error: Option<String>,
}

#[allow(dead_code)]
impl MockSubsystem {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            trigger: Trigger::default(),
            fail_start: None,
            stop_delay: None,
            stop_error: None,
        }
    }

    /// `start` fails with `message`.
    pub fn failing_start(mut self, message: &str) -> Self {
        self.fail_start = Some(message.to_string());
        self
    }

    /// `stop` hangs for `delay` before returning.
    pub fn slow_stop(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    /// `stop` makes the run end with `message` instead of cleanly.
    pub fn stop_with_error(mut self, message: &str) -> Self {
        self.stop_error = Some(message.to_string());
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }
}

#[async_trait]
impl Subsystem for MockSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<Done, BoxError> {
        self.log.push(format!("{}.start", self.name));
        if let Some(message) = &self.fail_start {
            return Err(message.clone().into());
        }
        let (tx, done) = done_channel();
        *self.trigger.0.lock().unwrap() = Some(tx);
        Ok(done)
    }

    async fn stop(&self) {
        self.log.push(format!("{}.stop", self.name));
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        self.trigger.finish(self.stop_error.as_deref());
    }

    async fn close(&self) {
        self.log.push(format!("{}.close", self.name));
    }
}

/// Poll `check` until it holds or `timeout` passes.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
