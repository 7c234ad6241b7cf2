//! Traffic engine subsystem.
//!
//! Request processing itself lives outside this crate; this subsystem owns
//! the engine's place in the lifecycle and its admin endpoints.
//!
//! # Data Flow
//! ```text
//! start → register `engine` group → run until stop
//! stop  → shutdown latch → run task exits → Done(Ok)
//! close → unregister `engine` group
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::Method;
use axum::Json;
use serde::Serialize;

use crate::lifecycle::{done_channel, BoxError, Done, Shutdown, Subsystem};
use crate::registry::{handler, EndpointDescriptor, GroupDescriptor, Registry};

pub const ENGINE_GROUP: &str = "engine";

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

pub struct Engine {
    registry: Arc<Registry>,
    shutdown: Shutdown,
    registered: AtomicBool,
}

impl Engine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            shutdown: Shutdown::new(),
            registered: AtomicBool::new(false),
        }
    }

    fn group(&self, started: Instant) -> Result<GroupDescriptor, BoxError> {
        let shutdown = self.shutdown.clone();
        let status = EndpointDescriptor::new(
            Method::GET,
            "/engine/status",
            handler(move |_req| {
                let status = EngineStatus {
                    version: env!("CARGO_PKG_VERSION"),
                    status: if shutdown.is_triggered() { "stopping" } else { "running" },
                    uptime_secs: started.elapsed().as_secs(),
                };
                async move { Json(status) }
            }),
        )?;
        Ok(GroupDescriptor::new(ENGINE_GROUP).with_entry(status))
    }
}

#[async_trait]
impl Subsystem for Engine {
    fn name(&self) -> &str {
        "engine"
    }

    async fn start(&mut self) -> Result<Done, BoxError> {
        let group = self.group(Instant::now())?;
        self.registry.register(group).await;
        self.registered.store(true, Ordering::SeqCst);

        let (done_tx, done) = done_channel();
        let stopped = self.shutdown.subscribe();
        tokio::spawn(async move {
            stopped.wait().await;
            tracing::info!("Engine stopped");
            done_tx.finish(Ok(()));
        });

        Ok(done)
    }

    async fn stop(&self) {
        self.shutdown.trigger();
    }

    async fn close(&self) {
        if self.registered.swap(false, Ordering::SeqCst) {
            let _ = self.registry.unregister(ENGINE_GROUP).await;
        }
    }
}
