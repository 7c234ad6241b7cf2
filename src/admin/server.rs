//! Admin API transport.
//!
//! # Responsibilities
//! - Bind the admin listener (plain or TLS)
//! - Register the `admin` group and keep the route table in sync with the
//!   registry by draining its change events
//! - Serve until stopped, then report through `Done`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::{middleware, Router};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::auth::require_bearer;
use crate::admin::handlers::{admin_group, ADMIN_GROUP};
use crate::admin::routes::{dispatch, RouteTable};
use crate::config::{AdminConfig, TlsConfig};
use crate::http::request::{propagate_request_id, set_request_id};
use crate::lifecycle::{done_channel, BoxError, Done, LifecycleHandle, Shutdown, ShutdownSignal, Subsystem};
use crate::registry::{ChangeEvents, Registry, RegistryError};

/// Grace period for open TLS connections after `stop`.
const TLS_DRAIN: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("admin server already started")]
    AlreadyStarted,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("admin server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// The admin API as a supervised subsystem.
pub struct AdminServer {
    config: AdminConfig,
    tls: Option<RustlsConfig>,
    registry: Arc<Registry>,
    lifecycle: LifecycleHandle,
    events: Option<ChangeEvents>,
    routes: RouteTable,
    shutdown: Shutdown,
    local_addr: Option<SocketAddr>,
    registered: AtomicBool,
}

impl AdminServer {
    /// Prepare the server; loads TLS material when configured.
    pub async fn new(
        config: AdminConfig,
        registry: Arc<Registry>,
        events: ChangeEvents,
        lifecycle: LifecycleHandle,
    ) -> Result<Self, AdminError> {
        let tls = match &config.tls {
            Some(tls) => Some(load_tls(tls).await?),
            None => None,
        };

        Ok(Self {
            routes: RouteTable::new(&config.api_prefix),
            config,
            tls,
            registry,
            lifecycle,
            events: Some(events),
            shutdown: Shutdown::new(),
            local_addr: None,
            registered: AtomicBool::new(false),
        })
    }

    /// Address actually bound, available after `start`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn app(&self) -> Router {
        let mut app = Router::new()
            .fallback(dispatch)
            .with_state(self.routes.clone());

        if let Some(api_key) = &self.config.api_key {
            let api_key: Arc<str> = Arc::from(api_key.as_str());
            app = app.layer(middleware::from_fn_with_state(api_key, require_bearer));
        }

        app.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(self.config.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id())
        .layer(set_request_id())
    }

    async fn launch(&mut self) -> Result<Done, AdminError> {
        let mut events = self.events.take().ok_or(AdminError::AlreadyStarted)?;
        let group = admin_group(Arc::downgrade(&self.registry), self.lifecycle.clone())?;

        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|source| AdminError::Bind {
                address: self.config.bind_address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(AdminError::Serve)?;
        let listener = match self.tls.clone() {
            None => Bound::Plain(listener),
            Some(tls) => Bound::Tls(listener.into_std().map_err(AdminError::Serve)?, tls),
        };
        self.local_addr = Some(local_addr);

        // The watcher must be draining before the self-registration below,
        // or a blocking notifier with a full queue never gets a free slot.
        let registry = self.registry.clone();
        let routes = self.routes.clone();
        let stop = self.shutdown.subscribe().wait();
        tokio::spawn(async move {
            tokio::pin!(stop);
            loop {
                tokio::select! {
                    changed = events.changed() => match changed {
                        Some(count) => {
                            tracing::debug!(events = count, "Registry changed");
                            routes.rebuild(&registry.list());
                        }
                        None => break,
                    },
                    _ = &mut stop => break,
                }
            }
        });

        self.routes.rebuild(&self.registry.list());
        self.registry.register(group).await;
        self.registered.store(true, Ordering::SeqCst);

        let app = self.app();
        let signal = self.shutdown.subscribe();
        let (done_tx, done) = done_channel();

        match listener {
            Bound::Plain(listener) => {
                tracing::info!(address = %local_addr, "Admin API listening");
                tokio::spawn(async move {
                    let result = axum::serve(listener, app)
                        .with_graceful_shutdown(signal.wait())
                        .await;
                    done_tx.finish(result.map_err(|e| AdminError::Serve(e).into()));
                });
            }
            Bound::Tls(listener, tls) => {
                tracing::info!(address = %local_addr, "Admin API listening (TLS)");
                tokio::spawn(async move {
                    let handle = axum_server::Handle::new();
                    tokio::spawn(drain_on(signal, handle.clone()));
                    let result = axum_server::from_tcp_rustls(listener, tls)
                        .handle(handle)
                        .serve(app.into_make_service())
                        .await;
                    done_tx.finish(result.map_err(|e| AdminError::Serve(e).into()));
                });
            }
        }

        Ok(done)
    }
}

/// Listener ready to serve, prepared before anything is registered.
enum Bound {
    Plain(TcpListener),
    Tls(std::net::TcpListener, RustlsConfig),
}

async fn drain_on(signal: ShutdownSignal, handle: axum_server::Handle) {
    signal.wait().await;
    handle.graceful_shutdown(Some(TLS_DRAIN));
}

async fn load_tls(tls: &TlsConfig) -> Result<RustlsConfig, AdminError> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(AdminError::Tls)
}

#[async_trait]
impl Subsystem for AdminServer {
    fn name(&self) -> &str {
        "admin-api"
    }

    async fn start(&mut self) -> Result<Done, BoxError> {
        Ok(self.launch().await?)
    }

    async fn stop(&self) {
        if !self.shutdown.is_triggered() {
            tracing::info!("Admin API stopping");
        }
        self.shutdown.trigger();
    }

    async fn close(&self) {
        if self.registered.swap(false, Ordering::SeqCst) {
            let _ = self.registry.unregister(ADMIN_GROUP).await;
        }
    }
}
