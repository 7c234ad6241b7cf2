//! Gateway control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!   SIGHUP/INT/TERM/QUIT
//!          │
//!          ▼
//!   ┌──────────────────┐ 1st: request_stop  ┌──────────────────────────┐
//!   │ InterruptHandler │───────────────────▶│       Coordinator        │
//!   │                  │ 2nd: exit(255)     │ start → race Done → stop │
//!   └──────────────────┘                    └────────────┬─────────────┘
//!                                                        │ supervises
//!                                     ┌──────────────────┴───────────────┐
//!                                     ▼                                  ▼
//!                               ┌──────────┐                      ┌────────────┐
//!                               │  engine  │                      │ admin-api  │
//!                               └────┬─────┘                      └─────┬──────┘
//!                                    │ register/unregister              │ list + change events
//!                                    ▼                                  ▼
//!                               ┌───────────────────────────────────────────────┐
//!                               │                   Registry                    │
//!                               └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use gateway_control::admin::AdminServer;
use gateway_control::config::{load_config, GatewayConfig};
use gateway_control::engine::Engine;
use gateway_control::lifecycle::exit::{
    EXIT_ADMIN_INIT, EXIT_ADMIN_START, EXIT_CONFIG, EXIT_ENGINE_START,
};
use gateway_control::lifecycle::signals::{self, process_exit, InterruptHandler};
use gateway_control::lifecycle::{Coordinator, LifecycleHandle};
use gateway_control::observability::{logging, metrics};
use gateway_control::registry::Registry;

#[derive(Parser)]
#[command(name = "gateway-control")]
#[command(about = "Admin API registry and subsystem supervisor", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("load config {} failed: {e}", path.display());
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        None => GatewayConfig::default(),
    };
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("initialize logging failed: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gateway-control starting");
    tracing::info!(
        admin_address = %config.admin.bind_address,
        api_prefix = %config.admin.api_prefix,
        overflow = ?config.registry.overflow,
        stop_timeout_secs = config.lifecycle.stop_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (registry, events) = Registry::new(&config.registry);
    let registry = Arc::new(registry);
    let lifecycle = LifecycleHandle::new();

    let admin = match AdminServer::new(
        config.admin.clone(),
        registry.clone(),
        events,
        lifecycle.clone(),
    )
    .await
    {
        Ok(admin) => admin,
        Err(e) => {
            tracing::error!(error = %e, "Initialize admin API failed");
            return ExitCode::from(EXIT_ADMIN_INIT);
        }
    };
    let engine = Engine::new(registry.clone());

    match signals::listen() {
        Ok(interrupts) => {
            let handler = InterruptHandler::new(lifecycle.clone(), process_exit());
            tokio::spawn(handler.run(interrupts));
        }
        Err(e) => {
            tracing::error!(error = %e, "Install signal handlers failed");
            return ExitCode::from(EXIT_CONFIG);
        }
    }

    let report = Coordinator::new(lifecycle, config.lifecycle.stop_timeout())
        .supervise(engine, EXIT_ENGINE_START)
        .supervise(admin, EXIT_ADMIN_START)
        .run()
        .await;

    tracing::info!(cause = %report.cause, code = report.code, "gateway-control exited");
    ExitCode::from(report.code)
}
