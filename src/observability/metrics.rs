//! Metrics collection and exposition.
//!
//! # Metrics
//! - `registry_mutations_total` (counter): successful register/unregister by `op`
//! - `registry_anomalies_total` (counter): duplicate / not_found by `kind`
//! - `registry_groups` (gauge): registered group count
//! - `registry_change_events_dropped_total` (counter): events lost to a full queue
//! - `subsystem_exits_total` (counter): terminations by `subsystem` and `outcome`
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_registry_mutation(op: &'static str, groups: usize) {
    counter!("registry_mutations_total", "op" => op).increment(1);
    gauge!("registry_groups").set(groups as f64);
}

pub fn record_registry_anomaly(kind: &'static str) {
    counter!("registry_anomalies_total", "kind" => kind).increment(1);
}

pub fn record_change_event_dropped() {
    counter!("registry_change_events_dropped_total").increment(1);
}

pub fn record_subsystem_exit(subsystem: &str, outcome: &'static str) {
    counter!(
        "subsystem_exits_total",
        "subsystem" => subsystem.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
