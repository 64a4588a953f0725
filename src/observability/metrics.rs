//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_listeners` (gauge): listeners held after the last reconciliation
//! - `relay_clusters` (gauge): clusters held after the last reconciliation
//! - `relay_reconcile_total` (counter): reconciliations by outcome
//!   (`applied`, `restart`, `failed`)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The recorder is installed by the binary, never by the library
//! - Exposition is served by the admin servers so the scrape endpoint can
//!   move on restart

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::debug!("Metrics recorder installed");
            Some(handle)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            None
        }
    }
}

/// Record the outcome of one reconciliation call.
pub fn record_reconcile(outcome: &'static str) {
    counter!("relay_reconcile_total", "outcome" => outcome).increment(1);
}

/// Record the number of live resources per kind.
pub fn record_resources(listeners: usize, clusters: usize) {
    gauge!("relay_listeners").set(listeners as f64);
    gauge!("relay_clusters").set(clusters as f64);
}
