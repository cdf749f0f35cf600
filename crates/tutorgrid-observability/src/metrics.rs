use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

use crate::is_observability_enabled;

/// Install the Prometheus recorder so the `metrics` counters emitted by the
/// console library are captured. Returns None if observability is disabled or
/// a recorder is already installed.
///
/// The console is a short-lived process, so there is no scrape endpoint; the
/// caller renders the handle when it is done.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}
