//! Console counters. Recorded through the `metrics` facade; the CLI installs
//! a Prometheus recorder when observability is on.

use metrics::counter;
use tutorgrid_observability::is_observability_enabled;

/// Count one console action by outcome ("success", "noop", "blocked", "error").
pub fn track_console_action(action: &str, outcome: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("console_actions_total", "action" => action.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Count one call against the remote authority.
pub fn track_remote_request(endpoint: &'static str, success: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if success { "success" } else { "error" };
    counter!("remote_requests_total", "endpoint" => endpoint, "status" => status).increment(1);
}

pub fn track_soft_conflicts(count: usize) {
    if !is_observability_enabled() || count == 0 {
        return;
    }
    counter!("soft_conflicts_detected_total").increment(count as u64);
}

pub fn track_auto_assign_retry(succeeded: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if succeeded { "succeeded" } else { "failed" };
    counter!("auto_assign_retries_total", "status" => status).increment(1);
}
