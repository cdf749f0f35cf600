//! TutorGrid Observability Module
//!
//! Provides configurable observability features:
//! - Structured logging to the console and rolling JSON files
//! - Metrics collection via Prometheus
//!
//! This module can be enabled or disabled at compile time via the `observability` feature flag.
//! At runtime, observability can be further controlled via the `OBSERVABILITY_ENABLED` environment variable.
//!
//! # Examples
//!
//! ```no_run
//! use tutorgrid_observability::{init_metrics, init_tracing};
//!
//! let _guard = init_tracing();
//! let metrics = init_metrics();
//! // ... console work ...
//! if let Some(handle) = metrics {
//!     println!("{}", handle.render());
//! }
//! ```

#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

use std::sync::OnceLock;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true) // Enabled by default
    })
}

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{LogGuard, init_basic_console_logging, init_tracing, init_tracing_in};
#[cfg(feature = "observability")]
pub use metrics::init_metrics;

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    /// Placeholder guard when feature disabled
    pub struct LogGuard;

    /// No-op tracing initialization when feature disabled
    pub fn init_tracing() -> Option<LogGuard> {
        None
    }

    /// No-op console logging when feature disabled
    pub fn init_basic_console_logging() {}

    /// Stand-in for the Prometheus handle when feature disabled
    pub struct PrometheusHandle;

    impl PrometheusHandle {
        pub fn render(&self) -> String {
            String::new()
        }
    }

    /// No-op metrics initialization when feature disabled
    pub fn init_metrics() -> Option<PrometheusHandle> {
        None
    }
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
