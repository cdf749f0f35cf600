//! # TutorGrid Config
//!
//! Configuration types for the TutorGrid console, loaded from environment
//! variables (a `.env` file is read by the binary before these run):
//!
//! - [`api`]: Remote console API connection settings
//! - [`console`]: Hierarchy source and lifecycle limits
//!
//! # Example
//!
//! ```ignore
//! use tutorgrid_config::{ApiConfig, ConsoleConfig};
//!
//! let api = ApiConfig::from_env();
//! let console = ConsoleConfig::from_env();
//! ```

pub mod api;
pub mod console;

pub use api::ApiConfig;
pub use console::ConsoleConfig;

/// Parse an environment variable, falling back to `default` when unset or
/// malformed.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
