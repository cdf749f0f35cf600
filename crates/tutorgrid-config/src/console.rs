//! Console behaviour configuration.
//!
//! # Environment Variables
//!
//! - `TUTORGRID_HIERARCHY_PATH`: JSON file holding the region forest; when unset
//!   the hierarchy is fetched from the remote API
//! - `TUTORGRID_MAX_AUTO_ASSIGN_RETRIES`: Retry ceiling per auto-assignment attempt (default: 5)
//! - `TUTORGRID_AUDIT_CAPACITY`: Audit entries kept in memory (default: 1000)

use std::env;
use std::path::PathBuf;

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub hierarchy_path: Option<PathBuf>,
    pub max_auto_assign_retries: u32,
    pub audit_capacity: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            hierarchy_path: None,
            max_auto_assign_retries: 5,
            audit_capacity: 1000,
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hierarchy_path: env::var("TUTORGRID_HIERARCHY_PATH").ok().map(PathBuf::from),
            max_auto_assign_retries: env_or(
                "TUTORGRID_MAX_AUTO_ASSIGN_RETRIES",
                defaults.max_auto_assign_retries,
            ),
            audit_capacity: env_or("TUTORGRID_AUDIT_CAPACITY", defaults.audit_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.hierarchy_path, None);
        assert_eq!(config.max_auto_assign_retries, 5);
        assert_eq!(config.audit_capacity, 1000);
    }

    #[test]
    fn test_config_clone() {
        let config = ConsoleConfig {
            hierarchy_path: Some(PathBuf::from("regions.json")),
            ..ConsoleConfig::default()
        };
        assert_eq!(config.clone(), config);
    }
}
