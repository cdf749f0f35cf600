//! Console error taxonomy.
//!
//! Every hierarchy, scope, allocation, and session operation reports failure
//! through [`ConsoleError`]. Authorization failures (`OutOfScope`,
//! `PermissionDenied`) and state-machine violations (`InvalidTransition`,
//! `AlreadyVerified`) are raised before any remote call is made.
//! `RemoteFailure` is the only recoverable variant.

use validator::ValidationErrors;

/// Result alias used across the console crates.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// The requested state change is not allowed from the current status.
    #[error("Cannot {action} {entity} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A verification channel was already recorded for the session.
    #[error("Session {session} already has a {channel} verification")]
    AlreadyVerified { session: String, channel: String },

    /// The admin attempted to act on an entity outside their region subtree.
    #[error("Region {region} is outside the admin's scope")]
    OutOfScope { region: String },

    #[error("Missing required permission: {0}")]
    PermissionDenied(String),

    /// Approval needs a trainer and none was assigned or supplied.
    #[error("Allocation {0} has no trainer to approve with")]
    UnresolvableTrainer(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid region hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The remote authority returned a non-success envelope or was unreachable.
    #[error("Remote request failed: {0}")]
    RemoteFailure(String),

    /// A response arrived after the console was torn down and was dropped.
    #[error("Response discarded after console teardown")]
    Stale,
}

impl ConsoleError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        action: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            action,
        }
    }

    pub fn out_of_scope(region: impl ToString) -> Self {
        Self::OutOfScope {
            region: region.to_string(),
        }
    }

    pub fn remote<E: ToString>(err: E) -> Self {
        Self::RemoteFailure(err.to_string())
    }

    /// Only remote failures may succeed on a second attempt. Everything else is
    /// a blocked action that must be surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteFailure(_))
    }

    /// Authorization failures, as opposed to state or transport errors.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::OutOfScope { .. } | Self::PermissionDenied(_))
    }
}

impl From<ValidationErrors> for ConsoleError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self::Validation(message)
    }
}
