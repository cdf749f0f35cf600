//! Permission constants for the TutorGrid console.
//!
//! Admin records carry free-form permission arrays. These constants are the
//! closed set of codes the console understands; checks elsewhere must use them
//! instead of string literals.
//!
//! # Example
//!
//! ```ignore
//! use tutorgrid_core::permissions;
//!
//! if scope::has_permission(&admin, permissions::ALLOCATIONS_APPROVE) {
//!     // Render the approve button
//! }
//! ```

// =============================================================================
// Dashboard permissions
// =============================================================================

/// Permission to view the dashboard overview
pub const DASHBOARD_VIEW: &str = "dashboard:view";

// =============================================================================
// Students / trainers permissions
// =============================================================================

/// Permission to read students
pub const STUDENTS_READ: &str = "students:read";
/// Permission to update students
pub const STUDENTS_UPDATE: &str = "students:update";
/// Permission to read trainers
pub const TRAINERS_READ: &str = "trainers:read";
/// Permission to update trainers
pub const TRAINERS_UPDATE: &str = "trainers:update";

// =============================================================================
// Allocations permissions
// =============================================================================

/// Permission to read allocations
pub const ALLOCATIONS_READ: &str = "allocations:read";
/// Permission to request new allocations
pub const ALLOCATIONS_CREATE: &str = "allocations:create";
/// Permission to approve pending allocations
pub const ALLOCATIONS_APPROVE: &str = "allocations:approve";
/// Permission to reject pending allocations
pub const ALLOCATIONS_REJECT: &str = "allocations:reject";
/// Permission to swap the trainer on an allocation
pub const ALLOCATIONS_REALLOCATE: &str = "allocations:reallocate";
/// Permission to cancel allocations
pub const ALLOCATIONS_CANCEL: &str = "allocations:cancel";
/// Permission to mark allocations completed
pub const ALLOCATIONS_COMPLETE: &str = "allocations:complete";
/// Permission to retry the auto-assignment algorithm
pub const ALLOCATIONS_AUTO_ASSIGN: &str = "allocations:auto_assign";

// =============================================================================
// Sessions permissions
// =============================================================================

/// Permission to read sessions
pub const SESSIONS_READ: &str = "sessions:read";
/// Permission to schedule and move sessions
pub const SESSIONS_SCHEDULE: &str = "sessions:schedule";
/// Permission to record GPS / face verification outcomes
pub const SESSIONS_VERIFY: &str = "sessions:verify";
/// Permission to approve or reject reschedule requests
pub const RESCHEDULES_RESOLVE: &str = "reschedules:resolve";

// =============================================================================
// Admin management permissions
// =============================================================================

/// Permission to list subordinate admins
pub const ADMINS_READ: &str = "admins:read";
/// Permission to invite new admins
pub const ADMINS_INVITE: &str = "admins:invite";

// =============================================================================
// Reports / audit permissions
// =============================================================================

/// Permission to view reports
pub const REPORTS_VIEW: &str = "reports:view";
/// Permission to read the audit trail
pub const AUDIT_READ: &str = "audit:read";

/// Every permission code the console recognizes.
pub const ALL: &[&str] = &[
    DASHBOARD_VIEW,
    STUDENTS_READ,
    STUDENTS_UPDATE,
    TRAINERS_READ,
    TRAINERS_UPDATE,
    ALLOCATIONS_READ,
    ALLOCATIONS_CREATE,
    ALLOCATIONS_APPROVE,
    ALLOCATIONS_REJECT,
    ALLOCATIONS_REALLOCATE,
    ALLOCATIONS_CANCEL,
    ALLOCATIONS_COMPLETE,
    ALLOCATIONS_AUTO_ASSIGN,
    SESSIONS_READ,
    SESSIONS_SCHEDULE,
    SESSIONS_VERIFY,
    RESCHEDULES_RESOLVE,
    ADMINS_READ,
    ADMINS_INVITE,
    REPORTS_VIEW,
    AUDIT_READ,
];

/// Whether `code` is one of the known permission constants.
pub fn is_known(code: &str) -> bool {
    ALL.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let unique: HashSet<_> = ALL.iter().collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn test_codes_follow_resource_action_format() {
        for code in ALL {
            let parts: Vec<_> = code.split(':').collect();
            assert_eq!(parts.len(), 2, "{code} should be resource:action");
        }
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("allocations:approve"));
        assert!(!is_known("allocations:delete"));
    }
}
