//! Hierarchical scope authorization.
//!
//! An admin is anchored at one region node (or `ALL`). Entity visibility is
//! decided by [`is_in_scope`] alone; route and action gating go through the
//! permission helpers, which carry the super-admin bypass exactly once.

use std::collections::HashSet;

use serde::{Serialize, Serializer};

use tutorgrid_core::{ConsoleError, ConsoleResult, permissions};
use tutorgrid_models::{Admin, AdminRegion, RegionId, RegionNode, RegionScoped, RegionType, RoleCode, role_codes};

use crate::hierarchy::{Hierarchy, descendant_ids};

// =============================================================================
// Levels
// =============================================================================

/// Position of `region_type` in State → Mandal order (State = 0).
pub fn level_index(region_type: RegionType) -> i32 {
    region_type.index() as i32
}

/// The node an admin is anchored at. `None` for `ALL` and for ids the
/// hierarchy does not know.
pub fn admin_node<'h>(hierarchy: &'h Hierarchy, admin: &Admin) -> Option<&'h RegionNode> {
    admin
        .region_id
        .node_id()
        .and_then(|id| hierarchy.find_node(id.as_str()))
}

/// `-1` for `ALL`, the admin node's level otherwise, `None` when the node
/// cannot be resolved.
pub fn admin_level_index(hierarchy: &Hierarchy, admin: &Admin) -> Option<i32> {
    match &admin.region_id {
        AdminRegion::All => Some(-1),
        AdminRegion::Node(_) => admin_node(hierarchy, admin).map(|n| level_index(n.region_type)),
    }
}

/// Levels offered when filtering subordinates: strictly below the admin.
pub fn filter_levels(hierarchy: &Hierarchy, admin: &Admin) -> Vec<RegionType> {
    match admin_level_index(hierarchy, admin) {
        Some(level) => RegionType::LEVELS
            .into_iter()
            .filter(|t| level_index(*t) > level)
            .collect(),
        None => Vec::new(),
    }
}

/// Levels an admin may invite at: their own level and below.
pub fn invite_levels(hierarchy: &Hierarchy, admin: &Admin) -> Vec<RegionType> {
    match admin_level_index(hierarchy, admin) {
        Some(level) => RegionType::LEVELS
            .into_iter()
            .filter(|t| level_index(*t) >= level)
            .collect(),
        None => Vec::new(),
    }
}

/// Mandal admins have no lower levels to manage.
pub fn is_leaf_node_admin(hierarchy: &Hierarchy, admin: &Admin) -> bool {
    admin_node(hierarchy, admin).is_some_and(|n| n.region_type.is_leaf_level())
}

// =============================================================================
// Entity scoping
// =============================================================================

/// The single entity-scoping primitive. Unresolvable admin nodes fail closed.
pub fn is_in_scope(hierarchy: &Hierarchy, admin: &Admin, region_id: &str) -> bool {
    match &admin.region_id {
        AdminRegion::All => true,
        AdminRegion::Node(_) => admin_node(hierarchy, admin)
            .is_some_and(|node| descendant_ids(node).contains(region_id)),
    }
}

pub fn ensure_in_scope(hierarchy: &Hierarchy, admin: &Admin, region_id: &str) -> ConsoleResult<()> {
    if is_in_scope(hierarchy, admin, region_id) {
        Ok(())
    } else {
        Err(ConsoleError::out_of_scope(region_id))
    }
}

/// Keep only the items whose region the admin can see, preserving order.
pub fn filter_in_scope<'a, T: RegionScoped>(
    hierarchy: &Hierarchy,
    admin: &Admin,
    items: impl IntoIterator<Item = &'a T>,
) -> Vec<&'a T>
where
    T: 'a,
{
    match accessible_region_ids(hierarchy, admin) {
        AccessibleRegions::Unrestricted => items.into_iter().collect(),
        AccessibleRegions::Only(ids) => items
            .into_iter()
            .filter(|item| ids.contains(item.region_id()))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessibleRegions {
    /// `ALL` admins see every region, including ones the hierarchy never listed.
    Unrestricted,
    Only(HashSet<RegionId>),
}

impl AccessibleRegions {
    pub fn contains(&self, region_id: &str) -> bool {
        match self {
            AccessibleRegions::Unrestricted => true,
            AccessibleRegions::Only(ids) => ids.contains(region_id),
        }
    }
}

pub fn accessible_region_ids(hierarchy: &Hierarchy, admin: &Admin) -> AccessibleRegions {
    match &admin.region_id {
        AdminRegion::All => AccessibleRegions::Unrestricted,
        AdminRegion::Node(_) => AccessibleRegions::Only(
            admin_node(hierarchy, admin)
                .map(descendant_ids)
                .unwrap_or_default(),
        ),
    }
}

/// Admins anchored strictly below the viewer. Peers, superiors and `ALL`
/// admins are hidden from scoped viewers.
pub fn visible_admins<'a>(
    hierarchy: &Hierarchy,
    viewer: &Admin,
    admins: &'a [Admin],
) -> Vec<&'a Admin> {
    let below: Option<HashSet<RegionId>> = match &viewer.region_id {
        AdminRegion::All => None,
        AdminRegion::Node(own) => {
            let mut ids = admin_node(hierarchy, viewer)
                .map(descendant_ids)
                .unwrap_or_default();
            ids.remove(own);
            Some(ids)
        }
    };

    admins
        .iter()
        .filter(|other| other.id != viewer.id)
        .filter(|other| match (&below, &other.region_id) {
            (None, AdminRegion::All) => false,
            (None, AdminRegion::Node(_)) => true,
            (Some(_), AdminRegion::All) => false,
            (Some(ids), AdminRegion::Node(id)) => ids.contains(id),
        })
        .collect()
}

// =============================================================================
// Permissions
// =============================================================================

/// Exact `super_admin` role code, or a case-insensitive role label match.
pub fn is_super_admin(admin: &Admin) -> bool {
    admin.role_codes.iter().any(|c| c == role_codes::SUPER_ADMIN)
        || admin.role_label.as_deref().is_some_and(|label| {
            let label = label.trim();
            label.eq_ignore_ascii_case(role_codes::SUPER_ADMIN)
                || label.eq_ignore_ascii_case("super admin")
        })
}

/// Check if the admin holds a specific permission
pub fn has_permission(admin: &Admin, permission: &str) -> bool {
    if is_super_admin(admin) {
        return true;
    }
    admin.permissions.iter().any(|p| p == permission)
}

/// Check if the admin holds any of the specified permissions
pub fn has_any_permission(admin: &Admin, permissions: &[&str]) -> bool {
    if is_super_admin(admin) {
        return true;
    }
    permissions.iter().any(|p| admin.permissions.iter().any(|held| held == p))
}

pub fn require_permission(admin: &Admin, permission: &str) -> ConsoleResult<()> {
    if has_permission(admin, permission) {
        Ok(())
    } else {
        Err(ConsoleError::PermissionDenied(permission.to_string()))
    }
}

// =============================================================================
// Routes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Students,
    Trainers,
    Allocations,
    AutoAssign,
    Sessions,
    Reschedules,
    Admins,
    Reports,
    AuditLog,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Dashboard,
        Route::Students,
        Route::Trainers,
        Route::Allocations,
        Route::AutoAssign,
        Route::Sessions,
        Route::Reschedules,
        Route::Admins,
        Route::Reports,
        Route::AuditLog,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/dashboard",
            Route::Students => "/students",
            Route::Trainers => "/trainers",
            Route::Allocations => "/allocations",
            Route::AutoAssign => "/allocations/auto-assign",
            Route::Sessions => "/sessions",
            Route::Reschedules => "/reschedules",
            Route::Admins => "/admins",
            Route::Reports => "/reports",
            Route::AuditLog => "/audit",
        }
    }

    /// Holding any one of these grants the route. Empty means open to every
    /// signed-in admin.
    pub fn required_permissions(self) -> &'static [&'static str] {
        match self {
            Route::Dashboard => &[],
            Route::Students => &[permissions::STUDENTS_READ],
            Route::Trainers => &[permissions::TRAINERS_READ],
            Route::Allocations => &[permissions::ALLOCATIONS_READ],
            Route::AutoAssign => &[permissions::ALLOCATIONS_AUTO_ASSIGN],
            Route::Sessions => &[permissions::SESSIONS_READ],
            Route::Reschedules => &[permissions::RESCHEDULES_RESOLVE, permissions::SESSIONS_READ],
            Route::Admins => &[permissions::ADMINS_READ, permissions::ADMINS_INVITE],
            Route::Reports => &[permissions::REPORTS_VIEW],
            Route::AuditLog => &[permissions::AUDIT_READ],
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Route::ALL.into_iter().find(|r| r.path() == path)
    }
}

/// Static allow-list used for admins whose record carries no permissions.
fn role_routes(role: RoleCode) -> &'static [Route] {
    match role {
        RoleCode::SuperAdmin => &Route::ALL,
        RoleCode::StateAdmin => &[
            Route::Dashboard,
            Route::Students,
            Route::Trainers,
            Route::Allocations,
            Route::AutoAssign,
            Route::Sessions,
            Route::Reschedules,
            Route::Admins,
            Route::Reports,
        ],
        RoleCode::DistrictAdmin | RoleCode::DivisionAdmin | RoleCode::ConstituencyAdmin => &[
            Route::Dashboard,
            Route::Students,
            Route::Trainers,
            Route::Allocations,
            Route::AutoAssign,
            Route::Sessions,
            Route::Reschedules,
            Route::Admins,
        ],
        RoleCode::MandalAdmin => &[
            Route::Dashboard,
            Route::Students,
            Route::Trainers,
            Route::Allocations,
            Route::Sessions,
            Route::Reschedules,
        ],
        RoleCode::Coordinator => &[Route::Dashboard, Route::Sessions, Route::Reschedules],
    }
}

/// Exactly one mechanism decides: the permission set when the admin carries
/// one, otherwise the allow-list of their highest-privilege role.
pub fn can_access_route(admin: &Admin, route: Route) -> bool {
    if !admin.permissions.is_empty() {
        let required = route.required_permissions();
        return required.is_empty() || has_any_permission(admin, required);
    }

    match admin.highest_role() {
        Some(role) => role_routes(role).contains(&route),
        None => false,
    }
}

pub fn accessible_routes(admin: &Admin) -> Vec<Route> {
    Route::ALL
        .into_iter()
        .filter(|r| can_access_route(admin, *r))
        .collect()
}

// =============================================================================
// Actions
// =============================================================================

/// Console buttons that mutate state, each gated by one permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateAllocation,
    ApproveAllocation,
    RejectAllocation,
    ReallocateAllocation,
    CancelAllocation,
    CompleteAllocation,
    RetryAutoAssign,
    ScheduleSession,
    MoveSession,
    CompleteSession,
    MarkSessionMissed,
    VerifySession,
    RequestReschedule,
    ResolveReschedule,
    InviteAdmin,
}

impl Action {
    pub fn permission(self) -> &'static str {
        match self {
            Action::CreateAllocation => permissions::ALLOCATIONS_CREATE,
            Action::ApproveAllocation => permissions::ALLOCATIONS_APPROVE,
            Action::RejectAllocation => permissions::ALLOCATIONS_REJECT,
            Action::ReallocateAllocation => permissions::ALLOCATIONS_REALLOCATE,
            Action::CancelAllocation => permissions::ALLOCATIONS_CANCEL,
            Action::CompleteAllocation => permissions::ALLOCATIONS_COMPLETE,
            Action::RetryAutoAssign => permissions::ALLOCATIONS_AUTO_ASSIGN,
            Action::ScheduleSession
            | Action::MoveSession
            | Action::CompleteSession
            | Action::MarkSessionMissed
            | Action::RequestReschedule => permissions::SESSIONS_SCHEDULE,
            Action::VerifySession => permissions::SESSIONS_VERIFY,
            Action::ResolveReschedule => permissions::RESCHEDULES_RESOLVE,
            Action::InviteAdmin => permissions::ADMINS_INVITE,
        }
    }

    /// Audit/metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateAllocation => "allocation.create",
            Action::ApproveAllocation => "allocation.approve",
            Action::RejectAllocation => "allocation.reject",
            Action::ReallocateAllocation => "allocation.reallocate",
            Action::CancelAllocation => "allocation.cancel",
            Action::CompleteAllocation => "allocation.complete",
            Action::RetryAutoAssign => "allocation.retry_auto_assign",
            Action::ScheduleSession => "session.schedule",
            Action::MoveSession => "session.move",
            Action::CompleteSession => "session.complete",
            Action::MarkSessionMissed => "session.mark_missed",
            Action::VerifySession => "session.verify",
            Action::RequestReschedule => "reschedule.request",
            Action::ResolveReschedule => "reschedule.resolve",
            Action::InviteAdmin => "admin.invite",
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn can_perform(admin: &Admin, action: Action) -> bool {
    has_permission(admin, action.permission())
}

/// `PermissionDenied` naming the missing permission code.
pub fn ensure_can_perform(admin: &Admin, action: Action) -> ConsoleResult<()> {
    require_permission(admin, action.permission())
}
