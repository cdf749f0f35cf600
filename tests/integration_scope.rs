mod common;

use tutorgrid::allocations::AllocationTab;
use tutorgrid::hierarchy::descendants_by_type;
use tutorgrid::scope::{
    self, AccessibleRegions, Action, Route, accessible_region_ids, can_access_route,
    filter_levels, invite_levels, is_in_scope, is_leaf_node_admin, visible_admins,
};
use tutorgrid_core::{ConsoleError, permissions};
use tutorgrid_models::{AllocationStatus, RegionType, role_codes};

// ============ Levels ============

#[test]
fn test_mandal_admin_has_no_lower_levels() {
    let hierarchy = common::hierarchy();
    let admin = common::mandal_admin("MA-01");
    let node = hierarchy.find_node("MA-01").unwrap();

    let own = descendants_by_type(node, RegionType::Mandal);
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id.as_str(), "MA-01");
    assert!(is_leaf_node_admin(&hierarchy, &admin));
    assert!(filter_levels(&hierarchy, &admin).is_empty());
    assert_eq!(invite_levels(&hierarchy, &admin), vec![RegionType::Mandal]);
}

#[test]
fn test_constituency_admin_levels() {
    let hierarchy = common::hierarchy();
    let admin = common::constituency_admin("CO-01");

    assert!(!is_leaf_node_admin(&hierarchy, &admin));
    assert_eq!(filter_levels(&hierarchy, &admin), vec![RegionType::Mandal]);
    assert_eq!(
        invite_levels(&hierarchy, &admin),
        vec![RegionType::Constituency, RegionType::Mandal]
    );
}

#[test]
fn test_all_admin_sees_every_level() {
    let hierarchy = common::hierarchy();
    let admin = common::super_admin();

    assert_eq!(filter_levels(&hierarchy, &admin), RegionType::LEVELS.to_vec());
    assert!(!is_leaf_node_admin(&hierarchy, &admin));
}

// ============ Entity scope ============

#[test]
fn test_scope_is_reflexive_and_downward_only() {
    let hierarchy = common::hierarchy();
    let admin = common::constituency_admin("CO-01");

    assert!(is_in_scope(&hierarchy, &admin, "CO-01"));
    assert!(is_in_scope(&hierarchy, &admin, "MA-01"));
    assert!(is_in_scope(&hierarchy, &admin, "MA-02"));
    assert!(!is_in_scope(&hierarchy, &admin, "MA-03"));
    assert!(!is_in_scope(&hierarchy, &admin, "DV-01"));
    assert!(!is_in_scope(&hierarchy, &admin, "ST-01"));
}

#[test]
fn test_all_admin_sees_unknown_regions() {
    let hierarchy = common::hierarchy();
    let admin = common::super_admin();

    assert!(is_in_scope(&hierarchy, &admin, "MA-04"));
    assert!(is_in_scope(&hierarchy, &admin, "NOT-IN-TREE"));
    assert_eq!(accessible_region_ids(&hierarchy, &admin), AccessibleRegions::Unrestricted);
}

#[test]
fn test_unknown_admin_node_fails_closed() {
    let hierarchy = common::hierarchy();
    let admin = common::mandal_admin("MA-GONE");

    assert!(!is_in_scope(&hierarchy, &admin, "MA-GONE"));
    assert!(!is_in_scope(&hierarchy, &admin, "MA-01"));
    assert!(filter_levels(&hierarchy, &admin).is_empty());

    let err = scope::ensure_in_scope(&hierarchy, &admin, "MA-01").unwrap_err();
    assert_eq!(err, ConsoleError::OutOfScope { region: "MA-01".into() });
}

#[test]
fn test_accessible_regions_for_division() {
    let hierarchy = common::hierarchy();
    let admin = common::admin("DV-02", &[role_codes::DIVISION_ADMIN], &[]);

    let regions = accessible_region_ids(&hierarchy, &admin);
    assert!(regions.contains("DV-02"));
    assert!(regions.contains("CO-03"));
    assert!(regions.contains("MA-04"));
    assert!(!regions.contains("MA-01"));
}

// ============ Visible admins ============

#[test]
fn test_visible_admins_strictly_below() {
    let hierarchy = common::hierarchy();
    let viewer = common::constituency_admin("CO-01");
    let admins = vec![
        viewer.clone(),
        common::constituency_admin("CO-01"),
        common::mandal_admin("MA-01"),
        common::mandal_admin("MA-03"),
        common::admin("DI-01", &[role_codes::DISTRICT_ADMIN], &[]),
        common::super_admin(),
    ];

    let visible = visible_admins(&hierarchy, &viewer, &admins);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].region_id.to_string(), "MA-01");
}

#[test]
fn test_all_viewer_sees_scoped_admins_only() {
    let hierarchy = common::hierarchy();
    let viewer = common::super_admin();
    let admins = vec![
        viewer.clone(),
        common::super_admin(),
        common::mandal_admin("MA-04"),
        common::admin("ST-01", &[role_codes::STATE_ADMIN], &[]),
    ];

    let visible = visible_admins(&hierarchy, &viewer, &admins);
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|a| !a.region_id.is_all()));
}

// ============ Routes and actions ============

#[test]
fn test_permissions_decide_routes_when_present() {
    let admin = common::admin(
        "MA-01",
        &[role_codes::MANDAL_ADMIN],
        &[permissions::REPORTS_VIEW],
    );

    assert!(can_access_route(&admin, Route::Dashboard));
    assert!(can_access_route(&admin, Route::Reports));
    // The mandal allow-list would grant this, but the permission set wins.
    assert!(!can_access_route(&admin, Route::Students));
}

#[test]
fn test_role_fallback_without_permissions() {
    let mandal = common::admin("MA-01", &[role_codes::MANDAL_ADMIN], &[]);
    assert!(can_access_route(&mandal, Route::Allocations));
    assert!(!can_access_route(&mandal, Route::AutoAssign));
    assert!(!can_access_route(&mandal, Route::Admins));

    let coordinator = common::admin("MA-01", &[role_codes::COORDINATOR], &[]);
    assert_eq!(
        scope::accessible_routes(&coordinator),
        vec![Route::Dashboard, Route::Sessions, Route::Reschedules]
    );

    let nobody = common::admin("MA-01", &["janitor"], &[]);
    assert!(scope::accessible_routes(&nobody).is_empty());
}

#[test]
fn test_super_admin_bypass() {
    let admin = common::super_admin();
    assert!(scope::is_super_admin(&admin));
    assert_eq!(scope::accessible_routes(&admin).len(), Route::ALL.len());
    assert!(scope::can_perform(&admin, Action::ResolveReschedule));

    let mut labelled = common::admin("ST-01", &[], &[]);
    labelled.role_label = Some("Super Admin".to_string());
    assert!(scope::is_super_admin(&labelled));
}

#[test]
fn test_missing_permission_is_named() {
    let admin = common::admin("MA-01", &[role_codes::MANDAL_ADMIN], &[permissions::ALLOCATIONS_READ]);
    let err = scope::ensure_can_perform(&admin, Action::ApproveAllocation).unwrap_err();
    assert_eq!(err, ConsoleError::PermissionDenied(permissions::ALLOCATIONS_APPROVE.into()));
}

#[test]
fn test_route_from_path() {
    assert_eq!(Route::from_path("/allocations/auto-assign/"), Some(Route::AutoAssign));
    assert_eq!(Route::from_path("/nope"), None);
}

// ============ Console listings ============

#[tokio::test]
async fn test_console_lists_only_in_scope_records() {
    let remote = common::remote().await;
    remote
        .insert_allocation(common::allocation("ALC-1", "STU-1", "MA-01", None, AllocationStatus::Pending))
        .await;
    remote
        .insert_allocation(common::allocation("ALC-2", "STU-2", "MA-02", Some("TRN-2"), AllocationStatus::Active))
        .await;
    remote
        .insert_allocation(common::allocation("ALC-3", "STU-3", "MA-04", Some("TRN-3"), AllocationStatus::Active))
        .await;

    let console = common::console(common::mandal_admin("MA-01"), &remote).await;
    let ids: Vec<&str> = console.allocations(None).iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ALC-1"]);
    assert_eq!(console.students().len(), 1);
    assert_eq!(console.trainers().len(), 1);

    let wider = common::console(common::constituency_admin("CO-01"), &remote).await;
    assert_eq!(wider.allocations(None).len(), 2);
    assert_eq!(wider.allocations(Some(AllocationTab::Active)).len(), 1);
    assert_eq!(wider.allocations(Some(AllocationTab::PendingManual)).len(), 1);

    let everyone = common::console(common::super_admin(), &remote).await;
    assert_eq!(everyone.allocations(None).len(), 3);
}

#[tokio::test]
async fn test_console_lookup_out_of_scope() {
    let remote = common::remote().await;
    remote
        .insert_allocation(common::allocation("ALC-9", "STU-3", "MA-04", None, AllocationStatus::Pending))
        .await;

    let console = common::console(common::mandal_admin("MA-01"), &remote).await;
    assert!(matches!(
        console.allocation(&"ALC-9".into()),
        Err(ConsoleError::OutOfScope { .. })
    ));
    assert!(matches!(
        console.allocation(&"ALC-404".into()),
        Err(ConsoleError::NotFound { .. })
    ));
}
