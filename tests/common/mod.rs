#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;

use tutorgrid::hierarchy::Hierarchy;
use tutorgrid::{Console, InMemoryRemote, RemoteApi};
use tutorgrid_config::ConsoleConfig;
use tutorgrid_core::permissions;
use tutorgrid_models::{
    Admin, AdminId, AdminRegion, Allocation, AllocationId, AllocationStatus, AssignmentMethod,
    CourseId, RegionNode, RegionType, ScheduleMode, Session, SessionId, SessionStatus, Student,
    StudentId, Trainer, TrainerAssignment, TrainerId, VerificationStatus, role_codes,
};

pub const COURSE: &str = "CRS-MATH";

/// ST-01
/// └── DI-01
///     ├── DV-01
///     │   ├── CO-01 ── MA-01, MA-02
///     │   └── CO-02 ── MA-03
///     └── DV-02
///         └── CO-03 ── MA-04
pub fn region_roots() -> Vec<RegionNode> {
    vec![
        RegionNode::new("ST-01", "Telangana", RegionType::State).with_child(
            RegionNode::new("DI-01", "Hyderabad", RegionType::District)
                .with_child(
                    RegionNode::new("DV-01", "Secunderabad", RegionType::Division)
                        .with_child(
                            RegionNode::new("CO-01", "Sanathnagar", RegionType::Constituency)
                                .with_child(RegionNode::new("MA-01", "Ameerpet", RegionType::Mandal))
                                .with_child(RegionNode::new("MA-02", "Begumpet", RegionType::Mandal)),
                        )
                        .with_child(
                            RegionNode::new("CO-02", "Musheerabad", RegionType::Constituency)
                                .with_child(RegionNode::new("MA-03", "Bholakpur", RegionType::Mandal)),
                        ),
                )
                .with_child(
                    RegionNode::new("DV-02", "Charminar", RegionType::Division).with_child(
                        RegionNode::new("CO-03", "Yakutpura", RegionType::Constituency)
                            .with_child(RegionNode::new("MA-04", "Saidabad", RegionType::Mandal)),
                    ),
                ),
        ),
    ]
}

pub fn hierarchy() -> Hierarchy {
    Hierarchy::from_roots(region_roots()).unwrap()
}

/// Every permission a console operator can act with.
pub fn operator_permissions() -> Vec<&'static str> {
    vec![
        permissions::ALLOCATIONS_READ,
        permissions::ALLOCATIONS_CREATE,
        permissions::ALLOCATIONS_APPROVE,
        permissions::ALLOCATIONS_REJECT,
        permissions::ALLOCATIONS_REALLOCATE,
        permissions::ALLOCATIONS_CANCEL,
        permissions::ALLOCATIONS_COMPLETE,
        permissions::ALLOCATIONS_AUTO_ASSIGN,
        permissions::SESSIONS_READ,
        permissions::SESSIONS_SCHEDULE,
        permissions::SESSIONS_VERIFY,
        permissions::RESCHEDULES_RESOLVE,
    ]
}

pub fn admin(region: &str, roles: &[&str], permissions: &[&str]) -> Admin {
    Admin {
        id: AdminId::generate(),
        email: SafeEmail().fake(),
        name: Name().fake(),
        region_id: AdminRegion::from(region),
        role_codes: roles.iter().map(|r| r.to_string()).collect(),
        role_label: None,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn super_admin() -> Admin {
    admin("ALL", &[role_codes::SUPER_ADMIN], &[])
}

pub fn mandal_admin(mandal: &str) -> Admin {
    admin(mandal, &[role_codes::MANDAL_ADMIN], &operator_permissions())
}

pub fn constituency_admin(constituency: &str) -> Admin {
    admin(constituency, &[role_codes::CONSTITUENCY_ADMIN], &operator_permissions())
}

pub fn student(id: &str, region: &str) -> Student {
    Student {
        id: StudentId::new(id),
        name: Name().fake(),
        region_id: region.into(),
        course_ids: vec![CourseId::new(COURSE)],
    }
}

pub fn trainer(id: &str, region: &str) -> Trainer {
    Trainer {
        id: TrainerId::new(id),
        name: Name().fake(),
        region_id: region.into(),
        specialties: vec![COURSE.to_string()],
        active: true,
    }
}

pub fn allocation(
    id: &str,
    student: &str,
    region: &str,
    trainer: Option<&str>,
    status: AllocationStatus,
) -> Allocation {
    Allocation {
        id: AllocationId::new(id),
        student_id: StudentId::new(student),
        trainer: trainer
            .map(|t| TrainerAssignment::Assigned(TrainerId::new(t)))
            .unwrap_or(TrainerAssignment::Unassigned),
        course_id: CourseId::new(COURSE),
        status,
        method: AssignmentMethod::Manual,
        requested_by: "ADM-SEED".to_string(),
        requested_at: Utc::now(),
        allocated_by: status.is_live().then(|| "ADM-SEED".to_string()),
        allocated_at: status.is_live().then(Utc::now),
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        schedule_mode: ScheduleMode::Weekdays,
        notes: None,
        region_id: region.into(),
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

pub fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

pub fn session(id: &str, allocation: &str, day: u32, hour: u32) -> Session {
    Session {
        id: SessionId::new(id),
        allocation_id: AllocationId::new(allocation),
        scheduled_date: date(day),
        scheduled_time: time(hour),
        duration: 60,
        status: SessionStatus::Scheduled,
        gps_status: VerificationStatus::Pending,
        face_status: VerificationStatus::Pending,
    }
}

/// An authority with students and trainers in MA-01, MA-02 and MA-04.
pub async fn remote() -> Arc<InMemoryRemote> {
    let remote = InMemoryRemote::new(region_roots());
    for (n, region) in ["MA-01", "MA-02", "MA-04"].iter().enumerate() {
        remote.add_student(student(&format!("STU-{}", n + 1), region)).await;
        remote.add_trainer(trainer(&format!("TRN-{}", n + 1), region)).await;
    }
    Arc::new(remote)
}

/// Connect `admin` to `remote` and load every list.
pub async fn console(admin: Admin, remote: &Arc<InMemoryRemote>) -> Console {
    let remote: Arc<dyn RemoteApi> = remote.clone();
    let mut console = Console::connect(admin, remote, ConsoleConfig::default())
        .await
        .unwrap();
    console.refresh().await.unwrap();
    console
}
