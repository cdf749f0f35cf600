//! Offline mode: a seeded in-process authority.
//!
//! Ids are deterministic so commands can reference them across runs; names
//! are generated. Nothing persists between invocations.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use fake::Fake;
use fake::faker::name::en::Name;
use tracing::info;

use tutorgrid::InMemoryRemote;
use tutorgrid_models::{
    Allocation, AllocationId, AllocationStatus, AssignmentCriteria, AssignmentMethod, AttemptId,
    AttemptStatus, AutoAssignmentAttempt, CourseId, RegionNode, RegionType, ScheduleMode,
    Session, SessionId, SessionStatus, Student, StudentId, Trainer, TrainerAssignment, TrainerId,
    VerificationStatus,
};

pub const COURSES: [&str; 3] = ["CRS-MATH", "CRS-SCI", "CRS-ENG"];

/// A small two-constituency state, used when no hierarchy file is configured.
pub fn demo_hierarchy() -> Vec<RegionNode> {
    vec![
        RegionNode::new("ST-01", "Telangana", RegionType::State).with_child(
            RegionNode::new("DI-01", "Hyderabad", RegionType::District).with_child(
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
            ),
        ),
    ]
}

fn mandal_ids(nodes: &[RegionNode], out: &mut Vec<String>) {
    for node in nodes {
        if node.region_type == RegionType::Mandal {
            out.push(node.id.to_string());
        }
        mandal_ids(&node.children, out);
    }
}

fn session(id: &str, allocation: &str, date: NaiveDate, time: NaiveTime) -> Session {
    Session {
        id: SessionId::new(id),
        allocation_id: AllocationId::new(allocation),
        scheduled_date: date,
        scheduled_time: time,
        duration: 60,
        status: SessionStatus::Scheduled,
        gps_status: VerificationStatus::Pending,
        face_status: VerificationStatus::Pending,
    }
}

fn allocation(
    id: &str,
    student: &str,
    trainer: TrainerAssignment,
    status: AllocationStatus,
    method: AssignmentMethod,
    region: &str,
) -> Allocation {
    let requested_at = Utc::now() - Duration::days(7);
    let live = status.is_live();
    Allocation {
        id: AllocationId::new(id),
        student_id: StudentId::new(student),
        trainer,
        course_id: CourseId::new(COURSES[0]),
        status,
        method,
        requested_by: "ADM-SEED".to_string(),
        requested_at,
        allocated_by: live.then(|| "ADM-SEED".to_string()),
        allocated_at: live.then(|| requested_at + Duration::days(1)),
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        schedule_mode: ScheduleMode::Weekdays,
        notes: None,
        region_id: region.into(),
    }
}

/// Build an authority over `hierarchy` with three students and two trainers
/// per mandal, plus a handful of allocations in every tab. The first two
/// mandals also get sessions, including one double-booked slot.
pub async fn seed(hierarchy: Vec<RegionNode>) -> InMemoryRemote {
    let mut mandals = Vec::new();
    mandal_ids(&hierarchy, &mut mandals);
    let remote = InMemoryRemote::new(hierarchy);

    for mandal in &mandals {
        for n in 1..=3 {
            remote
                .add_student(Student {
                    id: StudentId::new(format!("STU-{}-{}", mandal, n)),
                    name: Name().fake(),
                    region_id: mandal.as_str().into(),
                    course_ids: vec![CourseId::new(COURSES[n % COURSES.len()])],
                })
                .await;
        }
        for n in 1..=2 {
            remote
                .add_trainer(Trainer {
                    id: TrainerId::new(format!("TRN-{}-{}", mandal, n)),
                    name: Name().fake(),
                    region_id: mandal.as_str().into(),
                    specialties: vec![COURSES[0].to_string()],
                    active: true,
                })
                .await;
        }
    }

    let Some(first) = mandals.first().map(String::as_str) else {
        return remote;
    };
    let second = mandals.get(1).map(String::as_str).unwrap_or(first);
    let trainer = |mandal: &str, n: u8| TrainerAssignment::Assigned(TrainerId::new(format!("TRN-{}-{}", mandal, n)));
    let student = |mandal: &str, n: u8| format!("STU-{}-{}", mandal, n);

    let seeded = [
        allocation("ALC-001", &student(first, 1), TrainerAssignment::Unassigned, AllocationStatus::Pending, AssignmentMethod::Manual, first),
        allocation("ALC-002", &student(first, 2), trainer(first, 2), AllocationStatus::Pending, AssignmentMethod::Manual, first),
        allocation("ALC-003", &student(first, 3), trainer(first, 1), AllocationStatus::Active, AssignmentMethod::Manual, first),
        allocation("ALC-004", &student(second, 1), trainer(first, 1), AllocationStatus::Approved, AssignmentMethod::Manual, second),
        allocation("ALC-005", &student(second, 2), TrainerAssignment::PendingAutoAssign, AllocationStatus::Pending, AssignmentMethod::Auto, second),
    ];
    for a in seeded {
        remote.insert_allocation(a).await;
    }

    let monday = Utc::now().date_naive() + Duration::days(7);
    let four_pm = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default();
    let five_pm = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default();
    remote.insert_session(session("SES-001", "ALC-003", monday, four_pm)).await;
    remote.insert_session(session("SES-002", "ALC-003", monday + Duration::days(2), four_pm)).await;
    remote.insert_session(session("SES-003", "ALC-004", monday, four_pm)).await;
    remote.insert_session(session("SES-004", "ALC-004", monday, five_pm)).await;

    remote
        .insert_attempt(AutoAssignmentAttempt {
            id: AttemptId::new("ATT-001"),
            student_id: StudentId::new(student(second, 2)),
            course_id: CourseId::new(COURSES[0]),
            method: AssignmentMethod::Auto,
            status: AttemptStatus::Failed,
            retry_count: 1,
            criteria: AssignmentCriteria::default(),
            failure_reason: Some("no trainer within 10km".to_string()),
            last_attempt_at: Some(Utc::now() - Duration::days(1)),
        })
        .await;

    info!(mandals = mandals.len(), "Seeded offline authority");
    remote
}
