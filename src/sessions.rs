//! Session and reschedule sub-lifecycle.
//!
//! Sessions hang off a live allocation. Verification is one-shot per channel,
//! reschedule requests resolve once, and calendar collisions for the same
//! trainer are reported as soft conflicts rather than refused.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use validator::Validate;

use tutorgrid_core::{ConsoleError, ConsoleResult};
use tutorgrid_models::{
    Allocation, RescheduleDecision, RescheduleRequest, RescheduleRequestDto,
    RescheduleRequestId, RescheduleStatus, ScheduleSessionDto, Session, SessionId,
    SessionStatus, TrainerId, VerificationChannel, VerificationOutcome, VerificationStatus,
};

use crate::allocations::Transition;

const SESSION: &str = "session";
const REQUEST: &str = "reschedule request";

/// New `Scheduled` session under a live (Approved/Active) allocation.
pub fn schedule(allocation: &Allocation, dto: ScheduleSessionDto) -> ConsoleResult<Session> {
    dto.validate()?;
    if !allocation.status.is_live() {
        return Err(ConsoleError::invalid_transition(
            "allocation",
            allocation.status,
            "schedule a session for",
        ));
    }

    Ok(Session {
        id: SessionId::generate(),
        allocation_id: allocation.id.clone(),
        scheduled_date: dto.scheduled_date,
        scheduled_time: dto.scheduled_time,
        duration: dto.duration,
        status: SessionStatus::Scheduled,
        gps_status: VerificationStatus::Pending,
        face_status: VerificationStatus::Pending,
    })
}

/// Record one verification channel. A channel that already holds an outcome
/// is never overwritten.
pub fn verify(
    session: &mut Session,
    channel: VerificationChannel,
    outcome: VerificationOutcome,
) -> ConsoleResult<()> {
    if session.verification(channel) != VerificationStatus::Pending {
        return Err(ConsoleError::AlreadyVerified {
            session: session.id.to_string(),
            channel: channel.to_string(),
        });
    }
    if session.status == SessionStatus::Cancelled {
        return Err(ConsoleError::invalid_transition(SESSION, session.status, "verify"));
    }

    *session.verification_mut(channel) = outcome.into();
    Ok(())
}

fn ensure_open(session: &Session, action: &'static str) -> ConsoleResult<()> {
    if session.status.is_closed() {
        return Err(ConsoleError::invalid_transition(SESSION, session.status, action));
    }
    Ok(())
}

pub fn request_reschedule(
    session: &Session,
    dto: RescheduleRequestDto,
) -> ConsoleResult<RescheduleRequest> {
    ensure_open(session, "reschedule")?;
    dto.validate()?;

    Ok(RescheduleRequest {
        id: RescheduleRequestId::generate(),
        session_id: session.id.clone(),
        requested_by: dto.requested_by,
        original_date: session.scheduled_date,
        original_time: session.scheduled_time,
        new_date: dto.new_date,
        new_time: dto.new_time,
        reason: dto.reason.trim().to_string(),
        status: RescheduleStatus::Pending,
        resolved_by: None,
        resolved_at: None,
    })
}

/// Approve moves the session in place; reject leaves it alone. Either way the
/// request is closed for good.
pub fn resolve_reschedule(
    request: &mut RescheduleRequest,
    session: &mut Session,
    decision: RescheduleDecision,
    actor: &str,
    now: DateTime<Utc>,
) -> ConsoleResult<()> {
    if request.is_resolved() {
        return Err(ConsoleError::invalid_transition(REQUEST, request.status, "resolve"));
    }
    if request.session_id != session.id {
        return Err(ConsoleError::not_found(SESSION, &request.session_id));
    }
    if decision == RescheduleDecision::Approved {
        ensure_open(session, "reschedule")?;
        session.scheduled_date = request.new_date;
        session.scheduled_time = request.new_time;
    }

    request.status = decision.into();
    request.resolved_by = Some(actor.to_string());
    request.resolved_at = Some(now);
    Ok(())
}

/// Direct calendar move, bypassing the request flow.
pub fn move_to(session: &mut Session, date: NaiveDate, time: NaiveTime) -> ConsoleResult<()> {
    ensure_open(session, "move")?;
    session.scheduled_date = date;
    session.scheduled_time = time;
    Ok(())
}

pub fn complete(session: &mut Session) -> ConsoleResult<Transition> {
    match session.status {
        SessionStatus::Completed => Ok(Transition::Unchanged),
        SessionStatus::Scheduled => {
            session.status = SessionStatus::Completed;
            Ok(Transition::Applied)
        }
        other => Err(ConsoleError::invalid_transition(SESSION, other, "complete")),
    }
}

pub fn mark_missed(session: &mut Session) -> ConsoleResult<Transition> {
    match session.status {
        SessionStatus::Missed => Ok(Transition::Unchanged),
        SessionStatus::Scheduled => {
            session.status = SessionStatus::Missed;
            Ok(Transition::Applied)
        }
        other => Err(ConsoleError::invalid_transition(SESSION, other, "mark missed")),
    }
}

/// Cancel every session that has not completed. Returns how many changed.
pub fn cascade_cancel<'a>(sessions: impl IntoIterator<Item = &'a mut Session>) -> usize {
    let mut changed = 0;
    for session in sessions {
        if !session.status.is_closed() {
            session.status = SessionStatus::Cancelled;
            changed += 1;
        }
    }
    changed
}

// =============================================================================
// Calendar conflicts
// =============================================================================

/// Two or more non-cancelled sessions of one trainer in the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftConflict {
    pub trainer_id: TrainerId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub session_ids: Vec<SessionId>,
}

/// Group sessions by (trainer, date, time) and report every slot holding more
/// than one. Ordered by trainer, then slot.
pub fn detect_conflicts<'a>(
    sessions: impl IntoIterator<Item = (&'a TrainerId, &'a Session)>,
) -> Vec<SoftConflict> {
    let mut slots: BTreeMap<(&TrainerId, NaiveDate, NaiveTime), Vec<SessionId>> = BTreeMap::new();
    for (trainer, session) in sessions {
        if session.status == SessionStatus::Cancelled {
            continue;
        }
        slots
            .entry((trainer, session.scheduled_date, session.scheduled_time))
            .or_default()
            .push(session.id.clone());
    }

    slots
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((trainer, date, time), session_ids)| SoftConflict {
            trainer_id: trainer.clone(),
            date,
            time,
            session_ids,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementKind {
    /// A pending request already asks for this slot; placing approves it.
    ApproveRequest(RescheduleRequestId),
    DirectMove,
}

/// What dropping a session onto a calendar slot would do. Nothing is applied
/// until the caller confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub kind: PlacementKind,
    pub conflicts: Vec<SoftConflict>,
}

impl PlacementPlan {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Plan a placement of `session` (taught by `trainer`) at `date`/`time`.
/// `trainer_sessions` are the other sessions of the same trainer.
pub fn plan_placement<'a>(
    session: &Session,
    trainer: &TrainerId,
    date: NaiveDate,
    time: NaiveTime,
    requests: &[RescheduleRequest],
    trainer_sessions: impl IntoIterator<Item = &'a Session>,
) -> ConsoleResult<PlacementPlan> {
    ensure_open(session, "place")?;

    let kind = requests
        .iter()
        .find(|r| {
            r.session_id == session.id
                && !r.is_resolved()
                && r.new_date == date
                && r.new_time == time
        })
        .map(|r| PlacementKind::ApproveRequest(r.id.clone()))
        .unwrap_or(PlacementKind::DirectMove);

    let mut moved = session.clone();
    moved.scheduled_date = date;
    moved.scheduled_time = time;

    let others: Vec<&Session> = trainer_sessions
        .into_iter()
        .filter(|s| s.id != session.id)
        .collect();
    let conflicts = detect_conflicts(
        others
            .into_iter()
            .chain(std::iter::once(&moved))
            .map(|s| (trainer, s)),
    )
    .into_iter()
    .filter(|c| c.session_ids.contains(&session.id))
    .collect();

    Ok(PlacementPlan {
        session_id: session.id.clone(),
        date,
        time,
        kind,
        conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorgrid_models::{
        AllocationStatus, CourseId, CreateAllocationDto, RegionId, RequestedBy, ScheduleMode,
        StudentId,
    };

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn live_allocation() -> Allocation {
        let mut a = crate::allocations::create(
            CreateAllocationDto {
                student_id: StudentId::new("stu-1"),
                trainer_id: Some(TrainerId::new("tr-1")),
                course_id: CourseId::new("math"),
                schedule_mode: ScheduleMode::Daily,
                notes: None,
            },
            RegionId::new("MAN-01"),
            "admin-1",
            Utc::now(),
        )
        .unwrap();
        a.status = AllocationStatus::Active;
        a
    }

    fn session_at(d: u32, h: u32) -> Session {
        schedule(
            &live_allocation(),
            ScheduleSessionDto {
                scheduled_date: date(d),
                scheduled_time: time(h),
                duration: 60,
            },
        )
        .unwrap()
    }

    fn reschedule_dto(d: u32, h: u32) -> RescheduleRequestDto {
        RescheduleRequestDto {
            requested_by: RequestedBy::Student,
            new_date: date(d),
            new_time: time(h),
            reason: "exam week".into(),
        }
    }

    #[test]
    fn test_schedule_needs_live_allocation() {
        let mut a = live_allocation();
        a.status = AllocationStatus::Pending;
        let dto = ScheduleSessionDto {
            scheduled_date: date(1),
            scheduled_time: time(9),
            duration: 60,
        };
        assert!(matches!(schedule(&a, dto), Err(ConsoleError::InvalidTransition { .. })));
    }

    #[test]
    fn test_schedule_validates_duration() {
        let dto = ScheduleSessionDto {
            scheduled_date: date(1),
            scheduled_time: time(9),
            duration: 5,
        };
        assert!(matches!(schedule(&live_allocation(), dto), Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_verify_is_one_shot() {
        let mut s = session_at(1, 9);
        verify(&mut s, VerificationChannel::Gps, VerificationOutcome::Failed).unwrap();
        let err = verify(&mut s, VerificationChannel::Gps, VerificationOutcome::Passed).unwrap_err();
        assert!(matches!(err, ConsoleError::AlreadyVerified { .. }));
        assert_eq!(s.gps_status, VerificationStatus::Failed);

        verify(&mut s, VerificationChannel::Face, VerificationOutcome::Passed).unwrap();
        assert_eq!(s.face_status, VerificationStatus::Passed);
        assert!(!s.is_fully_verified());
    }

    #[test]
    fn test_reschedule_approved_moves_session() {
        let mut s = session_at(1, 9);
        let mut req = request_reschedule(&s, reschedule_dto(2, 10)).unwrap();
        assert_eq!(req.original_date, date(1));

        resolve_reschedule(&mut req, &mut s, RescheduleDecision::Approved, "admin-1", Utc::now())
            .unwrap();
        assert_eq!(s.slot(), (date(2), time(10)));
        assert_eq!(req.status, RescheduleStatus::Approved);

        let err = resolve_reschedule(&mut req, &mut s, RescheduleDecision::Rejected, "admin-1", Utc::now())
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidTransition { .. }));
        assert_eq!(req.status, RescheduleStatus::Approved);
    }

    #[test]
    fn test_reschedule_rejected_leaves_session() {
        let mut s = session_at(1, 9);
        let mut req = request_reschedule(&s, reschedule_dto(2, 10)).unwrap();
        resolve_reschedule(&mut req, &mut s, RescheduleDecision::Rejected, "admin-1", Utc::now())
            .unwrap();
        assert_eq!(s.slot(), (date(1), time(9)));
        assert_eq!(req.resolved_by.as_deref(), Some("admin-1"));
    }

    #[test]
    fn test_no_reschedule_for_closed_sessions() {
        let mut s = session_at(1, 9);
        complete(&mut s).unwrap();
        assert!(request_reschedule(&s, reschedule_dto(2, 10)).is_err());
        assert!(move_to(&mut s, date(3), time(9)).is_err());
    }

    #[test]
    fn test_cascade_skips_completed() {
        let mut done = session_at(1, 9);
        complete(&mut done).unwrap();
        let mut sessions = vec![done, session_at(2, 9), session_at(3, 9)];
        assert_eq!(cascade_cancel(sessions.iter_mut()), 2);
        assert_eq!(sessions[0].status, SessionStatus::Completed);
        assert!(sessions[1..].iter().all(|s| s.status == SessionStatus::Cancelled));
    }

    #[test]
    fn test_missed_then_complete_is_invalid() {
        let mut s = session_at(1, 9);
        assert_eq!(mark_missed(&mut s).unwrap(), Transition::Applied);
        assert_eq!(mark_missed(&mut s).unwrap(), Transition::Unchanged);
        assert!(complete(&mut s).is_err());
    }

    #[test]
    fn test_detect_conflicts_groups_same_trainer_slot() {
        let t1 = TrainerId::new("tr-1");
        let t2 = TrainerId::new("tr-2");
        let a = session_at(1, 9);
        let b = session_at(1, 9);
        let c = session_at(1, 9);
        let mut cancelled = session_at(1, 9);
        cancelled.status = SessionStatus::Cancelled;

        let conflicts = detect_conflicts(vec![(&t1, &a), (&t1, &b), (&t2, &c), (&t1, &cancelled)]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].trainer_id, t1);
        assert_eq!(conflicts[0].session_ids, vec![a.id.clone(), b.id.clone()]);
    }

    #[test]
    fn test_plan_placement_prefers_pending_request() {
        let trainer = TrainerId::new("tr-1");
        let s = session_at(1, 9);
        let other = session_at(2, 10);
        let req = request_reschedule(&s, reschedule_dto(2, 10)).unwrap();

        let plan = plan_placement(&s, &trainer, date(2), time(10), &[req.clone()], [&other, &s]).unwrap();
        assert_eq!(plan.kind, PlacementKind::ApproveRequest(req.id));
        assert!(plan.has_conflicts());
        assert_eq!(plan.conflicts[0].session_ids.len(), 2);

        let free = plan_placement(&s, &trainer, date(4), time(8), &[], [&other]).unwrap();
        assert_eq!(free.kind, PlacementKind::DirectMove);
        assert!(!free.has_conflicts());
    }
}
