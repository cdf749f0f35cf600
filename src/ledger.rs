//! Local projection of the remote authority's records.
//!
//! Sessions and reschedule requests are stored inside their parent
//! allocation's record, so nothing can outlive the allocation it belongs to.
//! Records are only ever replaced with what the authority returned.

use tutorgrid_core::{ConsoleError, ConsoleResult};
use tutorgrid_models::{
    Allocation, AllocationId, RescheduleRequest, RescheduleRequestId, Session, SessionId,
    TrainerId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRecord {
    pub allocation: Allocation,
    pub sessions: Vec<Session>,
    pub reschedules: Vec<RescheduleRequest>,
    /// Set when a reload after a server-side change failed. Cleared by the
    /// next successful reload.
    pub sessions_stale: bool,
}

impl AllocationRecord {
    fn new(allocation: Allocation) -> Self {
        Self {
            allocation,
            sessions: Vec::new(),
            reschedules: Vec::new(),
            sessions_stale: false,
        }
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Requests for one session, oldest first.
    pub fn requests_for(&self, session_id: &SessionId) -> Vec<&RescheduleRequest> {
        self.reschedules
            .iter()
            .filter(|r| &r.session_id == session_id)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<AllocationRecord>,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.records.iter().map(|r| &r.allocation)
    }

    /// Swap in a fresh allocation list. Children of allocations that are
    /// still present are kept; the rest go with their parent.
    pub fn replace_allocations(&mut self, allocations: Vec<Allocation>) {
        let mut previous = std::mem::take(&mut self.records);
        self.records = allocations
            .into_iter()
            .map(|allocation| {
                match previous.iter().position(|r| r.allocation.id == allocation.id) {
                    Some(i) => {
                        let mut record = previous.swap_remove(i);
                        record.allocation = allocation;
                        record
                    }
                    None => AllocationRecord::new(allocation),
                }
            })
            .collect();
    }

    pub fn upsert_allocation(&mut self, allocation: Allocation) {
        match self.records.iter_mut().find(|r| r.allocation.id == allocation.id) {
            Some(record) => record.allocation = allocation,
            None => self.records.push(AllocationRecord::new(allocation)),
        }
    }

    pub fn record(&self, id: &AllocationId) -> ConsoleResult<&AllocationRecord> {
        self.records
            .iter()
            .find(|r| &r.allocation.id == id)
            .ok_or_else(|| ConsoleError::not_found("allocation", id))
    }

    fn record_mut(&mut self, id: &AllocationId) -> ConsoleResult<&mut AllocationRecord> {
        self.records
            .iter_mut()
            .find(|r| &r.allocation.id == id)
            .ok_or_else(|| ConsoleError::not_found("allocation", id))
    }

    pub fn allocation(&self, id: &AllocationId) -> ConsoleResult<&Allocation> {
        self.record(id).map(|r| &r.allocation)
    }

    /// The session and the record that owns it.
    pub fn session(&self, id: &SessionId) -> ConsoleResult<(&AllocationRecord, &Session)> {
        self.records
            .iter()
            .find_map(|r| r.session(id).map(|s| (r, s)))
            .ok_or_else(|| ConsoleError::not_found("session", id))
    }

    pub fn reschedule(
        &self,
        id: &RescheduleRequestId,
    ) -> ConsoleResult<(&AllocationRecord, &RescheduleRequest)> {
        self.records
            .iter()
            .find_map(|r| r.reschedules.iter().find(|q| &q.id == id).map(|q| (r, q)))
            .ok_or_else(|| ConsoleError::not_found("reschedule request", id))
    }

    pub fn replace_sessions(
        &mut self,
        allocation_id: &AllocationId,
        sessions: Vec<Session>,
        reschedules: Vec<RescheduleRequest>,
    ) -> ConsoleResult<()> {
        let record = self.record_mut(allocation_id)?;
        record.sessions = sessions;
        record.reschedules = reschedules;
        record.sessions_stale = false;
        Ok(())
    }

    pub fn mark_sessions_stale(&mut self, allocation_id: &AllocationId) -> ConsoleResult<()> {
        self.record_mut(allocation_id)?.sessions_stale = true;
        Ok(())
    }

    /// Store a session under its allocation. Unknown parents are refused.
    pub fn upsert_session(&mut self, session: Session) -> ConsoleResult<()> {
        let record = self.record_mut(&session.allocation_id)?;
        match record.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => record.sessions.push(session),
        }
        Ok(())
    }

    pub fn upsert_reschedule(&mut self, request: RescheduleRequest) -> ConsoleResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.session(&request.session_id).is_some())
            .ok_or_else(|| ConsoleError::not_found("session", &request.session_id))?;
        match record.reschedules.iter_mut().find(|q| q.id == request.id) {
            Some(existing) => *existing = request,
            None => record.reschedules.push(request),
        }
        Ok(())
    }

    /// Sessions of the allocations `include` accepts, paired with their
    /// allocation's trainer. Sessions of allocations without a trainer are
    /// skipped.
    pub fn sessions_by_trainer(
        &self,
        include: impl Fn(&Allocation) -> bool,
    ) -> Vec<(&TrainerId, &Session)> {
        self.records
            .iter()
            .filter(|r| include(&r.allocation))
            .filter_map(|r| r.allocation.trainer_id().map(|t| (t, &r.sessions)))
            .flat_map(|(t, sessions)| sessions.iter().map(move |s| (t, s)))
            .collect()
    }

    pub fn sessions_of_trainer<'a>(&'a self, trainer: &'a TrainerId) -> impl Iterator<Item = &'a Session> {
        self.records
            .iter()
            .filter(move |r| r.allocation.trainer_id() == Some(trainer))
            .flat_map(|r| r.sessions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use tutorgrid_models::{
        AllocationStatus, AssignmentMethod, CourseId, RegionId, ScheduleMode, SessionStatus,
        StudentId, TrainerAssignment, VerificationStatus,
    };

    fn allocation(id: &str, trainer: Option<&str>) -> Allocation {
        Allocation {
            id: AllocationId::new(id),
            student_id: StudentId::new("stu-1"),
            trainer: trainer
                .map(|t| TrainerAssignment::Assigned(TrainerId::new(t)))
                .unwrap_or(TrainerAssignment::Unassigned),
            course_id: CourseId::new("math"),
            status: AllocationStatus::Active,
            method: AssignmentMethod::Manual,
            requested_by: "admin-1".into(),
            requested_at: Utc::now(),
            allocated_by: None,
            allocated_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            schedule_mode: ScheduleMode::Weekdays,
            notes: None,
            region_id: RegionId::new("MAN-01"),
        }
    }

    fn session(id: &str, allocation_id: &str) -> Session {
        Session {
            id: SessionId::new(id),
            allocation_id: AllocationId::new(allocation_id),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration: 60,
            status: SessionStatus::Scheduled,
            gps_status: VerificationStatus::Pending,
            face_status: VerificationStatus::Pending,
        }
    }

    #[test]
    fn test_sessions_need_a_parent() {
        let mut ledger = Ledger::default();
        let err = ledger.upsert_session(session("s-1", "al-404")).unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound { entity: "allocation", .. }));
    }

    #[test]
    fn test_replace_keeps_children_of_survivors() {
        let mut ledger = Ledger::default();
        ledger.upsert_allocation(allocation("al-1", Some("tr-1")));
        ledger.upsert_allocation(allocation("al-2", Some("tr-1")));
        ledger.upsert_session(session("s-1", "al-1")).unwrap();
        ledger.upsert_session(session("s-2", "al-2")).unwrap();

        ledger.replace_allocations(vec![allocation("al-1", Some("tr-2"))]);

        assert_eq!(ledger.len(), 1);
        let (record, _) = ledger.session(&SessionId::new("s-1")).unwrap();
        assert_eq!(record.allocation.trainer_id().unwrap().as_str(), "tr-2");
        assert!(ledger.session(&SessionId::new("s-2")).is_err());
    }

    #[test]
    fn test_sessions_by_trainer_skips_unassigned() {
        let mut ledger = Ledger::default();
        ledger.upsert_allocation(allocation("al-1", Some("tr-1")));
        let mut unassigned = allocation("al-2", None);
        unassigned.status = AllocationStatus::Pending;
        ledger.upsert_allocation(unassigned);
        ledger.upsert_allocation(allocation("al-3", Some("tr-2")));
        ledger.upsert_session(session("s-1", "al-1")).unwrap();
        ledger.upsert_session(session("s-2", "al-2")).unwrap();
        ledger.upsert_session(session("s-3", "al-3")).unwrap();

        let pairs = ledger.sessions_by_trainer(|_| true);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.id.as_str(), "s-1");

        let only_first = ledger.sessions_by_trainer(|a| a.id.as_str() == "al-1");
        assert_eq!(only_first.len(), 1);
        assert_eq!(ledger.sessions_of_trainer(&TrainerId::new("tr-1")).count(), 1);
    }
}
