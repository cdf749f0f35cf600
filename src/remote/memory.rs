//! In-process remote authority.
//!
//! Holds the records a real backend would and applies the same lifecycle
//! functions to them, so the console can be exercised without a network. The
//! CLI's offline mode and the integration tests run against it.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use tutorgrid_config::ConsoleConfig;
use tutorgrid_core::{ConsoleError, ConsoleResult, PaginationMeta, PaginationParams};
use tutorgrid_models::{
    Allocation, AllocationFilterParams, AllocationId, AllocationStatus, ApproveAllocationDto,
    AssignmentCriteria, AttemptId, AttemptStatus, AutoAssignOutcome, AutoAssignmentAttempt,
    AssignmentMethod, CreateAllocationDto, MoveSessionDto, ReallocateDto, RegionNode,
    RejectAllocationDto, RescheduleRequest, RescheduleRequestDto, RescheduleRequestId,
    ResolveRescheduleDto, RetryAutoAssignDto, ScheduleSessionDto, Session, SessionId, Student,
    Trainer, TrainerId, VerifySessionDto,
};

use super::{Page, RemoteApi};
use crate::{allocations, sessions};

/// Actor recorded for actions taken through the in-memory authority.
const REMOTE_ACTOR: &str = "console";

#[derive(Debug, Default)]
struct Store {
    hierarchy: Vec<RegionNode>,
    students: Vec<Student>,
    trainers: Vec<Trainer>,
    allocations: Vec<Allocation>,
    sessions: Vec<Session>,
    reschedules: Vec<RescheduleRequest>,
    attempts: Vec<AutoAssignmentAttempt>,
    /// Injected outcomes, consumed one per request. `None` lets the request
    /// through.
    failures: VecDeque<Option<String>>,
}

impl Store {
    fn take_failure(&mut self) -> ConsoleResult<()> {
        match self.failures.pop_front() {
            Some(Some(message)) => Err(ConsoleError::RemoteFailure(message)),
            _ => Ok(()),
        }
    }

    fn allocation_mut(&mut self, id: &AllocationId) -> ConsoleResult<&mut Allocation> {
        self.allocations
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| ConsoleError::not_found("allocation", id))
    }

    fn session_mut(&mut self, id: &SessionId) -> ConsoleResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ConsoleError::not_found("session", id))
    }

    /// Run `apply` on a copy and commit it only on success.
    fn update_allocation(
        &mut self,
        id: &AllocationId,
        apply: impl FnOnce(&mut Allocation) -> ConsoleResult<allocations::Transition>,
    ) -> ConsoleResult<Allocation> {
        let current = self.allocation_mut(id)?;
        let mut next = current.clone();
        apply(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    fn update_session(
        &mut self,
        id: &SessionId,
        apply: impl FnOnce(&mut Session) -> ConsoleResult<()>,
    ) -> ConsoleResult<Session> {
        let current = self.session_mut(id)?;
        let mut next = current.clone();
        apply(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    fn find_trainer(&self, student: &Student, course: &str, criteria: &AssignmentCriteria) -> Option<TrainerId> {
        self.trainers
            .iter()
            .filter(|t| t.active && t.region_id == student.region_id)
            .find(|t| !criteria.specialty_match || t.specialties.iter().any(|s| s == course))
            .map(|t| t.id.clone())
    }
}

#[derive(Debug)]
pub struct InMemoryRemote {
    store: Mutex<Store>,
    latency: Option<Duration>,
    max_auto_assign_retries: u32,
}

impl InMemoryRemote {
    pub fn new(hierarchy: Vec<RegionNode>) -> Self {
        Self {
            store: Mutex::new(Store {
                hierarchy,
                ..Store::default()
            }),
            latency: None,
            max_auto_assign_retries: ConsoleConfig::default().max_auto_assign_retries,
        }
    }

    pub fn with_max_auto_assign_retries(mut self, max: u32) -> Self {
        self.max_auto_assign_retries = max;
        self
    }

    /// Delay every response, to model a slow network.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add_student(&self, student: Student) {
        self.store.lock().await.students.push(student);
    }

    pub async fn add_trainer(&self, trainer: Trainer) {
        self.store.lock().await.trainers.push(trainer);
    }

    /// Seed an allocation as-is, bypassing creation rules.
    pub async fn insert_allocation(&self, allocation: Allocation) {
        self.store.lock().await.allocations.push(allocation);
    }

    pub async fn insert_session(&self, session: Session) {
        self.store.lock().await.sessions.push(session);
    }

    pub async fn insert_attempt(&self, attempt: AutoAssignmentAttempt) {
        self.store.lock().await.attempts.push(attempt);
    }

    /// The next request fails with `RemoteFailure(message)` and changes nothing.
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.store.lock().await.failures.push_back(Some(message.into()));
    }

    /// Let `passes` requests through, then fail the one after them.
    pub async fn fail_after(&self, passes: usize, message: impl Into<String>) {
        let mut store = self.store.lock().await;
        store.failures.extend(std::iter::repeat_n(None, passes));
        store.failures.push_back(Some(message.into()));
    }

    pub async fn allocation(&self, id: &AllocationId) -> Option<Allocation> {
        let store = self.store.lock().await;
        store.allocations.iter().find(|a| &a.id == id).cloned()
    }

    pub async fn session(&self, id: &SessionId) -> Option<Session> {
        let store = self.store.lock().await;
        store.sessions.iter().find(|s| &s.id == id).cloned()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: &PaginationParams) -> Page<T> {
    let limit = page.limit();
    let offset = page.offset();
    let total = items.len() as i64;
    let slice: Vec<T> = items
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit as usize)
        .cloned()
        .collect();

    Page {
        items: slice,
        meta: Some(PaginationMeta {
            total,
            limit,
            offset: Some(offset),
            page: page.page,
            has_more: offset + limit < total,
        }),
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemote {
    async fn fetch_hierarchy(&self) -> ConsoleResult<Vec<RegionNode>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        Ok(store.hierarchy.clone())
    }

    async fn list_allocations(
        &self,
        filter: &AllocationFilterParams,
        page: &PaginationParams,
    ) -> ConsoleResult<Page<Allocation>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let matching: Vec<Allocation> = store
            .allocations
            .iter()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.method.is_none_or(|m| a.method == m))
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn create_allocation(&self, dto: &CreateAllocationDto) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let region_id = store
            .students
            .iter()
            .find(|s| s.id == dto.student_id)
            .map(|s| s.region_id.clone())
            .ok_or_else(|| ConsoleError::not_found("student", &dto.student_id))?;

        let allocation = allocations::create(dto.clone(), region_id, REMOTE_ACTOR, Utc::now())?;
        store.allocations.push(allocation.clone());
        debug!(allocation_id = %allocation.id, "Allocation created");
        Ok(allocation)
    }

    async fn approve_allocation(
        &self,
        id: &AllocationId,
        dto: &ApproveAllocationDto,
    ) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_allocation(id, |a| {
            allocations::approve(a, dto.trainer_id.clone(), REMOTE_ACTOR, Utc::now())
        })
    }

    async fn reject_allocation(
        &self,
        id: &AllocationId,
        dto: &RejectAllocationDto,
    ) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_allocation(id, |a| {
            allocations::reject(a, &dto.reason, REMOTE_ACTOR, Utc::now())
        })
    }

    async fn cancel_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let allocation = store.update_allocation(id, allocations::cancel)?;
        let cascaded = sessions::cascade_cancel(
            store.sessions.iter_mut().filter(|s| &s.allocation_id == id),
        );
        debug!(allocation_id = %id, cascaded, "Allocation cancelled");
        Ok(allocation)
    }

    async fn reallocate(&self, id: &AllocationId, dto: &ReallocateDto) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_allocation(id, |a| {
            allocations::reallocate(a, dto.new_trainer_id.clone(), &dto.reason)
        })
    }

    async fn complete_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_allocation(id, allocations::complete)
    }

    async fn retry_auto_assign(&self, dto: &RetryAutoAssignDto) -> ConsoleResult<AutoAssignOutcome> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let now = Utc::now();

        let student = store
            .students
            .iter()
            .find(|s| s.id == dto.student_id)
            .cloned()
            .ok_or_else(|| ConsoleError::not_found("student", &dto.student_id))?;

        let index = match store
            .attempts
            .iter()
            .position(|a| a.matches(&dto.student_id, &dto.course_id))
        {
            Some(i) => i,
            None => {
                store.attempts.push(AutoAssignmentAttempt {
                    id: AttemptId::generate(),
                    student_id: dto.student_id.clone(),
                    course_id: dto.course_id.clone(),
                    method: AssignmentMethod::Auto,
                    status: AttemptStatus::Pending,
                    retry_count: 0,
                    criteria: AssignmentCriteria::default(),
                    failure_reason: None,
                    last_attempt_at: None,
                });
                store.attempts.len() - 1
            }
        };

        allocations::ensure_retryable(&store.attempts[index], self.max_auto_assign_retries)?;
        let criteria = store.attempts[index].criteria.clone();
        let trainer = store.find_trainer(&student, dto.course_id.as_str(), &criteria);

        let allocation = match &trainer {
            Some(trainer_id) => {
                let pending = store.allocations.iter_mut().find(|a| {
                    a.student_id == dto.student_id
                        && a.course_id == dto.course_id
                        && a.status == AllocationStatus::Pending
                });
                match pending {
                    Some(a) => {
                        allocations::apply_auto_assignment(a, trainer_id.clone(), now)?;
                        Some(a.clone())
                    }
                    None => None,
                }
            }
            None => None,
        };

        let attempt = &mut store.attempts[index];
        let result = match trainer {
            Some(_) => Ok(()),
            None => Err("no matching trainer available".to_string()),
        };
        allocations::record_retry(attempt, result, now);

        Ok(AutoAssignOutcome {
            attempt: attempt.clone(),
            allocation,
        })
    }

    async fn list_sessions(&self, allocation_id: &AllocationId) -> ConsoleResult<Vec<Session>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.allocation_mut(allocation_id)?;
        Ok(store
            .sessions
            .iter()
            .filter(|s| &s.allocation_id == allocation_id)
            .cloned()
            .collect())
    }

    async fn schedule_session(
        &self,
        allocation_id: &AllocationId,
        dto: &ScheduleSessionDto,
    ) -> ConsoleResult<Session> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let allocation = store.allocation_mut(allocation_id)?.clone();
        let session = sessions::schedule(&allocation, dto.clone())?;
        store.sessions.push(session.clone());
        Ok(session)
    }

    async fn verify_session(&self, id: &SessionId, dto: &VerifySessionDto) -> ConsoleResult<Session> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_session(id, |s| sessions::verify(s, dto.channel, dto.outcome))
    }

    async fn move_session(&self, id: &SessionId, dto: &MoveSessionDto) -> ConsoleResult<Session> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_session(id, |s| {
            sessions::move_to(s, dto.scheduled_date, dto.scheduled_time)
        })
    }

    async fn complete_session(&self, id: &SessionId) -> ConsoleResult<Session> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_session(id, |s| sessions::complete(s).map(|_| ()))
    }

    async fn mark_session_missed(&self, id: &SessionId) -> ConsoleResult<Session> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        store.update_session(id, |s| sessions::mark_missed(s).map(|_| ()))
    }

    async fn list_reschedule_requests(
        &self,
        session_id: &SessionId,
    ) -> ConsoleResult<Vec<RescheduleRequest>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        Ok(store
            .reschedules
            .iter()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn request_reschedule(
        &self,
        session_id: &SessionId,
        dto: &RescheduleRequestDto,
    ) -> ConsoleResult<RescheduleRequest> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        let session = store.session_mut(session_id)?.clone();
        let request = sessions::request_reschedule(&session, dto.clone())?;
        store.reschedules.push(request.clone());
        Ok(request)
    }

    async fn resolve_reschedule(
        &self,
        id: &RescheduleRequestId,
        dto: &ResolveRescheduleDto,
    ) -> ConsoleResult<RescheduleRequest> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;

        let mut request = store
            .reschedules
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| ConsoleError::not_found("reschedule request", id))?;
        let mut session = store.session_mut(&request.session_id)?.clone();

        sessions::resolve_reschedule(&mut request, &mut session, dto.decision, REMOTE_ACTOR, Utc::now())?;

        let stored_session = store.session_mut(&request.session_id)?;
        *stored_session = session;
        if let Some(stored) = store.reschedules.iter_mut().find(|r| &r.id == id) {
            *stored = request.clone();
        }
        Ok(request)
    }

    async fn list_students(&self, page: &PaginationParams) -> ConsoleResult<Page<Student>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        Ok(paginate(&store.students, page))
    }

    async fn list_trainers(&self, page: &PaginationParams) -> ConsoleResult<Page<Trainer>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        Ok(paginate(&store.trainers, page))
    }

    async fn list_auto_assign_attempts(&self) -> ConsoleResult<Vec<AutoAssignmentAttempt>> {
        self.pause().await;
        let mut store = self.store.lock().await;
        store.take_failure()?;
        Ok(store.attempts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorgrid_models::{CourseId, RegionId, RegionType, ScheduleMode, StudentId};

    fn remote() -> InMemoryRemote {
        InMemoryRemote::new(vec![RegionNode::new("ST-01", "State", RegionType::State)])
    }

    fn student() -> Student {
        Student {
            id: StudentId::new("stu-1"),
            name: "Asha".into(),
            region_id: RegionId::new("MAN-01"),
            course_ids: vec![CourseId::new("math")],
        }
    }

    fn create_dto() -> CreateAllocationDto {
        CreateAllocationDto {
            student_id: StudentId::new("stu-1"),
            trainer_id: None,
            course_id: CourseId::new("math"),
            schedule_mode: ScheduleMode::Weekdays,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_retry_ceiling_enforced() {
        let remote = remote().with_max_auto_assign_retries(1);
        remote.add_student(student()).await;
        let dto = RetryAutoAssignDto {
            student_id: StudentId::new("stu-1"),
            course_id: CourseId::new("math"),
        };

        let first = remote.retry_auto_assign(&dto).await.unwrap();
        assert_eq!(first.attempt.retry_count, 1);
        assert_eq!(first.attempt.status, AttemptStatus::Failed);

        let err = remote.retry_auto_assign(&dto).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        let store = remote.store.lock().await;
        assert_eq!(store.attempts[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_create_uses_student_region() {
        let remote = remote();
        remote.add_student(student()).await;
        let created = remote.create_allocation(&create_dto()).await.unwrap();
        assert_eq!(created.region_id.as_str(), "MAN-01");
        assert_eq!(created.status, AllocationStatus::Pending);
    }

    #[tokio::test]
    async fn test_injected_failure_changes_nothing() {
        let remote = remote();
        remote.add_student(student()).await;
        remote.fail_next("gateway timeout").await;

        let err = remote.create_allocation(&create_dto()).await.unwrap_err();
        assert_eq!(err, ConsoleError::RemoteFailure("gateway timeout".into()));
        let page = remote
            .list_allocations(&AllocationFilterParams::default(), &PaginationParams::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_record() {
        let remote = remote();
        remote.add_student(student()).await;
        let created = remote.create_allocation(&create_dto()).await.unwrap();

        let err = remote
            .approve_allocation(&created.id, &ApproveAllocationDto::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::UnresolvableTrainer(_)));
        assert_eq!(remote.allocation(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_paginate_meta() {
        let items: Vec<u32> = (0..5).collect();
        let page = paginate(&items, &PaginationParams::page(2, 2));
        assert_eq!(page.items, vec![2, 3]);
        let meta = page.meta.unwrap();
        assert_eq!(meta.total, 5);
        assert!(meta.has_more);
    }
}
