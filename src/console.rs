//! The console: one signed-in admin working against the remote authority.
//!
//! Every mutation follows the same path. Permission and scope are checked,
//! then the transition is previewed on a copy of the local record so invalid
//! or already-satisfied requests never reach the network. The remote call
//! follows, and its returned record replaces the local one. A failure leaves
//! local state as it was.
//!
//! Responses that arrive after [`TeardownHandle::teardown`] are dropped with
//! [`ConsoleError::Stale`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};

use tutorgrid_config::ConsoleConfig;
use tutorgrid_core::{ConsoleError, ConsoleResult, PaginationParams};
use tutorgrid_models::{
    Admin, Allocation, AllocationFilterParams, AllocationId, ApproveAllocationDto,
    AutoAssignOutcome, AutoAssignmentAttempt, CourseId, CreateAllocationDto, MoveSessionDto,
    ReallocateDto, RejectAllocationDto, RescheduleDecision, RescheduleRequest,
    RescheduleRequestDto, RescheduleRequestId, ResolveRescheduleDto, RetryAutoAssignDto,
    ScheduleSessionDto, Session, SessionId, Student, StudentId, Trainer, TrainerId,
    VerificationChannel, VerificationOutcome, VerifySessionDto,
};

use crate::allocations::{self, AllocationTab, Transition};
use crate::audit::{AuditEntry, AuditLog, Notification};
use crate::context::AuthContext;
use crate::hierarchy::Hierarchy;
use crate::ledger::{AllocationRecord, Ledger};
use crate::metrics::{track_auto_assign_retry, track_soft_conflicts};
use crate::remote::{Page, RemoteApi};
use crate::scope::Action;
use crate::sessions::{self, PlacementKind, PlacementPlan, SoftConflict};

const ALLOCATION: &str = "allocation";
const SESSION: &str = "session";
const REQUEST: &str = "reschedule request";
const ATTEMPT: &str = "auto-assign attempt";

/// Invalidates every request still in flight on the console it came from.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    generation: Arc<AtomicU64>,
}

impl TeardownHandle {
    pub fn teardown(&self) {
        let previous = self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(generation = previous + 1, "Console torn down");
    }
}

pub struct Console {
    ctx: AuthContext,
    remote: Arc<dyn RemoteApi>,
    config: ConsoleConfig,
    ledger: Ledger,
    students: Vec<Student>,
    trainers: Vec<Trainer>,
    attempts: Vec<AutoAssignmentAttempt>,
    audit: AuditLog,
    generation: Arc<AtomicU64>,
}

impl Console {
    pub fn new(ctx: AuthContext, remote: Arc<dyn RemoteApi>, config: ConsoleConfig) -> Self {
        let audit = AuditLog::new(config.audit_capacity);
        Self {
            ctx,
            remote,
            config,
            ledger: Ledger::default(),
            students: Vec::new(),
            trainers: Vec::new(),
            attempts: Vec::new(),
            audit,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch the region hierarchy from the authority and open a console for
    /// `admin` over it.
    #[instrument(skip_all, fields(admin_id = %admin.id))]
    pub async fn connect(
        admin: Admin,
        remote: Arc<dyn RemoteApi>,
        config: ConsoleConfig,
    ) -> ConsoleResult<Self> {
        let roots = remote.fetch_hierarchy().await?;
        let hierarchy = Hierarchy::from_roots(roots)?;
        info!(regions = hierarchy.len(), "Region hierarchy loaded");
        Ok(Self::new(AuthContext::new(admin, Arc::new(hierarchy)), remote, config))
    }

    pub fn context(&self) -> &AuthContext {
        &self.ctx
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.audit.drain_notifications()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            generation: Arc::clone(&self.generation),
        }
    }

    pub fn teardown(&self) {
        self.teardown_handle().teardown();
    }

    fn begin(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn ensure_current(&self, generation: u64) -> ConsoleResult<()> {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Dropping response from a torn-down console");
            return Err(ConsoleError::Stale);
        }
        Ok(())
    }

    fn conclude<T>(&mut self, action: Action, result: ConsoleResult<T>) -> ConsoleResult<T> {
        if let Err(e) = &result {
            if !matches!(e, ConsoleError::Stale) {
                self.audit.record_failure(self.ctx.actor(), action, e);
            }
        }
        result
    }

    fn record(&mut self, action: Action, kind: &'static str, id: impl ToString, detail: Option<String>) {
        self.audit.record(self.ctx.actor(), action, kind, id, detail);
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reload allocations, students, trainers and auto-assign attempts.
    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn refresh(&mut self) -> ConsoleResult<()> {
        self.refresh_allocations().await?;
        self.refresh_people().await?;
        self.refresh_attempts().await
    }

    pub async fn refresh_allocations(&mut self) -> ConsoleResult<usize> {
        let generation = self.begin();
        let remote = Arc::clone(&self.remote);
        let filter = AllocationFilterParams::default();
        let all = fetch_all(|page| {
            let remote = Arc::clone(&remote);
            let filter = filter.clone();
            async move { remote.list_allocations(&filter, &page).await }
        })
        .await?;
        self.ensure_current(generation)?;
        self.ledger.replace_allocations(all);
        debug!(count = self.ledger.len(), "Allocations refreshed");
        Ok(self.ledger.len())
    }

    pub async fn refresh_people(&mut self) -> ConsoleResult<()> {
        let generation = self.begin();
        let remote = Arc::clone(&self.remote);
        let students = fetch_all(|page| {
            let remote = Arc::clone(&remote);
            async move { remote.list_students(&page).await }
        })
        .await?;
        let trainers = fetch_all(|page| {
            let remote = Arc::clone(&remote);
            async move { remote.list_trainers(&page).await }
        })
        .await?;
        self.ensure_current(generation)?;
        self.students = students;
        self.trainers = trainers;
        Ok(())
    }

    pub async fn refresh_attempts(&mut self) -> ConsoleResult<()> {
        let generation = self.begin();
        let attempts = self.remote.list_auto_assign_attempts().await?;
        self.ensure_current(generation)?;
        self.attempts = attempts;
        Ok(())
    }

    /// Fetch an allocation's sessions and their reschedule requests.
    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn load_sessions(&mut self, allocation_id: &AllocationId) -> ConsoleResult<&AllocationRecord> {
        let allocation = self.ledger.allocation(allocation_id)?;
        self.ctx.ensure_in_scope(allocation.region_id.as_str())?;
        let generation = self.begin();
        self.reload_sessions(allocation_id, generation).await?;
        self.ledger.record(allocation_id)
    }

    async fn reload_sessions(&mut self, allocation_id: &AllocationId, generation: u64) -> ConsoleResult<()> {
        let sessions = self.remote.list_sessions(allocation_id).await?;
        let mut requests = Vec::new();
        for session in &sessions {
            requests.extend(self.remote.list_reschedule_requests(&session.id).await?);
        }
        self.ensure_current(generation)?;
        self.ledger.replace_sessions(allocation_id, sessions, requests)
    }

    /// After a mutation that changed sessions server-side. The mutation
    /// already stands, so a failed reload flags the record as stale instead
    /// of failing the action.
    async fn resync_sessions(&mut self, allocation_id: &AllocationId, generation: u64) {
        let Err(e) = self.reload_sessions(allocation_id, generation).await else {
            return;
        };
        warn!(allocation_id = %allocation_id, error = %e, "Session reload failed");
        if e == ConsoleError::Stale {
            return;
        }
        if self.ledger.mark_sessions_stale(allocation_id).is_ok() {
            self.audit.notify(Notification::info(format!(
                "sessions of allocation {} are out of date, reload them: {}",
                allocation_id, e
            )));
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// In-scope allocations, optionally narrowed to one tab.
    pub fn allocations(&self, tab: Option<AllocationTab>) -> Vec<&Allocation> {
        self.ctx
            .filter_in_scope(self.ledger.allocations())
            .into_iter()
            .filter(|a| tab.is_none_or(|t| AllocationTab::of(a) == t))
            .collect()
    }

    pub fn allocation(&self, id: &AllocationId) -> ConsoleResult<&Allocation> {
        let allocation = self.ledger.allocation(id)?;
        self.ctx.ensure_in_scope(allocation.region_id.as_str())?;
        Ok(allocation)
    }

    pub fn record_of(&self, id: &AllocationId) -> ConsoleResult<&AllocationRecord> {
        let record = self.ledger.record(id)?;
        self.ctx.ensure_in_scope(record.allocation.region_id.as_str())?;
        Ok(record)
    }

    pub fn students(&self) -> Vec<&Student> {
        self.ctx.filter_in_scope(&self.students)
    }

    pub fn trainers(&self) -> Vec<&Trainer> {
        self.ctx.filter_in_scope(&self.trainers)
    }

    /// Attempts whose student is visible to this admin.
    pub fn attempts(&self) -> Vec<&AutoAssignmentAttempt> {
        let visible = self.students();
        self.attempts
            .iter()
            .filter(|a| visible.iter().any(|s| s.id == a.student_id))
            .collect()
    }

    fn student(&self, id: &StudentId) -> ConsoleResult<&Student> {
        self.students
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ConsoleError::not_found("student", id))
    }

    // =========================================================================
    // Allocation lifecycle
    // =========================================================================

    #[instrument(skip(self, dto), fields(actor = %self.ctx.admin.id, student_id = %dto.student_id))]
    pub async fn create_allocation(&mut self, dto: CreateAllocationDto) -> ConsoleResult<Allocation> {
        let result = self.create_allocation_inner(dto).await;
        self.conclude(Action::CreateAllocation, result)
    }

    async fn create_allocation_inner(&mut self, dto: CreateAllocationDto) -> ConsoleResult<Allocation> {
        let student = self.student(&dto.student_id)?;
        self.ctx.authorize(Action::CreateAllocation, student)?;
        allocations::create(dto.clone(), student.region_id.clone(), self.ctx.actor(), Utc::now())?;

        let generation = self.begin();
        let created = self.remote.create_allocation(&dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_allocation(created.clone());
        self.record(
            Action::CreateAllocation,
            ALLOCATION,
            &created.id,
            Some(format!("course {}", created.course_id)),
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn approve(&mut self, id: &AllocationId, trainer: Option<TrainerId>) -> ConsoleResult<Transition> {
        let result = self.approve_inner(id, trainer).await;
        self.conclude(Action::ApproveAllocation, result)
    }

    async fn approve_inner(&mut self, id: &AllocationId, trainer: Option<TrainerId>) -> ConsoleResult<Transition> {
        let current = self.ledger.allocation(id)?;
        self.ctx.authorize(Action::ApproveAllocation, current)?;
        let mut preview = current.clone();
        allocations::approve(&mut preview, trainer.clone(), self.ctx.actor(), Utc::now())?;

        let generation = self.begin();
        let dto = ApproveAllocationDto { trainer_id: trainer };
        let updated = self.remote.approve_allocation(id, &dto).await?;
        self.ensure_current(generation)?;

        let detail = updated.trainer_id().map(|t| format!("trainer {}", t));
        self.ledger.upsert_allocation(updated);
        self.record(Action::ApproveAllocation, ALLOCATION, id, detail);
        Ok(Transition::Applied)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn reject(&mut self, id: &AllocationId, reason: &str) -> ConsoleResult<Transition> {
        let result = self.reject_inner(id, reason).await;
        self.conclude(Action::RejectAllocation, result)
    }

    async fn reject_inner(&mut self, id: &AllocationId, reason: &str) -> ConsoleResult<Transition> {
        let current = self.ledger.allocation(id)?;
        self.ctx.authorize(Action::RejectAllocation, current)?;
        let mut preview = current.clone();
        if allocations::reject(&mut preview, reason, self.ctx.actor(), Utc::now())? == Transition::Unchanged {
            self.audit.record_noop(Action::RejectAllocation, ALLOCATION, id);
            return Ok(Transition::Unchanged);
        }

        let generation = self.begin();
        let dto = RejectAllocationDto {
            reason: reason.trim().to_string(),
        };
        let updated = self.remote.reject_allocation(id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_allocation(updated);
        self.record(Action::RejectAllocation, ALLOCATION, id, Some(dto.reason));
        Ok(Transition::Applied)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn reallocate(
        &mut self,
        id: &AllocationId,
        new_trainer: TrainerId,
        reason: &str,
    ) -> ConsoleResult<Transition> {
        let result = self.reallocate_inner(id, new_trainer, reason).await;
        self.conclude(Action::ReallocateAllocation, result)
    }

    async fn reallocate_inner(
        &mut self,
        id: &AllocationId,
        new_trainer: TrainerId,
        reason: &str,
    ) -> ConsoleResult<Transition> {
        let current = self.ledger.allocation(id)?;
        self.ctx.authorize(Action::ReallocateAllocation, current)?;
        let mut preview = current.clone();
        allocations::reallocate(&mut preview, new_trainer.clone(), reason)?;

        let generation = self.begin();
        let dto = ReallocateDto {
            new_trainer_id: new_trainer,
            reason: reason.trim().to_string(),
        };
        let updated = self.remote.reallocate(id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_allocation(updated);
        self.record(
            Action::ReallocateAllocation,
            ALLOCATION,
            id,
            Some(format!("trainer {}: {}", dto.new_trainer_id, dto.reason)),
        );
        Ok(Transition::Applied)
    }

    /// Cancel the allocation. The authority cascades to its open sessions,
    /// which are then re-fetched.
    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn cancel(&mut self, id: &AllocationId) -> ConsoleResult<Transition> {
        let result = self.cancel_inner(id).await;
        self.conclude(Action::CancelAllocation, result)
    }

    async fn cancel_inner(&mut self, id: &AllocationId) -> ConsoleResult<Transition> {
        let current = self.ledger.allocation(id)?;
        self.ctx.authorize(Action::CancelAllocation, current)?;
        let mut preview = current.clone();
        if allocations::cancel(&mut preview)? == Transition::Unchanged {
            self.audit.record_noop(Action::CancelAllocation, ALLOCATION, id);
            return Ok(Transition::Unchanged);
        }

        let generation = self.begin();
        let updated = self.remote.cancel_allocation(id).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_allocation(updated);
        self.record(Action::CancelAllocation, ALLOCATION, id, None);
        self.resync_sessions(id, generation).await;
        Ok(Transition::Applied)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn complete(&mut self, id: &AllocationId) -> ConsoleResult<Transition> {
        let result = self.complete_inner(id).await;
        self.conclude(Action::CompleteAllocation, result)
    }

    async fn complete_inner(&mut self, id: &AllocationId) -> ConsoleResult<Transition> {
        let current = self.ledger.allocation(id)?;
        self.ctx.authorize(Action::CompleteAllocation, current)?;
        let mut preview = current.clone();
        if allocations::complete(&mut preview)? == Transition::Unchanged {
            self.audit.record_noop(Action::CompleteAllocation, ALLOCATION, id);
            return Ok(Transition::Unchanged);
        }

        let generation = self.begin();
        let updated = self.remote.complete_allocation(id).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_allocation(updated);
        self.record(Action::CompleteAllocation, ALLOCATION, id, None);
        Ok(Transition::Applied)
    }

    /// Ask the authority to run auto-assignment again for a student/course.
    /// A run that finds no trainer is still a successful retry; the outcome
    /// carries the failure reason.
    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn retry_auto_assign(
        &mut self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> ConsoleResult<AutoAssignOutcome> {
        let result = self.retry_auto_assign_inner(student_id, course_id).await;
        self.conclude(Action::RetryAutoAssign, result)
    }

    async fn retry_auto_assign_inner(
        &mut self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> ConsoleResult<AutoAssignOutcome> {
        let student = self.student(student_id)?;
        self.ctx.authorize(Action::RetryAutoAssign, student)?;
        if let Some(attempt) = self.attempts.iter().find(|a| a.matches(student_id, course_id)) {
            allocations::ensure_retryable(attempt, self.config.max_auto_assign_retries)?;
        }

        let generation = self.begin();
        let dto = RetryAutoAssignDto {
            student_id: student_id.clone(),
            course_id: course_id.clone(),
        };
        let outcome = self.remote.retry_auto_assign(&dto).await?;
        self.ensure_current(generation)?;

        let succeeded = outcome.succeeded();
        track_auto_assign_retry(succeeded);
        match self.attempts.iter_mut().find(|a| a.id == outcome.attempt.id) {
            Some(existing) => *existing = outcome.attempt.clone(),
            None => self.attempts.push(outcome.attempt.clone()),
        }
        if let Some(allocation) = &outcome.allocation {
            self.ledger.upsert_allocation(allocation.clone());
        }

        let detail = match (&outcome.allocation, &outcome.attempt.failure_reason) {
            (Some(a), _) => format!("retry {} assigned allocation {}", outcome.attempt.retry_count, a.id),
            (None, Some(reason)) => format!("retry {} failed: {}", outcome.attempt.retry_count, reason),
            (None, None) => format!("retry {}", outcome.attempt.retry_count),
        };
        self.record(Action::RetryAutoAssign, ATTEMPT, &outcome.attempt.id, Some(detail));
        Ok(outcome)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    #[instrument(skip(self, dto), fields(actor = %self.ctx.admin.id))]
    pub async fn schedule_session(
        &mut self,
        allocation_id: &AllocationId,
        dto: ScheduleSessionDto,
    ) -> ConsoleResult<Session> {
        let result = self.schedule_session_inner(allocation_id, dto).await;
        self.conclude(Action::ScheduleSession, result)
    }

    async fn schedule_session_inner(
        &mut self,
        allocation_id: &AllocationId,
        dto: ScheduleSessionDto,
    ) -> ConsoleResult<Session> {
        let allocation = self.ledger.allocation(allocation_id)?;
        self.ctx.authorize(Action::ScheduleSession, allocation)?;
        sessions::schedule(allocation, dto.clone())?;

        let generation = self.begin();
        let session = self.remote.schedule_session(allocation_id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_session(session.clone())?;
        self.record(
            Action::ScheduleSession,
            SESSION,
            &session.id,
            Some(format!("{} {}", session.scheduled_date, session.scheduled_time)),
        );
        Ok(session)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn verify_session(
        &mut self,
        id: &SessionId,
        channel: VerificationChannel,
        outcome: VerificationOutcome,
    ) -> ConsoleResult<Session> {
        let result = self.verify_session_inner(id, channel, outcome).await;
        self.conclude(Action::VerifySession, result)
    }

    async fn verify_session_inner(
        &mut self,
        id: &SessionId,
        channel: VerificationChannel,
        outcome: VerificationOutcome,
    ) -> ConsoleResult<Session> {
        let (record, session) = self.ledger.session(id)?;
        self.ctx.authorize(Action::VerifySession, &record.allocation)?;
        let mut preview = session.clone();
        sessions::verify(&mut preview, channel, outcome)?;

        let generation = self.begin();
        let dto = VerifySessionDto { channel, outcome };
        let updated = self.remote.verify_session(id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_session(updated.clone())?;
        self.record(
            Action::VerifySession,
            SESSION,
            id,
            Some(format!("{} {:?}", channel, outcome)),
        );
        Ok(updated)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn complete_session(&mut self, id: &SessionId) -> ConsoleResult<Transition> {
        let result = self.close_session(id, Action::CompleteSession).await;
        self.conclude(Action::CompleteSession, result)
    }

    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn mark_session_missed(&mut self, id: &SessionId) -> ConsoleResult<Transition> {
        let result = self.close_session(id, Action::MarkSessionMissed).await;
        self.conclude(Action::MarkSessionMissed, result)
    }

    async fn close_session(&mut self, id: &SessionId, action: Action) -> ConsoleResult<Transition> {
        let (record, session) = self.ledger.session(id)?;
        self.ctx.authorize(action, &record.allocation)?;
        let mut preview = session.clone();
        let transition = match action {
            Action::CompleteSession => sessions::complete(&mut preview)?,
            _ => sessions::mark_missed(&mut preview)?,
        };
        if transition == Transition::Unchanged {
            self.audit.record_noop(action, SESSION, id);
            return Ok(Transition::Unchanged);
        }

        let generation = self.begin();
        let updated = match action {
            Action::CompleteSession => self.remote.complete_session(id).await?,
            _ => self.remote.mark_session_missed(id).await?,
        };
        self.ensure_current(generation)?;

        self.ledger.upsert_session(updated)?;
        self.record(action, SESSION, id, None);
        Ok(Transition::Applied)
    }

    // =========================================================================
    // Reschedules
    // =========================================================================

    #[instrument(skip(self, dto), fields(actor = %self.ctx.admin.id))]
    pub async fn request_reschedule(
        &mut self,
        session_id: &SessionId,
        dto: RescheduleRequestDto,
    ) -> ConsoleResult<RescheduleRequest> {
        let result = self.request_reschedule_inner(session_id, dto).await;
        self.conclude(Action::RequestReschedule, result)
    }

    async fn request_reschedule_inner(
        &mut self,
        session_id: &SessionId,
        dto: RescheduleRequestDto,
    ) -> ConsoleResult<RescheduleRequest> {
        let (record, session) = self.ledger.session(session_id)?;
        self.ctx.authorize(Action::RequestReschedule, &record.allocation)?;
        sessions::request_reschedule(session, dto.clone())?;

        let generation = self.begin();
        let request = self.remote.request_reschedule(session_id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_reschedule(request.clone())?;
        self.record(
            Action::RequestReschedule,
            REQUEST,
            &request.id,
            Some(format!("{} {} by {:?}", request.new_date, request.new_time, request.requested_by)),
        );
        Ok(request)
    }

    /// Approve or reject a pending request. Approval moves the session on
    /// the authority; the allocation's sessions are re-fetched afterwards.
    #[instrument(skip(self), fields(actor = %self.ctx.admin.id))]
    pub async fn resolve_reschedule(
        &mut self,
        id: &RescheduleRequestId,
        decision: RescheduleDecision,
    ) -> ConsoleResult<RescheduleRequest> {
        let result = self.resolve_reschedule_inner(id, decision).await;
        self.conclude(Action::ResolveReschedule, result)
    }

    async fn resolve_reschedule_inner(
        &mut self,
        id: &RescheduleRequestId,
        decision: RescheduleDecision,
    ) -> ConsoleResult<RescheduleRequest> {
        let (record, request) = self.ledger.reschedule(id)?;
        self.ctx.authorize(Action::ResolveReschedule, &record.allocation)?;
        let session = record
            .session(&request.session_id)
            .ok_or_else(|| ConsoleError::not_found(SESSION, &request.session_id))?;
        let allocation_id = record.allocation.id.clone();
        let (mut request_preview, mut session_preview) = (request.clone(), session.clone());
        sessions::resolve_reschedule(
            &mut request_preview,
            &mut session_preview,
            decision,
            self.ctx.actor(),
            Utc::now(),
        )?;

        let generation = self.begin();
        let dto = ResolveRescheduleDto { decision };
        let resolved = self.remote.resolve_reschedule(id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_reschedule(resolved.clone())?;
        self.record(
            Action::ResolveReschedule,
            REQUEST,
            id,
            Some(format!("{:?}", decision)),
        );
        if decision == RescheduleDecision::Approved {
            self.resync_sessions(&allocation_id, generation).await;
        }
        Ok(resolved)
    }

    // =========================================================================
    // Calendar
    // =========================================================================

    /// Soft conflicts across every loaded in-scope session.
    pub fn detect_conflicts(&self) -> Vec<SoftConflict> {
        let pairs = self
            .ledger
            .sessions_by_trainer(|a| self.ctx.is_in_scope(a.region_id.as_str()));
        let conflicts = sessions::detect_conflicts(pairs);
        track_soft_conflicts(conflicts.len());
        conflicts
    }

    /// Work out what dropping a session on `date`/`time` would do without
    /// changing anything. Apply it with [`Console::confirm_placement`].
    pub fn plan_placement(
        &self,
        session_id: &SessionId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ConsoleResult<PlacementPlan> {
        let (record, session) = self.ledger.session(session_id)?;
        self.ctx.authorize(Action::MoveSession, &record.allocation)?;
        let trainer = record.allocation.trainer_id().ok_or_else(|| {
            ConsoleError::Validation(format!("allocation {} has no trainer", record.allocation.id))
        })?;

        let plan = sessions::plan_placement(
            session,
            trainer,
            date,
            time,
            &record.reschedules,
            self.ledger.sessions_of_trainer(trainer),
        )?;
        if plan.has_conflicts() {
            track_soft_conflicts(plan.conflicts.len());
            debug!(session_id = %session_id, conflicts = plan.conflicts.len(), "Placement would overlap");
        }
        Ok(plan)
    }

    /// Apply a placement. A plan matching a pending request approves that
    /// request; anything else is a direct move.
    #[instrument(skip(self, plan), fields(actor = %self.ctx.admin.id, session_id = %plan.session_id))]
    pub async fn confirm_placement(&mut self, plan: &PlacementPlan) -> ConsoleResult<Session> {
        if let PlacementKind::ApproveRequest(request_id) = &plan.kind {
            self.resolve_reschedule(request_id, RescheduleDecision::Approved).await?;
            return self.ledger.session(&plan.session_id).map(|(_, s)| s.clone());
        }
        let result = self.move_session_inner(plan).await;
        self.conclude(Action::MoveSession, result)
    }

    async fn move_session_inner(&mut self, plan: &PlacementPlan) -> ConsoleResult<Session> {
        let (record, session) = self.ledger.session(&plan.session_id)?;
        self.ctx.authorize(Action::MoveSession, &record.allocation)?;
        let mut preview = session.clone();
        sessions::move_to(&mut preview, plan.date, plan.time)?;

        let generation = self.begin();
        let dto = MoveSessionDto {
            scheduled_date: plan.date,
            scheduled_time: plan.time,
        };
        let updated = self.remote.move_session(&plan.session_id, &dto).await?;
        self.ensure_current(generation)?;

        self.ledger.upsert_session(updated.clone())?;
        let mut detail = format!("{} {}", plan.date, plan.time);
        if plan.has_conflicts() {
            detail.push_str(&format!(" ({} soft conflicts)", plan.conflicts.len()));
        }
        self.record(Action::MoveSession, SESSION, &plan.session_id, Some(detail));
        Ok(updated)
    }

    pub fn audit_entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.audit.entries()
    }
}

/// Walk a paginated endpoint to the end.
async fn fetch_all<T, F, Fut>(mut fetch: F) -> ConsoleResult<Vec<T>>
where
    F: FnMut(PaginationParams) -> Fut,
    Fut: Future<Output = ConsoleResult<Page<T>>>,
{
    let mut params = PaginationParams::default();
    let mut items = Vec::new();
    loop {
        let page = fetch(params.clone()).await?;
        let empty = page.items.is_empty();
        items.extend(page.items);
        match page.meta.as_ref().and_then(|meta| params.next(meta)) {
            Some(next) if !empty => params = next,
            _ => break,
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorgrid_core::PaginationMeta;

    #[tokio::test]
    async fn test_fetch_all_follows_has_more() {
        let pages = vec![vec![1, 2], vec![3, 4], vec![5]];
        let mut calls = 0;
        let all = fetch_all(|params| {
            let index = calls;
            calls += 1;
            let items = pages[index].clone();
            async move {
                Ok(Page {
                    items,
                    meta: Some(PaginationMeta {
                        total: 5,
                        limit: params.limit(),
                        offset: Some(params.offset()),
                        page: None,
                        has_more: index < 2,
                    }),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_page() {
        let all: Vec<i32> = fetch_all(|_| async {
            Ok(Page {
                items: Vec::new(),
                meta: Some(PaginationMeta {
                    total: 10,
                    limit: 50,
                    offset: Some(0),
                    page: None,
                    has_more: true,
                }),
            })
        })
        .await
        .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_single_unpaged() {
        let all = fetch_all(|_| async { Ok(Page::unpaged(vec!["a"])) }).await.unwrap();
        assert_eq!(all, vec!["a"]);
    }
}
