//! The remote authority seam.
//!
//! Every mutation is one request; the record that comes back replaces the
//! local copy. [`HttpRemote`] talks to the REST API, [`InMemoryRemote`] is an
//! in-process authority applying the same lifecycle rules.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::InMemoryRemote;

use async_trait::async_trait;

use tutorgrid_core::{ConsoleResult, PaginationMeta, PaginationParams};
use tutorgrid_models::{
    Allocation, AllocationFilterParams, AllocationId, ApproveAllocationDto,
    AutoAssignOutcome, AutoAssignmentAttempt, CreateAllocationDto, MoveSessionDto,
    ReallocateDto, RegionNode, RejectAllocationDto, RescheduleRequest, RescheduleRequestDto,
    RescheduleRequestId, ResolveRescheduleDto, RetryAutoAssignDto, ScheduleSessionDto,
    Session, SessionId, Student, Trainer, VerifySessionDto,
};

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: Option<PaginationMeta>,
}

impl<T> Page<T> {
    pub fn unpaged(items: Vec<T>) -> Self {
        Self { items, meta: None }
    }
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// `GET /regions/hierarchy`
    async fn fetch_hierarchy(&self) -> ConsoleResult<Vec<RegionNode>>;

    /// `GET /allocations`
    async fn list_allocations(
        &self,
        filter: &AllocationFilterParams,
        page: &PaginationParams,
    ) -> ConsoleResult<Page<Allocation>>;

    /// `POST /allocations`
    async fn create_allocation(&self, dto: &CreateAllocationDto) -> ConsoleResult<Allocation>;

    /// `POST /allocations/{id}/approve`
    async fn approve_allocation(
        &self,
        id: &AllocationId,
        dto: &ApproveAllocationDto,
    ) -> ConsoleResult<Allocation>;

    /// `POST /allocations/{id}/reject`
    async fn reject_allocation(
        &self,
        id: &AllocationId,
        dto: &RejectAllocationDto,
    ) -> ConsoleResult<Allocation>;

    /// `POST /allocations/{id}/cancel`. The authority cascades to sessions.
    async fn cancel_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation>;

    /// `POST /allocations/{id}/reallocate`
    async fn reallocate(&self, id: &AllocationId, dto: &ReallocateDto) -> ConsoleResult<Allocation>;

    /// `POST /allocations/{id}/complete`
    async fn complete_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation>;

    /// `POST /allocations/auto-assign/retry`
    async fn retry_auto_assign(&self, dto: &RetryAutoAssignDto) -> ConsoleResult<AutoAssignOutcome>;

    /// `GET /allocations/{id}/sessions`
    async fn list_sessions(&self, allocation_id: &AllocationId) -> ConsoleResult<Vec<Session>>;

    /// `POST /allocations/{id}/sessions`
    async fn schedule_session(
        &self,
        allocation_id: &AllocationId,
        dto: &ScheduleSessionDto,
    ) -> ConsoleResult<Session>;

    /// `POST /sessions/{id}/verify`
    async fn verify_session(&self, id: &SessionId, dto: &VerifySessionDto) -> ConsoleResult<Session>;

    /// `PATCH /sessions/{id}/schedule`
    async fn move_session(&self, id: &SessionId, dto: &MoveSessionDto) -> ConsoleResult<Session>;

    /// `POST /sessions/{id}/complete`
    async fn complete_session(&self, id: &SessionId) -> ConsoleResult<Session>;

    /// `POST /sessions/{id}/missed`
    async fn mark_session_missed(&self, id: &SessionId) -> ConsoleResult<Session>;

    /// `GET /sessions/{id}/reschedule-requests`
    async fn list_reschedule_requests(
        &self,
        session_id: &SessionId,
    ) -> ConsoleResult<Vec<RescheduleRequest>>;

    /// `POST /sessions/{id}/reschedule-requests`
    async fn request_reschedule(
        &self,
        session_id: &SessionId,
        dto: &RescheduleRequestDto,
    ) -> ConsoleResult<RescheduleRequest>;

    /// `POST /reschedule-requests/{id}/resolve`
    async fn resolve_reschedule(
        &self,
        id: &RescheduleRequestId,
        dto: &ResolveRescheduleDto,
    ) -> ConsoleResult<RescheduleRequest>;

    /// `GET /students`
    async fn list_students(&self, page: &PaginationParams) -> ConsoleResult<Page<Student>>;

    /// `GET /trainers`
    async fn list_trainers(&self, page: &PaginationParams) -> ConsoleResult<Page<Trainer>>;

    /// `GET /auto-assign/attempts`
    async fn list_auto_assign_attempts(&self) -> ConsoleResult<Vec<AutoAssignmentAttempt>>;
}
