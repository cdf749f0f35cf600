//! REST client for the remote console API.
//!
//! Every endpoint answers with an [`ApiEnvelope`]; a non-success envelope,
//! a non-2xx status without an envelope, or a transport error all surface as
//! [`ConsoleError::RemoteFailure`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use tutorgrid_config::ApiConfig;
use tutorgrid_core::{ConsoleError, ConsoleResult, PaginationParams};
use tutorgrid_models::{
    Allocation, AllocationFilterParams, AllocationId, ApiEnvelope, ApproveAllocationDto,
    AutoAssignOutcome, AutoAssignmentAttempt, CreateAllocationDto, MoveSessionDto,
    ReallocateDto, RegionNode, RejectAllocationDto, RescheduleRequest, RescheduleRequestDto,
    RescheduleRequestId, ResolveRescheduleDto, RetryAutoAssignDto, ScheduleSessionDto,
    Session, SessionId, Student, Trainer, VerifySessionDto,
};

use super::{Page, RemoteApi};
use crate::metrics::track_remote_request;

/// Longest body excerpt quoted in an error message.
const ERROR_BODY_LIMIT: usize = 200;

pub struct HttpRemote {
    client: Client,
    config: ApiConfig,
}

impl HttpRemote {
    pub fn new(config: ApiConfig) -> ConsoleResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ConsoleError::remote)?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.config.url(path));
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> ConsoleResult<ApiEnvelope<T>> {
        let result = Self::exchange(request).await;
        let ok = matches!(&result, Ok(envelope) if envelope.success);
        track_remote_request(endpoint, ok);
        if let Err(e) = &result {
            warn!(endpoint, error = %e, "Remote request failed");
        }
        result
    }

    async fn exchange<T: DeserializeOwned>(request: RequestBuilder) -> ConsoleResult<ApiEnvelope<T>> {
        let response = request.send().await.map_err(ConsoleError::remote)?;
        let status = response.status();
        let body = response.text().await.map_err(ConsoleError::remote)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Remote response received");

        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) if status.is_success() => Ok(envelope),
            Ok(envelope) => Err(ConsoleError::RemoteFailure(
                envelope
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            )),
            Err(_) if !status.is_success() => Err(ConsoleError::RemoteFailure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                excerpt(&body)
            ))),
            Err(e) => Err(ConsoleError::RemoteFailure(format!("malformed response: {}", e))),
        }
    }

    async fn data<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> ConsoleResult<T> {
        self.send(endpoint, request).await?.into_data()
    }

    async fn page<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> ConsoleResult<Page<T>> {
        let envelope = self.send::<Vec<T>>(endpoint, request).await?;
        let meta = envelope.meta.clone();
        Ok(Page {
            items: envelope.into_data()?,
            meta,
        })
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    #[instrument(skip(self))]
    async fn fetch_hierarchy(&self) -> ConsoleResult<Vec<RegionNode>> {
        self.data("regions.hierarchy", self.request(Method::GET, "/regions/hierarchy"))
            .await
    }

    #[instrument(skip(self))]
    async fn list_allocations(
        &self,
        filter: &AllocationFilterParams,
        page: &PaginationParams,
    ) -> ConsoleResult<Page<Allocation>> {
        let request = self
            .request(Method::GET, "/allocations")
            .query(filter)
            .query(&page.as_query());
        self.page("allocations.list", request).await
    }

    #[instrument(skip(self, dto), fields(student_id = %dto.student_id))]
    async fn create_allocation(&self, dto: &CreateAllocationDto) -> ConsoleResult<Allocation> {
        let request = self.request(Method::POST, "/allocations").json(dto);
        self.data("allocations.create", request).await
    }

    #[instrument(skip(self, dto))]
    async fn approve_allocation(
        &self,
        id: &AllocationId,
        dto: &ApproveAllocationDto,
    ) -> ConsoleResult<Allocation> {
        let request = self
            .request(Method::POST, &format!("/allocations/{}/approve", id))
            .json(dto);
        self.data("allocations.approve", request).await
    }

    #[instrument(skip(self, dto))]
    async fn reject_allocation(
        &self,
        id: &AllocationId,
        dto: &RejectAllocationDto,
    ) -> ConsoleResult<Allocation> {
        let request = self
            .request(Method::POST, &format!("/allocations/{}/reject", id))
            .json(dto);
        self.data("allocations.reject", request).await
    }

    #[instrument(skip(self))]
    async fn cancel_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation> {
        let request = self.request(Method::POST, &format!("/allocations/{}/cancel", id));
        self.data("allocations.cancel", request).await
    }

    #[instrument(skip(self, dto))]
    async fn reallocate(&self, id: &AllocationId, dto: &ReallocateDto) -> ConsoleResult<Allocation> {
        let request = self
            .request(Method::POST, &format!("/allocations/{}/reallocate", id))
            .json(dto);
        self.data("allocations.reallocate", request).await
    }

    #[instrument(skip(self))]
    async fn complete_allocation(&self, id: &AllocationId) -> ConsoleResult<Allocation> {
        let request = self.request(Method::POST, &format!("/allocations/{}/complete", id));
        self.data("allocations.complete", request).await
    }

    #[instrument(skip(self, dto), fields(student_id = %dto.student_id, course_id = %dto.course_id))]
    async fn retry_auto_assign(&self, dto: &RetryAutoAssignDto) -> ConsoleResult<AutoAssignOutcome> {
        let request = self
            .request(Method::POST, "/allocations/auto-assign/retry")
            .json(dto);
        self.data("allocations.auto_assign_retry", request).await
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self, allocation_id: &AllocationId) -> ConsoleResult<Vec<Session>> {
        let request = self.request(
            Method::GET,
            &format!("/allocations/{}/sessions", allocation_id),
        );
        self.data("sessions.list", request).await
    }

    #[instrument(skip(self, dto))]
    async fn schedule_session(
        &self,
        allocation_id: &AllocationId,
        dto: &ScheduleSessionDto,
    ) -> ConsoleResult<Session> {
        let request = self
            .request(
                Method::POST,
                &format!("/allocations/{}/sessions", allocation_id),
            )
            .json(dto);
        self.data("sessions.create", request).await
    }

    #[instrument(skip(self, dto))]
    async fn verify_session(&self, id: &SessionId, dto: &VerifySessionDto) -> ConsoleResult<Session> {
        let request = self
            .request(Method::POST, &format!("/sessions/{}/verify", id))
            .json(dto);
        self.data("sessions.verify", request).await
    }

    #[instrument(skip(self, dto))]
    async fn move_session(&self, id: &SessionId, dto: &MoveSessionDto) -> ConsoleResult<Session> {
        let request = self
            .request(Method::PATCH, &format!("/sessions/{}/schedule", id))
            .json(dto);
        self.data("sessions.move", request).await
    }

    #[instrument(skip(self))]
    async fn complete_session(&self, id: &SessionId) -> ConsoleResult<Session> {
        let request = self.request(Method::POST, &format!("/sessions/{}/complete", id));
        self.data("sessions.complete", request).await
    }

    #[instrument(skip(self))]
    async fn mark_session_missed(&self, id: &SessionId) -> ConsoleResult<Session> {
        let request = self.request(Method::POST, &format!("/sessions/{}/missed", id));
        self.data("sessions.missed", request).await
    }

    #[instrument(skip(self))]
    async fn list_reschedule_requests(
        &self,
        session_id: &SessionId,
    ) -> ConsoleResult<Vec<RescheduleRequest>> {
        let request = self.request(
            Method::GET,
            &format!("/sessions/{}/reschedule-requests", session_id),
        );
        self.data("reschedules.list", request).await
    }

    #[instrument(skip(self, dto))]
    async fn request_reschedule(
        &self,
        session_id: &SessionId,
        dto: &RescheduleRequestDto,
    ) -> ConsoleResult<RescheduleRequest> {
        let request = self
            .request(
                Method::POST,
                &format!("/sessions/{}/reschedule-requests", session_id),
            )
            .json(dto);
        self.data("reschedules.create", request).await
    }

    #[instrument(skip(self, dto))]
    async fn resolve_reschedule(
        &self,
        id: &RescheduleRequestId,
        dto: &ResolveRescheduleDto,
    ) -> ConsoleResult<RescheduleRequest> {
        let request = self
            .request(Method::POST, &format!("/reschedule-requests/{}/resolve", id))
            .json(dto);
        self.data("reschedules.resolve", request).await
    }

    #[instrument(skip(self))]
    async fn list_students(&self, page: &PaginationParams) -> ConsoleResult<Page<Student>> {
        let request = self.request(Method::GET, "/students").query(&page.as_query());
        self.page("students.list", request).await
    }

    #[instrument(skip(self))]
    async fn list_trainers(&self, page: &PaginationParams) -> ConsoleResult<Page<Trainer>> {
        let request = self.request(Method::GET, "/trainers").query(&page.as_query());
        self.page("trainers.list", request).await
    }

    #[instrument(skip(self))]
    async fn list_auto_assign_attempts(&self) -> ConsoleResult<Vec<AutoAssignmentAttempt>> {
        self.data(
            "auto_assign.attempts",
            self.request(Method::GET, "/auto-assign/attempts"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(excerpt(&long).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_request_carries_bearer_token() {
        let remote = HttpRemote::new(
            ApiConfig::default()
                .with_base_url("http://console.test/api/")
                .with_token("secret"),
        )
        .unwrap();
        let request = remote.request(Method::GET, "/students").build().unwrap();

        assert_eq!(request.url().as_str(), "http://console.test/api/students");
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer secret"
        );
    }
}
