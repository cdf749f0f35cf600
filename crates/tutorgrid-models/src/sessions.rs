//! Session and reschedule models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::ids::{AllocationId, RescheduleRequestId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    Missed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
            SessionStatus::Missed => "Missed",
        }
    }

    /// Completed and cancelled sessions accept no further schedule changes.
    pub fn is_closed(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationChannel {
    Gps,
    Face,
}

impl fmt::Display for VerificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationChannel::Gps => f.write_str("gps"),
            VerificationChannel::Face => f.write_str("face"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl From<VerificationOutcome> for VerificationStatus {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Passed => VerificationStatus::Passed,
            VerificationOutcome::Failed => VerificationStatus::Failed,
        }
    }
}

/// One scheduled tutoring meeting under an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub allocation_id: AllocationId,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Length in minutes.
    pub duration: u32,
    pub status: SessionStatus,
    #[serde(default)]
    pub gps_status: VerificationStatus,
    #[serde(default)]
    pub face_status: VerificationStatus,
}

impl Session {
    pub fn verification(&self, channel: VerificationChannel) -> VerificationStatus {
        match channel {
            VerificationChannel::Gps => self.gps_status,
            VerificationChannel::Face => self.face_status,
        }
    }

    pub fn verification_mut(&mut self, channel: VerificationChannel) -> &mut VerificationStatus {
        match channel {
            VerificationChannel::Gps => &mut self.gps_status,
            VerificationChannel::Face => &mut self.face_status,
        }
    }

    pub fn is_fully_verified(&self) -> bool {
        self.gps_status == VerificationStatus::Passed
            && self.face_status == VerificationStatus::Passed
    }

    /// Calendar slot key: sessions collide when these match.
    pub fn slot(&self) -> (NaiveDate, NaiveTime) {
        (self.scheduled_date, self.scheduled_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedBy {
    Student,
    Trainer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RescheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescheduleStatus::Pending => f.write_str("Pending"),
            RescheduleStatus::Approved => f.write_str("Approved"),
            RescheduleStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescheduleDecision {
    Approved,
    Rejected,
}

impl From<RescheduleDecision> for RescheduleStatus {
    fn from(decision: RescheduleDecision) -> Self {
        match decision {
            RescheduleDecision::Approved => RescheduleStatus::Approved,
            RescheduleDecision::Rejected => RescheduleStatus::Rejected,
        }
    }
}

/// A proposed move of a session to a new date/time. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub id: RescheduleRequestId,
    pub session_id: SessionId,
    pub requested_by: RequestedBy,
    pub original_date: NaiveDate,
    pub original_time: NaiveTime,
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    pub reason: String,
    pub status: RescheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RescheduleRequest {
    pub fn is_resolved(&self) -> bool {
        self.status != RescheduleStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSessionDto {
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    #[validate(range(min = 15, max = 480, message = "duration must be 15-480 minutes"))]
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySessionDto {
    pub channel: VerificationChannel,
    pub outcome: VerificationOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequestDto {
    pub requested_by: RequestedBy,
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    #[validate(length(min = 1, max = 500, message = "a reschedule reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRescheduleDto {
    pub decision: RescheduleDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSessionDto {
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
}
