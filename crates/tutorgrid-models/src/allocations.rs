//! Allocation domain models and DTOs.
//!
//! An allocation binds one student to one trainer for a course. The backend
//! sends a nullable `trainerId` and infers "auto" allocations from an
//! `allocatedBy == "System"` actor string; both are normalized here at the
//! decoding boundary into [`TrainerAssignment`] and [`AssignmentMethod`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::ids::{AllocationId, CourseId, RegionId, StudentId, TrainerId};
use crate::people::RegionScoped;

/// Actor name the backend records for algorithmic assignments.
pub const SYSTEM_ACTOR: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Pending,
    Approved,
    Active,
    Rejected,
    Completed,
    Cancelled,
}

impl AllocationStatus {
    pub const ALL: [AllocationStatus; 6] = [
        AllocationStatus::Pending,
        AllocationStatus::Approved,
        AllocationStatus::Active,
        AllocationStatus::Rejected,
        AllocationStatus::Completed,
        AllocationStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AllocationStatus::Pending => "Pending",
            AllocationStatus::Approved => "Approved",
            AllocationStatus::Active => "Active",
            AllocationStatus::Rejected => "Rejected",
            AllocationStatus::Completed => "Completed",
            AllocationStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AllocationStatus::Completed | AllocationStatus::Rejected | AllocationStatus::Cancelled
        )
    }

    /// Approved and Active both mean "tutoring is under way".
    pub fn is_live(self) -> bool {
        matches!(self, AllocationStatus::Approved | AllocationStatus::Active)
    }

    /// Approved, Active and Completed allocations always carry a trainer.
    pub fn requires_trainer(self) -> bool {
        matches!(
            self,
            AllocationStatus::Approved | AllocationStatus::Active | AllocationStatus::Completed
        )
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMethod {
    #[default]
    Manual,
    Auto,
}

/// Who (if anyone) is bound as trainer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrainerAssignment {
    /// Created without a trainer; waiting for a manual pick.
    Unassigned,
    /// Waiting on the auto-assignment algorithm.
    PendingAutoAssign,
    Assigned(TrainerId),
}

impl TrainerAssignment {
    pub fn trainer_id(&self) -> Option<&TrainerId> {
        match self {
            TrainerAssignment::Assigned(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, TrainerAssignment::Assigned(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    #[default]
    Weekdays,
    Weekends,
    Daily,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllocationWire", into = "AllocationWire")]
pub struct Allocation {
    pub id: AllocationId,
    pub student_id: StudentId,
    pub trainer: TrainerAssignment,
    pub course_id: CourseId,
    pub status: AllocationStatus,
    pub method: AssignmentMethod,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub allocated_by: Option<String>,
    pub allocated_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub schedule_mode: ScheduleMode,
    pub notes: Option<String>,
    /// Home region of the student; the key every scope check uses.
    pub region_id: RegionId,
}

impl Allocation {
    pub fn trainer_id(&self) -> Option<&TrainerId> {
        self.trainer.trainer_id()
    }

    pub fn is_auto(&self) -> bool {
        self.method == AssignmentMethod::Auto
    }

    /// Append a line to the free-text notes.
    pub fn append_note(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line.to_string(),
        });
    }
}

impl RegionScoped for Allocation {
    fn region_id(&self) -> &RegionId {
        &self.region_id
    }
}

/// Wire shape of an allocation as the remote API sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocationWire {
    id: AllocationId,
    student_id: StudentId,
    #[serde(default)]
    trainer_id: Option<TrainerId>,
    course_id: CourseId,
    status: AllocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<AssignmentMethod>,
    requested_by: String,
    requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allocated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allocated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
    #[serde(default)]
    schedule_mode: ScheduleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    region_id: RegionId,
}

impl TryFrom<AllocationWire> for Allocation {
    type Error = String;

    fn try_from(wire: AllocationWire) -> Result<Self, Self::Error> {
        if wire.trainer_id.is_none() && wire.status.requires_trainer() {
            return Err(format!(
                "allocation {} is {} but has no trainer",
                wire.id, wire.status
            ));
        }

        // Records written before `method` existed only carry the actor string.
        let method = wire.method.unwrap_or_else(|| {
            if wire.allocated_by.as_deref() == Some(SYSTEM_ACTOR) {
                AssignmentMethod::Auto
            } else {
                AssignmentMethod::Manual
            }
        });

        let trainer = match wire.trainer_id {
            Some(id) => TrainerAssignment::Assigned(id),
            None if wire.status == AllocationStatus::Pending
                && method == AssignmentMethod::Auto =>
            {
                TrainerAssignment::PendingAutoAssign
            }
            None => TrainerAssignment::Unassigned,
        };

        Ok(Self {
            id: wire.id,
            student_id: wire.student_id,
            trainer,
            course_id: wire.course_id,
            status: wire.status,
            method,
            requested_by: wire.requested_by,
            requested_at: wire.requested_at,
            allocated_by: wire.allocated_by,
            allocated_at: wire.allocated_at,
            rejected_by: wire.rejected_by,
            rejected_at: wire.rejected_at,
            rejection_reason: wire.rejection_reason,
            schedule_mode: wire.schedule_mode,
            notes: wire.notes,
            region_id: wire.region_id,
        })
    }
}

impl From<Allocation> for AllocationWire {
    fn from(a: Allocation) -> Self {
        Self {
            id: a.id,
            student_id: a.student_id,
            trainer_id: a.trainer.trainer_id().cloned(),
            course_id: a.course_id,
            status: a.status,
            method: Some(a.method),
            requested_by: a.requested_by,
            requested_at: a.requested_at,
            allocated_by: a.allocated_by,
            allocated_at: a.allocated_at,
            rejected_by: a.rejected_by,
            rejected_at: a.rejected_at,
            rejection_reason: a.rejection_reason,
            schedule_mode: a.schedule_mode,
            notes: a.notes,
            region_id: a.region_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllocationDto {
    pub student_id: StudentId,
    #[serde(default)]
    pub trainer_id: Option<TrainerId>,
    pub course_id: CourseId,
    #[serde(default)]
    pub schedule_mode: ScheduleMode,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAllocationDto {
    #[serde(default)]
    pub trainer_id: Option<TrainerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectAllocationDto {
    #[validate(length(min = 1, max = 500, message = "a rejection reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReallocateDto {
    pub new_trainer_id: TrainerId,
    #[validate(length(min = 1, max = 500, message = "a reallocation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RetryAutoAssignDto {
    pub student_id: StudentId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationFilterParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AllocationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<AssignmentMethod>,
}
