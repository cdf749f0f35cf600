//! Auto-assignment attempt models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocations::{Allocation, AssignmentMethod};
use crate::ids::{AttemptId, CourseId, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Pending,
    Failed,
    Succeeded,
}

/// Matching criteria the assignment algorithm ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCriteria {
    /// Maximum trainer distance in kilometres.
    pub proximity: f64,
    pub specialty_match: bool,
    #[serde(default)]
    pub availability: bool,
}

impl Default for AssignmentCriteria {
    fn default() -> Self {
        Self {
            proximity: 10.0,
            specialty_match: true,
            availability: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignmentAttempt {
    pub id: AttemptId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    #[serde(default = "auto_method")]
    pub method: AssignmentMethod,
    pub status: AttemptStatus,
    pub retry_count: u32,
    #[serde(default)]
    pub criteria: AssignmentCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

fn auto_method() -> AssignmentMethod {
    AssignmentMethod::Auto
}

impl AutoAssignmentAttempt {
    pub fn matches(&self, student_id: &StudentId, course_id: &CourseId) -> bool {
        &self.student_id == student_id && &self.course_id == course_id
    }
}

/// Result of one retry: the updated attempt plus, on success, the allocation
/// that left `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAssignOutcome {
    pub attempt: AutoAssignmentAttempt,
    #[serde(default)]
    pub allocation: Option<Allocation>,
}

impl AutoAssignOutcome {
    pub fn succeeded(&self) -> bool {
        self.attempt.status == AttemptStatus::Succeeded
    }
}
