//! # TutorGrid Models
//!
//! Domain models and DTOs for the TutorGrid console.
//!
//! # Modules
//!
//! - [`admins`]: Admins, their region anchor, and role codes
//! - [`allocations`]: Student-trainer allocations and their request DTOs
//! - [`auto_assign`]: Auto-assignment attempts
//! - [`envelope`]: The remote API response envelope
//! - [`ids`]: Strongly-typed identifiers
//! - [`people`]: Students, trainers, and the [`RegionScoped`] seam
//! - [`regions`]: Region hierarchy nodes and levels
//! - [`sessions`]: Sessions, verification, and reschedule requests
//!
//! # Example
//!
//! ```ignore
//! use tutorgrid_models::{Admin, AdminRegion, RegionNode, RegionType};
//!
//! let mandal = RegionNode::new("MAN-01", "Ameerpet", RegionType::Mandal);
//! assert!(mandal.is_leaf());
//! ```

pub mod admins;
pub mod allocations;
pub mod auto_assign;
pub mod envelope;
pub mod ids;
pub mod people;
pub mod regions;
pub mod sessions;

// Re-export commonly used types at crate root for convenience
pub use admins::{Admin, AdminRegion, InviteAdminDto, RoleCode, role_codes};

pub use allocations::{
    Allocation, AllocationFilterParams, AllocationStatus, ApproveAllocationDto, AssignmentMethod,
    CreateAllocationDto, ReallocateDto, RejectAllocationDto, RetryAutoAssignDto, SYSTEM_ACTOR,
    ScheduleMode, TrainerAssignment,
};

pub use auto_assign::{AssignmentCriteria, AttemptStatus, AutoAssignOutcome, AutoAssignmentAttempt};

pub use envelope::ApiEnvelope;

pub use ids::{
    AdminId, AllocationId, AttemptId, CourseId, RegionId, RescheduleRequestId, SessionId,
    StudentId, TrainerId,
};

pub use people::{RegionScoped, Student, Trainer};

pub use regions::{RegionNode, RegionType};

pub use sessions::{
    MoveSessionDto, RequestedBy, RescheduleDecision, RescheduleRequest, RescheduleRequestDto,
    RescheduleStatus, ResolveRescheduleDto, ScheduleSessionDto, Session, SessionStatus,
    VerificationChannel, VerificationOutcome, VerificationStatus, VerifySessionDto,
};
