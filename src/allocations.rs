//! Allocation lifecycle.
//!
//! ```text
//! Pending ──approve──▶ Approved ──complete──▶ Completed
//!    │  └─auto-assign─▶ Active   ──cancel────▶ Cancelled
//!    ├──reject──▶ Rejected
//!    └──cancel──▶ Cancelled
//! ```
//!
//! Reallocation replaces the trainer and never moves the status. Every
//! function checks first and mutates only on success, so a rejected
//! transition leaves the allocation exactly as it was.

use chrono::{DateTime, Utc};
use validator::Validate;

use tutorgrid_core::{ConsoleError, ConsoleResult};
use tutorgrid_models::{
    Allocation, AllocationId, AllocationStatus, AssignmentMethod, AttemptStatus,
    AutoAssignmentAttempt, CreateAllocationDto, RegionId, SYSTEM_ACTOR, TrainerAssignment,
    TrainerId,
};

const ENTITY: &str = "allocation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationAction {
    Approve,
    Reject,
    Reallocate,
    Cancel,
    Complete,
    AutoAssign,
}

impl AllocationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AllocationAction::Approve => "approve",
            AllocationAction::Reject => "reject",
            AllocationAction::Reallocate => "reallocate",
            AllocationAction::Cancel => "cancel",
            AllocationAction::Complete => "complete",
            AllocationAction::AutoAssign => "auto-assign",
        }
    }
}

/// Whether a call changed anything. Resubmitting an action whose terminal
/// target is already held is a successful no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        self == Transition::Applied
    }
}

/// The transition table. `None` means the pair is not allowed.
pub fn next_status(from: AllocationStatus, action: AllocationAction) -> Option<AllocationStatus> {
    use AllocationAction as A;
    use AllocationStatus::*;
    match (from, action) {
        (Pending, A::Approve) => Some(Approved),
        (Pending, A::Reject) => Some(Rejected),
        (Pending, A::AutoAssign) => Some(Active),
        (Pending | Approved | Active, A::Reallocate) => Some(from),
        (Pending | Approved | Active, A::Cancel) => Some(Cancelled),
        (Approved | Active, A::Complete) => Some(Completed),
        _ => None,
    }
}

pub fn can_transition(from: AllocationStatus, action: AllocationAction) -> bool {
    next_status(from, action).is_some()
}

fn check(allocation: &Allocation, action: AllocationAction) -> ConsoleResult<AllocationStatus> {
    next_status(allocation.status, action).ok_or_else(|| {
        ConsoleError::invalid_transition(ENTITY, allocation.status, action.as_str())
    })
}

/// A record that should carry a trainer but does not cannot move on.
fn ensure_trainer_resolved(allocation: &Allocation) -> ConsoleResult<()> {
    if allocation.status.requires_trainer() && !allocation.trainer.is_assigned() {
        return Err(ConsoleError::UnresolvableTrainer(allocation.id.to_string()));
    }
    Ok(())
}

/// Build a new `Pending` manual request. The region is the student's home
/// region.
pub fn create(
    dto: CreateAllocationDto,
    region_id: RegionId,
    requested_by: &str,
    now: DateTime<Utc>,
) -> ConsoleResult<Allocation> {
    dto.validate()?;

    let trainer = match dto.trainer_id {
        Some(id) => TrainerAssignment::Assigned(id),
        None => TrainerAssignment::Unassigned,
    };

    Ok(Allocation {
        id: AllocationId::generate(),
        student_id: dto.student_id,
        trainer,
        course_id: dto.course_id,
        status: AllocationStatus::Pending,
        method: AssignmentMethod::Manual,
        requested_by: requested_by.to_string(),
        requested_at: now,
        allocated_by: None,
        allocated_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        schedule_mode: dto.schedule_mode,
        notes: dto.notes.filter(|n| !n.trim().is_empty()),
        region_id,
    })
}

/// Pending → Approved. A supplied trainer wins over an existing assignment.
pub fn approve(
    allocation: &mut Allocation,
    trainer: Option<TrainerId>,
    actor: &str,
    now: DateTime<Utc>,
) -> ConsoleResult<Transition> {
    let next = check(allocation, AllocationAction::Approve)?;
    let trainer = trainer
        .or_else(|| allocation.trainer_id().cloned())
        .ok_or_else(|| ConsoleError::UnresolvableTrainer(allocation.id.to_string()))?;

    allocation.trainer = TrainerAssignment::Assigned(trainer);
    allocation.status = next;
    allocation.allocated_by = Some(actor.to_string());
    allocation.allocated_at = Some(now);
    Ok(Transition::Applied)
}

pub fn reject(
    allocation: &mut Allocation,
    reason: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> ConsoleResult<Transition> {
    let reason = reason.trim();
    if allocation.status == AllocationStatus::Rejected
        && allocation.rejection_reason.as_deref() == Some(reason)
    {
        return Ok(Transition::Unchanged);
    }
    let next = check(allocation, AllocationAction::Reject)?;
    if reason.is_empty() {
        return Err(ConsoleError::Validation("a rejection reason is required".into()));
    }

    allocation.status = next;
    allocation.rejected_by = Some(actor.to_string());
    allocation.rejected_at = Some(now);
    allocation.rejection_reason = Some(reason.to_string());
    Ok(Transition::Applied)
}

/// Swap the trainer and record why in the notes. Status and sessions stay
/// as they are.
pub fn reallocate(
    allocation: &mut Allocation,
    new_trainer: TrainerId,
    reason: &str,
) -> ConsoleResult<Transition> {
    check(allocation, AllocationAction::Reallocate)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ConsoleError::Validation("a reallocation reason is required".into()));
    }

    let note = match allocation.trainer_id() {
        Some(previous) => format!("Reallocated from {} to {}: {}", previous, new_trainer, reason),
        None => format!("Assigned {}: {}", new_trainer, reason),
    };
    allocation.trainer = TrainerAssignment::Assigned(new_trainer);
    allocation.append_note(&note);
    Ok(Transition::Applied)
}

/// Any non-terminal state → Cancelled. Child sessions are cascaded by the
/// caller with [`crate::sessions::cascade_cancel`].
pub fn cancel(allocation: &mut Allocation) -> ConsoleResult<Transition> {
    if allocation.status == AllocationStatus::Cancelled {
        return Ok(Transition::Unchanged);
    }
    let next = check(allocation, AllocationAction::Cancel)?;
    ensure_trainer_resolved(allocation)?;
    allocation.status = next;
    Ok(Transition::Applied)
}

pub fn complete(allocation: &mut Allocation) -> ConsoleResult<Transition> {
    if allocation.status == AllocationStatus::Completed {
        return Ok(Transition::Unchanged);
    }
    let next = check(allocation, AllocationAction::Complete)?;
    ensure_trainer_resolved(allocation)?;
    allocation.status = next;
    Ok(Transition::Applied)
}

/// The assignment algorithm found a trainer: the pending request goes live
/// as an auto allocation.
pub fn apply_auto_assignment(
    allocation: &mut Allocation,
    trainer: TrainerId,
    now: DateTime<Utc>,
) -> ConsoleResult<Transition> {
    let next = check(allocation, AllocationAction::AutoAssign)?;
    allocation.trainer = TrainerAssignment::Assigned(trainer);
    allocation.status = next;
    allocation.method = AssignmentMethod::Auto;
    allocation.allocated_by = Some(SYSTEM_ACTOR.to_string());
    allocation.allocated_at = Some(now);
    Ok(Transition::Applied)
}

/// A retry is allowed while the attempt has not succeeded and the retry
/// budget is not spent.
pub fn ensure_retryable(attempt: &AutoAssignmentAttempt, max_retries: u32) -> ConsoleResult<()> {
    if attempt.status == AttemptStatus::Succeeded {
        return Err(ConsoleError::invalid_transition(
            "auto-assign attempt",
            "Succeeded",
            "retry",
        ));
    }
    if attempt.retry_count >= max_retries {
        return Err(ConsoleError::Validation(format!(
            "auto-assign retry limit of {} reached",
            max_retries
        )));
    }
    Ok(())
}

/// Record one retry against the attempt.
pub fn record_retry(
    attempt: &mut AutoAssignmentAttempt,
    result: Result<(), String>,
    now: DateTime<Utc>,
) {
    attempt.retry_count += 1;
    attempt.last_attempt_at = Some(now);
    match result {
        Ok(()) => {
            attempt.status = AttemptStatus::Succeeded;
            attempt.failure_reason = None;
        }
        Err(reason) => {
            attempt.status = AttemptStatus::Failed;
            attempt.failure_reason = Some(reason);
        }
    }
}

/// Console list tabs. Derived from status and method, never from actor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationTab {
    PendingManual,
    PendingAuto,
    Active,
    Closed,
}

impl AllocationTab {
    pub fn of(allocation: &Allocation) -> Self {
        match allocation.status {
            AllocationStatus::Pending if allocation.is_auto() => AllocationTab::PendingAuto,
            AllocationStatus::Pending => AllocationTab::PendingManual,
            AllocationStatus::Approved | AllocationStatus::Active => AllocationTab::Active,
            AllocationStatus::Rejected
            | AllocationStatus::Completed
            | AllocationStatus::Cancelled => AllocationTab::Closed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AllocationTab::PendingManual => "pending-manual",
            AllocationTab::PendingAuto => "pending-auto",
            AllocationTab::Active => "active",
            AllocationTab::Closed => "closed",
        }
    }
}
