//! Audit trail and transient notifications.
//!
//! Every console action ends here exactly once: successes become audit entries
//! plus a `Success` notification, failures become an `Error` notification
//! whose `retryable` flag mirrors [`ConsoleError::is_retryable`]. Entries are
//! also emitted on the `tutorgrid::audit` tracing target.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tutorgrid_core::ConsoleError;

use crate::metrics::track_console_action;
use crate::scope::Action;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub actor_id: String,
    pub action: Action,
    pub entity_kind: &'static str,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Only remote failures are worth retrying.
    pub retryable: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn error(error: &ConsoleError) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Bounded, in-memory audit trail. The oldest entries fall off once
/// `capacity` is reached.
#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    entries: VecDeque<AuditEntry>,
    notifications: VecDeque<Notification>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            notifications: VecDeque::new(),
        }
    }

    pub fn record(
        &mut self,
        actor_id: &str,
        action: Action,
        entity_kind: &'static str,
        entity_id: impl ToString,
        detail: Option<String>,
    ) -> &AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            at: Utc::now(),
            actor_id: actor_id.to_string(),
            action,
            entity_kind,
            entity_id: entity_id.to_string(),
            detail,
        };

        info!(
            target: "tutorgrid::audit",
            audit_action = %entry.action,
            audit_resource = entry.entity_kind,
            entity_id = %entry.entity_id,
            actor_id = %entry.actor_id,
            detail = entry.detail.as_deref().unwrap_or(""),
            "Console action recorded"
        );
        track_console_action(action.as_str(), "success");

        self.notifications.push_back(Notification::success(format!(
            "{} {} {}",
            entry.entity_kind, entry.entity_id, past_tense(action)
        )));

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Resubmission of an action whose result already holds.
    pub fn record_noop(&mut self, action: Action, entity_kind: &'static str, entity_id: impl ToString) {
        track_console_action(action.as_str(), "noop");
        self.notifications.push_back(Notification::info(format!(
            "{} {} was already {}",
            entity_kind,
            entity_id.to_string(),
            past_tense(action)
        )));
    }

    pub fn record_failure(&mut self, actor_id: &str, action: Action, error: &ConsoleError) {
        let outcome = if error.is_retryable() { "error" } else { "blocked" };
        if error.is_authorization() {
            warn!(
                target: "tutorgrid::audit",
                security_event = "authorization_denied",
                audit_action = %action,
                actor_id = %actor_id,
                error = %error,
                "Console action denied"
            );
        } else {
            warn!(
                target: "tutorgrid::audit",
                audit_action = %action,
                actor_id = %actor_id,
                error = %error,
                retryable = error.is_retryable(),
                "Console action failed"
            );
        }
        track_console_action(action.as_str(), outcome);
        self.notifications.push_back(Notification::error(error));
    }

    /// Queue a notification that is not tied to an audited action.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.back()
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    /// Hand every queued notification to the caller and forget them.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}

fn past_tense(action: Action) -> &'static str {
    match action {
        Action::CreateAllocation => "requested",
        Action::ApproveAllocation => "approved",
        Action::RejectAllocation => "rejected",
        Action::ReallocateAllocation => "reallocated",
        Action::CancelAllocation => "cancelled",
        Action::CompleteAllocation => "completed",
        Action::RetryAutoAssign => "retried",
        Action::ScheduleSession => "scheduled",
        Action::MoveSession => "moved",
        Action::CompleteSession => "completed",
        Action::MarkSessionMissed => "marked missed",
        Action::VerifySession => "verified",
        Action::RequestReschedule => "submitted",
        Action::ResolveReschedule => "resolved",
        Action::InviteAdmin => "invited",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_and_notifies() {
        let mut log = AuditLog::new(10);
        log.record("admin-1", Action::ApproveAllocation, "allocation", "al-1", None);

        assert_eq!(log.len(), 1);
        let entry = log.last().unwrap();
        assert_eq!(entry.actor_id, "admin-1");
        assert_eq!(entry.entity_id, "al-1");

        let notes = log.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Success);
        assert_eq!(log.pending_notifications(), 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = AuditLog::new(2);
        for id in ["a", "b", "c"] {
            log.record("admin-1", Action::CancelAllocation, "allocation", id, None);
        }
        let ids: Vec<_> = log.entries().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_failure_retryable_only_for_remote() {
        let mut log = AuditLog::new(10);
        log.record_failure("admin-1", Action::ApproveAllocation, &ConsoleError::remote("timeout"));
        log.record_failure(
            "admin-1",
            Action::ApproveAllocation,
            &ConsoleError::out_of_scope("MAN-03"),
        );

        let notes = log.drain_notifications();
        assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
        assert!(notes[0].retryable);
        assert!(!notes[1].retryable);
        assert!(log.is_empty());
    }

    #[test]
    fn test_noop_is_info_without_entry() {
        let mut log = AuditLog::new(10);
        log.record_noop(Action::CancelAllocation, "allocation", "al-1");
        assert!(log.is_empty());
        assert_eq!(log.drain_notifications()[0].level, NotificationLevel::Info);
    }
}
