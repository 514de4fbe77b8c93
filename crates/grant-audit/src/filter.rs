//! Audit entry queries.

use chrono::{DateTime, Utc};
use grant_core::{Action, AuditEntry};

/// Filter for querying audit entries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by subject entity type.
    pub subject_type: Option<String>,
    /// Filter by subject id.
    pub subject_id: Option<String>,
    /// Filter by actor type.
    pub actor_type: Option<String>,
    /// Filter by actor id.
    pub actor_id: Option<String>,
    /// Filter by action.
    pub action: Option<Action>,
    /// Filter by outcome.
    pub success: Option<bool>,
    /// Filter by start time (inclusive).
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by end time (inclusive).
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// Entries about one entity.
    pub fn for_subject(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: Some(subject_type.into()),
            subject_id: Some(subject_id.into()),
            ..Default::default()
        }
    }

    /// Entries recorded for one actor.
    pub fn for_actor(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type: Some(actor_type.into()),
            actor_id: Some(actor_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        fn eq(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map(|w| w == actual).unwrap_or(true)
        }

        eq(&self.subject_type, &entry.subject_type)
            && eq(&self.subject_id, &entry.subject_id)
            && eq(&self.actor_type, &entry.actor_type)
            && eq(&self.actor_id, &entry.actor_id)
            && self.action.map(|a| a == entry.action).unwrap_or(true)
            && self.success.map(|s| s == entry.success).unwrap_or(true)
            && self.start_time.map(|t| entry.created_at >= t).unwrap_or(true)
            && self.end_time.map(|t| entry.created_at <= t).unwrap_or(true)
    }

    /// Select matching entries, then apply offset and limit.
    pub fn apply<I>(&self, entries: I) -> Vec<AuditEntry>
    where
        I: IntoIterator<Item = AuditEntry>,
    {
        entries
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
