//! The persisted record of one observed lifecycle event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;
use crate::actor::{ANONYMOUS, Actor};
use crate::entity::ChangeSet;

/// Actor id recorded when no actor is set.
pub const ANONYMOUS_ACTOR_ID: &str = "0";

/// One audited lifecycle event (matches `schemas/AuditEntry.schema.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID.
    pub entry_id: Uuid,

    /// Identity of the audited entity.
    pub subject_id: String,
    pub subject_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_version: Option<i64>,

    pub actor_id: String,
    pub actor_type: String,

    pub action: Action,

    /// `false` while the transition is in flight.
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Filtered change-set, `None` when nothing survived the filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,

    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a builder for an entry about an entity of `subject_type`.
    pub fn builder(action: Action, subject_type: impl Into<String>) -> AuditEntryBuilder {
        AuditEntryBuilder::new(action, subject_type)
    }

    /// Check the fields every persisted row must carry.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("subject_id", &self.subject_id),
            ("subject_type", &self.subject_type),
            ("actor_id", &self.actor_id),
            ("actor_type", &self.actor_type),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("audit entry is missing required field '{}'", field));
            }
        }
        Ok(())
    }

    /// Human-readable log line.
    ///
    /// Format: `[timestamp] ACTION subject=Type:id actor=Type:id success=...`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} subject={}:{} actor={}:{} success={}",
            self.created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.action.as_str().to_uppercase(),
            self.subject_type,
            self.subject_id,
            self.actor_type,
            self.actor_id,
            self.success,
        );

        if let Some(version) = self.subject_version {
            line.push_str(&format!(" version={}", version));
        }

        if let Some(ref changes) = self.changes {
            let fields: Vec<&str> = changes.keys().map(String::as_str).collect();
            line.push_str(&format!(" changed_fields=[{}]", fields.join(",")));
        }

        if let Some(ref message) = self.message {
            line.push_str(&format!(" message=\"{}\"", message.replace('"', "'")));
        }

        line
    }
}

/// Builder for audit entries.
#[derive(Debug)]
pub struct AuditEntryBuilder {
    entry: AuditEntry,
}

impl AuditEntryBuilder {
    pub fn new(action: Action, subject_type: impl Into<String>) -> Self {
        Self {
            entry: AuditEntry {
                entry_id: Uuid::new_v4(),
                subject_id: String::new(),
                subject_type: subject_type.into(),
                subject_version: None,
                actor_id: ANONYMOUS_ACTOR_ID.to_string(),
                actor_type: ANONYMOUS.to_string(),
                action,
                success: false,
                message: None,
                changes: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn subject_id(mut self, id: impl Into<String>) -> Self {
        self.entry.subject_id = id.into();
        self
    }

    pub fn subject_version(mut self, version: Option<i64>) -> Self {
        self.entry.subject_version = version;
        self
    }

    /// Record the actor; an absent actor is recorded as anonymous.
    pub fn actor(mut self, actor: Option<&Actor>) -> Self {
        if let Some(actor) = actor {
            self.entry.actor_id = actor.id.clone();
            self.entry.actor_type = actor.actor_type.clone();
        }
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.entry.success = success;
        self
    }

    pub fn message(mut self, message: Option<String>) -> Self {
        self.entry.message = message;
        self
    }

    /// Set the change-set; an empty set is stored as `None`.
    pub fn changes(mut self, changes: ChangeSet) -> Self {
        self.entry.changes = if changes.is_empty() { None } else { Some(changes) };
        self
    }

    pub fn build(self) -> AuditEntry {
        self.entry
    }
}
