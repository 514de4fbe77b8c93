//! Identity of whoever performs an operation.

use serde::{Deserialize, Serialize};

/// Descriptor used in messages and audit rows when no actor is set.
pub const ANONYMOUS: &str = "anonymous";

/// The user or system principal attempting an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Kind of principal (e.g., "User", "ServiceAccount").
    pub actor_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Arbitrary attributes available to predicates.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub attrs: serde_json::Value,
}

impl Actor {
    pub fn new(actor_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            id: id.into(),
            roles: Vec::new(),
            attrs: serde_json::Value::Null,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_attrs(mut self, attrs: serde_json::Value) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Look up a single attribute by key.
    pub fn attr(&self, key: &str) -> Option<&serde_json::Value> {
        self.attrs.get(key)
    }

    /// `Type:id` descriptor.
    pub fn descriptor(&self) -> String {
        format!("{}:{}", self.actor_type, self.id)
    }
}

/// Descriptor for an optional actor, `anonymous` when absent.
pub fn describe_actor(actor: Option<&Actor>) -> String {
    actor
        .map(Actor::descriptor)
        .unwrap_or_else(|| ANONYMOUS.to_string())
}
