//! Permission denial errors.
//!
//! A denial is always fatal to the transition that triggered it. It carries
//! the actor and subject descriptors so it can be both logged and shown to an
//! operator.

use serde::Serialize;
use std::fmt;

/// A transition failed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDenied {
    /// The kind of denial.
    pub kind: DeniedKind,
    /// The denied action (`create`, `find`, `update`, `destroy`, `add`, `remove`).
    pub action: String,
    /// `Type:id` of the actor, or `anonymous`.
    pub actor: String,
    /// `Type:id` of the subject entity.
    pub subject: String,
    /// Every denied attribute, sorted (attribute denials only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    /// Relation name (association denials only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// `Type:id` of the associated entity (association denials only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated: Option<String>,
    /// Human-readable error message.
    pub message: String,
}

impl PermissionDenied {
    /// The action itself is not granted.
    pub fn action(action: impl Into<String>, actor: impl Into<String>, subject: impl Into<String>) -> Self {
        let (action, actor, subject) = (action.into(), actor.into(), subject.into());
        let message = format!(
            "{} permission not granted to {} for resource {}",
            action, actor, subject
        );
        Self {
            kind: DeniedKind::Action,
            action,
            actor,
            subject,
            attributes: Vec::new(),
            relation: None,
            associated: None,
            message,
        }
    }

    /// One or more changed attributes are not granted.
    pub fn attributes(
        action: impl Into<String>,
        mut attributes: Vec<String>,
        actor: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        attributes.sort();
        attributes.dedup();
        let (action, actor, subject) = (action.into(), actor.into(), subject.into());
        let message = format!(
            "{} permission not granted to {} for resource {}",
            attributes.join(", "),
            actor,
            subject
        );
        Self {
            kind: DeniedKind::Attributes,
            action,
            actor,
            subject,
            attributes,
            relation: None,
            associated: None,
            message,
        }
    }

    /// Adding to or removing from a relation is not granted.
    pub fn association(
        action: impl Into<String>,
        relation: impl Into<String>,
        associated: impl Into<String>,
        actor: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        let (action, relation, associated) = (action.into(), relation.into(), associated.into());
        let (actor, subject) = (actor.into(), subject.into());
        let message = format!(
            "{} permission to {}:{} association not granted to {} for resource {}",
            action, relation, associated, actor, subject
        );
        Self {
            kind: DeniedKind::Association,
            action,
            actor,
            subject,
            attributes: Vec::new(),
            relation: Some(relation),
            associated: Some(associated),
            message,
        }
    }
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PermissionDenied {}

/// Categories of denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedKind {
    /// Create, find, update or destroy.
    Action,
    /// Changed attributes of a save.
    Attributes,
    /// Relation membership add or remove.
    Association,
}
