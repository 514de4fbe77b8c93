//! Shared fixtures for the kernel scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use grant_audit::MemoryStore;
use grant_core::{Actor, AttributeChange, ChangeSet, Entity};
use grant_kernel::EntityPolicy;
use grant_policy::{PermissionRequest, predicate};
use serde_json::{Value, json};

// =============================================================================
// ENTITIES
// =============================================================================

/// A versioned entity with pending changes.
#[derive(Debug, Clone, Default)]
pub struct Article {
    pub id: Option<u64>,
    pub version: Option<i64>,
    pub author_id: String,
    pub changes: ChangeSet,
}

impl Article {
    pub fn new(author_id: &str) -> Self {
        Self {
            author_id: author_id.to_string(),
            ..Default::default()
        }
    }

    pub fn change(mut self, name: &str, old: Value, new: Value) -> Self {
        self.changes
            .insert(name.to_string(), AttributeChange::new(old, new));
        self
    }

    /// Simulate the host persisting the entity.
    pub fn persisted(mut self, id: u64) -> Self {
        self.id = Some(id);
        self.version = Some(self.version.unwrap_or(0) + 1);
        self.changes.clear();
        self
    }
}

impl Entity for Article {
    fn entity_type(&self) -> &str {
        "Article"
    }

    fn id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn version(&self) -> Option<i64> {
        self.version
    }

    fn changed_attributes(&self) -> ChangeSet {
        self.changes.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "author_id" => Some(json!(self.author_id)),
            _ => None,
        }
    }
}

/// A plain entity used as an association target.
pub struct Label {
    pub id: u64,
}

impl Entity for Label {
    fn entity_type(&self) -> &str {
        "Label"
    }

    fn id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

// =============================================================================
// ACTORS
// =============================================================================

pub fn admin() -> Actor {
    Actor::new("User", "1").with_role("admin")
}

pub fn author(id: &str) -> Actor {
    Actor::new("User", id).with_role("author")
}

// =============================================================================
// POLICIES
// =============================================================================

/// Admins create and destroy, authors update their own articles, anyone finds.
/// Title and body are editable by anyone allowed to update; `published` by
/// admins only.
pub fn article_policy() -> (EntityPolicy<Article>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mut policy = EntityPolicy::new("Article", store.clone());

    policy
        .grant(
            ["create", "destroy"],
            predicate(|req: &PermissionRequest<'_, Article>| req.actor_has_role("admin")),
        )
        .unwrap();
    policy
        .grant(
            ["update"],
            predicate(|req: &PermissionRequest<'_, Article>| {
                req.actor_has_role("admin") || req.actor_id() == Some(req.subject.author_id.as_str())
            }),
        )
        .unwrap();
    policy
        .grant(["find"], predicate(|_: &PermissionRequest<'_, Article>| true))
        .unwrap();

    policy
        .grant_attributes(
            ["title", "body", "author_id"],
            predicate(|_: &PermissionRequest<'_, Article>| true),
        )
        .unwrap();
    policy
        .grant_attributes(
            ["published"],
            predicate(|req: &PermissionRequest<'_, Article>| req.actor_has_role("admin")),
        )
        .unwrap();

    (policy, store)
}
