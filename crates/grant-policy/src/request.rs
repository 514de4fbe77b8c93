//! Permission request types.
//!
//! This module defines what a rule predicate gets to see when it is
//! evaluated.

use grant_core::{Actor, Entity, ExecutionContext};

/// Everything a predicate needs to decide one permission.
///
/// Predicates run with enforcement disabled on `ctx`, so they may load or
/// inspect other governed entities through it without being checked.
pub struct PermissionRequest<'a, E: ?Sized> {
    /// The unit of work the check runs in.
    pub ctx: &'a ExecutionContext,
    /// The current actor, `None` when unauthenticated.
    pub actor: Option<&'a Actor>,
    /// The entity the transition applies to.
    pub subject: &'a E,
    /// The entity being added to or removed from a relation.
    pub associated: Option<&'a dyn Entity>,
}

impl<'a, E: ?Sized> PermissionRequest<'a, E> {
    pub fn new(ctx: &'a ExecutionContext, actor: Option<&'a Actor>, subject: &'a E) -> Self {
        Self {
            ctx,
            actor,
            subject,
            associated: None,
        }
    }

    pub fn with_associated(mut self, associated: &'a dyn Entity) -> Self {
        self.associated = Some(associated);
        self
    }

    /// Whether an actor with `role` is set.
    pub fn actor_has_role(&self, role: &str) -> bool {
        self.actor.map(|a| a.has_role(role)).unwrap_or(false)
    }

    /// Id of the current actor, if any.
    pub fn actor_id(&self) -> Option<&str> {
        self.actor.map(|a| a.id.as_str())
    }
}
