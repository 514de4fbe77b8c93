//! Registered rules.
//!
//! A rule binds one predicate to one target: a canonical action, a single
//! attribute, or an association action on a named relation.

use std::fmt;
use std::sync::Arc;

use grant_core::{Action, AssociationAction};

use crate::request::PermissionRequest;

/// A rule predicate.
pub type Predicate<E> = Arc<dyn Fn(&PermissionRequest<'_, E>) -> bool + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<E, F>(f: F) -> Predicate<E>
where
    E: ?Sized,
    F: Fn(&PermissionRequest<'_, E>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a rule governs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleTarget {
    Action(Action),
    Attribute(String),
    Association(AssociationAction, String),
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Action(action) => write!(f, "{}", action),
            RuleTarget::Attribute(name) => write!(f, "attribute {}", name),
            RuleTarget::Association(action, relation) => write!(f, "{} {}", action, relation),
        }
    }
}

/// A predicate bound to one target. Immutable once built.
pub struct Rule<E: ?Sized> {
    target: RuleTarget,
    predicate: Predicate<E>,
}

impl<E: ?Sized> Rule<E> {
    pub fn new(target: RuleTarget, predicate: Predicate<E>) -> Self {
        Self { target, predicate }
    }

    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// Evaluate the predicate.
    pub fn permits(&self, request: &PermissionRequest<'_, E>) -> bool {
        (self.predicate)(request)
    }
}

impl<E: ?Sized> Clone for Rule<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E: ?Sized> fmt::Debug for Rule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("target", &self.target).finish_non_exhaustive()
    }
}
