//! Grant introspection.
//!
//! Lists which actions and attributes are, or are not, currently granted to
//! the actor in an [`ExecutionContext`].

use std::collections::BTreeSet;

use grant_core::{Action, AttributeSchema, Entity, ExecutionContext};
use serde::Serialize;

use crate::evaluator::PermissionEvaluator;

/// Members to ask about. Empty lists mean "every known member".
#[derive(Debug, Clone, Default)]
pub struct GrantQuery {
    pub actions: Vec<Action>,
    pub attributes: Vec<String>,
}

impl GrantQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }
}

/// Members whose grant state matched the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantReport {
    pub actions: Vec<Action>,
    pub attributes: Vec<String>,
}

impl<E: Entity + ?Sized> PermissionEvaluator<E> {
    /// Actions and attributes whose grant state equals `want_granted`.
    ///
    /// Unfiltered results are sorted by name; filtered results keep the order
    /// of `query`.
    pub fn granted(
        &self,
        ctx: &ExecutionContext,
        subject: &E,
        query: &GrantQuery,
        want_granted: bool,
    ) -> GrantReport {
        let actions = if query.actions.is_empty() {
            let mut all = Action::ALL.to_vec();
            all.sort_by_key(|a| a.as_str());
            all
        } else {
            query.actions.clone()
        };

        let attributes = if query.attributes.is_empty() {
            self.known_attributes()
        } else {
            query.attributes.clone()
        };

        GrantReport {
            actions: actions
                .into_iter()
                .filter(|action| self.is_granted(ctx, *action, subject) == want_granted)
                .collect(),
            attributes: attributes
                .into_iter()
                .filter(|name| self.is_attribute_granted(ctx, name, subject) == want_granted)
                .collect(),
        }
    }

    /// Schema attributes if known, otherwise every attribute with a rule.
    fn known_attributes(&self) -> Vec<String> {
        let names: BTreeSet<String> = match self.schema() {
            Some(schema) => schema.attribute_names().into_iter().collect(),
            None => self.granted_attribute_names().map(str::to_string).collect(),
        };
        names.into_iter().collect()
    }
}
