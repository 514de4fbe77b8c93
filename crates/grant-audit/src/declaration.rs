//! Audit declarations.

use std::fmt;
use std::sync::Arc;

use grant_core::{
    Action, Actor, ChangeFilter, Entity, ExecutionContext, describe_actor, describe_entity,
};
use serde_json::Value;

/// Builds the message stored with an entry.
///
/// Runs with enforcement disabled on the context it receives, so it may load
/// other governed entities through their policies without being checked.
pub type MessageFn<E> =
    Arc<dyn Fn(&ExecutionContext, &E, Option<&Actor>) -> String + Send + Sync>;

/// Wrap a closure as a [`MessageFn`].
pub fn message_fn<E, F>(f: F) -> MessageFn<E>
where
    E: ?Sized,
    F: Fn(&ExecutionContext, &E, Option<&Actor>) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A [`MessageFn`] rendering a template.
///
/// `{actor}`, `{subject}`, `{action}`, `{subject_type}` and `{subject_id}`
/// are substituted. Any other `{name}` is filled from
/// [`Entity::attribute`] when the host exposes it, and kept as written
/// otherwise.
pub fn template_message<E>(action: Action, template: impl Into<String>) -> MessageFn<E>
where
    E: Entity + ?Sized + 'static,
{
    let template = template.into();
    Arc::new(move |_: &ExecutionContext, entity: &E, actor: Option<&Actor>| {
        render_template(&template, |name| match name {
            "actor" => Some(describe_actor(actor)),
            "subject" => Some(describe_entity(entity)),
            "action" => Some(action.as_str().to_string()),
            "subject_type" => Some(entity.entity_type().to_string()),
            "subject_id" => Some(entity.id().unwrap_or_else(|| "new".to_string())),
            other => entity.attribute(other).map(|value| match value {
                Value::String(s) => s,
                value => value.to_string(),
            }),
        })
    })
}

fn render_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// What to capture for one audited action.
pub struct AuditDeclaration<E: ?Sized> {
    pub action: Action,
    pub filter: ChangeFilter,
    pub message: Option<MessageFn<E>>,
}

impl<E: ?Sized> AuditDeclaration<E> {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            filter: ChangeFilter::default(),
            message: None,
        }
    }

    pub fn with_filter(mut self, filter: ChangeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_message(mut self, message: MessageFn<E>) -> Self {
        self.message = Some(message);
        self
    }
}

impl<E: ?Sized> Clone for AuditDeclaration<E> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            filter: self.filter.clone(),
            message: self.message.clone(),
        }
    }
}

impl<E: ?Sized> fmt::Debug for AuditDeclaration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditDeclaration")
            .field("action", &self.action)
            .field("filter", &self.filter)
            .field("message", &self.message.is_some())
            .finish()
    }
}
