//! Host entity abstraction.
//!
//! The kernel never owns domain entities. It inspects them through the
//! [`Entity`] trait, which the host data layer implements for each entity
//! type it wants governed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Old and new value of one changed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub old: Value,
    pub new: Value,
}

impl AttributeChange {
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

/// Pending changes of an entity, keyed by attribute name.
pub type ChangeSet = BTreeMap<String, AttributeChange>;

/// Source of an entity type's known attribute names.
pub trait AttributeSchema {
    fn attribute_names(&self) -> Vec<String>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute_names().iter().any(|a| a == name)
    }
}

/// A static list of attribute names for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub attributes: Vec<String>,
}

impl EntitySchema {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttributeSchema for EntitySchema {
    fn attribute_names(&self) -> Vec<String> {
        self.attributes.clone()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// A domain entity whose lifecycle is governed by the kernel.
pub trait Entity {
    /// Entity type name (e.g., "Post").
    fn entity_type(&self) -> &str;

    /// Identity, `None` while the entity has not been persisted yet.
    fn id(&self) -> Option<String>;

    /// Optimistic-locking or revision number, when the entity exposes one.
    fn version(&self) -> Option<i64> {
        None
    }

    /// Attributes changed since the entity was loaded.
    fn changed_attributes(&self) -> ChangeSet {
        ChangeSet::new()
    }

    /// Current value of an attribute, when the host exposes it.
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// `Type:id` descriptor; unsaved entities render as `Type:new`.
pub fn describe_entity(entity: &(impl Entity + ?Sized)) -> String {
    format!(
        "{}:{}",
        entity.entity_type(),
        entity.id().unwrap_or_else(|| "new".to_string())
    )
}
