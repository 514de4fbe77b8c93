//! Building policies from declaration files.
//!
//! Declarations reference predicates by name. A [`PredicateRegistry`]
//! supplies the closures behind those names for one entity type, and a
//! [`PolicyRegistry`] turns the declarations of a [`GrantConfig`] into an
//! [`EntityPolicy`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use grant_audit::{AuditDeclaration, AuditStore, create_store, template_message};
use grant_core::{ConfigError, Entity, EntityDeclaration, GrantConfig};
use grant_policy::{PermissionRequest, Predicate, predicate};

use crate::error::GrantError;
use crate::policy::EntityPolicy;

/// Named predicates for one entity type.
///
/// `always`, `never` and `authenticated` are always available.
pub struct PredicateRegistry<E: ?Sized> {
    predicates: HashMap<String, Predicate<E>>,
}

impl<E: Entity + ?Sized + 'static> Default for PredicateRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity + ?Sized + 'static> PredicateRegistry<E> {
    pub fn new() -> Self {
        let mut registry = Self {
            predicates: HashMap::new(),
        };
        registry.insert("always", predicate(|_: &PermissionRequest<'_, E>| true));
        registry.insert("never", predicate(|_: &PermissionRequest<'_, E>| false));
        registry.insert(
            "authenticated",
            predicate(|req: &PermissionRequest<'_, E>| req.actor.is_some()),
        );
        registry
    }

    /// Add or replace a named predicate.
    pub fn insert(&mut self, name: impl Into<String>, predicate: Predicate<E>) {
        self.predicates.insert(name.into(), predicate);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, predicate: Predicate<E>) -> Self {
        self.insert(name, predicate);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Predicate<E>> {
        self.predicates.get(name)
    }

    fn resolve(&self, entity_type: &str, name: &str) -> Result<Predicate<E>, ConfigError> {
        self.get(name).cloned().ok_or_else(|| {
            ConfigError::Config(format!(
                "entity '{}': unknown predicate '{}'",
                entity_type, name
            ))
        })
    }
}

/// Validated declarations and the audit store their policies share.
pub struct PolicyRegistry {
    config: GrantConfig,
    store: Arc<dyn AuditStore>,
}

impl PolicyRegistry {
    /// Validate `config` and open the store it selects.
    pub fn from_config(config: GrantConfig) -> Result<Self, GrantError> {
        let store = create_store(&config.audit)?;
        Self::with_store(config, store)
    }

    /// Validate `config`, persisting audit entries to `store`.
    pub fn with_store(config: GrantConfig, store: Arc<dyn AuditStore>) -> Result<Self, GrantError> {
        config.validate()?;
        tracing::debug!(
            entities = config.entities.len(),
            audit_enabled = config.audit.enabled,
            "Loaded grant declarations"
        );
        Ok(Self { config, store })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrantError> {
        Self::from_config(GrantConfig::from_file(path)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, GrantError> {
        Self::from_config(GrantConfig::from_yaml(content)?)
    }

    pub fn config(&self) -> &GrantConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Declared entity types, sorted.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.config.entities.keys().map(String::as_str)
    }

    /// Build the policy declared for `entity_type`.
    ///
    /// An undeclared entity type gets a policy without grants, which denies
    /// every action.
    pub fn build<E: Entity + ?Sized + 'static>(
        &self,
        entity_type: &str,
        predicates: &PredicateRegistry<E>,
    ) -> Result<EntityPolicy<E>, GrantError> {
        let mut policy = EntityPolicy::new(entity_type, self.store.clone());
        policy.recorder_mut().set_enabled(self.config.audit.enabled);

        let Some(declaration) = self.config.entity(entity_type) else {
            tracing::debug!(entity_type, "No declarations; every action is denied");
            return Ok(policy);
        };

        if let Some(schema) = declaration.schema() {
            policy = policy.with_schema(schema);
        }
        apply_declaration(&mut policy, entity_type, declaration, predicates)?;
        Ok(policy)
    }
}

fn apply_declaration<E: Entity + ?Sized + 'static>(
    policy: &mut EntityPolicy<E>,
    entity_type: &str,
    declaration: &EntityDeclaration,
    predicates: &PredicateRegistry<E>,
) -> Result<(), ConfigError> {
    for grant in &declaration.grants {
        let predicate = predicates.resolve(entity_type, &grant.when)?;
        policy.grant(grant.rule.iter().cloned(), predicate)?;
    }

    for grant in &declaration.attribute_grants {
        let predicate = predicates.resolve(entity_type, &grant.when)?;
        policy.grant_attributes(grant.rule.iter().cloned(), predicate)?;
    }

    if declaration.attribute_security {
        policy.enable_attribute_security();
    }

    for audit in &declaration.audits {
        let (actions, filter) = audit.parse()?;
        for action in actions {
            let mut decl = AuditDeclaration::new(action).with_filter(filter.clone());
            if let Some(template) = &audit.message {
                decl = decl.with_message(template_message(action, template.clone()));
            }
            policy.audit(decl)?;
        }
    }

    tracing::debug!(
        entity_type,
        grants = declaration.grants.len(),
        attribute_grants = declaration.attribute_grants.len(),
        audits = declaration.audits.len(),
        "Built entity policy"
    );
    Ok(())
}
