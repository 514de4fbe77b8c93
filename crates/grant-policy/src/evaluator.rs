//! Default-deny permission evaluation.
//!
//! A `PermissionEvaluator` owns every rule registered for one entity type
//! and answers three questions about a transition:
//!
//! 1. **Action** - is at least one rule for the action satisfied?
//! 2. **Attributes** - is every changed attribute individually granted?
//! 3. **Association** - is at least one rule for `(add|remove, relation)` satisfied?
//!
//! An action or association with no rule is denied. Every check is skipped
//! when enforcement is bypassed for the entity type, before any predicate runs.
//! Predicates themselves run with enforcement disabled.

use std::collections::BTreeMap;

use grant_core::{
    Action, AssociationAction, ConfigError, Entity, EntitySchema, ExecutionContext, RuleSpec,
    RuleSpecParser, describe_actor, describe_entity,
};

use crate::error::PermissionDenied;
use crate::request::PermissionRequest;
use crate::rule::{Predicate, Rule, RuleTarget};

/// Rule registries and evaluation for one entity type.
pub struct PermissionEvaluator<E: ?Sized> {
    entity_type: String,
    schema: Option<EntitySchema>,
    action_rules: BTreeMap<Action, Vec<Rule<E>>>,
    /// One rule per attribute; a later grant replaces an earlier one.
    attribute_rules: BTreeMap<String, Rule<E>>,
    association_rules: BTreeMap<(AssociationAction, String), Vec<Rule<E>>>,
    attribute_security: bool,
}

impl<E: Entity + ?Sized> PermissionEvaluator<E> {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            schema: None,
            action_rules: BTreeMap::new(),
            attribute_rules: BTreeMap::new(),
            association_rules: BTreeMap::new(),
            attribute_security: false,
        }
    }

    /// Known attribute names, used to validate declarations.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn schema(&self) -> Option<&EntitySchema> {
        self.schema.as_ref()
    }

    /// A parser validating against this entity type's schema.
    pub fn parser(&self) -> RuleSpecParser<'_> {
        match &self.schema {
            Some(schema) => RuleSpecParser::new().with_schema(schema),
            None => RuleSpecParser::new(),
        }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Bind `predicate` to every action, attribute and association in `spec`.
    ///
    /// Attributes named in `spec` turn attribute security on. `only` and
    /// `except` filter audited changes and are rejected here.
    pub fn register(&mut self, spec: &RuleSpec, predicate: Predicate<E>) -> Result<(), ConfigError> {
        if !spec.options.is_empty() {
            return Err(ConfigError::Config(
                ":only and :except apply to audit declarations, not grants".to_string(),
            ));
        }

        for action in &spec.actions {
            self.action_rules
                .entry(*action)
                .or_default()
                .push(Rule::new(RuleTarget::Action(*action), predicate.clone()));
        }

        for attribute in &spec.attributes {
            self.attribute_rules.insert(
                attribute.clone(),
                Rule::new(RuleTarget::Attribute(attribute.clone()), predicate.clone()),
            );
            self.attribute_security = true;
        }

        for (action, relations) in &spec.associations {
            for relation in relations {
                self.association_rules
                    .entry((*action, relation.clone()))
                    .or_default()
                    .push(Rule::new(
                        RuleTarget::Association(*action, relation.clone()),
                        predicate.clone(),
                    ));
            }
        }

        tracing::debug!(
            entity_type = %self.entity_type,
            actions = spec.actions.len(),
            attributes = spec.attributes.len(),
            "Registered grant"
        );
        Ok(())
    }

    /// Register an attribute-only grant.
    pub fn register_attributes(
        &mut self,
        spec: &RuleSpec,
        predicate: Predicate<E>,
    ) -> Result<(), ConfigError> {
        if !spec.actions.is_empty() || spec.associations.values().any(|r| !r.is_empty()) {
            return Err(ConfigError::Config(
                "attribute grants may only name attributes".to_string(),
            ));
        }
        if spec.attributes.is_empty() {
            return Err(ConfigError::Config(
                "at least one attribute must be specified".to_string(),
            ));
        }
        self.register(spec, predicate)
    }

    /// Deny changes to attributes without a rule, even before any attribute grant.
    pub fn enable_attribute_security(&mut self) {
        self.attribute_security = true;
    }

    pub fn attribute_security_enabled(&self) -> bool {
        self.attribute_security
    }

    /// Rules registered for `action`.
    pub fn rules_for(&self, action: Action) -> &[Rule<E>] {
        self.action_rules.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attribute names with a registered rule, sorted.
    pub fn granted_attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attribute_rules.keys().map(String::as_str)
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// Check that `action` is granted on `subject`.
    pub fn check_action(
        &self,
        ctx: &ExecutionContext,
        action: Action,
        subject: &E,
    ) -> Result<(), PermissionDenied> {
        if self.bypassed(ctx, subject) {
            tracing::trace!(%action, entity_type = %self.entity_type, "Enforcement bypassed");
            return Ok(());
        }

        let actor = ctx.actor();
        let request = PermissionRequest::new(ctx, actor.as_ref(), subject);
        let permitted = self.any_permits(ctx, self.action_rules.get(&action), &request);

        tracing::debug!(
            %action,
            subject = %describe_entity(subject),
            actor = %describe_actor(actor.as_ref()),
            permitted,
            "Evaluated action"
        );

        if permitted {
            return Ok(());
        }

        let denied = PermissionDenied::action(
            action.as_str(),
            describe_actor(actor.as_ref()),
            describe_entity(subject),
        );
        tracing::warn!(%action, error = %denied, "Permission denied");
        Err(denied)
    }

    /// Check that every changed attribute of `subject` is granted.
    ///
    /// The error lists every denied attribute, not just the first.
    pub fn check_attributes(
        &self,
        ctx: &ExecutionContext,
        action: Action,
        subject: &E,
    ) -> Result<(), PermissionDenied> {
        if !self.attribute_security {
            return Ok(());
        }
        if self.bypassed(ctx, subject) {
            tracing::trace!(%action, entity_type = %self.entity_type, "Enforcement bypassed");
            return Ok(());
        }

        let actor = ctx.actor();
        let request = PermissionRequest::new(ctx, actor.as_ref(), subject);
        let denied: Vec<String> = subject
            .changed_attributes()
            .into_keys()
            .filter(|name| !self.attribute_permits(ctx, name, &request))
            .collect();

        tracing::debug!(
            %action,
            subject = %describe_entity(subject),
            denied = denied.len(),
            "Evaluated changed attributes"
        );

        if denied.is_empty() {
            return Ok(());
        }

        let denied = PermissionDenied::attributes(
            action.as_str(),
            denied,
            describe_actor(actor.as_ref()),
            describe_entity(subject),
        );
        tracing::warn!(%action, error = %denied, "Permission denied");
        Err(denied)
    }

    /// Check that `associated` may be added to or removed from `relation`.
    pub fn check_association(
        &self,
        ctx: &ExecutionContext,
        action: AssociationAction,
        relation: &str,
        subject: &E,
        associated: &dyn Entity,
    ) -> Result<(), PermissionDenied> {
        if self.bypassed(ctx, subject) {
            tracing::trace!(%action, relation, entity_type = %self.entity_type, "Enforcement bypassed");
            return Ok(());
        }

        let actor = ctx.actor();
        let request = PermissionRequest::new(ctx, actor.as_ref(), subject).with_associated(associated);
        let rules = self.association_rules.get(&(action, relation.to_string()));
        let permitted = self.any_permits(ctx, rules, &request);

        tracing::debug!(
            %action,
            relation,
            subject = %describe_entity(subject),
            associated = %describe_entity(associated),
            permitted,
            "Evaluated association"
        );

        if permitted {
            return Ok(());
        }

        let denied = PermissionDenied::association(
            action.as_str(),
            relation,
            describe_entity(associated),
            describe_actor(actor.as_ref()),
            describe_entity(subject),
        );
        tracing::warn!(%action, relation, error = %denied, "Permission denied");
        Err(denied)
    }

    /// Whether `action` is currently granted on `subject`.
    pub fn is_granted(&self, ctx: &ExecutionContext, action: Action, subject: &E) -> bool {
        if self.bypassed(ctx, subject) {
            return true;
        }
        let actor = ctx.actor();
        let request = PermissionRequest::new(ctx, actor.as_ref(), subject);
        self.any_permits(ctx, self.action_rules.get(&action), &request)
    }

    /// Whether changes to `attribute` are currently granted on `subject`.
    pub fn is_attribute_granted(&self, ctx: &ExecutionContext, attribute: &str, subject: &E) -> bool {
        if !self.attribute_security || self.bypassed(ctx, subject) {
            return true;
        }
        let actor = ctx.actor();
        let request = PermissionRequest::new(ctx, actor.as_ref(), subject);
        self.attribute_permits(ctx, attribute, &request)
    }

    fn bypassed(&self, ctx: &ExecutionContext, subject: &E) -> bool {
        ctx.is_security_bypassed(subject.entity_type())
            || ctx.is_security_bypassed(&self.entity_type)
    }

    fn any_permits(
        &self,
        ctx: &ExecutionContext,
        rules: Option<&Vec<Rule<E>>>,
        request: &PermissionRequest<'_, E>,
    ) -> bool {
        rules
            .map(|rules| {
                rules
                    .iter()
                    .any(|rule| ctx.without_enforcement(|| rule.permits(request)))
            })
            .unwrap_or(false)
    }

    fn attribute_permits(
        &self,
        ctx: &ExecutionContext,
        attribute: &str,
        request: &PermissionRequest<'_, E>,
    ) -> bool {
        self.attribute_rules
            .get(attribute)
            .map(|rule| ctx.without_enforcement(|| rule.permits(request)))
            .unwrap_or(false)
    }
}
