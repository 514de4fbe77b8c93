//! Authorization and audit policy for one entity type.
//!
//! `EntityPolicy` is what a host lifecycle talks to. It exposes the
//! extension points a host must invoke around each transition:
//!
//! | Moment                        | Extension point             | Effect                                      |
//! |-------------------------------|-----------------------------|---------------------------------------------|
//! | before create/update/destroy  | `before_*`                  | action check, attribute check, audit begin  |
//! | after create/update/destroy   | `after_*`                   | audit commit                                |
//! | after a failed transition     | `abandon`                   | drop the in-flight audit entry              |
//! | after find                    | `after_find`                | find check, then single-phase audit record  |
//! | before relation add/remove    | `before_association_*`      | association check                           |

use std::sync::Arc;

use grant_audit::{AuditDeclaration, AuditRecorder, AuditStore, MessageFn};
use grant_core::{
    Action, AssociationAction, AuditEntry, ConfigError, Entity, EntitySchema, ExecutionContext,
    RuleToken,
};
use grant_policy::{GrantQuery, GrantReport, PermissionEvaluator, Predicate};

use crate::error::GrantError;

/// Rules and audit declarations for one entity type.
pub struct EntityPolicy<E: ?Sized> {
    entity_type: String,
    evaluator: PermissionEvaluator<E>,
    recorder: AuditRecorder<E>,
}

impl<E: Entity + ?Sized> EntityPolicy<E> {
    /// A policy with no grants, persisting audit entries to `store`.
    pub fn new(entity_type: impl Into<String>, store: Arc<dyn AuditStore>) -> Self {
        let entity_type = entity_type.into();
        Self {
            evaluator: PermissionEvaluator::new(entity_type.clone()),
            recorder: AuditRecorder::new(entity_type.clone(), store),
            entity_type,
        }
    }

    /// Known attribute names; declarations naming anything else are rejected.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.evaluator = self.evaluator.with_schema(schema);
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn evaluator(&self) -> &PermissionEvaluator<E> {
        &self.evaluator
    }

    pub fn recorder(&self) -> &AuditRecorder<E> {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut AuditRecorder<E> {
        &mut self.recorder
    }

    // =========================================================================
    // DECLARATIONS
    // =========================================================================

    /// Grant the actions, attributes and associations named by `tokens`.
    ///
    /// `only`/`except` are audit filters and make the grant fail.
    pub fn grant<I, T>(&mut self, tokens: I, predicate: Predicate<E>) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<RuleToken>,
    {
        let spec = self.evaluator.parser().parse(tokens)?;
        self.evaluator.register(&spec, predicate)
    }

    /// Grant changes to the attributes named by `tokens`.
    ///
    /// Once any attribute is granted, changes to attributes without a grant
    /// are denied.
    pub fn grant_attributes<I, T>(&mut self, tokens: I, predicate: Predicate<E>) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<RuleToken>,
    {
        let spec = self.evaluator.parser().parse(tokens)?;
        self.evaluator.register_attributes(&spec, predicate)
    }

    /// Deny changes to every attribute that has no grant.
    pub fn enable_attribute_security(&mut self) {
        self.evaluator.enable_attribute_security();
    }

    /// Audit the actions named by `tokens`, filtered by their `only`/`except`.
    pub fn audit_on<I, T>(&mut self, tokens: I, message: Option<MessageFn<E>>) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<RuleToken>,
    {
        let spec = self.evaluator.parser().parse(tokens)?;
        self.recorder.audit_on(&spec, message)
    }

    /// Register a prepared audit declaration.
    pub fn audit(&mut self, declaration: AuditDeclaration<E>) -> Result<(), ConfigError> {
        self.recorder.register(declaration)
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    pub fn is_granted(&self, ctx: &ExecutionContext, action: Action, subject: &E) -> bool {
        self.evaluator.is_granted(ctx, action, subject)
    }

    pub fn is_attribute_granted(&self, ctx: &ExecutionContext, attribute: &str, subject: &E) -> bool {
        self.evaluator.is_attribute_granted(ctx, attribute, subject)
    }

    /// Actions and attributes whose grant state equals `want_granted`.
    pub fn granted(
        &self,
        ctx: &ExecutionContext,
        subject: &E,
        query: &GrantQuery,
        want_granted: bool,
    ) -> GrantReport {
        self.evaluator.granted(ctx, subject, query, want_granted)
    }

    // =========================================================================
    // BYPASS
    // =========================================================================

    /// Run `work` with enforcement off for this entity type only.
    pub fn without_security<T>(&self, ctx: &ExecutionContext, work: impl FnOnce() -> T) -> T {
        ctx.without_security_for(&self.entity_type, work)
    }

    /// Run `work` with audit capture off for this entity type only.
    pub fn without_audit<T>(&self, ctx: &ExecutionContext, work: impl FnOnce() -> T) -> T {
        ctx.without_audit_for(&self.entity_type, work)
    }

    // =========================================================================
    // EXTENSION POINTS
    // =========================================================================

    pub fn before_create(&self, ctx: &ExecutionContext, entity: &E) -> Result<(), GrantError> {
        self.before_save(ctx, Action::Create, entity)
    }

    pub fn before_update(&self, ctx: &ExecutionContext, entity: &E) -> Result<(), GrantError> {
        self.before_save(ctx, Action::Update, entity)
    }

    pub fn before_destroy(&self, ctx: &ExecutionContext, entity: &E) -> Result<(), GrantError> {
        self.evaluator.check_action(ctx, Action::Destroy, entity)?;
        self.recorder.begin(ctx, Action::Destroy, entity);
        Ok(())
    }

    pub fn after_create(&self, ctx: &ExecutionContext, entity: &E) -> Result<Option<AuditEntry>, GrantError> {
        Ok(self.recorder.commit(ctx, Action::Create, entity)?)
    }

    pub fn after_update(&self, ctx: &ExecutionContext, entity: &E) -> Result<Option<AuditEntry>, GrantError> {
        Ok(self.recorder.commit(ctx, Action::Update, entity)?)
    }

    pub fn after_destroy(&self, ctx: &ExecutionContext, entity: &E) -> Result<Option<AuditEntry>, GrantError> {
        Ok(self.recorder.commit(ctx, Action::Destroy, entity)?)
    }

    /// Call when a transition fails after its `before_*` succeeded.
    pub fn abandon(&self, ctx: &ExecutionContext) {
        self.recorder.abandon(ctx);
    }

    /// Check find permission on a loaded entity, then audit the find.
    pub fn after_find(&self, ctx: &ExecutionContext, entity: &E) -> Result<Option<AuditEntry>, GrantError> {
        self.evaluator.check_action(ctx, Action::Find, entity)?;
        Ok(self.recorder.record(ctx, entity)?)
    }

    pub fn before_association_add(
        &self,
        ctx: &ExecutionContext,
        relation: &str,
        owner: &E,
        target: &dyn Entity,
    ) -> Result<(), GrantError> {
        self.evaluator
            .check_association(ctx, AssociationAction::Add, relation, owner, target)?;
        Ok(())
    }

    pub fn before_association_remove(
        &self,
        ctx: &ExecutionContext,
        relation: &str,
        owner: &E,
        target: &dyn Entity,
    ) -> Result<(), GrantError> {
        self.evaluator
            .check_association(ctx, AssociationAction::Remove, relation, owner, target)?;
        Ok(())
    }

    fn before_save(&self, ctx: &ExecutionContext, action: Action, entity: &E) -> Result<(), GrantError> {
        self.evaluator.check_action(ctx, action, entity)?;
        self.evaluator.check_attributes(ctx, action, entity)?;
        self.recorder.begin(ctx, action, entity);
        Ok(())
    }
}
