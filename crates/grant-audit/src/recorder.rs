//! Audit capture for one entity type.
//!
//! Mutations are captured in two phases. `begin` snapshots the filtered
//! change-set before the transition runs and parks an unfinished entry in
//! the [`ExecutionContext`]; `commit` finalizes it with the persisted
//! identity and hands it to the store. A transition that never reaches
//! `commit` leaves nothing in the store.
//!
//! Finds are captured in a single phase by `record`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use grant_core::{
    Action, AuditConfig, AuditEntry, ConfigError, Entity, ExecutionContext, RuleSpec,
};

use crate::declaration::{AuditDeclaration, MessageFn};
use crate::error::AuditError;
use crate::storage::{AuditStore, create_store};

/// Audit declarations and capture for one entity type.
pub struct AuditRecorder<E: ?Sized> {
    entity_type: String,
    declarations: BTreeMap<Action, AuditDeclaration<E>>,
    store: Arc<dyn AuditStore>,
    enabled: bool,
}

impl<E: Entity + ?Sized> AuditRecorder<E> {
    pub fn new(entity_type: impl Into<String>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            entity_type: entity_type.into(),
            declarations: BTreeMap::new(),
            store,
            enabled: true,
        }
    }

    /// A recorder whose store and enabled state come from `config`.
    pub fn from_config(entity_type: impl Into<String>, config: &AuditConfig) -> Result<Self, AuditError> {
        let mut recorder = Self::new(entity_type, create_store(config)?);
        recorder.enabled = config.enabled;
        Ok(recorder)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    // =========================================================================
    // DECLARATIONS
    // =========================================================================

    /// Declare what to capture for one action, replacing any earlier declaration.
    pub fn register(&mut self, declaration: AuditDeclaration<E>) -> Result<(), ConfigError> {
        declaration.filter.validate()?;
        let action = declaration.action;
        if self.declarations.insert(action, declaration).is_some() {
            tracing::debug!(
                entity_type = %self.entity_type,
                %action,
                "Replaced audit declaration"
            );
        }
        Ok(())
    }

    /// Declare auditing for every action in `spec`, filtered by its options.
    pub fn audit_on(&mut self, spec: &RuleSpec, message: Option<MessageFn<E>>) -> Result<(), ConfigError> {
        if !spec.attributes.is_empty() || spec.associations.values().any(|r| !r.is_empty()) {
            return Err(ConfigError::Config(
                "audit declarations may only name :create, :find, :update, or :destroy".to_string(),
            ));
        }
        if spec.actions.is_empty() {
            return Err(ConfigError::Config(
                "at least one :create, :find, :update, or :destroy action must be specified"
                    .to_string(),
            ));
        }

        for action in &spec.actions {
            let mut declaration = AuditDeclaration::new(*action).with_filter(spec.options.clone());
            declaration.message = message.clone();
            self.register(declaration)?;
        }
        Ok(())
    }

    pub fn declaration(&self, action: Action) -> Option<&AuditDeclaration<E>> {
        self.declarations.get(&action)
    }

    pub fn is_declared(&self, action: Action) -> bool {
        self.declarations.contains_key(&action)
    }

    // =========================================================================
    // CAPTURE
    // =========================================================================

    /// Start capturing a create, update or destroy of `entity`.
    ///
    /// Does nothing when the action is not declared or auditing is off.
    pub fn begin(&self, ctx: &ExecutionContext, action: Action, entity: &E) {
        if !action.is_mutation() {
            return;
        }
        let Some(declaration) = self.active_declaration(ctx, action, entity) else {
            return;
        };

        let actor = ctx.actor();
        let changes = declaration.filter.apply(&entity.changed_attributes());
        let message = declaration
            .message
            .as_ref()
            .map(|render| ctx.without_enforcement(|| render(ctx, entity, actor.as_ref())));

        let entry = AuditEntry::builder(action, entity.entity_type())
            .subject_id(entity.id().unwrap_or_default())
            .subject_version(entity.version())
            .actor(actor.as_ref())
            .message(message)
            .changes(changes)
            .build();

        tracing::trace!(
            %action,
            entity_type = %self.entity_type,
            entry_id = %entry.entry_id,
            "Holding in-flight audit entry"
        );
        ctx.hold_in_flight(&self.entity_type, entry);
    }

    /// Finish the capture started by [`begin`](Self::begin) and persist it.
    ///
    /// Returns the persisted entry, or `None` when nothing was in flight.
    pub fn commit(
        &self,
        ctx: &ExecutionContext,
        action: Action,
        entity: &E,
    ) -> Result<Option<AuditEntry>, AuditError> {
        let Some(mut entry) = ctx.take_in_flight(&self.entity_type) else {
            return Ok(None);
        };
        if entry.action != action {
            tracing::debug!(
                %action,
                in_flight = %entry.action,
                entity_type = %self.entity_type,
                "In-flight audit entry belongs to another action"
            );
            ctx.hold_in_flight(&self.entity_type, entry);
            return Ok(None);
        }

        entry.subject_id = entity.id().unwrap_or_default();
        entry.subject_version = entity.version();
        entry.success = true;
        entry.created_at = Utc::now();

        self.persist(entry).map(Some)
    }

    /// Drop the capture of a transition that failed.
    pub fn abandon(&self, ctx: &ExecutionContext) {
        ctx.abandon_in_flight(&self.entity_type);
    }

    /// Capture a find of `entity` in one step.
    pub fn record(&self, ctx: &ExecutionContext, entity: &E) -> Result<Option<AuditEntry>, AuditError> {
        let Some(declaration) = self.active_declaration(ctx, Action::Find, entity) else {
            return Ok(None);
        };

        let actor = ctx.actor();
        let message = declaration
            .message
            .as_ref()
            .map(|render| ctx.without_enforcement(|| render(ctx, entity, actor.as_ref())));

        let entry = AuditEntry::builder(Action::Find, entity.entity_type())
            .subject_id(entity.id().unwrap_or_default())
            .subject_version(entity.version())
            .actor(actor.as_ref())
            .message(message)
            .success(true)
            .build();

        self.persist(entry).map(Some)
    }

    fn active_declaration(
        &self,
        ctx: &ExecutionContext,
        action: Action,
        entity: &E,
    ) -> Option<&AuditDeclaration<E>> {
        if !self.enabled
            || ctx.is_audit_bypassed(&self.entity_type)
            || ctx.is_audit_bypassed(entity.entity_type())
        {
            tracing::trace!(%action, entity_type = %self.entity_type, "Audit bypassed");
            return None;
        }
        self.declarations.get(&action)
    }

    fn persist(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        entry.validate().map_err(AuditError::InvalidEntry)?;
        self.store.save(entry.clone())?;
        tracing::debug!(
            action = %entry.action,
            subject = %format!("{}:{}", entry.subject_type, entry.subject_id),
            actor = %format!("{}:{}", entry.actor_type, entry.actor_id),
            "Persisted audit entry"
        );
        Ok(entry)
    }
}
