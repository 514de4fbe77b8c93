//! Per-request execution context.
//!
//! Holds the current actor, the enforcement and audit flags, and the audit
//! entries captured by an in-progress transition. A context belongs to exactly
//! one logical unit of work: it is `Send` so a runtime can hand it to the task
//! that serves a request, but it is not `Sync`, so two concurrent units of work
//! can never observe each other's actor, bypass scope or in-flight entries.
//!
//! Flags are only changed through scopes that restore the previous value when
//! they end, including when the scoped work panics.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::actor::Actor;
use crate::audit_entry::AuditEntry;

/// Actor identity, bypass flags and in-flight audit entries for one unit of work.
#[derive(Debug)]
pub struct ExecutionContext {
    actor: RefCell<Option<Actor>>,
    enforcement_enabled: Cell<bool>,
    audit_enabled: Cell<bool>,
    security_bypassed: RefCell<HashSet<String>>,
    audit_bypassed: RefCell<HashSet<String>>,
    in_flight: RefCell<HashMap<String, AuditEntry>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// A context with no actor and enforcement enabled.
    pub fn new() -> Self {
        Self {
            actor: RefCell::new(None),
            enforcement_enabled: Cell::new(true),
            audit_enabled: Cell::new(true),
            security_bypassed: RefCell::new(HashSet::new()),
            audit_bypassed: RefCell::new(HashSet::new()),
            in_flight: RefCell::new(HashMap::new()),
        }
    }

    /// A context acting on behalf of `actor`.
    pub fn with_actor(actor: Actor) -> Self {
        let ctx = Self::new();
        ctx.set_actor(Some(actor));
        ctx
    }

    /// A context whose enforcement starts disabled.
    ///
    /// Intended for host test suites that exercise domain logic without
    /// declaring grants for every fixture.
    pub fn disabled() -> Self {
        let ctx = Self::new();
        ctx.enforcement_enabled.set(false);
        ctx
    }

    // =========================================================================
    // ACTOR
    // =========================================================================

    /// The current actor, `None` when unauthenticated.
    pub fn actor(&self) -> Option<Actor> {
        self.actor.borrow().clone()
    }

    pub fn set_actor(&self, actor: Option<Actor>) {
        *self.actor.borrow_mut() = actor;
    }

    pub fn clear_actor(&self) {
        self.set_actor(None);
    }

    // =========================================================================
    // ENFORCEMENT
    // =========================================================================

    pub fn is_enforcement_enabled(&self) -> bool {
        self.enforcement_enabled.get()
    }

    /// Whether enforcement is off for `entity_type`, globally or for that type.
    pub fn is_security_bypassed(&self, entity_type: &str) -> bool {
        !self.enforcement_enabled.get() || self.security_bypassed.borrow().contains(entity_type)
    }

    /// Disable enforcement until the returned scope is dropped.
    pub fn disable_enforcement(&self) -> FlagScope<'_> {
        FlagScope::new(&self.enforcement_enabled)
    }

    /// Run `work` with enforcement disabled, restoring the prior state afterwards.
    ///
    /// Nested calls are idempotent: leaving an inner scope restores the
    /// disabled state of the outer one.
    pub fn without_enforcement<T>(&self, work: impl FnOnce() -> T) -> T {
        let _scope = self.disable_enforcement();
        work()
    }

    /// Run `work` with enforcement disabled for one entity type only.
    pub fn without_security_for<T>(&self, entity_type: &str, work: impl FnOnce() -> T) -> T {
        let _scope = TypeScope::new(&self.security_bypassed, entity_type);
        work()
    }

    // =========================================================================
    // AUDIT
    // =========================================================================

    pub fn is_audit_enabled(&self) -> bool {
        self.audit_enabled.get()
    }

    /// Whether audit capture is off for `entity_type`.
    ///
    /// Disabling enforcement also disables auditing.
    pub fn is_audit_bypassed(&self, entity_type: &str) -> bool {
        !self.enforcement_enabled.get()
            || !self.audit_enabled.get()
            || self.audit_bypassed.borrow().contains(entity_type)
    }

    /// Disable audit capture until the returned scope is dropped.
    pub fn disable_audit(&self) -> FlagScope<'_> {
        FlagScope::new(&self.audit_enabled)
    }

    /// Run `work` with audit capture disabled.
    pub fn without_audit<T>(&self, work: impl FnOnce() -> T) -> T {
        let _scope = self.disable_audit();
        work()
    }

    /// Run `work` with audit capture disabled for one entity type only.
    pub fn without_audit_for<T>(&self, entity_type: &str, work: impl FnOnce() -> T) -> T {
        let _scope = TypeScope::new(&self.audit_bypassed, entity_type);
        work()
    }

    // =========================================================================
    // IN-FLIGHT AUDIT ENTRIES
    // =========================================================================

    /// Hold `entry` as the in-flight entry for `entity_type`.
    ///
    /// An entry left behind by a transition that never committed is replaced.
    pub fn hold_in_flight(&self, entity_type: &str, entry: AuditEntry) {
        let replaced = self
            .in_flight
            .borrow_mut()
            .insert(entity_type.to_string(), entry);
        if replaced.is_some() {
            tracing::debug!(entity_type, "Discarding abandoned in-flight audit entry");
        }
    }

    /// Remove and return the in-flight entry for `entity_type`.
    pub fn take_in_flight(&self, entity_type: &str) -> Option<AuditEntry> {
        self.in_flight.borrow_mut().remove(entity_type)
    }

    pub fn has_in_flight(&self, entity_type: &str) -> bool {
        self.in_flight.borrow().contains_key(entity_type)
    }

    /// Drop the in-flight entry of a transition that failed or aborted.
    pub fn abandon_in_flight(&self, entity_type: &str) {
        if self.take_in_flight(entity_type).is_some() {
            tracing::debug!(entity_type, "Abandoned in-flight audit entry");
        }
    }

    /// Clear all state so the context can serve another unit of work.
    pub fn reset(&self) {
        self.clear_actor();
        self.enforcement_enabled.set(true);
        self.audit_enabled.set(true);
        self.security_bypassed.borrow_mut().clear();
        self.audit_bypassed.borrow_mut().clear();
        self.in_flight.borrow_mut().clear();
    }
}

/// Scope that holds a flag disabled and restores its prior value on drop.
#[must_use = "the flag is restored as soon as the scope is dropped"]
pub struct FlagScope<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> FlagScope<'a> {
    fn new(flag: &'a Cell<bool>) -> Self {
        let previous = flag.get();
        if previous {
            flag.set(false);
        }
        Self { flag, previous }
    }
}

impl Drop for FlagScope<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Scope that marks one entity type as bypassed.
struct TypeScope<'a> {
    set: &'a RefCell<HashSet<String>>,
    entity_type: String,
    inserted: bool,
}

impl<'a> TypeScope<'a> {
    fn new(set: &'a RefCell<HashSet<String>>, entity_type: &str) -> Self {
        let inserted = set.borrow_mut().insert(entity_type.to_string());
        Self {
            set,
            entity_type: entity_type.to_string(),
            inserted,
        }
    }
}

impl Drop for TypeScope<'_> {
    fn drop(&mut self) {
        if self.inserted {
            self.set.borrow_mut().remove(&self.entity_type);
        }
    }
}
