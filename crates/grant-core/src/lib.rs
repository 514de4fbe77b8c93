//! Core types shared across all Grant crates.
//!
//! - [`Action`] / [`AssociationAction`]: the lifecycle operations rules govern
//! - [`Actor`]: who performs an operation
//! - [`Entity`]: the host's view of a governed domain entity
//! - [`ExecutionContext`]: actor, bypass scopes and in-flight audit entries for
//!   one unit of work
//! - [`RuleSpec`] / [`RuleSpecParser`]: normalized rule declarations
//! - [`AuditEntry`]: the persisted audit row
//! - [`config`]: YAML declaration files

pub mod action;
pub mod actor;
pub mod audit_entry;
pub mod config;
pub mod context;
pub mod entity;
pub mod rule_spec;

pub use action::{Action, AssociationAction};
pub use actor::{Actor, describe_actor};
pub use audit_entry::{AuditEntry, AuditEntryBuilder};
pub use config::{
    AuditConfig, AuditDeclarationConfig, ConfigError, EntityDeclaration, GrantConfig,
    GrantDeclaration, StorageBackend, StorageConfig,
};
pub use context::{ExecutionContext, FlagScope};
pub use entity::{
    AttributeChange, AttributeSchema, ChangeSet, Entity, EntitySchema, describe_entity,
};
pub use rule_spec::{ChangeFilter, RuleSpec, RuleSpecParser, RuleToken, TokenValue};
