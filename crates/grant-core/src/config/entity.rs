//! Per-entity-type declarations.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::action::Action;
use crate::entity::EntitySchema;
use crate::rule_spec::{ChangeFilter, RuleSpec, RuleSpecParser, RuleToken};

/// Grants and audits declared for one entity type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDeclaration {
    /// Known attribute names; enables attribute validation and `all` expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,

    /// Action and association grants.
    #[serde(default)]
    pub grants: Vec<GrantDeclaration>,

    /// Attribute-level grants.
    #[serde(default)]
    pub attribute_grants: Vec<GrantDeclaration>,

    /// Turn on attribute security even without attribute grants.
    #[serde(default)]
    pub attribute_security: bool,

    /// Audit declarations.
    #[serde(default)]
    pub audits: Vec<AuditDeclarationConfig>,
}

/// A rule declaration bound to a named predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantDeclaration {
    /// Declaration tokens, as accepted by [`RuleSpecParser`].
    pub rule: Vec<RuleToken>,

    /// Name of the predicate to evaluate.
    pub when: String,
}

/// An audit declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDeclarationConfig {
    /// Audited actions.
    pub actions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,

    /// Message template; `{actor}`, `{subject}`, `{action}`, `{subject_type}`
    /// and `{subject_id}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EntityDeclaration {
    pub fn schema(&self) -> Option<EntitySchema> {
        self.attributes.as_ref().map(|attrs| EntitySchema::new(attrs.iter().cloned()))
    }

    /// Parse one grant's rule against this entity's schema.
    ///
    /// `only` and `except` narrow audited changes; a grant carrying them is
    /// rejected rather than silently granting every named attribute.
    pub fn parse_rule(&self, grant: &GrantDeclaration) -> Result<RuleSpec, ConfigError> {
        let schema = self.schema();
        let mut parser = RuleSpecParser::new();
        if let Some(schema) = schema.as_ref() {
            parser = parser.with_schema(schema);
        }
        let spec = parser.parse(grant.rule.iter().cloned())?;
        if !spec.options.is_empty() {
            return Err(ConfigError::Config(format!(
                "grant '{}': :only and :except apply to audit declarations, not grants",
                grant.when
            )));
        }
        Ok(spec)
    }

    /// Check every grant and audit declaration without building anything.
    pub fn validate(&self, entity_type: &str) -> Result<(), ConfigError> {
        for grant in self.grants.iter().chain(&self.attribute_grants) {
            self.parse_rule(grant).map_err(|e| {
                ConfigError::Config(format!("entity '{}': {}", entity_type, e))
            })?;
        }
        for audit in &self.audits {
            audit.parse().map_err(|e| {
                ConfigError::Config(format!("entity '{}': {}", entity_type, e))
            })?;
        }
        Ok(())
    }
}

impl AuditDeclarationConfig {
    /// Resolve the audited actions and the change filter.
    pub fn parse(&self) -> Result<(Vec<Action>, ChangeFilter), ConfigError> {
        if self.actions.is_empty() {
            return Err(ConfigError::Config(
                "an audit declaration needs at least one action".to_string(),
            ));
        }
        let actions = self
            .actions
            .iter()
            .map(|a| a.parse::<Action>().map_err(ConfigError::Config))
            .collect::<Result<Vec<_>, _>>()?;
        let filter = ChangeFilter {
            only: self.only.iter().cloned().collect(),
            except: self.except.iter().cloned().collect(),
        };
        filter.validate()?;
        Ok((actions, filter))
    }
}
