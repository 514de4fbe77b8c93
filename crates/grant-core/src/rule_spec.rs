//! Rule declarations and the parser that normalizes them.
//!
//! A declaration is a heterogeneous token list: scalar tokens name actions or
//! attributes, and an optional trailing mapping carries explicit `actions`,
//! `attributes`, association actions (`add`/`remove` mapped to relation names)
//! and the `only`/`except` change filters. The same list is accepted from Rust
//! call sites and from YAML declaration files.
//!
//! ```
//! use grant_core::{Action, EntitySchema, RuleSpecParser, RuleToken};
//!
//! let schema = EntitySchema::new(["title", "body"]);
//! let spec = RuleSpecParser::new()
//!     .with_schema(&schema)
//!     .parse(vec![
//!         RuleToken::from(":create"),
//!         RuleToken::from("title"),
//!         RuleToken::options([("add", vec!["tags"])]),
//!     ])
//!     .unwrap();
//!
//! assert!(spec.actions.contains(&Action::Create));
//! assert!(spec.attributes.contains("title"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::action::{Action, AssociationAction, normalize_symbol};
use crate::config::ConfigError;
use crate::entity::{AttributeSchema, ChangeSet};

/// Sentinel for "every known attribute".
pub const ALL_ATTRIBUTES: &str = "all";

/// A single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenValue {
    One(String),
    Many(Vec<String>),
}

impl TokenValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            TokenValue::One(v) => vec![v.as_str()],
            TokenValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn is_all_sentinel(&self) -> bool {
        let values = self.values();
        values.len() == 1 && normalize_symbol(values[0]) == ALL_ATTRIBUTES
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        TokenValue::One(value.to_string())
    }
}

impl From<Vec<&str>> for TokenValue {
    fn from(values: Vec<&str>) -> Self {
        TokenValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// One token of a rule declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleToken {
    /// An action name or an attribute name.
    Symbol(String),
    /// Explicit keys: `actions`, `attributes`, `add`, `remove`, `only`, `except`.
    Options(BTreeMap<String, TokenValue>),
}

impl RuleToken {
    /// Build a mapping token from key/value pairs.
    pub fn options<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TokenValue>,
    {
        RuleToken::Options(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for RuleToken {
    fn from(symbol: &str) -> Self {
        RuleToken::Symbol(symbol.to_string())
    }
}

impl From<String> for RuleToken {
    fn from(symbol: String) -> Self {
        RuleToken::Symbol(symbol)
    }
}

impl From<Action> for RuleToken {
    fn from(action: Action) -> Self {
        RuleToken::Symbol(action.as_str().to_string())
    }
}

/// Attribute filter applied to change-sets before they are audited.
///
/// At most one of `only`/`except` may be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub only: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub except: BTreeSet<String>,
}

impl ChangeFilter {
    pub fn only<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: attributes.into_iter().map(Into::into).collect(),
            except: BTreeSet::new(),
        }
    }

    pub fn except<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: BTreeSet::new(),
            except: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.only.is_empty() && self.except.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.only.is_empty() && !self.except.is_empty() {
            return Err(ConfigError::Config(
                "only one of :except or :only may be specified".to_string(),
            ));
        }
        Ok(())
    }

    /// Keep the changes this filter lets through.
    pub fn apply(&self, changes: &ChangeSet) -> ChangeSet {
        changes
            .iter()
            .filter(|(name, _)| !self.except.contains(*name))
            .filter(|(name, _)| self.only.is_empty() || self.only.contains(*name))
            .map(|(name, change)| (name.clone(), change.clone()))
            .collect()
    }
}

/// Normalized rule declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub actions: BTreeSet<Action>,
    pub attributes: BTreeSet<String>,
    pub associations: BTreeMap<AssociationAction, BTreeSet<String>>,
    pub options: ChangeFilter,
}

impl RuleSpec {
    /// Parse without attribute validation.
    pub fn parse<I, T>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<RuleToken>,
    {
        RuleSpecParser::new().parse(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.attributes.is_empty()
            && self.associations.values().all(BTreeSet::is_empty)
    }

    /// Relations named for one association action.
    pub fn relations(&self, action: AssociationAction) -> impl Iterator<Item = &str> {
        self.associations
            .get(&action)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }
}

/// Parses declaration tokens into a [`RuleSpec`].
#[derive(Default)]
pub struct RuleSpecParser<'a> {
    schema: Option<&'a dyn AttributeSchema>,
}

impl<'a> RuleSpecParser<'a> {
    pub fn new() -> Self {
        Self { schema: None }
    }

    /// Validate attributes against `schema` and use it to expand `all`.
    pub fn with_schema(mut self, schema: &'a dyn AttributeSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Parse and validate a declaration.
    pub fn parse<I, T>(&self, tokens: I) -> Result<RuleSpec, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<RuleToken>,
    {
        let mut tokens: Vec<RuleToken> = tokens.into_iter().map(Into::into).collect();
        let mapping = match tokens.pop() {
            Some(RuleToken::Options(map)) => map,
            Some(scalar) => {
                tokens.push(scalar);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        let mut spec = RuleSpec::default();

        for token in tokens {
            let RuleToken::Symbol(symbol) = token else {
                return Err(ConfigError::Config(
                    "only the last declaration token may be a mapping".to_string(),
                ));
            };
            match symbol.parse::<Action>() {
                Ok(action) => {
                    spec.actions.insert(action);
                }
                Err(_) => {
                    spec.attributes.insert(attribute_name(&symbol));
                }
            }
        }

        for (key, value) in mapping {
            match normalize_symbol(&key).as_str() {
                "actions" => {
                    for name in value.values() {
                        let action = name.parse::<Action>().map_err(|_| {
                            ConfigError::Config(format!(
                                "{} is not a valid action; :create, :find, :update, and :destroy are the only valid actions",
                                normalize_symbol(name)
                            ))
                        })?;
                        spec.actions.insert(action);
                    }
                }
                "attributes" => {
                    if value.is_all_sentinel() {
                        let known = self.schema.map(|s| s.attribute_names()).unwrap_or_default();
                        spec.attributes.extend(known);
                    } else {
                        spec.attributes
                            .extend(value.values().into_iter().map(attribute_name));
                    }
                }
                "only" => spec
                    .options
                    .only
                    .extend(value.values().into_iter().map(attribute_name)),
                "except" => spec
                    .options
                    .except
                    .extend(value.values().into_iter().map(attribute_name)),
                other => {
                    let action = other
                        .parse::<AssociationAction>()
                        .map_err(ConfigError::Config)?;
                    spec.associations
                        .entry(action)
                        .or_default()
                        .extend(value.values().into_iter().map(attribute_name));
                }
            }
        }

        self.validate(&spec)?;
        Ok(spec)
    }

    fn validate(&self, spec: &RuleSpec) -> Result<(), ConfigError> {
        if spec.is_empty() {
            return Err(ConfigError::Config(
                "at least one :create, :find, :update, or :destroy action, attribute, or association must be specified"
                    .to_string(),
            ));
        }

        spec.options.validate()?;

        if let Some(schema) = self.schema {
            let unknown: Vec<&str> = spec
                .attributes
                .iter()
                .filter(|a| !schema.has_attribute(a))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(ConfigError::Config(format!(
                    "unknown attribute(s): {}",
                    unknown.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Attribute names keep their case; only the symbol prefix and padding go.
fn attribute_name(token: &str) -> String {
    token.trim().trim_start_matches(':').trim().to_string()
}
