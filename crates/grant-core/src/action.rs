//! Lifecycle actions governed by rules and audits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four canonical lifecycle actions.
///
/// `Find` is the read/lookup action. It is spelled `find` in audit rows and
/// denial messages; `read` is accepted as an alias when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Find,
    Update,
    Destroy,
}

impl Action {
    /// All canonical actions, in declaration order.
    pub const ALL: [Action; 4] = [Action::Create, Action::Find, Action::Update, Action::Destroy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Find => "find",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }

    /// Whether the action is audited in two phases (begin + commit).
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::Find)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_symbol(s).as_str() {
            "create" => Ok(Action::Create),
            "find" | "read" => Ok(Action::Find),
            "update" => Ok(Action::Update),
            "destroy" | "delete" => Ok(Action::Destroy),
            other => Err(format!(
                "{} is not a valid action; valid actions are create, find, update, destroy",
                other
            )),
        }
    }
}

/// A relation-membership mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationAction {
    Add,
    Remove,
}

impl AssociationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationAction::Add => "add",
            AssociationAction::Remove => "remove",
        }
    }
}

impl fmt::Display for AssociationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssociationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_symbol(s).as_str() {
            "add" => Ok(AssociationAction::Add),
            "remove" => Ok(AssociationAction::Remove),
            other => Err(format!(
                "{} is not a valid association action; add and remove are the only valid association specifications",
                other
            )),
        }
    }
}

/// Normalize a declaration token to its canonical symbol form.
///
/// Leading `:` is stripped, surrounding whitespace trimmed and the result
/// lowercased, so `":Create"`, `"create"` and `" CREATE "` are the same symbol.
pub fn normalize_symbol(token: &str) -> String {
    token.trim().trim_start_matches(':').trim().to_lowercase()
}
