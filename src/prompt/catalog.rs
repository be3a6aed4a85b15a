//! Commit-type catalogs offered to the model.

use serde::{Deserialize, Serialize};

/// Built-in conventional commit types, in mapping order.
pub const DEFAULT_COMMIT_TYPES: [(&str, &str); 11] = [
    ("docs", "Documentation only changes"),
    (
        "style",
        "Changes that do not affect the meaning of the code (white-space, formatting, missing semi-colons, etc)",
    ),
    ("refactor", "A code change that neither fixes a bug nor adds a feature"),
    ("perf", "A code change that improves performance"),
    ("test", "Adding missing tests or correcting existing tests"),
    ("build", "Changes that affect the build system or external dependencies"),
    ("ci", "Changes to our CI configuration files and scripts"),
    ("chore", "Other changes that don't modify src or test files"),
    ("revert", "Reverts a previous commit"),
    ("feat", "A new feature"),
    ("fix", "A bug fix"),
];

/// A named commit type from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitType {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl CommitType {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Allowed commit types: caller-supplied (ordered) or the built-in mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommitTypeCatalog {
    Custom(Vec<CommitType>),
    #[default]
    Default,
}

impl CommitTypeCatalog {
    /// Build from optional configuration. An empty list means "use the default".
    pub fn from_config(types: Option<Vec<CommitType>>) -> Self {
        match types {
            Some(types) if !types.is_empty() => CommitTypeCatalog::Custom(types),
            _ => CommitTypeCatalog::Default,
        }
    }

    /// Identifying names, in catalog order.
    pub fn type_names(&self) -> Vec<&str> {
        match self {
            CommitTypeCatalog::Custom(types) => types.iter().map(|t| t.value.as_str()).collect(),
            CommitTypeCatalog::Default => DEFAULT_COMMIT_TYPES.iter().map(|(name, _)| *name).collect(),
        }
    }

    /// Comma-joined names for prompt rendering.
    pub fn render_names(&self) -> String {
        self.type_names().join(", ")
    }
}
