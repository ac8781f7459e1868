//! Adaptor behavior switches and declarative filter configuration.

use serde::Deserialize;

use crate::changeset::ChangeOp;

/// Behavior switches of a [`super::ChangesetAdaptor`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AdaptorOptions {
    /// Fail instead of silently skipping primitive-array and struct-array
    /// properties that have columns in the changed table.
    #[serde(default)]
    pub fail_on_array_properties: bool,
}

/// Declarative form of the adaptor's table, operation and class filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FilterConfig {
    /// Accepted physical table names.
    #[serde(default)]
    pub tables: Vec<String>,
    /// Accepted operations.
    #[serde(default)]
    pub ops: Vec<ChangeOp>,
    /// Accepted classes (`Schema.Class` or `Schema:Class`), subclasses included.
    #[serde(default)]
    pub classes: Vec<String>,
}

impl FilterConfig {
    /// Returns `true` when no filter is configured.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.ops.is_empty() && self.classes.is_empty()
    }

    /// Adds the entries of `other` that are not present yet.
    pub fn merge(&mut self, other: &FilterConfig) {
        for table in &other.tables {
            if !self.tables.contains(table) {
                self.tables.push(table.clone());
            }
        }
        for op in &other.ops {
            if !self.ops.contains(op) {
                self.ops.push(*op);
            }
        }
        for class in &other.classes {
            if !self.classes.contains(class) {
                self.classes.push(class.clone());
            }
        }
    }
}
