//! Error taxonomy of the catalog cache and the changeset adaptor.

use std::io;

use thiserror::Error;

use crate::changeset::{ChangeOp, ChangeStage};
use crate::types::Id64;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AdaptorError>;

/// Errors raised while building or driving a changeset adaptor.
///
/// Configuration errors surface from construction. Every other variant except
/// the wrapped I/O, SQLite and JSON failures means the changeset and the catalog
/// have diverged; iteration cannot continue after one is returned.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// The changeset reader was handed over without an attached store.
    #[error("changeset reader has no attached store")]
    MissingStore,
    /// The changeset reader still performs its own schema checks.
    #[error("changeset reader must be configured with schema checking disabled")]
    SchemaCheckEnabled,
    /// A change carried a row for a table the catalog does not map.
    #[error("table '{0}' is not a mapped table")]
    UnknownTable(String),
    /// A change carried a row for a virtual table.
    #[error("table '{0}' is virtual and cannot carry rows")]
    VirtualTable(String),
    /// Update changes are not adapted.
    #[error("update changes are not supported (table '{table}')")]
    UpdateNotSupported {
        /// Physical table of the rejected change.
        table: String,
    },
    /// The reader could not produce the values object for the change.
    #[error("no {stage} values for {op} change on table '{table}'")]
    MissingValues {
        /// Physical table of the change.
        table: String,
        /// Operation of the change.
        op: ChangeOp,
        /// Which side of the change was requested.
        stage: ChangeStage,
    },
    /// The row does not carry its class discriminator.
    #[error("row on table '{table}' has no '{column}' value")]
    MissingClassId {
        /// Physical table of the change.
        table: String,
        /// Name of the discriminator column.
        column: String,
    },
    /// The class discriminator could not be read as an identifier.
    #[error("row on table '{table}' has a malformed class id in '{column}'")]
    InvalidClassId {
        /// Physical table of the change.
        table: String,
        /// Name of the discriminator column.
        column: String,
    },
    /// Neither the row's class nor the table's root class has a class map.
    #[error("no class map for class {class_id} or root class {root_class_id} (table '{table}')")]
    UnresolvedClass {
        /// Physical table of the change.
        table: String,
        /// Class id read from the row, or the root class when the discriminator is virtual.
        class_id: Id64,
        /// Exclusive root class of the table.
        root_class_id: Id64,
    },
    /// A compact GUID value did not hold exactly 16 bytes.
    #[error("guid value must be 16 bytes (got {0})")]
    InvalidGuidLength(usize),
    /// An array property was met while strict array handling is on.
    #[error("array property '{property}' of class '{class}' is not supported")]
    UnsupportedArrayProperty {
        /// Full name of the owning class.
        class: String,
        /// Property name.
        property: String,
    },
    /// A catalog code fell outside its fixed code table.
    #[error("unknown {kind} code {code}")]
    UnknownCode {
        /// Code table name.
        kind: &'static str,
        /// Offending code.
        code: i64,
    },
    /// Caller supplied an argument that cannot be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Catalog store failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Malformed JSON from the catalog or a recorded changeset.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// I/O failure while loading recorded changes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
