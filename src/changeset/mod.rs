#![forbid(unsafe_code)]

//! Contract of the row-level changeset stream and an in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::rc::Rc;

use serde::Deserialize;

use crate::catalog::CatalogStore;
use crate::error::{AdaptorError, Result};
use crate::types::SqlValue;

/// Column values of one side of a changed row, keyed by physical column name.
pub type RowValues = HashMap<String, SqlValue>;

/// Operation recorded for a changed row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum ChangeOp {
    /// Row was inserted.
    Inserted,
    /// Row was updated.
    Updated,
    /// Row was deleted.
    Deleted,
}

impl ChangeOp {
    /// Name used in instance metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOp::Inserted => "Inserted",
            ChangeOp::Updated => "Updated",
            ChangeOp::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeOp {
    type Err = AdaptorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inserted" | "insert" => Ok(ChangeOp::Inserted),
            "updated" | "update" => Ok(ChangeOp::Updated),
            "deleted" | "delete" => Ok(ChangeOp::Deleted),
            _ => Err(AdaptorError::InvalidArgument(format!(
                "unknown change operation '{s}'"
            ))),
        }
    }
}

/// Side of a change to read values from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeStage {
    /// Values after the change.
    New,
    /// Values before the change.
    Old,
}

impl fmt::Display for ChangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStage::New => f.write_str("New"),
            ChangeStage::Old => f.write_str("Old"),
        }
    }
}

/// Ordered, pull-based stream of physical row changes.
///
/// The stream must have a catalog store attached and its own schema checking
/// disabled before it is wrapped by [`crate::adaptor::ChangesetAdaptor`].
pub trait ChangesetReader {
    /// Advances to the next change; `false` once the stream is exhausted.
    fn step(&mut self) -> Result<bool>;
    /// Physical table of the current change.
    fn table_name(&self) -> &str;
    /// Operation of the current change.
    fn op(&self) -> ChangeOp;
    /// `true` when the current change carries column values.
    fn has_row(&self) -> bool;
    /// Column values of one side of the current change.
    fn change_values(&self, stage: ChangeStage) -> Option<RowValues>;
    /// Releases the stream.
    fn close(&mut self);
    /// Catalog store attached to the stream.
    fn store(&self) -> Option<Rc<dyn CatalogStore>>;
    /// `true` while the stream validates changes against the schema itself.
    fn schema_check_enabled(&self) -> bool;
}

impl<T: ChangesetReader + ?Sized> ChangesetReader for &mut T {
    fn step(&mut self) -> Result<bool> {
        (**self).step()
    }

    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn op(&self) -> ChangeOp {
        (**self).op()
    }

    fn has_row(&self) -> bool {
        (**self).has_row()
    }

    fn change_values(&self, stage: ChangeStage) -> Option<RowValues> {
        (**self).change_values(stage)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn store(&self) -> Option<Rc<dyn CatalogStore>> {
        (**self).store()
    }

    fn schema_check_enabled(&self) -> bool {
        (**self).schema_check_enabled()
    }
}

/// One recorded physical change.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeRecord {
    /// Physical table name.
    pub table: String,
    /// Operation.
    pub op: ChangeOp,
    /// Values before the change.
    pub old: Option<RowValues>,
    /// Values after the change.
    pub new: Option<RowValues>,
}

impl ChangeRecord {
    /// Insert of a row with `values`.
    pub fn inserted(table: impl Into<String>, values: RowValues) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Inserted,
            old: None,
            new: Some(values),
        }
    }

    /// Delete of a row that held `values`.
    pub fn deleted(table: impl Into<String>, values: RowValues) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Deleted,
            old: Some(values),
            new: None,
        }
    }

    /// Update of a row from `old` to `new`.
    pub fn updated(table: impl Into<String>, old: RowValues, new: RowValues) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Updated,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Change without row payload.
    pub fn marker(table: impl Into<String>, op: ChangeOp) -> Self {
        Self {
            table: table.into(),
            op,
            old: None,
            new: None,
        }
    }

    fn has_row(&self) -> bool {
        self.old.is_some() || self.new.is_some()
    }
}

/// Builds [`RowValues`] from `(column, value)` pairs.
pub fn row<I, K, V>(pairs: I) -> RowValues
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<SqlValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// In-memory changeset replaying a list of recorded changes.
pub struct RecordedChangeset {
    records: Vec<ChangeRecord>,
    cursor: Option<usize>,
    store: Option<Rc<dyn CatalogStore>>,
    schema_check: bool,
    closed: bool,
}

impl RecordedChangeset {
    /// Wraps `records`; no store is attached and schema checking is on.
    pub fn new(records: Vec<ChangeRecord>) -> Self {
        Self {
            records,
            cursor: None,
            store: None,
            schema_check: true,
            closed: false,
        }
    }

    /// Attaches the catalog store.
    pub fn with_store(mut self, store: Rc<dyn CatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Turns the stream's own schema checking off.
    pub fn disable_schema_check(mut self) -> Self {
        self.schema_check = false;
        self
    }

    /// Returns `true` once [`ChangesetReader::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Loads records from JSON lines.
    ///
    /// Each non-blank line is `{"table": .., "op": "Inserted"|"Updated"|"Deleted",
    /// "old": {..}?, "new": {..}?}`. Values are JSON null, numbers or strings;
    /// blobs are written `{"blob": "<hex>"}`.
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let wire: WireRecord = serde_json::from_str(&line)?;
            records.push(wire.into_record().map_err(|err| {
                AdaptorError::InvalidArgument(format!("line {}: {err}", idx + 1))
            })?);
        }
        Ok(Self::new(records))
    }

    fn current(&self) -> Option<&ChangeRecord> {
        self.cursor.and_then(|idx| self.records.get(idx))
    }
}

impl ChangesetReader for RecordedChangeset {
    fn step(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        let next = self.cursor.map_or(0, |idx| idx + 1);
        self.cursor = Some(next.min(self.records.len()));
        Ok(next < self.records.len())
    }

    fn table_name(&self) -> &str {
        self.current().map_or("", |rec| rec.table.as_str())
    }

    fn op(&self) -> ChangeOp {
        self.current().map_or(ChangeOp::Inserted, |rec| rec.op)
    }

    fn has_row(&self) -> bool {
        self.current().is_some_and(ChangeRecord::has_row)
    }

    fn change_values(&self, stage: ChangeStage) -> Option<RowValues> {
        let rec = self.current()?;
        match stage {
            ChangeStage::New => rec.new.clone(),
            ChangeStage::Old => rec.old.clone(),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn store(&self) -> Option<Rc<dyn CatalogStore>> {
        self.store.clone()
    }

    fn schema_check_enabled(&self) -> bool {
        self.schema_check
    }
}

#[derive(Deserialize)]
struct WireRecord {
    table: String,
    op: ChangeOp,
    #[serde(default)]
    old: Option<HashMap<String, WireValue>>,
    #[serde(default)]
    new: Option<HashMap<String, WireValue>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Null(()),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob { blob: String },
}

impl WireRecord {
    fn into_record(self) -> std::result::Result<ChangeRecord, hex::FromHexError> {
        Ok(ChangeRecord {
            table: self.table,
            op: self.op,
            old: self.old.map(convert_values).transpose()?,
            new: self.new.map(convert_values).transpose()?,
        })
    }
}

fn convert_values(
    values: HashMap<String, WireValue>,
) -> std::result::Result<RowValues, hex::FromHexError> {
    values
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                WireValue::Null(()) => SqlValue::Null,
                WireValue::Integer(v) => SqlValue::Integer(v),
                WireValue::Real(v) => SqlValue::Real(v),
                WireValue::Text(s) => SqlValue::Text(s),
                WireValue::Blob { blob } => SqlValue::Blob(hex::decode(blob)?),
            };
            Ok((name, value))
        })
        .collect()
}
