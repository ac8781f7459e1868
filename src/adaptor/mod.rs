#![forbid(unsafe_code)]

//! Changeset adaptor: turns physical row changes into class-aware instances.
//!
//! [`ChangesetAdaptor`] pulls one physical change at a time from a
//! [`ChangesetReader`], drops the ones rejected by its filters, resolves the
//! owning class through its private [`MapCache`] and writes the row's values at
//! the access strings of that class's properties. Each accepted change yields
//! one instance of the form
//!
//! ```json
//! { "$meta": { "table": "bis_Element", "op": "Inserted",
//!              "classFullName": "BisCore.PhysicalElement" },
//!   "CodeValue": "pump-01", "Model": { "Id": 12, "RelECClassId": "0x4c" } }
//! ```
//!
//! Only inserted and deleted rows are adapted; an update with a row payload
//! is reported as [`AdaptorError::UpdateNotSupported`].

pub mod options;
pub mod transform;

use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::catalog::MapCache;
use crate::changeset::{ChangeOp, ChangeStage, ChangesetReader, RowValues};
use crate::error::{AdaptorError, Result};
use crate::schema::{ClassMap, Table};
use crate::types::{Id64, SqlValue};

pub use options::{AdaptorOptions, FilterConfig};

/// Key of the metadata envelope inside every instance.
pub const META_KEY: &str = "$meta";

/// Class ids admitted by the class-name filter.
#[derive(Debug)]
enum ClassScope {
    /// No class-name filter.
    Any,
    /// Class names changed since the ids were last derived.
    Pending,
    /// Derived ids; may be intentionally empty.
    Only(FxHashSet<Id64>),
}

/// Adapts a changeset stream into instances, one accepted change per [`step`](Self::step).
pub struct ChangesetAdaptor<R: ChangesetReader> {
    reader: R,
    cache: MapCache,
    options: AdaptorOptions,
    tables: FxHashSet<String>,
    ops: FxHashSet<ChangeOp>,
    classes: FxHashSet<String>,
    scope: ClassScope,
    instance: Option<Value>,
}

impl<R: ChangesetReader> ChangesetAdaptor<R> {
    /// Wraps `reader` with default options.
    ///
    /// The reader must have a store attached and schema checking disabled.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, AdaptorOptions::default())
    }

    /// Wraps `reader` with explicit options.
    pub fn with_options(reader: R, options: AdaptorOptions) -> Result<Self> {
        let store = reader.store().ok_or(AdaptorError::MissingStore)?;
        if reader.schema_check_enabled() {
            return Err(AdaptorError::SchemaCheckEnabled);
        }
        Ok(Self {
            reader,
            cache: MapCache::new(store),
            options,
            tables: FxHashSet::default(),
            ops: FxHashSet::default(),
            classes: FxHashSet::default(),
            scope: ClassScope::Any,
            instance: None,
        })
    }

    /// Accepts changes of physical table `name`.
    pub fn accept_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.tables.insert(name.into());
        self
    }

    /// Accepts changes with operation `op`.
    pub fn accept_op(&mut self, op: ChangeOp) -> &mut Self {
        self.ops.insert(op);
        self
    }

    /// Accepts instances of `full_name` and its subclasses.
    ///
    /// The class ids are derived lazily on the next [`step`](Self::step).
    pub fn accept_class(&mut self, full_name: impl Into<String>) -> &mut Self {
        if self.classes.insert(full_name.into()) {
            self.scope = ClassScope::Pending;
        }
        self
    }

    /// Registers every filter in `filters`.
    pub fn apply_filters(&mut self, filters: &FilterConfig) -> &mut Self {
        for table in &filters.tables {
            self.accept_table(table.as_str());
        }
        for op in &filters.ops {
            self.accept_op(*op);
        }
        for class in &filters.classes {
            self.accept_class(class.as_str());
        }
        self
    }

    /// Class ids currently admitted, or `None` when not restricted or not derived yet.
    pub fn allowed_class_ids(&self) -> Option<&FxHashSet<Id64>> {
        match &self.scope {
            ClassScope::Only(ids) => Some(ids),
            ClassScope::Any | ClassScope::Pending => None,
        }
    }

    /// Instance produced by the last successful [`step`](Self::step).
    pub fn instance(&self) -> Option<&Value> {
        self.instance.as_ref()
    }

    /// Moves the current instance out, leaving none.
    pub fn take_instance(&mut self) -> Option<Value> {
        self.instance.take()
    }

    /// The adaptor's schema/map cache.
    pub fn map_cache(&self) -> &MapCache {
        &self.cache
    }

    /// Closes the wrapped stream. The catalog store stays open.
    pub fn close(mut self) {
        self.reader.close();
    }

    /// Advances to the next accepted change and builds its instance.
    ///
    /// Returns `false` once the stream is exhausted without another accepted
    /// change. Errors mean the changeset and the catalog disagree.
    pub fn step(&mut self) -> Result<bool> {
        self.instance = None;
        self.refresh_scope()?;

        while self.reader.step()? {
            let table_name = self.reader.table_name().to_owned();
            if self.cache.table(&table_name)?.is_none() {
                trace!(table = %table_name, "skipping change on unmapped table");
                continue;
            }
            if !self.tables.is_empty() && !self.tables.contains(&table_name) {
                trace!(table = %table_name, "skipping change rejected by table filter");
                continue;
            }
            let op = self.reader.op();
            if !self.ops.is_empty() && !self.ops.contains(&op) {
                trace!(table = %table_name, %op, "skipping change rejected by op filter");
                continue;
            }
            if !self.reader.has_row() {
                continue;
            }

            let table = self
                .cache
                .table(&table_name)?
                .ok_or_else(|| AdaptorError::UnknownTable(table_name.clone()))?;
            if table.is_virtual() {
                return Err(AdaptorError::VirtualTable(table_name));
            }
            let stage = match op {
                ChangeOp::Inserted => ChangeStage::New,
                ChangeOp::Deleted => ChangeStage::Old,
                ChangeOp::Updated => {
                    return Err(AdaptorError::UpdateNotSupported { table: table_name });
                }
            };
            let values = self
                .reader
                .change_values(stage)
                .ok_or_else(|| AdaptorError::MissingValues {
                    table: table_name.clone(),
                    op,
                    stage,
                })?;

            let (class, fallback) = self.resolve_class(&table, &values)?;
            if let ClassScope::Only(allowed) = &self.scope {
                if !allowed.contains(&class.id) {
                    trace!(table = %table_name, class = %class.full_name, "skipping change rejected by class filter");
                    continue;
                }
            }

            self.instance = Some(self.build_instance(&table_name, op, &class, fallback, &values)?);
            return Ok(true);
        }
        Ok(false)
    }

    fn refresh_scope(&mut self) -> Result<()> {
        if !matches!(self.scope, ClassScope::Pending) {
            return Ok(());
        }
        if self.classes.is_empty() {
            self.scope = ClassScope::Any;
            return Ok(());
        }
        let mut ids = FxHashSet::default();
        for name in &self.classes {
            ids.extend(self.cache.derived_classes(name)?);
        }
        debug!(
            classes = self.classes.len(),
            derived = ids.len(),
            "derived class filter"
        );
        self.scope = ClassScope::Only(ids);
        Ok(())
    }

    /// Finds the class of the row, falling back to the table's root class.
    fn resolve_class(
        &mut self,
        table: &Table,
        values: &RowValues,
    ) -> Result<(Rc<ClassMap>, Option<Id64>)> {
        let root = table.exclusive_root_class_id;
        if table.is_class_id_virtual {
            let class = self
                .cache
                .class_map(root)?
                .ok_or_else(|| AdaptorError::UnresolvedClass {
                    table: table.name.clone(),
                    class_id: root,
                    root_class_id: root,
                })?;
            return Ok((class, Some(root)));
        }

        let raw = values
            .get(&table.class_id_column)
            .filter(|value| !matches!(value, SqlValue::Null))
            .ok_or_else(|| AdaptorError::MissingClassId {
                table: table.name.clone(),
                column: table.class_id_column.clone(),
            })?;
        let class_id = Id64::from_sql(raw)
            .filter(|id| id.is_valid())
            .ok_or_else(|| AdaptorError::InvalidClassId {
                table: table.name.clone(),
                column: table.class_id_column.clone(),
            })?;
        if let Some(class) = self.cache.class_map(class_id)? {
            return Ok((class, None));
        }

        warn!(
            table = %table.name,
            class_id = %class_id,
            root_class_id = %root,
            "row class has no class map, using table root class"
        );
        let class = self
            .cache
            .class_map(root)?
            .ok_or_else(|| AdaptorError::UnresolvedClass {
                table: table.name.clone(),
                class_id,
                root_class_id: root,
            })?;
        Ok((class, Some(root)))
    }

    fn build_instance(
        &self,
        table: &str,
        op: ChangeOp,
        class: &ClassMap,
        fallback: Option<Id64>,
        values: &RowValues,
    ) -> Result<Value> {
        let mut meta = Map::new();
        meta.insert("table".into(), Value::String(table.to_owned()));
        meta.insert("op".into(), Value::String(op.as_str().to_owned()));
        if let Some(id) = fallback {
            meta.insert("fallbackClassId".into(), Value::String(id.to_string()));
        }
        meta.insert(
            "classFullName".into(),
            Value::String(class.full_name.clone()),
        );

        let mut instance = Map::new();
        instance.insert(META_KEY.into(), Value::Object(meta));
        transform::populate(&mut instance, class, table, values, &self.options)?;
        Ok(Value::Object(instance))
    }
}
