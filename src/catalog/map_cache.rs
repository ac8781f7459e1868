//! Memoizing translation between physical tables and logical class maps.
//!
//! The cache owns two append-only maps (`table name -> Table`, `class id ->
//! ClassMap`). Entries are never evicted; a schema change requires a fresh cache.
//! Lookups that find nothing are not remembered, so every miss re-queries.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::{CatalogStore, QueryParam};
use crate::error::{AdaptorError, Result};
use crate::schema::{split_full_name, ClassMap, Table};
use crate::types::{Id64, SqlValue};

/// Table metadata together with the name and virtual flag of its class-id column.
pub(crate) const TABLE_SQL: &str = "\
SELECT json_object(
    'id', t.Id,
    'name', t.Name,
    'type', t.Type,
    'exclusiveRootClassId', COALESCE(t.ExclusiveRootClassId, 0),
    'classIdColumn', c.Name,
    'isClassIdVirtual', c.IsVirtual)
FROM ec_Table t
JOIN ec_Column c ON c.TableId = t.Id AND c.ColumnKind = 2
WHERE t.Name = ?1";

/// Class header plus every property mapped for the class and the columns backing it.
pub(crate) const CLASS_MAP_SQL: &str = "\
SELECT json_object(
    'id', c.Id,
    'name', s.Name || '.' || c.Name,
    'type', c.Type,
    'modifier', c.Modifier,
    'mapStrategy', COALESCE(m.MapStrategy, 0),
    'properties', json((
        SELECT json_group_array(json(p.doc)) FROM (
            SELECT json_object(
                'id', pp.Id,
                'name', pp.Name,
                'kind', pp.Kind,
                'primitiveType', pp.PrimitiveType,
                'extendedType', pp.ExtendedTypeName,
                'navigationRelationship', json(CASE WHEN pp.Kind = 4 THEN (
                    SELECT json_object('id', rc.Id, 'name', rs.Name || '.' || rc.Name)
                    FROM ec_Class rc JOIN ec_Schema rs ON rs.Id = rc.SchemaId
                    WHERE rc.Id = pp.NavigationRelationshipClassId) END),
                'structClass', json(CASE WHEN pp.Kind = 1 THEN (
                    SELECT json_object('id', sc.Id, 'name', ss.Name || '.' || sc.Name)
                    FROM ec_Class sc JOIN ec_Schema ss ON ss.Id = sc.SchemaId
                    WHERE sc.Id = pp.StructClassId) END),
                'columns', json(COALESCE((
                    SELECT json_group_array(json_object(
                        'table', tb.Name,
                        'column', col.Name,
                        'type', col.Type,
                        'kind', col.ColumnKind,
                        'accessString', pth.AccessString,
                        'isVirtual', (col.IsVirtual <> 0 OR tb.Type = 4)))
                    FROM ec_PropertyMap pm
                    JOIN ec_PropertyPath pth ON pth.Id = pm.PropertyPathId
                    JOIN ec_Column col ON col.Id = pm.ColumnId
                    JOIN ec_Table tb ON tb.Id = col.TableId
                    WHERE pm.ClassId = c.Id AND pth.RootPropertyId = pp.Id), '[]'))
            ) AS doc
            FROM ec_Property pp
            WHERE pp.Id IN (
                SELECT pth.RootPropertyId
                FROM ec_PropertyMap pm
                JOIN ec_PropertyPath pth ON pth.Id = pm.PropertyPathId
                WHERE pm.ClassId = c.Id)
            ORDER BY pp.Ordinal, pp.Id
        ) p)))
FROM ec_Class c
JOIN ec_Schema s ON s.Id = c.SchemaId
LEFT JOIN ec_ClassMap m ON m.ClassId = c.Id
WHERE c.Id = ?1";

/// Every class whose hierarchy closure contains the named base class.
pub(crate) const DERIVED_CLASSES_SQL: &str = "\
SELECT ch.ClassId
FROM ec_cache_ClassHierarchy ch
JOIN ec_Class b ON b.Id = ch.BaseClassId
JOIN ec_Schema s ON s.Id = b.SchemaId
WHERE (s.Name = ?1 COLLATE NOCASE OR s.Alias = ?1 COLLATE NOCASE)
  AND b.Name = ?2 COLLATE NOCASE";

/// Hit/miss counters of the two memoized lookups.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MapCacheStats {
    /// Table lookups answered from the cache.
    pub table_hits: u64,
    /// Table lookups that queried the store.
    pub table_misses: u64,
    /// Class map lookups answered from the cache.
    pub class_hits: u64,
    /// Class map lookups that queried the store.
    pub class_misses: u64,
}

/// Schema/map cache bound to one catalog store.
pub struct MapCache {
    store: Rc<dyn CatalogStore>,
    tables: FxHashMap<String, Rc<Table>>,
    classes: FxHashMap<Id64, Rc<ClassMap>>,
    stats: MapCacheStats,
}

impl MapCache {
    /// Creates an empty cache over `store`.
    pub fn new(store: Rc<dyn CatalogStore>) -> Self {
        Self {
            store,
            tables: FxHashMap::default(),
            classes: FxHashMap::default(),
            stats: MapCacheStats::default(),
        }
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> MapCacheStats {
        self.stats
    }

    /// Looks up the structural metadata of physical table `name`.
    ///
    /// Returns `None` when the table is unknown or has no class-id column, i.e.
    /// does not hold instance data.
    pub fn table(&mut self, name: &str) -> Result<Option<Rc<Table>>> {
        if let Some(table) = self.tables.get(name) {
            self.stats.table_hits += 1;
            trace!(table = name, "map cache table hit");
            return Ok(Some(Rc::clone(table)));
        }
        self.stats.table_misses += 1;
        debug!(table = name, "map cache table miss");
        let rows = self.store.query(TABLE_SQL, &[QueryParam::Text(name)])?;
        let Some(table) = first_document::<Table>(rows)? else {
            return Ok(None);
        };
        let table = Rc::new(table);
        self.tables.insert(name.to_owned(), Rc::clone(&table));
        Ok(Some(table))
    }

    /// Looks up the class map of `class_id`.
    ///
    /// The returned properties are the ones mapped for exactly this class,
    /// inherited ones included; subclass-only properties need their own lookup.
    pub fn class_map(&mut self, class_id: Id64) -> Result<Option<Rc<ClassMap>>> {
        if let Some(class) = self.classes.get(&class_id) {
            self.stats.class_hits += 1;
            trace!(class_id = %class_id, "map cache class hit");
            return Ok(Some(Rc::clone(class)));
        }
        self.stats.class_misses += 1;
        debug!(class_id = %class_id, "map cache class miss");
        let rows = self
            .store
            .query(CLASS_MAP_SQL, &[QueryParam::Id(class_id)])?;
        let Some(class) = first_document::<ClassMap>(rows)? else {
            return Ok(None);
        };
        let class = Rc::new(class);
        self.classes.insert(class_id, Rc::clone(&class));
        Ok(Some(class))
    }

    /// Returns every class id in the hierarchy rooted at `full_name`.
    ///
    /// `full_name` is `Schema.Class` or `Schema:Class`, where the schema part may
    /// be the schema name or its alias. The order carries no meaning and the
    /// result is not cached.
    pub fn derived_classes(&self, full_name: &str) -> Result<Vec<Id64>> {
        let (schema, class) = split_full_name(full_name).ok_or_else(|| {
            AdaptorError::InvalidArgument(format!(
                "class name '{full_name}' must be 'Schema.Class' or 'Schema:Class'"
            ))
        })?;
        let rows = self.store.query(
            DERIVED_CLASSES_SQL,
            &[QueryParam::Text(schema), QueryParam::Text(class)],
        )?;
        let ids: Vec<Id64> = rows
            .iter()
            .filter_map(|row| row.first().and_then(Id64::from_sql))
            .collect();
        debug!(class = full_name, derived = ids.len(), "expanded class hierarchy");
        Ok(ids)
    }
}

fn first_document<T: serde::de::DeserializeOwned>(rows: Vec<Vec<SqlValue>>) -> Result<Option<T>> {
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    match row.into_iter().next() {
        Some(SqlValue::Text(doc)) => Ok(Some(serde_json::from_str(&doc)?)),
        Some(SqlValue::Null) | None => Ok(None),
        Some(other) => Err(AdaptorError::InvalidArgument(format!(
            "catalog query returned {other:?} where a JSON document was expected"
        ))),
    }
}
