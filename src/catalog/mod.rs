#![forbid(unsafe_code)]

//! Catalog store access and the schema/map cache built on top of it.

pub mod map_cache;

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::Connection;

use crate::error::Result;
use crate::types::{Id64, SqlValue};

pub use map_cache::{MapCache, MapCacheStats};

/// Bound parameter of a catalog query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueryParam<'a> {
    /// Text parameter.
    Text(&'a str),
    /// Identifier parameter, bound as an integer.
    Id(Id64),
}

impl ToSql for QueryParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            QueryParam::Text(text) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes()))),
            QueryParam::Id(id) => Ok(ToSqlOutput::Owned(Value::Integer(id.0 as i64))),
        }
    }
}

/// Relational store holding the catalog meta tables.
///
/// Implementations run one parameterized statement and return every result row
/// with its columns in select order.
pub trait CatalogStore {
    /// Runs `sql` with positional `params` and collects the result rows.
    fn query(&self, sql: &str, params: &[QueryParam<'_>]) -> Result<Vec<Vec<SqlValue>>>;
}

impl CatalogStore for Connection {
    fn query(&self, sql: &str, params: &[QueryParam<'_>]) -> Result<Vec<Vec<SqlValue>>> {
        let mut stmt = self.prepare_cached(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value: Value = row.get(idx)?;
                values.push(SqlValue::from(value));
            }
            out.push(values);
        }
        Ok(out)
    }
}
