#![forbid(unsafe_code)]

//! Identifier and row-value primitives shared by the catalog cache and the adaptor.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// 64-bit catalog identifier (class, table, property) rendered as `0x`-prefixed hex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Id64(pub u64);

impl Id64 {
    /// Returns `true` unless this is the reserved zero id.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Interprets a row value as an identifier.
    ///
    /// Integers are taken as-is and text must be hex (`0x..`) or decimal. Any
    /// other storage class yields `None`.
    pub fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(v) => u64::try_from(*v).ok().map(Id64),
            SqlValue::Text(text) => text.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Id64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Id64 {
    fn from(value: u64) -> Self {
        Id64(value)
    }
}

impl From<Id64> for u64 {
    fn from(value: Id64) -> Self {
        value.0
    }
}

/// Error returned when text is neither `0x` hex nor decimal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id64 literal '{0}'")]
pub struct ParseId64Error(pub String);

impl FromStr for Id64 {
    type Err = ParseId64Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(Id64)
            .map_err(|_| ParseId64Error(s.to_owned()))
    }
}

impl Serialize for Id64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Id64Visitor;

        impl<'de> Visitor<'de> for Id64Visitor {
            type Value = Id64;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an unsigned integer or a 0x-prefixed hex string")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Id64(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(Id64)
                    .map_err(|_| E::custom(format!("negative id64 {value}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Id64Visitor)
    }
}

/// One column value as stored by SQLite.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit IEEE float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns `true` for values the transform treats as "not present".
    pub fn is_falsy(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::Integer(v) => *v == 0,
            SqlValue::Real(v) => *v == 0.0 || v.is_nan(),
            SqlValue::Text(s) => s.is_empty(),
            SqlValue::Blob(_) => false,
        }
    }

    /// Borrows the payload of a blob value.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Converts into a JSON value, writing blobs as arrays of byte numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Integer(v) => serde_json::Value::from(*v),
            SqlValue::Real(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Blob(bytes) => serde_json::Value::from(bytes.clone()),
        }
    }
}

impl From<rusqlite::types::Value> for SqlValue {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value;
        match value {
            Value::Null => SqlValue::Null,
            Value::Integer(v) => SqlValue::Integer(v),
            Value::Real(v) => SqlValue::Real(v),
            Value::Text(s) => SqlValue::Text(s),
            Value::Blob(b) => SqlValue::Blob(b),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        SqlValue::Blob(value.to_vec())
    }
}
