#![forbid(unsafe_code)]

//! Descriptors for classes, properties, columns and tables as read from the catalog.
//!
//! The descriptors are plain data. They are deserialized from the JSON documents
//! produced by the catalog queries in [`crate::catalog::map_cache`] and never
//! mutated afterwards.

pub mod codes;

use serde::Deserialize;

use crate::types::Id64;

pub use codes::{
    ClassKind, ClassModifier, ColumnKind, ColumnType, MapStrategy, PrimitiveType, PropertyKind,
    TableKind,
};

/// Extended type name marking a 16-byte compact GUID.
pub const GUID_EXTENDED_TYPE: &str = "BeGuid";
/// Extended type name marking an encoded geometry stream.
pub const GEOMETRY_STREAM_EXTENDED_TYPE: &str = "GeometryStream";
/// Access-string suffix of a navigation property's relationship class id.
pub const REL_CLASS_ID_SUFFIX: &str = ".RelECClassId";

/// Lightweight reference to a class.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClassRef {
    /// Class identifier.
    pub id: Id64,
    /// Fully qualified `Schema.Class` name.
    pub name: String,
}

/// Class mapped onto storage together with its properties.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMap {
    /// Class identifier.
    pub id: Id64,
    /// Fully qualified `Schema.Class` name.
    #[serde(rename = "name")]
    pub full_name: String,
    /// Mapping strategy.
    pub map_strategy: MapStrategy,
    /// Class kind.
    #[serde(rename = "type")]
    pub kind: ClassKind,
    /// Class modifier.
    pub modifier: ClassModifier,
    /// Properties in declaration order.
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ClassMap {
    /// Finds a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|prop| prop.name == name)
    }
}

/// Property of a class with every column backing it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Property identifier.
    pub id: Id64,
    /// Property name.
    pub name: String,
    /// Property kind.
    pub kind: PropertyKind,
    /// Primitive type, when the property has one.
    #[serde(default)]
    pub primitive_type: Option<PrimitiveType>,
    /// Extended type marker, e.g. [`GUID_EXTENDED_TYPE`].
    #[serde(default)]
    pub extended_type: Option<String>,
    /// Relationship class of a navigation property.
    #[serde(default)]
    pub navigation_relationship: Option<ClassRef>,
    /// Struct class of a struct property.
    #[serde(default)]
    pub struct_class: Option<ClassRef>,
    /// Physical storage locations, possibly across several tables.
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Property {
    /// Returns `true` for primitive-array and struct-array properties.
    pub fn is_array(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::PrimitiveArray | PropertyKind::StructArray
        )
    }

    /// Iterates the columns stored in `table`.
    pub fn columns_in<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns.iter().filter(move |col| col.table == table)
    }

    fn has_extended_type(&self, name: &str) -> bool {
        self.extended_type
            .as_deref()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(name))
    }

    /// Returns `true` when values are compact 16-byte GUIDs.
    pub fn is_guid(&self) -> bool {
        self.has_extended_type(GUID_EXTENDED_TYPE)
    }

    /// Returns `true` when values are encoded geometry streams.
    pub fn is_geometry_stream(&self) -> bool {
        self.has_extended_type(GEOMETRY_STREAM_EXTENDED_TYPE)
    }
}

/// Physical column backing (part of) a property.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Physical table name.
    pub table: String,
    /// Physical column name.
    pub column: String,
    /// Declared storage type.
    #[serde(rename = "type")]
    pub storage: ColumnType,
    /// Column role.
    pub kind: ColumnKind,
    /// Dotted path of the value inside an instance.
    pub access_string: String,
    /// Column holds no stored value (own flag or virtual table).
    #[serde(deserialize_with = "serde_flag::deserialize")]
    pub is_virtual: bool,
}

impl Column {
    /// Returns `true` for the relationship class id part of a navigation property.
    pub fn is_rel_class_id(&self) -> bool {
        self.access_string.ends_with(REL_CLASS_ID_SUFFIX)
    }
}

/// Structural metadata of a physical table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table identifier.
    pub id: Id64,
    /// Physical table name.
    pub name: String,
    /// Table kind.
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// Root class owning every row of the table.
    pub exclusive_root_class_id: Id64,
    /// Discriminator column name.
    pub class_id_column: String,
    /// Discriminator column is virtual, so rows carry no class tag.
    #[serde(deserialize_with = "serde_flag::deserialize")]
    pub is_class_id_virtual: bool,
}

impl Table {
    /// Returns `true` for tables that never hold physical rows.
    pub fn is_virtual(&self) -> bool {
        self.kind == TableKind::Virtual
    }
}

/// Splits `Schema.Class` or `Schema:Class` into its two parts.
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (schema, class) = full_name.split_once(['.', ':'])?;
    let (schema, class) = (schema.trim(), class.trim());
    if schema.is_empty() || class.is_empty() {
        return None;
    }
    Some((schema, class))
}

mod serde_flag {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FlagVisitor;

        impl<'de> Visitor<'de> for FlagVisitor {
            type Value = bool;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a boolean or a 0/1 integer")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value != 0)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value != 0)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(false)
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}
