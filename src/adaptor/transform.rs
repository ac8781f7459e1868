//! Row-to-instance property transform.

use serde_json::{Map, Value};
use tracing::trace;

use super::options::AdaptorOptions;
use crate::changeset::RowValues;
use crate::error::{AdaptorError, Result};
use crate::schema::{ClassMap, PrimitiveType, Property, PropertyKind};
use crate::types::SqlValue;

/// Written in place of an encoded geometry stream.
pub const GEOMETRY_STREAM_PLACEHOLDER: &str = "{GeometryStream}";
/// Written in place of a binary value.
pub const BINARY_PLACEHOLDER: &str = "{Binary}";

/// Renders 16 bytes as a canonical lowercase GUID (`8-4-4-4-12` hex digits).
pub fn decode_guid(bytes: &[u8]) -> Result<String> {
    if bytes.len() != 16 {
        return Err(AdaptorError::InvalidGuidLength(bytes.len()));
    }
    Ok(format!(
        "{}-{}-{}-{}-{}",
        hex::encode(&bytes[0..4]),
        hex::encode(&bytes[4..6]),
        hex::encode(&bytes[6..8]),
        hex::encode(&bytes[8..10]),
        hex::encode(&bytes[10..16]),
    ))
}

/// Writes `value` at the dotted `access_string` inside `target`.
///
/// Intermediate objects are created as needed; a non-object found on the way is
/// replaced. The last segment is overwritten.
pub fn set_value(target: &mut Map<String, Value>, access_string: &str, value: Value) {
    let mut segments = access_string.split('.');
    let Some(mut key) = segments.next() else {
        return;
    };
    let mut current = target;
    for next in segments {
        let slot = current
            .entry(key.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        current = map;
        key = next;
    }
    current.insert(key.to_owned(), value);
}

/// Converts one stored value according to the property's extended and primitive type.
fn transform_value(prop: &Property, value: &SqlValue) -> Result<Value> {
    if prop.is_guid() {
        return match value.as_blob() {
            Some(bytes) => decode_guid(bytes).map(Value::String),
            None => Ok(value.to_json()),
        };
    }
    if prop.is_geometry_stream() {
        return Ok(Value::String(GEOMETRY_STREAM_PLACEHOLDER.to_owned()));
    }
    if prop.primitive_type == Some(PrimitiveType::Binary) {
        return Ok(Value::String(BINARY_PLACEHOLDER.to_owned()));
    }
    Ok(value.to_json())
}

/// Populates `instance` with every property of `class` stored in `table`.
pub(crate) fn populate(
    instance: &mut Map<String, Value>,
    class: &ClassMap,
    table: &str,
    values: &RowValues,
    options: &AdaptorOptions,
) -> Result<()> {
    for prop in &class.properties {
        if prop.is_array() {
            if options.fail_on_array_properties && prop.columns_in(table).next().is_some() {
                return Err(AdaptorError::UnsupportedArrayProperty {
                    class: class.full_name.clone(),
                    property: prop.name.clone(),
                });
            }
            trace!(property = %prop.name, "skipping array property");
            continue;
        }
        for col in prop.columns_in(table) {
            if col.is_virtual {
                if prop.kind == PropertyKind::Navigation && col.is_rel_class_id() {
                    if let Some(rel) = &prop.navigation_relationship {
                        set_value(instance, &col.access_string, Value::String(rel.id.to_string()));
                    }
                }
                continue;
            }
            let Some(value) = values.get(&col.column) else {
                continue;
            };
            if value.is_falsy() {
                continue;
            }
            set_value(instance, &col.access_string, transform_value(prop, value)?);
        }
    }
    Ok(())
}
