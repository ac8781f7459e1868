//! Fixed integer code tables used by the catalog.
//!
//! Every enum converts from its stored code with `TryFrom<i64>` and back with
//! `code()`. Codes outside a table are reported as [`AdaptorError::UnknownCode`].

use serde::Deserialize;

use crate::error::AdaptorError;

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
        #[serde(try_from = "i64")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Returns the catalog code of this variant.
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i64> for $name {
            type Error = AdaptorError;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(AdaptorError::UnknownCode { kind: $kind, code }),
                }
            }
        }
    };
}

code_table! {
    /// How a class is mapped onto physical tables.
    MapStrategy, "map strategy" {
        /// Class has no storage.
        NotMapped = 0,
        /// Class owns its table.
        OwnTable = 1,
        /// Class hierarchy shares one table.
        TablePerHierarchy = 2,
        /// Class maps onto a pre-existing table.
        ExistingTable = 3,
        /// Relationship stored as a foreign key in the target table.
        ForeignKeyInTargetTable = 10,
        /// Relationship stored as a foreign key in the source table.
        ForeignKeyInSourceTable = 11,
    }
}

code_table! {
    /// Kind of class.
    ClassKind, "class kind" {
        /// Entity class.
        Entity = 0,
        /// Relationship class.
        Relationship = 1,
        /// Struct class.
        Struct = 2,
        /// Custom attribute class.
        CustomAttribute = 3,
    }
}

code_table! {
    /// Class modifier.
    ClassModifier, "class modifier" {
        /// No modifier.
        None = 0,
        /// Class cannot be instantiated.
        Abstract = 1,
        /// Class cannot be derived from.
        Sealed = 2,
    }
}

code_table! {
    /// Kind of property.
    PropertyKind, "property kind" {
        /// Scalar primitive value.
        Primitive = 0,
        /// Embedded struct.
        Struct = 1,
        /// Array of primitives.
        PrimitiveArray = 2,
        /// Array of structs.
        StructArray = 3,
        /// Reference to another instance.
        Navigation = 4,
    }
}

code_table! {
    /// Primitive type of a property.
    PrimitiveType, "primitive type" {
        /// Raw bytes.
        Binary = 0x101,
        /// Boolean.
        Boolean = 0x201,
        /// Date and time.
        DateTime = 0x301,
        /// Double precision float.
        Double = 0x401,
        /// 32-bit integer.
        Integer = 0x501,
        /// 64-bit integer.
        Long = 0x601,
        /// 2D point.
        Point2d = 0x701,
        /// 3D point.
        Point3d = 0x801,
        /// Text.
        String = 0x901,
        /// Geometry.
        IGeometry = 0xa01,
    }
}

code_table! {
    /// Declared storage type of a physical column.
    ColumnType, "column type" {
        /// Untyped (shared columns).
        Any = 0,
        /// Boolean.
        Boolean = 1,
        /// Blob.
        Blob = 2,
        /// Timestamp.
        Timestamp = 3,
        /// Real.
        Real = 4,
        /// Integer.
        Integer = 5,
        /// Text.
        Text = 6,
    }
}

code_table! {
    /// Role of a physical column.
    ColumnKind, "column kind" {
        /// Ordinary data column.
        Default = 0,
        /// Instance id column.
        Id = 1,
        /// Class discriminator column.
        ClassId = 2,
        /// Shared overflow-able column.
        Shared = 4,
    }
}

code_table! {
    /// Kind of physical table.
    TableKind, "table kind" {
        /// Primary table of a hierarchy.
        Primary = 0,
        /// Joined table of a subclass.
        Joined = 1,
        /// Table that existed before mapping.
        Existing = 2,
        /// Overflow table for wide classes.
        Overflow = 3,
        /// Table that is never materialized.
        Virtual = 4,
    }
}
