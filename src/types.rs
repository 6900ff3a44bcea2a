//! `DataType`, `Nullability` and `Value` definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported column data types.
///
/// The discriminants are the stable integer tags used on the wire; they must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Variable-length UTF-8 string.
    String = 0,
    /// 32-bit signed integer.
    Int32 = 1,
    /// 64-bit signed integer.
    Int64 = 2,
    /// 64-bit unsigned integer.
    UInt64 = 3,
    /// Timestamp with microsecond granularity.
    Datetime = 4,
    /// 64-bit floating point.
    Double = 5,
    /// Boolean.
    Bool = 6,
    /// Variable-length byte string.
    Binary = 7,
    /// 32-bit unsigned integer.
    UInt32 = 8,
    /// 32-bit floating point.
    Float = 9,
    /// Date with day granularity.
    Date = 10,
    /// A type-of-type; values are tags of this very enum.
    DataType = 11,
    /// The type of the untyped NULL literal.
    NullType = 12,
    /// An enumeration tag.
    Enum = 13,
}

impl DataType {
    /// Returns the stable integer tag of this type.
    #[must_use]
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Looks a type up by its stable integer tag.
    #[must_use]
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(DataType::String),
            1 => Some(DataType::Int32),
            2 => Some(DataType::Int64),
            3 => Some(DataType::UInt64),
            4 => Some(DataType::Datetime),
            5 => Some(DataType::Double),
            6 => Some(DataType::Bool),
            7 => Some(DataType::Binary),
            8 => Some(DataType::UInt32),
            9 => Some(DataType::Float),
            10 => Some(DataType::Date),
            11 => Some(DataType::DataType),
            12 => Some(DataType::NullType),
            13 => Some(DataType::Enum),
            _ => None,
        }
    }

    /// Returns the wire name of this type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::UInt64 => "UINT64",
            DataType::Datetime => "DATETIME",
            DataType::Double => "DOUBLE",
            DataType::Bool => "BOOL",
            DataType::Binary => "BINARY",
            DataType::UInt32 => "UINT32",
            DataType::Float => "FLOAT",
            DataType::Date => "DATE",
            DataType::DataType => "DATA_TYPE",
            DataType::NullType => "NULL_TYPE",
            DataType::Enum => "ENUM",
        }
    }

    /// Returns the logical width in bytes, or `None` for variable-length
    /// types.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            DataType::String | DataType::Binary => None,
            DataType::Bool => Some(1),
            DataType::Int32
            | DataType::UInt32
            | DataType::Float
            | DataType::Date
            | DataType::DataType
            | DataType::Enum => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Double | DataType::Datetime => Some(8),
            DataType::NullType => Some(0),
        }
    }

    /// Width of the physical values buffer entry, in bytes. Variable-length
    /// types store (offset, length) slots; NULL_TYPE carries a dummy slot.
    pub(crate) fn physical_width(self) -> usize {
        match self {
            DataType::String | DataType::Binary => 8,
            DataType::Bool => 1,
            DataType::Int64 | DataType::UInt64 | DataType::Double | DataType::Datetime => 8,
            _ => 4,
        }
    }

    /// Returns whether values of this type live in an external arena.
    #[must_use]
    pub fn is_variable_length(self) -> bool {
        matches!(self, DataType::String | DataType::Binary)
    }

    /// Returns whether this type is numeric.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Int32
                | DataType::Int64
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float
                | DataType::Double
        )
    }

    /// Returns whether this type is an integer type.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64
        )
    }

    /// Returns whether this type is a floating point type.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Returns whether values of this type have a total order usable by
    /// comparisons and sort keys.
    #[must_use]
    pub fn is_orderable(self) -> bool {
        !matches!(self, DataType::DataType | DataType::NullType | DataType::Enum)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-attribute nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    /// Values may be NULL; the column carries a null vector.
    Nullable,
    /// Values are never NULL; the column carries no null vector.
    NotNullable,
}

impl Nullability {
    /// Returns true for [`Nullability::Nullable`].
    #[must_use]
    pub fn is_nullable(self) -> bool {
        matches!(self, Nullability::Nullable)
    }

    /// Combines two nullabilities: the result is nullable if either is.
    #[must_use]
    pub fn or(self, other: Nullability) -> Nullability {
        if self.is_nullable() || other.is_nullable() {
            Nullability::Nullable
        } else {
            Nullability::NotNullable
        }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Nullability::Nullable => "NULLABLE",
            Nullability::NotNullable => "NOT_NULLABLE",
        })
    }
}

/// Runtime value container, used by row appends and literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit signed integer value.
    Int32(i32),
    /// 64-bit signed integer value.
    Int64(i64),
    /// 32-bit unsigned integer value.
    UInt32(u32),
    /// 64-bit unsigned integer value.
    UInt64(u64),
    /// 32-bit floating point value.
    Float(f32),
    /// 64-bit floating point value.
    Double(f64),
    /// Boolean value.
    Bool(bool),
    /// Date value (days since Unix epoch).
    Date(i32),
    /// Timestamp value (microseconds since Unix epoch).
    Datetime(i64),
    /// String value.
    Str(String),
    /// Binary value.
    Binary(Vec<u8>),
    /// Enumeration tag value.
    Enum(i32),
    /// Type tag value.
    Type(DataType),
    /// Null value.
    Null,
}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type of this value; `NullType` for [`Value::Null`].
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::UInt32(_) => DataType::UInt32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Bool(_) => DataType::Bool,
            Value::Date(_) => DataType::Date,
            Value::Datetime(_) => DataType::Datetime,
            Value::Str(_) => DataType::String,
            Value::Binary(_) => DataType::Binary,
            Value::Enum(_) => DataType::Enum,
            Value::Type(_) => DataType::DataType,
            Value::Null => DataType::NullType,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
