//! Catalogue of value types that can be scanned for

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Declared type of a scanned or tracked value.
///
/// Every numeric type has a fixed byte width; `String` has none and its
/// length is chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
}

impl DataType {
    /// All variants in display order
    pub const ALL: [DataType; 11] = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float,
        DataType::Double,
        DataType::String,
    ];

    /// Name used in table documents and user-facing listings
    pub const fn display_name(&self) -> &'static str {
        match self {
            DataType::Int8 => "Int8",
            DataType::UInt8 => "UInt8",
            DataType::Int16 => "Int16",
            DataType::UInt16 => "UInt16",
            DataType::Int32 => "Int32",
            DataType::UInt32 => "UInt32",
            DataType::Int64 => "Int64",
            DataType::UInt64 => "UInt64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::String => "String",
        }
    }

    /// Byte width, `None` for `String`
    pub const fn size(&self) -> Option<usize> {
        match self {
            DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Double => Some(8),
            DataType::String => None,
        }
    }

    /// Signedness for integer types, `None` for floats and strings
    pub const fn signed(&self) -> Option<bool> {
        match self {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => Some(true),
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                Some(false)
            }
            DataType::Float | DataType::Double | DataType::String => None,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        !matches!(self, DataType::String)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> MemoryResult<Self> {
        let wanted = name.trim();
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MemoryError::UnknownDataType(name.to_string()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DataType {
    type Err = MemoryError;

    fn from_str(s: &str) -> MemoryResult<Self> {
        DataType::from_name(s)
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        DataType::from_name(&name).map_err(serde::de::Error::custom)
    }
}
