use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of an `Int` field on disk.
pub const INT_SIZE: usize = 4;
/// Width of a `Double` field on disk.
pub const DOUBLE_SIZE: usize = 8;
/// Width of a `Char` field on disk. Shorter text is zero-padded.
pub const CHAR_SIZE: usize = 64;

/// Field types supported by the storage engine
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int = 1,
    Double = 2,
    Char = 3,
}

impl FieldType {
    /// Fixed number of bytes a field of this type occupies in a row.
    pub const fn width(self) -> usize {
        match self {
            FieldType::Int => INT_SIZE,
            FieldType::Double => DOUBLE_SIZE,
            FieldType::Char => CHAR_SIZE,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "INT"),
            FieldType::Double => write!(f, "DOUBLE"),
            FieldType::Char => write!(f, "CHAR({})", CHAR_SIZE),
        }
    }
}

/// Values that can be stored in a tuple
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Double(f64),
    Char(String),
}

impl Value {
    /// Get the field type of this value
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Double(_) => FieldType::Double,
            Value::Char(_) => FieldType::Char,
        }
    }

    /// Check if this value can be stored in a field of the given type
    pub fn is_compatible_with(&self, field_type: FieldType) -> bool {
        self.field_type() == field_type
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Char(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Char(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(s) => write!(f, "{}", s),
        }
    }
}
