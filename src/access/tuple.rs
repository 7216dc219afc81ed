use crate::access::value::{FieldType, Value};
use crate::storage::error::{StorageError, StorageResult};
use std::cmp::Ordering;
use std::fmt;

/// Scan position within a heap file: a page index and a slot on that page.
///
/// `(num_pages, 0)` is the end-of-file sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleCursor {
    pub page: usize,
    pub slot: usize,
}

impl TupleCursor {
    pub fn new(page: usize, slot: usize) -> Self {
        Self { page, slot }
    }
}

impl PartialOrd for TupleCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TupleCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by page, then by slot
        match self.page.cmp(&other.page) {
            Ordering::Equal => self.slot.cmp(&other.slot),
            other => other,
        }
    }
}

impl fmt::Display for TupleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.page, self.slot)
    }
}

/// Represents a row: an ordered, fixed-length list of values
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn field(&self, index: usize) -> StorageResult<&Value> {
        self.values
            .get(index)
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    pub fn field_type(&self, index: usize) -> StorageResult<FieldType> {
        self.field(index).map(Value::field_type)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
