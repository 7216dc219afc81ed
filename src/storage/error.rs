//! Storage layer error types.

use crate::access::FieldType;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Schema mismatch: {types} types but {names} names")]
    SchemaLengthMismatch { types: usize, names: usize },

    #[error("Duplicate field name: {0}")]
    DuplicateFieldName(String),

    #[error("Field name not found: {0}")]
    FieldNotFound(String),

    #[error("Invalid field index: {index} (fields: {len})")]
    FieldIndexOutOfRange { index: usize, len: usize },

    #[error("Tuple has {found} fields but the schema has {expected}")]
    IncompatibleTuple { expected: usize, found: usize },

    #[error("Text field too long: {len} bytes (max: {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("Text field {field} contains a zero byte")]
    ZeroByteInText { field: usize },

    #[error("Text field {field} is not valid UTF-8")]
    InvalidText { field: usize },

    #[error("Row buffer too small: requires {required} bytes but only {available} available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Type mismatch at field {field}: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        field: usize,
        expected: FieldType,
        found: FieldType,
    },

    #[error("Row of {row_len} bytes does not fit in a {page_size} byte page")]
    RowTooWide { row_len: usize, page_size: usize },

    #[error("Invalid slot ID: {slot} (capacity: {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },

    #[error("Slot {slot} is empty")]
    EmptySlot { slot: usize },

    #[error("Page {page} out of range for file {file} ({num_pages} pages)")]
    PageOutOfRange {
        file: String,
        page: usize,
        num_pages: usize,
    },

    #[error("Short transfer on page {page} of {file}: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        file: String,
        page: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Page size mismatch for {file}: file uses {expected} byte pages, caller asked for {actual}")]
    PageSizeMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("{file} is {file_size} bytes, not a whole number of {page_size} byte pages")]
    PartialPage {
        file: String,
        file_size: u64,
        page_size: usize,
    },

    #[error("File not registered with the buffer pool: {0}")]
    UnknownFile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Buffer pool is full: cannot allocate new frame")]
    BufferPoolFull,

    #[error("Schema file error: {0}")]
    Schema(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
