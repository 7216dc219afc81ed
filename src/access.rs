//! Access layer for tuple-oriented operations.
//!
//! This module provides the logical view of stored rows:
//!
//! - **Value**/**FieldType**: Field values and their fixed-width types
//! - **Tuple**: An immutable row of values
//! - **TupleDesc**: A row schema and its binary codec
//! - **TupleFile**: The cursor-based protocol every tuple file implements
//! - **HeapFile**: Tuples stored unordered in slotted pages
//! - **FileScan**: A lazy, restartable sequential scan
//!
//! A cursor is a `(page, slot)` pair. Cursors are plain values; the file that
//! produced one is needed to interpret it.

pub mod heap;
pub mod scan;
pub mod schema;
pub mod tuple;
pub mod value;

pub use heap::HeapFile;
pub use scan::FileScan;
pub use schema::TupleDesc;
pub use tuple::{Tuple, TupleCursor};
pub use value::{CHAR_SIZE, DOUBLE_SIZE, FieldType, INT_SIZE, Value};

use crate::storage::error::StorageResult;

/// A file of tuples addressed by cursors.
pub trait TupleFile {
    fn tuple_desc(&self) -> &TupleDesc;

    /// Current number of pages in the file; never less than one.
    fn num_pages(&self) -> usize;

    /// Store a tuple and return where it landed.
    fn insert_tuple(&self, tuple: &Tuple) -> StorageResult<TupleCursor>;

    fn delete_tuple(&self, cursor: TupleCursor) -> StorageResult<()>;

    fn get_tuple(&self, cursor: TupleCursor) -> StorageResult<Tuple>;

    /// Cursor of the next tuple after `cursor`, or `end()`.
    fn next(&self, cursor: TupleCursor) -> StorageResult<TupleCursor>;

    /// Cursor of the first tuple, or `end()` if the file holds none.
    fn begin(&self) -> StorageResult<TupleCursor>;

    /// The end sentinel `(num_pages, 0)`.
    fn end(&self) -> TupleCursor;
}
