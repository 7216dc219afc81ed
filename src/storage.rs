//! Storage layer implementation for heapdb.
//!
//! This module provides the foundation for persistent data storage using a page-based
//! architecture. Key components:
//!
//! - **DbFile**: A file of fixed-size pages with bounds-checked page I/O
//! - **BufferPoolManager**: In-memory cache of pages with LRU eviction and dirty tracking
//! - **HeapPage**: Slotted page format for storing fixed-width tuples
//!
//! Pages are identified by the name of their file and their index in it.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::BufferPoolManager;
pub use disk::{DEFAULT_PAGE_SIZE, DbFile};
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, PageId};
