pub mod heap_page;

use std::fmt;
use std::sync::Arc;

/// Identifies a page in the buffer pool: the owning file's name and the
/// page's index within that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId {
    pub file: Arc<str>,
    pub index: usize,
}

impl PageId {
    pub fn new(file: impl Into<Arc<str>>, index: usize) -> Self {
        Self {
            file: file.into(),
            index,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.index)
    }
}

pub use heap_page::{HeapPage, slot_capacity};
