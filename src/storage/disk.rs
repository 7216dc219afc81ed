//! Raw page files.

mod db_file;

pub use db_file::DbFile;

use crate::storage::error::{StorageError, StorageResult};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Reject page sizes no file can be laid out with.
pub fn check_page_size(page_size: usize) -> StorageResult<()> {
    if page_size == 0 {
        return Err(StorageError::InvalidConfig(
            "page size must be positive".to_string(),
        ));
    }
    Ok(())
}
