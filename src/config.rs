//! Storage configuration.

use crate::storage::disk::{DEFAULT_PAGE_SIZE, check_page_size};
use crate::storage::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// Number of buffer pool frames used when none is configured.
pub const DEFAULT_BUFFER_POOL_FRAMES: usize = 64;

/// Page size of heap files and size of the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub page_size: usize,
    pub buffer_pool_frames: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_frames: DEFAULT_BUFFER_POOL_FRAMES,
        }
    }
}

impl StorageConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_frames(mut self, frames: usize) -> Self {
        self.buffer_pool_frames = frames;
        self
    }

    pub fn validate(&self) -> StorageResult<()> {
        check_page_size(self.page_size)?;
        if self.buffer_pool_frames == 0 {
            return Err(StorageError::InvalidConfig(
                "buffer pool needs at least one frame".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.buffer_pool_frames, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_and_validation() {
        let config = StorageConfig::default()
            .with_page_size(300)
            .with_buffer_pool_frames(2);
        assert_eq!(config.page_size, 300);
        assert_eq!(config.buffer_pool_frames, 2);

        assert!(StorageConfig::default().with_page_size(0).validate().is_err());
        assert!(
            StorageConfig::default()
                .with_buffer_pool_frames(0)
                .validate()
                .is_err()
        );
    }
}
