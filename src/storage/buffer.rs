pub mod lru;
pub mod replacer;

use crate::storage::disk::DbFile;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use dashmap::DashMap;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use replacer::{FrameId, Replacer};
use std::collections::HashMap;
use std::sync::Arc;

struct Frame {
    data: Vec<u8>,
    page_id: Option<PageId>,
    is_dirty: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            page_id: None,
            is_dirty: false,
        }
    }
}

/// In-memory cache of pages from registered files.
///
/// Pages are reached through [`with_page`](Self::with_page) and
/// [`with_page_mut`](Self::with_page_mut), which load the page on a miss and
/// hold it only for the duration of the closure. Modified pages must be
/// reported with [`mark_dirty`](Self::mark_dirty) to be written back on
/// eviction or flush. Closures must not call back into the pool.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    files: DashMap<Arc<str>, Arc<DbFile>>,
    state: Mutex<PoolState>,
    max_frames: usize,
}

struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    frames: Vec<Frame>,
    free_frames: Vec<FrameId>,
    replacer: Box<dyn Replacer>,
}

impl BufferPoolManager {
    pub fn new(max_frames: usize) -> Self {
        Self::with_replacer(Box::new(lru::LruReplacer::new()), max_frames)
    }

    pub fn with_replacer(replacer: Box<dyn Replacer>, max_frames: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                files: DashMap::new(),
                state: Mutex::new(PoolState {
                    page_table: HashMap::with_capacity(max_frames),
                    frames: Vec::with_capacity(max_frames),
                    free_frames: Vec::new(),
                    replacer,
                }),
                max_frames,
            }),
        }
    }

    /// Make a file's pages reachable by its name.
    pub fn register(&self, file: Arc<DbFile>) {
        debug!("Registered {} with the buffer pool", file.name());
        if let Some(old) = self.inner.files.insert(file.name().clone(), file) {
            // Pages cached for the old handle are written back through it
            let mut state = self.inner.state.lock();
            let stale: Vec<FrameId> = state
                .page_table
                .iter()
                .filter(|(page_id, _)| *page_id.file == **old.name())
                .map(|(_, &frame_id)| frame_id)
                .collect();
            for frame_id in stale {
                if let Err(e) = Self::release_frame(&mut state, &old, frame_id) {
                    warn!("Failed to write back page of {}: {}", old.name(), e);
                }
            }
        }
    }

    pub fn file(&self, name: &str) -> StorageResult<Arc<DbFile>> {
        self.inner
            .files
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::UnknownFile(name.to_string()))
    }

    /// Run `f` over the bytes of a page.
    pub fn with_page<R>(&self, page_id: &PageId, f: impl FnOnce(&[u8]) -> R) -> StorageResult<R> {
        let mut state = self.inner.state.lock();
        let frame_id = self.fetch_frame(&mut state, page_id)?;
        Ok(f(state.frames[frame_id].data.as_slice()))
    }

    /// Run `f` over the mutable bytes of a page. The page is not marked
    /// dirty.
    pub fn with_page_mut<R>(
        &self,
        page_id: &PageId,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> StorageResult<R> {
        let mut state = self.inner.state.lock();
        let frame_id = self.fetch_frame(&mut state, page_id)?;
        Ok(f(state.frames[frame_id].data.as_mut_slice()))
    }

    /// Mark a page for write-back, loading it first if it is not cached.
    pub fn mark_dirty(&self, page_id: &PageId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let frame_id = self.fetch_frame(&mut state, page_id)?;
        state.frames[frame_id].is_dirty = true;
        trace!("Marked {} dirty", page_id);
        Ok(())
    }

    pub fn is_dirty(&self, page_id: &PageId) -> bool {
        let state = self.inner.state.lock();
        state
            .page_table
            .get(page_id)
            .is_some_and(|&frame_id| state.frames[frame_id].is_dirty)
    }

    pub fn contains(&self, page_id: &PageId) -> bool {
        self.inner.state.lock().page_table.contains_key(page_id)
    }

    /// Cached pages waiting for write-back, ordered by file and index.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        let state = self.inner.state.lock();
        let mut pages: Vec<PageId> = state
            .frames
            .iter()
            .filter(|frame| frame.is_dirty)
            .filter_map(|frame| frame.page_id.clone())
            .collect();
        pages.sort_by(|a, b| (&a.file, a.index).cmp(&(&b.file, b.index)));
        pages
    }

    pub fn flush_page(&self, page_id: &PageId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        if let Some(&frame_id) = state.page_table.get(page_id) {
            let file = self.file(&page_id.file)?;
            Self::write_back(&mut state.frames[frame_id], &file)?;
        }
        Ok(())
    }

    pub fn flush_all(&self) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        for frame in state.frames.iter_mut() {
            if let Some(page_id) = &frame.page_id {
                let file = self.file(&page_id.file)?;
                Self::write_back(frame, &file)?;
            }
        }
        Ok(())
    }

    fn fetch_frame(&self, state: &mut PoolState, page_id: &PageId) -> StorageResult<FrameId> {
        if let Some(&frame_id) = state.page_table.get(page_id) {
            state.replacer.record_access(frame_id);
            return Ok(frame_id);
        }

        let file = self.file(&page_id.file)?;
        let frame_id = self.get_frame(state)?;

        let frame = &mut state.frames[frame_id];
        frame.data.clear();
        frame.data.resize(file.page_size(), 0);
        if let Err(e) = file.read_page(&mut frame.data, page_id.index) {
            state.free_frames.push(frame_id);
            return Err(e);
        }
        frame.page_id = Some(page_id.clone());
        frame.is_dirty = false;

        state.page_table.insert(page_id.clone(), frame_id);
        state.replacer.record_access(frame_id);
        trace!("Loaded {} into frame {}", page_id, frame_id);

        Ok(frame_id)
    }

    fn get_frame(&self, state: &mut PoolState) -> StorageResult<FrameId> {
        if let Some(frame_id) = state.free_frames.pop() {
            return Ok(frame_id);
        }

        // Try to allocate new frame if under limit
        if state.frames.len() < self.inner.max_frames {
            state.frames.push(Frame::new());
            return Ok(state.frames.len() - 1);
        }

        // Need to evict a frame
        let frame_id = state
            .replacer
            .evict()
            .ok_or(StorageError::BufferPoolFull)?;
        if let Some(old_page_id) = state.frames[frame_id].page_id.clone() {
            debug!("Evicting {} from frame {}", old_page_id, frame_id);
            let written = self
                .file(&old_page_id.file)
                .and_then(|file| Self::write_back(&mut state.frames[frame_id], &file));
            if let Err(e) = written {
                state.replacer.record_access(frame_id);
                return Err(e);
            }
            state.page_table.remove(&old_page_id);
            state.frames[frame_id].page_id = None;
        }

        Ok(frame_id)
    }

    fn release_frame(state: &mut PoolState, file: &DbFile, frame_id: FrameId) -> StorageResult<()> {
        let result = Self::write_back(&mut state.frames[frame_id], file);
        if let Some(page_id) = state.frames[frame_id].page_id.take() {
            state.page_table.remove(&page_id);
        }
        state.frames[frame_id].is_dirty = false;
        state.replacer.remove(frame_id);
        state.free_frames.push(frame_id);
        result
    }

    fn write_back(frame: &mut Frame, file: &DbFile) -> StorageResult<()> {
        if let (true, Some(page_id)) = (frame.is_dirty, &frame.page_id) {
            file.write_page(&frame.data, page_id.index)?;
            frame.is_dirty = false;
            trace!("Flushed {}", page_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::{TempDir, tempdir};

    const PAGE: usize = 256;

    fn create_test_file(dir: &TempDir, name: &str, pages: usize) -> Result<Arc<DbFile>> {
        let file = DbFile::open(&dir.path().join(name), PAGE)?;
        for i in 1..pages {
            file.append_page(&vec![i as u8; PAGE])?;
        }
        Ok(Arc::new(file))
    }

    #[test]
    fn test_read_through() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 3)?;
        let pool = BufferPoolManager::new(10);
        pool.register(file.clone());

        let first = pool.with_page(&PageId::new(file.name().clone(), 2), |buf| buf[0])?;
        assert_eq!(first, 2);
        assert_eq!(file.reads(), vec![2]);

        // Second access hits the cache
        pool.with_page(&PageId::new(file.name().clone(), 2), |_| ())?;
        assert_eq!(file.reads(), vec![2]);

        Ok(())
    }

    #[test]
    fn test_unknown_file_and_page() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 1)?;
        let pool = BufferPoolManager::new(2);
        pool.register(file.clone());

        assert!(matches!(
            pool.with_page(&PageId::new("missing.db", 0), |_| ()),
            Err(StorageError::UnknownFile(_))
        ));
        assert!(matches!(
            pool.with_page(&PageId::new(file.name().clone(), 5), |_| ()),
            Err(StorageError::PageOutOfRange { .. })
        ));
        // The failed load did not leak a frame
        pool.with_page(&PageId::new(file.name().clone(), 0), |_| ())?;
        assert!(pool.contains(&PageId::new(file.name().clone(), 0)));

        Ok(())
    }

    #[test]
    fn test_mark_dirty_and_flush() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 2)?;
        let pool = BufferPoolManager::new(10);
        pool.register(file.clone());
        let page_id = PageId::new(file.name().clone(), 1);

        pool.with_page_mut(&page_id, |buf| buf[0] = 42)?;
        assert!(!pool.is_dirty(&page_id));
        pool.mark_dirty(&page_id)?;
        pool.mark_dirty(&page_id)?;
        assert!(pool.is_dirty(&page_id));
        assert_eq!(pool.dirty_pages(), vec![page_id.clone()]);

        let writes_before = file.writes().len();
        pool.flush_page(&page_id)?;
        assert!(!pool.is_dirty(&page_id));
        assert_eq!(file.writes().len(), writes_before + 1);

        // Clean pages are not written again
        pool.flush_all()?;
        assert_eq!(file.writes().len(), writes_before + 1);

        let mut buf = vec![0u8; PAGE];
        file.read_page(&mut buf, 1)?;
        assert_eq!(buf[0], 42);

        Ok(())
    }

    #[test]
    fn test_eviction_writes_back_dirty_pages() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 4)?;
        let pool = BufferPoolManager::new(2);
        pool.register(file.clone());
        let page = |i| PageId::new(file.name().clone(), i);

        pool.with_page_mut(&page(0), |buf| buf[0] = 100)?;
        pool.mark_dirty(&page(0))?;
        pool.with_page(&page(1), |_| ())?;
        // Page 0 is least recently used
        pool.with_page(&page(2), |_| ())?;

        assert!(!pool.contains(&page(0)));
        assert!(pool.contains(&page(1)));
        assert!(pool.contains(&page(2)));
        assert!(file.writes().contains(&0));

        let value = pool.with_page(&page(0), |buf| buf[0])?;
        assert_eq!(value, 100);

        Ok(())
    }

    #[test]
    fn test_zero_frames() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 1)?;
        let pool = BufferPoolManager::new(0);
        pool.register(file.clone());

        assert!(matches!(
            pool.with_page(&PageId::new(file.name().clone(), 0), |_| ()),
            Err(StorageError::BufferPoolFull)
        ));

        Ok(())
    }

    #[test]
    fn test_multiple_files() -> Result<()> {
        let dir = tempdir()?;
        let a = create_test_file(&dir, "a.db", 2)?;
        let b = create_test_file(&dir, "b.db", 2)?;
        let pool = BufferPoolManager::new(4);
        pool.register(a.clone());
        pool.register(b.clone());

        pool.with_page_mut(&PageId::new(b.name().clone(), 1), |buf| buf[1] = 7)?;
        pool.mark_dirty(&PageId::new(b.name().clone(), 1))?;
        pool.flush_all()?;

        assert_eq!(a.writes(), vec![0, 1]);
        assert_eq!(b.writes(), vec![0, 1, 1]);

        Ok(())
    }

    #[test]
    fn test_reregister_writes_back_old_pages() -> Result<()> {
        let dir = tempdir()?;
        let file = create_test_file(&dir, "a.db", 1)?;
        let pool = BufferPoolManager::new(4);
        pool.register(file.clone());
        let page_id = PageId::new(file.name().clone(), 0);

        pool.with_page_mut(&page_id, |buf| buf[3] = 9)?;
        pool.mark_dirty(&page_id)?;

        let reopened = Arc::new(DbFile::open(file.path(), PAGE)?);
        pool.register(reopened.clone());
        assert!(!pool.contains(&page_id));

        assert_eq!(pool.with_page(&page_id, |buf| buf[3])?, 9);
        assert_eq!(reopened.reads(), vec![0]);

        Ok(())
    }
}
