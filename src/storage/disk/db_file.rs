use crate::storage::disk::check_page_size;
use crate::storage::error::{StorageError, StorageResult};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file made of fixed-size pages. Page `i` starts at byte `i * page_size`.
///
/// The file always holds at least one page: opening an empty file writes a
/// zeroed page 0. A non-empty file must be a whole number of pages. Every physical page transfer is recorded in the read and
/// write logs.
#[derive(Debug)]
pub struct DbFile {
    name: Arc<str>,
    path: PathBuf,
    page_size: usize,
    inner: Mutex<DbFileInner>,
}

#[derive(Debug)]
struct DbFileInner {
    file: File,
    num_pages: usize,
    reads: Vec<usize>,
    writes: Vec<usize>,
}

impl DbFile {
    /// Open `path`, creating it if it does not exist.
    pub fn open(path: &Path, page_size: usize) -> StorageResult<Self> {
        check_page_size(page_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_size = file.metadata()?.len();
        if file_size % page_size as u64 != 0 {
            return Err(StorageError::PartialPage {
                file: path.to_string_lossy().into_owned(),
                file_size,
                page_size,
            });
        }

        let db_file = Self {
            name: Arc::from(path.to_string_lossy().into_owned()),
            path: path.to_path_buf(),
            page_size,
            inner: Mutex::new(DbFileInner {
                file,
                num_pages: (file_size / page_size as u64) as usize,
                reads: Vec::new(),
                writes: Vec::new(),
            }),
        };

        if db_file.num_pages() == 0 {
            db_file.append_page(&vec![0u8; page_size])?;
        }
        debug!(
            "Opened {} ({} pages of {} bytes)",
            db_file.name,
            db_file.num_pages(),
            page_size
        );

        Ok(db_file)
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_pages(&self) -> usize {
        self.inner.lock().num_pages
    }

    pub fn read_page(&self, buf: &mut [u8], page: usize) -> StorageResult<()> {
        self.check_buffer(buf.len())?;
        let mut inner = self.inner.lock();
        self.check_range(&inner, page)?;
        inner.reads.push(page);

        inner.file.seek(SeekFrom::Start(self.page_offset(page)))?;
        let mut filled = 0;
        while filled < buf.len() {
            match inner.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled != self.page_size {
            return Err(self.short_transfer(page, filled));
        }

        Ok(())
    }

    pub fn write_page(&self, buf: &[u8], page: usize) -> StorageResult<()> {
        self.check_buffer(buf.len())?;
        let mut inner = self.inner.lock();
        self.check_range(&inner, page)?;
        inner.writes.push(page);

        self.write_at(&mut inner, buf, page)
    }

    /// Write `buf` as a new last page and return its index.
    ///
    /// The page only counts towards `num_pages` once its bytes are written.
    pub fn append_page(&self, buf: &[u8]) -> StorageResult<usize> {
        self.check_buffer(buf.len())?;
        let mut inner = self.inner.lock();
        let page = inner.num_pages;
        inner.writes.push(page);

        self.write_at(&mut inner, buf, page)?;
        inner.num_pages += 1;
        debug!("Appended page {} to {}", page, self.name);

        Ok(page)
    }

    /// Page indices of every read so far, in order.
    pub fn reads(&self) -> Vec<usize> {
        self.inner.lock().reads.clone()
    }

    /// Page indices of every write so far, in order.
    pub fn writes(&self) -> Vec<usize> {
        self.inner.lock().writes.clone()
    }

    fn write_at(&self, inner: &mut DbFileInner, buf: &[u8], page: usize) -> StorageResult<()> {
        inner.file.seek(SeekFrom::Start(self.page_offset(page)))?;
        inner.file.write_all(buf).map_err(|e| {
            if e.kind() == ErrorKind::WriteZero {
                self.short_transfer(page, 0)
            } else {
                e.into()
            }
        })?;
        inner.file.sync_data()?;
        Ok(())
    }

    fn check_range(&self, inner: &DbFileInner, page: usize) -> StorageResult<()> {
        if page >= inner.num_pages {
            return Err(StorageError::PageOutOfRange {
                file: self.name.to_string(),
                page,
                num_pages: inner.num_pages,
            });
        }
        Ok(())
    }

    fn check_buffer(&self, len: usize) -> StorageResult<()> {
        if len != self.page_size {
            return Err(StorageError::PageSizeMismatch {
                file: self.name.to_string(),
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn short_transfer(&self, page: usize, actual: usize) -> StorageError {
        StorageError::ShortTransfer {
            file: self.name.to_string(),
            page,
            expected: self.page_size,
            actual,
        }
    }

    fn page_offset(&self, page: usize) -> u64 {
        page as u64 * self.page_size as u64
    }
}
