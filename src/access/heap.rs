use crate::access::scan::FileScan;
use crate::access::schema::TupleDesc;
use crate::access::tuple::{Tuple, TupleCursor};
use crate::access::TupleFile;
use crate::config::StorageConfig;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::disk::{DbFile, check_page_size};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId, slot_capacity};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An unordered collection of tuples stored in the slotted pages of one file.
///
/// Pages are read and modified through the buffer pool; a page is only
/// written directly when it is appended to the file. Inserts fill the first
/// free slot of the file, so deleted slots are reused before the file grows.
/// Pages are never removed.
pub struct HeapFile {
    file: Arc<DbFile>,
    td: Arc<TupleDesc>,
    buffer_pool: BufferPoolManager,
}

impl HeapFile {
    /// Open the heap file at `path`, creating an empty one if needed.
    ///
    /// If the file has a schema sidecar, the configured page size must match
    /// the one recorded there.
    pub fn open(
        path: &Path,
        td: impl Into<Arc<TupleDesc>>,
        buffer_pool: BufferPoolManager,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let sidecar = schema_path(path);
        if sidecar.exists() {
            let stored = SchemaFile::read(&sidecar)?;
            if stored.page_size != config.page_size {
                return Err(StorageError::PageSizeMismatch {
                    file: path.to_string_lossy().into_owned(),
                    expected: stored.page_size,
                    actual: config.page_size,
                });
            }
        }

        Self::open_with_page_size(path, td.into(), buffer_pool, config.page_size)
    }

    /// Create a new heap file and record its schema and page size next to it.
    pub fn create(
        path: &Path,
        td: impl Into<Arc<TupleDesc>>,
        buffer_pool: BufferPoolManager,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        if path.exists() {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("Heap file already exists at {:?}", path),
            )
            .into());
        }

        let td = td.into();
        let heap = Self::open_with_page_size(path, td.clone(), buffer_pool, config.page_size)?;
        SchemaFile {
            page_size: config.page_size,
            schema: td.encode()?,
        }
        .write(&schema_path(path))?;
        info!(
            "Created heap file {} with {} fields and {} byte pages",
            heap.name(),
            td.len(),
            config.page_size
        );

        Ok(heap)
    }

    /// Open a heap file created by [`HeapFile::create`], reading its schema
    /// and page size from the sidecar. The configured page size is ignored.
    pub fn open_existing(
        path: &Path,
        buffer_pool: BufferPoolManager,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let stored = SchemaFile::read(&schema_path(path))?;
        if stored.page_size != config.page_size {
            debug!(
                "{:?} uses {} byte pages, not the configured {}",
                path, stored.page_size, config.page_size
            );
        }
        let td = TupleDesc::decode(&stored.schema)?;
        Self::open_with_page_size(path, td.into(), buffer_pool, stored.page_size)
    }

    fn open_with_page_size(
        path: &Path,
        td: Arc<TupleDesc>,
        buffer_pool: BufferPoolManager,
        page_size: usize,
    ) -> StorageResult<Self> {
        check_page_size(page_size)?;
        if slot_capacity(page_size, td.length()) == 0 {
            return Err(StorageError::RowTooWide {
                row_len: td.length(),
                page_size,
            });
        }

        let file = Arc::new(DbFile::open(path, page_size)?);
        buffer_pool.register(file.clone());

        Ok(Self {
            file,
            td,
            buffer_pool,
        })
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// The underlying page file.
    pub fn file(&self) -> &Arc<DbFile> {
        &self.file
    }

    pub fn page_id(&self, index: usize) -> PageId {
        PageId::new(self.file.name().clone(), index)
    }

    /// Lazy scan over every tuple, from `begin()` to `end()`.
    pub fn scan(&self) -> FileScan<'_, Self> {
        FileScan::new(self)
    }

    fn check_page(&self, page: usize) -> StorageResult<()> {
        let num_pages = self.num_pages();
        if page >= num_pages {
            return Err(StorageError::PageOutOfRange {
                file: self.name().to_string(),
                page,
                num_pages,
            });
        }
        Ok(())
    }

    /// First occupied slot at or after page `page`. `after` restricts the
    /// search on that first page to slots strictly after it.
    fn seek(&self, mut page: usize, mut after: Option<usize>) -> StorageResult<TupleCursor> {
        let num_pages = self.num_pages();
        while page < num_pages {
            let found = self.buffer_pool.with_page(&self.page_id(page), |buf| {
                let heap_page = HeapPage::new(buf, &self.td)?;
                let slot = match after {
                    Some(slot) => heap_page.next(slot),
                    None => heap_page.begin(),
                };
                Ok::<_, StorageError>((slot < heap_page.end()).then_some(slot))
            })??;

            if let Some(slot) = found {
                return Ok(TupleCursor::new(page, slot));
            }
            page += 1;
            after = None;
        }
        Ok(self.end())
    }
}

impl TupleFile for HeapFile {
    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn num_pages(&self) -> usize {
        self.file.num_pages()
    }

    fn insert_tuple(&self, tuple: &Tuple) -> StorageResult<TupleCursor> {
        // First fit: lowest page, then lowest slot
        for index in 0..self.num_pages() {
            let page_id = self.page_id(index);
            let slot = self
                .buffer_pool
                .with_page_mut(&page_id, |buf| HeapPage::new(buf, &self.td)?.insert_tuple(tuple))??;
            if let Some(slot) = slot {
                self.buffer_pool.mark_dirty(&page_id)?;
                return Ok(TupleCursor::new(index, slot));
            }
        }

        // Every page is full: build the new page in memory, then append it
        let mut buf = vec![0u8; self.file.page_size()];
        let slot = HeapPage::new(buf.as_mut_slice(), &self.td)?
            .insert_tuple(tuple)?
            .ok_or(StorageError::RowTooWide {
                row_len: self.td.length(),
                page_size: self.file.page_size(),
            })?;
        let page = self.file.append_page(&buf)?;
        self.buffer_pool.mark_dirty(&self.page_id(page))?;
        debug!("Allocated page {} of {}", page, self.name());

        Ok(TupleCursor::new(page, slot))
    }

    fn delete_tuple(&self, cursor: TupleCursor) -> StorageResult<()> {
        self.check_page(cursor.page)?;
        let page_id = self.page_id(cursor.page);
        self.buffer_pool
            .with_page_mut(&page_id, |buf| HeapPage::new(buf, &self.td)?.delete_tuple(cursor.slot))??;
        self.buffer_pool.mark_dirty(&page_id)
    }

    fn get_tuple(&self, cursor: TupleCursor) -> StorageResult<Tuple> {
        self.check_page(cursor.page)?;
        self.buffer_pool
            .with_page(&self.page_id(cursor.page), |buf| {
                HeapPage::new(buf, &self.td)?.get_tuple(cursor.slot)
            })?
    }

    fn next(&self, cursor: TupleCursor) -> StorageResult<TupleCursor> {
        self.seek(cursor.page, Some(cursor.slot))
    }

    fn begin(&self) -> StorageResult<TupleCursor> {
        self.seek(0, None)
    }

    fn end(&self) -> TupleCursor {
        TupleCursor::new(self.num_pages(), 0)
    }
}

impl<'a> IntoIterator for &'a HeapFile {
    type Item = StorageResult<(TupleCursor, Tuple)>;
    type IntoIter = FileScan<'a, HeapFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.scan()
    }
}

/// Location of the schema written by [`HeapFile::create`].
pub fn schema_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".schema");
    PathBuf::from(name)
}

/// Contents of the `.schema` sidecar.
#[derive(Serialize, Deserialize)]
struct SchemaFile {
    page_size: usize,
    schema: Vec<u8>,
}

impl SchemaFile {
    fn read(path: &Path) -> StorageResult<Self> {
        let stored: SchemaFile = bincode::deserialize(&fs::read(path)?)?;
        check_page_size(stored.page_size)?;
        Ok(stored)
    }

    fn write(&self, path: &Path) -> StorageResult<()> {
        fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }
}
