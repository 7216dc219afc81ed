//! Sequential scans over tuple files.

use crate::access::TupleFile;
use crate::access::tuple::{Tuple, TupleCursor};
use crate::storage::error::StorageResult;
use std::iter::FusedIterator;

/// Iterator over every tuple of a file, from `begin()` to `end()`.
///
/// Each call advances the cursor with `TupleFile::next`; pages are only
/// touched as the scan reaches them. Build a new scan to start over.
pub struct FileScan<'a, F: TupleFile> {
    file: &'a F,
    position: Option<TupleCursor>,
    finished: bool,
}

impl<'a, F: TupleFile> FileScan<'a, F> {
    pub fn new(file: &'a F) -> Self {
        Self {
            file,
            position: None,
            finished: false,
        }
    }

    /// Cursor of the tuple most recently returned.
    pub fn position(&self) -> Option<TupleCursor> {
        self.position
    }

    fn advance(&mut self) -> StorageResult<Option<(TupleCursor, Tuple)>> {
        let cursor = match self.position {
            Some(cursor) => self.file.next(cursor)?,
            None => self.file.begin()?,
        };
        if cursor.page >= self.file.num_pages() {
            return Ok(None);
        }

        self.position = Some(cursor);
        let tuple = self.file.get_tuple(cursor)?;
        Ok(Some((cursor, tuple)))
    }
}

impl<F: TupleFile> Iterator for FileScan<'_, F> {
    type Item = StorageResult<(TupleCursor, Tuple)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<F: TupleFile> FusedIterator for FileScan<'_, F> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{FieldType, HeapFile, TupleDesc, Value};
    use crate::config::StorageConfig;
    use crate::storage::buffer::BufferPoolManager;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_scan_skips_deleted_and_empty_pages() -> Result<()> {
        let dir = tempdir()?;
        let td = TupleDesc::new(vec![FieldType::Int, FieldType::Char], vec!["id", "name"])?;
        let config = StorageConfig::default().with_page_size(300);
        let heap = HeapFile::open(&dir.path().join("t.db"), td, BufferPoolManager::new(8), &config)?;

        for i in 0..12 {
            heap.insert_tuple(&Tuple::new(vec![Value::Int(i), Value::from("x")]))?;
        }
        for slot in 0..4 {
            heap.delete_tuple(TupleCursor::new(1, slot))?;
        }

        let mut scan = heap.scan();
        assert_eq!(scan.position(), None);
        let first = scan.next().transpose()?;
        assert_eq!(first.map(|(c, _)| c), Some(TupleCursor::new(0, 0)));

        let rest: Vec<TupleCursor> = scan
            .by_ref()
            .map(|r| r.map(|(c, _)| c))
            .collect::<StorageResult<_>>()?;
        assert_eq!(rest.len(), 7);
        assert!(rest.iter().all(|c| c.page != 1));
        assert_eq!(scan.position(), Some(TupleCursor::new(2, 3)));
        assert!(scan.next().is_none());

        Ok(())
    }

    #[test]
    fn test_scan_stops_after_error() -> Result<()> {
        let dir = tempdir()?;
        let td = TupleDesc::new(vec![FieldType::Char], vec!["s"])?;
        let config = StorageConfig::default().with_page_size(300);
        let pool = BufferPoolManager::new(8);
        let heap = HeapFile::open(&dir.path().join("t.db"), td, pool.clone(), &config)?;
        heap.insert_tuple(&Tuple::new(vec![Value::from("ok")]))?;
        heap.insert_tuple(&Tuple::new(vec![Value::from("fine")]))?;

        // Slot 0 starts right after the one-byte header; break its UTF-8
        pool.with_page_mut(&heap.page_id(0), |buf| buf[1] = 0xFF)?;

        let mut scan = heap.scan();
        assert!(matches!(scan.next(), Some(Err(_))));
        assert!(scan.next().is_none());

        Ok(())
    }
}
