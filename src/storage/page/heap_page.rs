//! Slotted heap page with fixed-width slots.
//!
//! ```text
//! +----------------------------+ offset 0
//! | Occupancy bitmap           | ceil(capacity / 8) bytes
//! +----------------------------+ offset header_len
//! | Slot 0                     | row_len bytes
//! | Slot 1                     |
//! | ...                        |
//! | Slot capacity - 1          |
//! +----------------------------+
//! | Unused tail                |
//! +----------------------------+ offset page_size
//! ```
//!
//! Slot `i` is occupied when bit `7 - i % 8` of header byte `i / 8` is set
//! (most significant bit first).

use crate::access::{Tuple, TupleDesc};
use crate::storage::error::{StorageError, StorageResult};

/// Maximum number of slots of `row_len` bytes that fit in a page together
/// with one header bit per slot.
pub fn slot_capacity(page_size: usize, row_len: usize) -> usize {
    (page_size * 8) / (row_len * 8 + 1)
}

/// A view over one page buffer. `B` is `&[u8]` for read-only access or
/// `&mut [u8]` for mutation; the view never owns the bytes.
pub struct HeapPage<'a, B> {
    data: B,
    td: &'a TupleDesc,
    capacity: usize,
    header_len: usize,
    count: usize,
}

impl<'a, B: AsRef<[u8]>> HeapPage<'a, B> {
    pub fn new(data: B, td: &'a TupleDesc) -> StorageResult<Self> {
        let page_size = data.as_ref().len();
        let row_len = td.length();
        let capacity = slot_capacity(page_size, row_len);
        if capacity == 0 {
            return Err(StorageError::RowTooWide { row_len, page_size });
        }
        let header_len = capacity.div_ceil(8);
        debug_assert!(header_len + capacity * row_len <= page_size);

        let mut page = Self {
            data,
            td,
            capacity,
            header_len,
            count: 0,
        };
        let count = (0..capacity).filter(|&slot| page.is_occupied(slot)).count();
        page.count = count;
        Ok(page)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// First occupied slot, or `end()` if the page is empty.
    pub fn begin(&self) -> usize {
        (0..self.capacity)
            .find(|&slot| self.is_occupied(slot))
            .unwrap_or(self.capacity)
    }

    /// One past the last slot.
    pub fn end(&self) -> usize {
        self.capacity
    }

    /// Next occupied slot strictly after `slot`, or `end()`.
    pub fn next(&self, slot: usize) -> usize {
        (slot.saturating_add(1)..self.capacity)
            .find(|&s| self.is_occupied(s))
            .unwrap_or(self.capacity)
    }

    /// Whether `slot` holds no tuple. Slots past the capacity are empty.
    pub fn is_empty(&self, slot: usize) -> bool {
        slot >= self.capacity || !self.is_occupied(slot)
    }

    pub fn get_tuple(&self, slot: usize) -> StorageResult<Tuple> {
        self.check_occupied(slot)?;
        self.td.deserialize(&self.data.as_ref()[self.slot_range(slot)])
    }

    /// Occupied slot indices in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        let end = self.capacity;
        std::iter::successors(Some(self.begin()), move |&slot| Some(self.next(slot)))
            .take_while(move |&slot| slot < end)
    }

    fn is_occupied(&self, slot: usize) -> bool {
        let (byte, mask) = Self::bit(slot);
        self.data.as_ref()[byte] & mask != 0
    }

    fn check_occupied(&self, slot: usize) -> StorageResult<()> {
        if slot >= self.capacity {
            return Err(StorageError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            });
        }
        if !self.is_occupied(slot) {
            return Err(StorageError::EmptySlot { slot });
        }
        Ok(())
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let row_len = self.td.length();
        let start = self.header_len + slot * row_len;
        start..start + row_len
    }

    fn bit(slot: usize) -> (usize, u8) {
        (slot / 8, 1 << (7 - slot % 8))
    }
}

impl<'a, B: AsRef<[u8]> + AsMut<[u8]>> HeapPage<'a, B> {
    /// Store `tuple` in the lowest-numbered empty slot.
    ///
    /// Returns `Ok(None)` when the page is full; that is an expected outcome,
    /// not an error.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> StorageResult<Option<usize>> {
        let slot = match (0..self.capacity).find(|&s| !self.is_occupied(s)) {
            Some(slot) => slot,
            None => return Ok(None),
        };

        let range = self.slot_range(slot);
        self.td.serialize(&mut self.data.as_mut()[range], tuple)?;

        let (byte, mask) = Self::bit(slot);
        self.data.as_mut()[byte] |= mask;
        self.count += 1;

        Ok(Some(slot))
    }

    pub fn delete_tuple(&mut self, slot: usize) -> StorageResult<()> {
        self.check_occupied(slot)?;

        let (byte, mask) = Self::bit(slot);
        self.data.as_mut()[byte] &= !mask;
        let range = self.slot_range(slot);
        self.data.as_mut()[range].fill(0);
        self.count -= 1;

        Ok(())
    }
}
