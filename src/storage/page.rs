//! Slotted Page
//!
//! In-memory view over one block: record directory plus free-space pointer.
//! Every offset computation for the block layout lives in this file.
//!
//! ## Invariants
//! - `4 * (num_records + 1) <= end_free < BLOCK_SIZE`
//! - Record ids are `1..=num_records`, handed out in increasing order and
//!   never reused; deleted ids stay in the directory as `(0, 0)`
//! - Live payloads are packed contiguously in `(end_free, BLOCK_SIZE)`

use bytes::Bytes;

use crate::error::{HeapError, Result};

use super::{Block, BlockId, RecordId, BLOCK_SIZE};

/// Size of one directory entry (and of the header slot): size (2) + loc (2)
pub const DIRECTORY_ENTRY_SIZE: usize = 4;

/// Largest payload that fits in an empty page (header + one entry reserved)
pub const MAX_RECORD_SIZE: usize = BLOCK_SIZE - 1 - 2 * DIRECTORY_ENTRY_SIZE;

/// One directory slot: payload size and its offset in the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirEntry {
    size: u16,
    loc: u16,
}

impl DirEntry {
    const TOMBSTONE: DirEntry = DirEntry { size: 0, loc: 0 };

    fn is_tombstone(&self) -> bool {
        self.size == 0 && self.loc == 0
    }
}

/// A block interpreted as a slotted page
///
/// Mutations only touch the in-memory block. Persisting is the caller's
/// job via `HeapFile::put`.
#[derive(Debug, Clone)]
pub struct SlottedPage {
    block: Block,
    block_id: BlockId,
    num_records: u16,
    end_free: u16,
}

impl SlottedPage {
    /// Wrap a block as a slotted page
    ///
    /// With `is_new`, the block is formatted as an empty page. Otherwise the
    /// header and directory are read and checked; a block that breaks the
    /// layout invariants is rejected with `CorruptBlock`.
    pub fn new(block: Block, block_id: BlockId, is_new: bool) -> Result<Self> {
        if is_new {
            let mut page = Self {
                block,
                block_id,
                num_records: 0,
                end_free: (BLOCK_SIZE - 1) as u16,
            };
            page.put_header();
            return Ok(page);
        }

        let page = Self {
            num_records: block.read_u16(0),
            end_free: block.read_u16(2),
            block,
            block_id,
        };
        page.check_layout()?;
        Ok(page)
    }

    /// Whether a payload of `size` bytes (plus its directory entry) fits
    pub fn has_room(&self, size: usize) -> bool {
        size <= self.free_space()
    }

    /// Bytes available for the next payload
    pub fn free_space(&self) -> usize {
        (self.end_free as usize).saturating_sub(Self::directory_end(self.num_records + 1))
    }

    /// Store a payload, returning its new record id
    ///
    /// Fails with `NoRoom` without touching the page when it does not fit.
    pub fn add(&mut self, payload: &[u8]) -> Result<RecordId> {
        if !self.has_room(payload.len()) {
            return Err(HeapError::NoRoom {
                requested: payload.len(),
                available: self.free_space(),
            });
        }

        let id = self.num_records + 1;
        let size = payload.len();
        let loc = self.end_free as usize + 1 - size;

        self.block.as_bytes_mut()[loc..loc + size].copy_from_slice(payload);
        self.put_entry(
            id,
            DirEntry {
                size: size as u16,
                loc: loc as u16,
            },
        );
        self.end_free -= size as u16;
        self.num_records = id;
        self.put_header();

        Ok(id)
    }

    /// Copy of the payload for `id`, or `None` if it never existed or was deleted
    pub fn get(&self, id: RecordId) -> Option<Bytes> {
        if !self.in_range(id) {
            return None;
        }

        let entry = self.entry(id);
        if entry.is_tombstone() {
            return None;
        }

        let start = entry.loc as usize;
        let end = start + entry.size as usize;
        Some(Bytes::copy_from_slice(&self.block.as_bytes()[start..end]))
    }

    /// Delete a record: compact its bytes away, then tombstone its entry
    pub fn delete(&mut self, id: RecordId) -> Result<()> {
        if !self.in_range(id) {
            return Err(HeapError::NotFound(format!(
                "record {} in block {}",
                id, self.block_id
            )));
        }

        let entry = self.entry(id);
        if !entry.is_tombstone() {
            self.slide(entry.loc, entry.loc + entry.size)?;
        }
        self.put_entry(id, DirEntry::TOMBSTONE);

        Ok(())
    }

    /// Live record ids, ascending
    pub fn ids(&self) -> Vec<RecordId> {
        (1..=self.num_records)
            .filter(|&id| !self.entry(id).is_tombstone())
            .collect()
    }

    /// Close the gap `[start, end)` in the payload region
    ///
    /// Payload bytes in `(end_free, start)` move up by `end - start` in one
    /// overlapping copy, and every live record with `loc <= start` has its
    /// offset bumped by the same amount.
    pub fn slide(&mut self, start: u16, end: u16) -> Result<()> {
        if start > end {
            return Err(HeapError::Validation(format!(
                "slide range reversed: {}..{}",
                start, end
            )));
        }

        let shift = end - start;
        if shift == 0 {
            return Ok(());
        }

        if end as usize > BLOCK_SIZE || start <= self.end_free {
            return Err(HeapError::Validation(format!(
                "slide range {}..{} outside payload region ({}..{})",
                start, end, self.end_free as usize + 1, BLOCK_SIZE
            )));
        }

        let low = self.end_free as usize + 1;
        let bytes = self.block.as_bytes_mut();
        bytes.copy_within(low..start as usize, low + shift as usize);
        bytes[low..low + shift as usize].fill(0);

        for id in self.ids() {
            let mut entry = self.entry(id);
            if entry.loc <= start {
                entry.loc += shift;
                self.put_entry(id, entry);
            }
        }

        self.end_free += shift;
        self.put_header();

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// The underlying block, as it would be persisted
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Number of directory slots in use (live and tombstoned)
    pub fn num_records(&self) -> u16 {
        self.num_records
    }

    /// Offset of the last free byte
    pub fn end_free(&self) -> u16 {
        self.end_free
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// End (exclusive) of the header + directory for `n` records
    fn directory_end(n: u16) -> usize {
        DIRECTORY_ENTRY_SIZE * (n as usize + 1)
    }

    fn in_range(&self, id: RecordId) -> bool {
        id >= 1 && id <= self.num_records
    }

    fn entry(&self, id: RecordId) -> DirEntry {
        let offset = DIRECTORY_ENTRY_SIZE * id as usize;
        DirEntry {
            size: self.block.read_u16(offset),
            loc: self.block.read_u16(offset + 2),
        }
    }

    fn put_entry(&mut self, id: RecordId, entry: DirEntry) {
        let offset = DIRECTORY_ENTRY_SIZE * id as usize;
        self.block.write_u16(offset, entry.size);
        self.block.write_u16(offset + 2, entry.loc);
    }

    fn put_header(&mut self) {
        self.block.write_u16(0, self.num_records);
        self.block.write_u16(2, self.end_free);
    }

    /// Reject headers and directory entries that could not have been
    /// produced by `add`/`delete`
    fn check_layout(&self) -> Result<()> {
        let end_free = self.end_free as usize;

        if end_free >= BLOCK_SIZE {
            return Err(HeapError::CorruptBlock(format!(
                "block {}: end_free {} beyond block size {}",
                self.block_id, end_free, BLOCK_SIZE
            )));
        }

        if Self::directory_end(self.num_records) > end_free {
            return Err(HeapError::CorruptBlock(format!(
                "block {}: directory of {} records overruns end_free {}",
                self.block_id, self.num_records, end_free
            )));
        }

        for id in 1..=self.num_records {
            let entry = self.entry(id);
            if entry.is_tombstone() {
                continue;
            }

            let loc = entry.loc as usize;
            if loc <= end_free || loc + entry.size as usize > BLOCK_SIZE {
                return Err(HeapError::CorruptBlock(format!(
                    "block {}: record {} at {}+{} outside payload region",
                    self.block_id, id, loc, entry.size
                )));
            }
        }

        Ok(())
    }
}
