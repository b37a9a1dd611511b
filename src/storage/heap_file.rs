//! Heap File
//!
//! An append-only, ordered sequence of slotted-page blocks on a `BlockDevice`.
//!
//! ## Responsibilities
//! - Create/open/close/drop the underlying storage
//! - Allocate new blocks (`last + 1`) and hand them out as empty pages
//! - Fetch pages by id and write them back on explicit `put`
//!
//! Blocks are never deallocated individually; they live until the whole
//! file is dropped.

use crate::error::{HeapError, Result};

use super::{Block, BlockDevice, BlockId, SlottedPage};

/// Append-only collection of blocks
///
/// The device is released on every exit path: `Drop` closes it if the
/// caller did not.
pub struct HeapFile<D: BlockDevice> {
    /// Logical name of the file
    name: String,
    /// Underlying block storage
    device: D,
    /// Highest allocated block id (0 before the first allocation)
    last: BlockId,
}

impl<D: BlockDevice> HeapFile<D> {
    /// Wrap a (closed) device; nothing is touched until `create`/`open`
    pub fn new(name: impl Into<String>, device: D) -> Self {
        Self {
            name: name.into(),
            device,
            last: 0,
        }
    }

    /// Create the storage and allocate block 1
    ///
    /// Fails with `AlreadyExists` if the storage is already there.
    pub fn create(&mut self) -> Result<()> {
        if self.device.exists() {
            return Err(HeapError::AlreadyExists(self.name.clone()));
        }

        self.device.create()?;
        self.last = 0;
        self.get_new()?;

        tracing::debug!("Created heap file {}", self.name);
        Ok(())
    }

    /// Close if open, then remove the storage entirely
    pub fn drop_file(&mut self) -> Result<()> {
        self.close()?;
        self.device.remove()?;
        self.last = 0;

        tracing::debug!("Dropped heap file {}", self.name);
        Ok(())
    }

    /// Attach to existing storage and recover `last` from it
    pub fn open(&mut self) -> Result<()> {
        if self.device.is_open() {
            return Ok(());
        }

        self.device.open()?;
        self.last = self.device.highest_id()?;

        tracing::debug!("Opened heap file {} (last={})", self.name, self.last);
        Ok(())
    }

    /// Detach from the storage (no-op if already closed)
    pub fn close(&mut self) -> Result<()> {
        if self.device.is_open() {
            self.device.close()?;
            tracing::debug!("Closed heap file {}", self.name);
        }
        Ok(())
    }

    /// Fetch the page for an allocated block
    pub fn get(&mut self, id: BlockId) -> Result<SlottedPage> {
        self.ensure_open()?;
        if id == 0 || id > self.last {
            return Err(HeapError::NotFound(format!(
                "block {} in heap file {}",
                id, self.name
            )));
        }

        let block = self.device.get(id)?;
        SlottedPage::new(block, id, false)
    }

    /// Write a page's current buffer back under its own block id
    pub fn put(&mut self, page: &SlottedPage) -> Result<()> {
        self.ensure_open()?;
        if page.block_id() == 0 || page.block_id() > self.last {
            return Err(HeapError::NotFound(format!(
                "block {} in heap file {}",
                page.block_id(),
                self.name
            )));
        }

        self.device.put(page.block_id(), page.block())
    }

    /// Allocate, format and persist a fresh empty page
    pub fn get_new(&mut self) -> Result<SlottedPage> {
        self.ensure_open()?;

        let id = self.last + 1;
        let page = SlottedPage::new(Block::zeroed(), id, true)?;
        self.device.put(id, page.block())?;
        self.last = id;

        tracing::debug!("Allocated block {} in heap file {}", id, self.name);
        Ok(page)
    }

    /// Every allocated block id, ascending
    pub fn block_ids(&self) -> Vec<BlockId> {
        (1..=self.last).collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.device.is_open()
    }

    /// Highest allocated block id
    pub fn last_block_id(&self) -> BlockId {
        self.last
    }

    /// The underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Dropped storage is `NotFound`; existing but detached storage is `Closed`
    fn ensure_open(&self) -> Result<()> {
        if self.device.is_open() {
            Ok(())
        } else if !self.device.exists() {
            Err(HeapError::NotFound(format!("heap file {}", self.name)))
        } else {
            Err(HeapError::Closed(self.name.clone()))
        }
    }
}

impl<D: BlockDevice> Drop for HeapFile<D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close heap file {}: {}", self.name, e);
        }
    }
}
