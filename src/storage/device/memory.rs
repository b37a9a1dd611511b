//! In-memory block device
//!
//! Blocks live in a `MemoryStore` shared by every device created from it,
//! so a heap file can be closed and reopened (or dropped) like a real file.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{HeapError, Result};
use crate::storage::{Block, BlockId};

use super::BlockDevice;

/// Shared namespace of in-memory "files", keyed by name
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<Mutex<HashMap<String, Vec<Block>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed device for the storage named `name`
    pub fn device(&self, name: impl Into<String>) -> MemoryBlockDevice {
        MemoryBlockDevice {
            name: name.into(),
            store: self.clone(),
            open: false,
        }
    }

    /// Whether storage named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    /// Number of blocks stored under `name` (0 if missing)
    pub fn block_count(&self, name: &str) -> usize {
        self.files.lock().get(name).map(Vec::len).unwrap_or(0)
    }
}

/// Block device over a `MemoryStore` entry
#[derive(Debug)]
pub struct MemoryBlockDevice {
    name: String,
    store: MemoryStore,
    open: bool,
}

impl MemoryBlockDevice {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(HeapError::Closed(self.name.clone()))
        }
    }

    fn not_found(&self) -> HeapError {
        HeapError::NotFound(self.name.clone())
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.store.contains(&self.name)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn create(&mut self) -> Result<()> {
        let mut files = self.store.files.lock();
        if files.contains_key(&self.name) {
            return Err(HeapError::AlreadyExists(self.name.clone()));
        }
        files.insert(self.name.clone(), Vec::new());
        self.open = true;
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if !self.exists() {
            return Err(self.not_found());
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.close()?;
        match self.store.files.lock().remove(&self.name) {
            Some(_) => Ok(()),
            None => Err(self.not_found()),
        }
    }

    fn get(&mut self, id: BlockId) -> Result<Block> {
        self.ensure_open()?;

        let files = self.store.files.lock();
        let blocks = files.get(&self.name).ok_or_else(|| self.not_found())?;
        if id == 0 {
            return Err(HeapError::NotFound(format!("block 0 in {}", self.name)));
        }
        blocks
            .get(id as usize - 1)
            .cloned()
            .ok_or_else(|| HeapError::NotFound(format!("block {} in {}", id, self.name)))
    }

    fn put(&mut self, id: BlockId, block: &Block) -> Result<()> {
        self.ensure_open()?;

        let mut files = self.store.files.lock();
        let blocks = files.get_mut(&self.name).ok_or_else(|| self.not_found())?;
        let index = id as usize;
        if id == 0 || index > blocks.len() + 1 {
            return Err(HeapError::NotFound(format!("block {} in {}", id, self.name)));
        }

        if index == blocks.len() + 1 {
            blocks.push(block.clone());
        } else {
            blocks[index - 1] = block.clone();
        }
        Ok(())
    }

    fn highest_id(&self) -> Result<BlockId> {
        self.ensure_open()?;
        Ok(self.store.block_count(&self.name) as BlockId)
    }
}
