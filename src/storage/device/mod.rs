//! Block Device Module
//!
//! The persistence boundary under a heap file: a keyed store mapping a
//! `BlockId` to exactly `BLOCK_SIZE` bytes.
//!
//! ## Implementations
//! - `FileBlockDevice`: one file per heap file, header block + data blocks
//! - `MemoryBlockDevice`: blocks held in a shared `MemoryStore` (tests, benches)
//!
//! ## Contract
//! - `create` fails with `AlreadyExists` if the storage exists, and leaves the
//!   device open with no blocks
//! - `open` fails with `NotFound` if the storage does not exist
//! - `get`/`put`/`highest_id` fail with `Closed` while the device is closed
//! - `put(id)` accepts existing ids and exactly `highest_id + 1` (append)

mod file;
mod memory;

pub use file::FileBlockDevice;
pub use memory::{MemoryBlockDevice, MemoryStore};

use crate::error::Result;

use super::{Block, BlockId};

/// Storage backend capability consumed by `HeapFile`
pub trait BlockDevice {
    /// Name of the underlying storage (used in errors and logs)
    fn name(&self) -> &str;

    /// Whether the underlying storage currently exists
    fn exists(&self) -> bool;

    /// Whether the device is attached to its storage
    fn is_open(&self) -> bool;

    /// Initialize new, empty storage and attach to it
    fn create(&mut self) -> Result<()>;

    /// Attach to existing storage
    fn open(&mut self) -> Result<()>;

    /// Detach from storage (no-op if already closed)
    fn close(&mut self) -> Result<()>;

    /// Close if needed, then delete the storage entirely
    fn remove(&mut self) -> Result<()>;

    /// Read a block
    fn get(&mut self, id: BlockId) -> Result<Block>;

    /// Write a block (overwrite, or append at `highest_id + 1`)
    fn put(&mut self, id: BlockId, block: &Block) -> Result<()>;

    /// Highest block id stored so far (0 when empty)
    fn highest_id(&self) -> Result<BlockId>;
}
