//! Storage Module
//!
//! Block-level storage: the slotted page layout, the block device boundary,
//! and the append-only heap file built on top of them.
//!
//! ## Responsibilities
//! - Impose a record directory and free-space pointer onto a fixed-size block
//! - Persist and fetch blocks by id through a `BlockDevice`
//! - Allocate blocks monotonically (ids start at 1, never reused)
//!
//! ## Block Layout (BLOCK_SIZE bytes, little-endian)
//! ```text
//! offset 0                                                   BLOCK_SIZE - 1
//! ┌──────────────┬──────────────┬─────┬────────────┬────────────────────────┐
//! │ Header (4)   │ Entry 1 (4)  │ ... │ Free Space │ Payloads (grow down)   │
//! │ n | end_free │ size | loc   │     │            │ ... rec 2 │ rec 1      │
//! └──────────────┴──────────────┴─────┴────────────┴────────────────────────┘
//!                  directory grows →      end_free ┘  ← payloads grow
//! ```
//!
//! A directory entry of `(0, 0)` is a tombstone: the record was deleted,
//! its id stays reserved.

mod block;
mod page;
mod heap_file;
pub mod device;

pub use block::Block;
pub use page::{SlottedPage, DIRECTORY_ENTRY_SIZE, MAX_RECORD_SIZE};
pub use heap_file::HeapFile;
pub use device::{BlockDevice, FileBlockDevice, MemoryBlockDevice, MemoryStore};

// =============================================================================
// Shared Constants and Identifiers
// =============================================================================

/// Size of every block, in bytes
pub const BLOCK_SIZE: usize = 4096;

/// Block identifier within a heap file (1-based, monotonically assigned)
pub type BlockId = u32;

/// Record identifier within a block (1-based, stable for the block's life)
pub type RecordId = u16;

// Offsets inside a block are stored as u16.
const _: () = assert!(BLOCK_SIZE <= u16::MAX as usize + 1);
