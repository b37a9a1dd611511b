//! # heapstore
//!
//! A slotted-page heap storage engine:
//! - Variable-length records in fixed-size blocks (slotted pages)
//! - Append-only heap files of blocks on a pluggable block device
//! - Schema-bound heap tables with a binary row codec
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HeapTable (Relation)                      │
//! │        validate · marshal/unmarshal · insert/select/...     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ owns
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        HeapFile                              │
//! │           get · put · get_new · block_ids                    │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ SlottedPage (per block)           │ BlockDevice
//!            ▼                                   ▼
//!   ┌──────────────────┐             ┌──────────────────────────┐
//!   │ header · dir ·   │             │ FileBlockDevice (.db)    │
//!   │ payloads         │             │ MemoryBlockDevice        │
//!   └──────────────────┘             └──────────────────────────┘
//! ```
//!
//! Single-threaded and synchronous: pages are fetched, mutated in memory,
//! and persisted with an explicit `put`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod table;
pub mod env;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HeapError, Result};
pub use config::{Config, SyncStrategy};
pub use env::StorageEnv;
pub use storage::{BlockId, RecordId, BLOCK_SIZE};
pub use table::{Column, DataType, Handle, HeapTable, Relation, Row, Schema, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of heapstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
