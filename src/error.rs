//! Error types for heapstore
//!
//! Provides a unified error type for all storage operations.

use thiserror::Error;

/// Result type alias using HeapError
pub type Result<T> = std::result::Result<T, HeapError>;

/// Unified error type for heapstore operations
#[derive(Debug, Error)]
pub enum HeapError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    /// The page has no contiguous free space for the payload.
    /// Handled inside `HeapTable::append` by moving to a fresh block.
    #[error("No room in block: requested {requested} bytes, {available} available")]
    NoRoom { requested: usize, available: usize },

    #[error("Corrupt block: {0}")]
    CorruptBlock(String),

    // -------------------------------------------------------------------------
    // Lookup / Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Heap file is closed: {0}")]
    Closed(String),

    // -------------------------------------------------------------------------
    // Relation Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}
