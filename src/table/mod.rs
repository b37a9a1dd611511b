//! Table Module
//!
//! Schema-aware relations over a heap file.
//!
//! ## Responsibilities
//! - Validate rows against a schema (INT and TEXT columns)
//! - Marshal rows to records and back (see `codec`)
//! - Insert / select / project / delete, identifying rows by `Handle`
//!
//! ## Data Flow
//! ```text
//!   insert:  Row ──validate──▶ marshal ──▶ SlottedPage::add ──▶ HeapFile::put
//!   project: HeapFile::get ──▶ SlottedPage::get ──▶ unmarshal ──▶ Row
//! ```

pub mod codec;
mod heap_table;
mod schema;
mod value;

use std::fmt;

pub use heap_table::HeapTable;
pub use schema::{Column, DataType, Schema};
pub use value::{Row, Value};

use crate::error::Result;
use crate::storage::{BlockId, RecordId};

/// Durable identity of a stored row: `(block, record)`
///
/// Valid until the row is deleted; never reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    pub block_id: BlockId,
    pub record_id: RecordId,
}

impl Handle {
    pub fn new(block_id: BlockId, record_id: RecordId) -> Self {
        Self {
            block_id,
            record_id,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_id, self.record_id)
    }
}

/// Relation capability: lifecycle plus row-level CRUD
pub trait Relation {
    /// Create the relation's storage (fails if it exists)
    fn create(&mut self) -> Result<()>;

    /// Open the relation, creating it if it does not exist
    fn create_if_not_exists(&mut self) -> Result<()>;

    /// Remove the relation's storage entirely
    fn drop_table(&mut self) -> Result<()>;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Store a row, returning its handle
    fn insert(&mut self, row: &Row) -> Result<Handle>;

    /// Handles of rows matching `predicate` (all rows if `None`), in scan order
    fn select(&mut self, predicate: Option<&Row>) -> Result<Vec<Handle>>;

    /// Fetch a row, optionally restricted to `columns`
    fn project(&mut self, handle: Handle, columns: Option<&[&str]>) -> Result<Row>;

    /// Delete a row
    fn delete(&mut self, handle: Handle) -> Result<()>;
}
