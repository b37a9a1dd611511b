//! Heap Table
//!
//! A relation stored in one heap file, one record per row.
//!
//! Rows are appended to the last block; when it is full a new block is
//! allocated and the row goes there. Scans walk blocks in id order and
//! records in id order within each block.

use crate::error::{HeapError, Result};
use crate::storage::{BlockDevice, HeapFile, SlottedPage, MAX_RECORD_SIZE};

use super::codec;
use super::{DataType, Handle, Relation, Row, Schema, Value};

/// Schema-bound relation over a `HeapFile`
pub struct HeapTable<D: BlockDevice> {
    /// Table name (also the heap file name)
    name: String,
    /// Column layout for validation and the codec
    schema: Schema,
    /// Backing storage, owned exclusively by this table
    file: HeapFile<D>,
}

impl<D: BlockDevice> HeapTable<D> {
    /// Build a table over a (closed) device; call `create` or `open` next
    pub fn new(name: impl Into<String>, schema: Schema, device: D) -> Self {
        let name = name.into();
        Self {
            file: HeapFile::new(name.clone(), device),
            name,
            schema,
        }
    }

    /// Check a row against the schema
    ///
    /// Returns exactly the schema columns, in schema order. Columns the
    /// schema does not know are ignored.
    pub fn validate(&self, row: &Row) -> Result<Row> {
        let mut full_row = Row::new();

        for column in self.schema.columns() {
            let value = row.get(&column.name).ok_or_else(|| {
                HeapError::Validation(format!(
                    "table {}: missing value for column {}",
                    self.name, column.name
                ))
            })?;

            if value.data_type() != column.data_type {
                return Err(HeapError::Validation(format!(
                    "table {}: column {} expects {}, got {}",
                    self.name,
                    column.name,
                    column.data_type,
                    value.data_type()
                )));
            }

            if let (DataType::Text, Value::Text(s)) = (column.data_type, value) {
                if !s.is_ascii() {
                    return Err(HeapError::Validation(format!(
                        "table {}: column {} holds non-ASCII text",
                        self.name, column.name
                    )));
                }
            }

            full_row.set(column.name.clone(), value.clone());
        }

        Ok(full_row)
    }

    /// Encode a row with this table's schema
    pub fn marshal(&self, row: &Row) -> Result<Vec<u8>> {
        codec::marshal(&self.schema, row)
    }

    /// Decode a record with this table's schema
    pub fn unmarshal(&self, bytes: &[u8]) -> Result<Row> {
        codec::unmarshal(&self.schema, bytes)
    }

    /// Store an already-marshaled record
    ///
    /// Tries the last block first; on `NoRoom` a new block is allocated and
    /// the record goes there. The touched block is persisted before returning.
    pub fn append(&mut self, data: &[u8]) -> Result<Handle> {
        if data.len() > MAX_RECORD_SIZE {
            return Err(HeapError::Validation(format!(
                "record of {} bytes exceeds block capacity of {} bytes",
                data.len(),
                MAX_RECORD_SIZE
            )));
        }

        self.file.open()?;
        let mut page = self.file.get(self.file.last_block_id())?;

        let record_id = match page.add(data) {
            Ok(id) => id,
            Err(HeapError::NoRoom { requested, available }) => {
                tracing::debug!(
                    "Block {} of {} full ({} requested, {} available), allocating new block",
                    page.block_id(),
                    self.name,
                    requested,
                    available
                );
                page = self.file.get_new()?;
                page.add(data)?
            }
            Err(e) => return Err(e),
        };

        self.file.put(&page)?;
        Ok(Handle::new(page.block_id(), record_id))
    }

    /// Matching rows with their handles, in scan order
    pub fn rows(&mut self, predicate: Option<&Row>) -> Result<Vec<(Handle, Row)>> {
        let mut rows = Vec::new();
        for handle in self.select(predicate)? {
            let row = self.project(handle, None)?;
            rows.push((handle, row));
        }
        Ok(rows)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The backing heap file
    pub fn file(&self) -> &HeapFile<D> {
        &self.file
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_columns<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for column in columns {
            if !self.schema.contains(column) {
                return Err(HeapError::Validation(format!(
                    "table {}: unknown column {}",
                    self.name, column
                )));
            }
        }
        Ok(())
    }

    fn page_for(&mut self, handle: Handle) -> Result<SlottedPage> {
        self.file.open()?;
        self.file.get(handle.block_id)
    }
}

impl<D: BlockDevice> Relation for HeapTable<D> {
    fn create(&mut self) -> Result<()> {
        self.file.create()?;
        tracing::debug!("Created table {}", self.name);
        Ok(())
    }

    fn create_if_not_exists(&mut self) -> Result<()> {
        match self.open() {
            Ok(()) => Ok(()),
            Err(HeapError::NotFound(_)) => self.create(),
            Err(e) => Err(e),
        }
    }

    fn drop_table(&mut self) -> Result<()> {
        self.file.drop_file()?;
        tracing::debug!("Dropped table {}", self.name);
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.file.open()
    }

    fn close(&mut self) -> Result<()> {
        self.file.close()
    }

    fn insert(&mut self, row: &Row) -> Result<Handle> {
        let full_row = self.validate(row)?;
        let data = self.marshal(&full_row)?;
        self.append(&data)
    }

    fn select(&mut self, predicate: Option<&Row>) -> Result<Vec<Handle>> {
        if let Some(predicate) = predicate {
            self.check_columns(predicate.columns())?;
        }

        self.file.open()?;
        let mut handles = Vec::new();

        for block_id in self.file.block_ids() {
            let page = self.file.get(block_id)?;
            for record_id in page.ids() {
                let matched = match predicate {
                    None => true,
                    Some(predicate) => match page.get(record_id) {
                        Some(bytes) => self.unmarshal(&bytes)?.matches(predicate),
                        None => false,
                    },
                };

                if matched {
                    handles.push(Handle::new(block_id, record_id));
                }
            }
        }

        Ok(handles)
    }

    fn project(&mut self, handle: Handle, columns: Option<&[&str]>) -> Result<Row> {
        if let Some(columns) = columns {
            self.check_columns(columns.iter().copied())?;
        }

        let page = self.page_for(handle)?;
        let bytes = page.get(handle.record_id).ok_or_else(|| {
            HeapError::NotFound(format!("row {} in table {}", handle, self.name))
        })?;
        let row = self.unmarshal(&bytes)?;

        let Some(columns) = columns else {
            return Ok(row);
        };

        let mut projected = Row::new();
        for column in columns {
            if let Some(value) = row.get(column) {
                projected.set(*column, value.clone());
            }
        }
        Ok(projected)
    }

    fn delete(&mut self, handle: Handle) -> Result<()> {
        let mut page = self.page_for(handle)?;
        page.delete(handle.record_id)?;
        self.file.put(&page)
    }
}
