//! Row codec
//!
//! Encoding and decoding of rows to their fixed binary layout.
//!
//! ## Record Format
//! Fields follow schema order with no padding between them:
//! ```text
//! ┌───────────────┬──────────────────────────┬─────┐
//! │ INT: i32 (4)  │ TEXT: len u16 (2) | bytes│ ... │
//! └───────────────┴──────────────────────────┴─────┘
//! ```
//! All integers are little-endian. Text carries no terminator.
//!
//! A marshaled row never exceeds `MAX_RECORD_SIZE`, so it always fits in
//! an empty block.

use crate::error::{HeapError, Result};
use crate::storage::MAX_RECORD_SIZE;

use super::{DataType, Row, Schema, Value};

/// Size of an encoded INT field
pub const INT_SIZE: usize = 4;

/// Size of the length prefix of an encoded TEXT field
pub const TEXT_LEN_SIZE: usize = 2;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a row in schema order
///
/// Fails with `Validation` if a column is missing, has the wrong type, or
/// the encoded row would not fit in an empty block.
pub fn marshal(schema: &Schema, row: &Row) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(encoded_size_hint(schema));

    for column in schema.columns() {
        let value = row.get(&column.name).ok_or_else(|| {
            HeapError::Validation(format!("missing value for column {}", column.name))
        })?;

        match (column.data_type, value) {
            (DataType::Int, Value::Int(n)) => {
                bytes.extend_from_slice(&n.to_le_bytes());
            }
            (DataType::Text, Value::Text(s)) => {
                let len = u16::try_from(s.len()).map_err(|_| {
                    HeapError::Validation(format!(
                        "text for column {} too long: {} bytes (max {})",
                        column.name,
                        s.len(),
                        u16::MAX
                    ))
                })?;
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(s.as_bytes());
            }
            (expected, value) => {
                return Err(HeapError::Validation(format!(
                    "column {} expects {}, got {}",
                    column.name,
                    expected,
                    value.data_type()
                )));
            }
        }

        if bytes.len() > MAX_RECORD_SIZE {
            return Err(too_large(bytes.len()));
        }
    }

    Ok(bytes)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode bytes produced by `marshal` for the same schema
///
/// Every byte must be consumed; short input, trailing bytes or non-ASCII
/// text mean the stored record is corrupt.
pub fn unmarshal(schema: &Schema, bytes: &[u8]) -> Result<Row> {
    let mut row = Row::new();
    let mut pos = 0;

    for column in schema.columns() {
        let value = match column.data_type {
            DataType::Int => {
                let field = take(bytes, &mut pos, INT_SIZE, &column.name)?;
                Value::Int(i32::from_le_bytes([field[0], field[1], field[2], field[3]]))
            }
            DataType::Text => {
                let prefix = take(bytes, &mut pos, TEXT_LEN_SIZE, &column.name)?;
                let len = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
                let text = take(bytes, &mut pos, len, &column.name)?;
                if !text.is_ascii() {
                    return Err(HeapError::CorruptBlock(format!(
                        "column {}: stored text is not ASCII",
                        column.name
                    )));
                }
                // ASCII is always valid UTF-8
                Value::Text(String::from_utf8_lossy(text).into_owned())
            }
        };
        row.set(column.name.clone(), value);
    }

    if pos != bytes.len() {
        return Err(HeapError::CorruptBlock(format!(
            "record has {} trailing bytes",
            bytes.len() - pos
        )));
    }

    Ok(row)
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Slice `len` bytes at `*pos` and advance, or report a truncated record
fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize, column: &str) -> Result<&'a [u8]> {
    if *pos + len > bytes.len() {
        return Err(HeapError::CorruptBlock(format!(
            "record truncated in column {}: need {} bytes at offset {}, have {}",
            column,
            len,
            *pos,
            bytes.len()
        )));
    }

    let field = &bytes[*pos..*pos + len];
    *pos += len;
    Ok(field)
}

fn encoded_size_hint(schema: &Schema) -> usize {
    schema
        .columns()
        .iter()
        .map(|c| match c.data_type {
            DataType::Int => INT_SIZE,
            DataType::Text => TEXT_LEN_SIZE + 16,
        })
        .sum()
}

fn too_large(size: usize) -> HeapError {
    HeapError::Validation(format!(
        "row too large: {} bytes exceeds block capacity of {} bytes",
        size, MAX_RECORD_SIZE
    ))
}
