//! Fixed-size block buffer

use std::fmt;

use crate::error::{HeapError, Result};

use super::BLOCK_SIZE;

/// An owned buffer of exactly `BLOCK_SIZE` bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    data: Box<[u8; BLOCK_SIZE]>,
}

impl Block {
    /// Create an all-zero block
    pub fn zeroed() -> Self {
        Self {
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    /// Copy a block out of a byte slice (must be exactly BLOCK_SIZE long)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOCK_SIZE {
            return Err(HeapError::CorruptBlock(format!(
                "expected {} bytes, got {}",
                BLOCK_SIZE,
                bytes.len()
            )));
        }

        let mut block = Self::zeroed();
        block.data.copy_from_slice(bytes);
        Ok(block)
    }

    /// Raw bytes of the block
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Read a little-endian u16 at `offset`
    pub(crate) fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    /// Write a little-endian u16 at `offset`
    pub(crate) fn write_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("len", &BLOCK_SIZE)
            .field("header", &[self.read_u16(0), self.read_u16(2)])
            .finish()
    }
}
