//! File Block Device
//!
//! Stores a heap file's blocks in a single OS file.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Slot 0: File Header (BLOCK_SIZE bytes)                      │
//! │   bincode(FileHeader) | CRC32 (4) | zero padding            │
//! │   FileHeader = Magic "HPST" (4) | Version: u16 (2)          │
//! │                BlockSize: u32 (4) | HighestId: u32 (4)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Slot 1: Block 1 (BLOCK_SIZE bytes)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ ... Slot N: Block N                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//! Block `id` lives at byte offset `id * BLOCK_SIZE`.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::SyncStrategy;
use crate::error::{HeapError, Result};
use crate::storage::{Block, BlockId, BLOCK_SIZE};

use super::BlockDevice;

/// Magic bytes identifying a heapstore file
const MAGIC: [u8; 4] = *b"HPST";

/// Current file format version
const VERSION: u16 = 1;

/// Metadata kept in slot 0 of the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 4],
    version: u16,
    block_size: u32,
    highest_id: u32,
}

impl FileHeader {
    fn new(highest_id: BlockId) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            block_size: BLOCK_SIZE as u32,
            highest_id,
        }
    }

    /// Encode as a full header slot: bincode bytes, CRC32, zero padding
    fn encode(&self) -> Result<Block> {
        let encoded =
            bincode::serialize(self).map_err(|e| HeapError::Serialization(e.to_string()))?;
        let crc = crc32fast::hash(&encoded);

        let mut block = Block::zeroed();
        let bytes = block.as_bytes_mut();
        bytes[..encoded.len()].copy_from_slice(&encoded);
        bytes[encoded.len()..encoded.len() + 4].copy_from_slice(&crc.to_le_bytes());
        Ok(block)
    }

    /// Decode and validate a header slot
    fn decode(block: &Block, path: &Path) -> Result<Self> {
        let bytes = block.as_bytes();
        let header: FileHeader = bincode::deserialize(bytes).map_err(|e| {
            HeapError::CorruptBlock(format!("{}: unreadable header: {}", path.display(), e))
        })?;

        if header.magic != MAGIC {
            return Err(HeapError::CorruptBlock(format!(
                "{}: invalid magic: expected HPST, got {:?}",
                path.display(),
                header.magic
            )));
        }

        if header.version != VERSION {
            return Err(HeapError::CorruptBlock(format!(
                "{}: unsupported version: {}",
                path.display(),
                header.version
            )));
        }

        if header.block_size as usize != BLOCK_SIZE {
            return Err(HeapError::CorruptBlock(format!(
                "{}: block size {} does not match engine block size {}",
                path.display(),
                header.block_size,
                BLOCK_SIZE
            )));
        }

        let len = bincode::serialized_size(&header)
            .map_err(|e| HeapError::Serialization(e.to_string()))? as usize;
        let stored_crc = u32::from_le_bytes([
            bytes[len],
            bytes[len + 1],
            bytes[len + 2],
            bytes[len + 3],
        ]);
        if stored_crc != crc32fast::hash(&bytes[..len]) {
            return Err(HeapError::CorruptBlock(format!(
                "{}: header checksum mismatch",
                path.display()
            )));
        }

        Ok(header)
    }
}

/// Block device backed by `{data_dir}/{name}.db`
pub struct FileBlockDevice {
    /// Logical name (table name)
    name: String,
    /// Path to the backing file
    path: PathBuf,
    /// When to fsync writes
    sync_strategy: SyncStrategy,
    /// Open file handle; `None` while closed
    file: Option<File>,
    /// Highest block id recorded in the header
    highest_id: BlockId,
}

impl FileBlockDevice {
    /// Create a (closed) device for the given path
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, sync_strategy: SyncStrategy) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            sync_strategy,
            file: None,
            highest_id: 0,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file_mut(&mut self) -> Result<&mut File> {
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(HeapError::Closed(self.name.clone())),
        }
    }

    fn block_offset(id: BlockId) -> u64 {
        id as u64 * BLOCK_SIZE as u64
    }

    fn write_header(&mut self) -> Result<()> {
        let header = FileHeader::new(self.highest_id).encode()?;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(header.as_bytes())?;
        tracing::trace!("Wrote header for {} (highest_id={})", self.name, self.highest_id);
        Ok(())
    }

    fn sync_if_needed(&mut self) -> Result<()> {
        if self.sync_strategy == SyncStrategy::EveryPut {
            self.file_mut()?.sync_data()?;
        }
        Ok(())
    }
}

impl BlockDevice for FileBlockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn create(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    HeapError::AlreadyExists(self.path.display().to_string())
                }
                _ => HeapError::Io(e),
            })?;

        self.file = Some(file);
        self.highest_id = 0;
        self.write_header()?;
        self.sync_if_needed()?;

        tracing::debug!("Created block file {}", self.path.display());
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HeapError::NotFound(self.path.display().to_string()),
                _ => HeapError::Io(e),
            })?;

        let file_len = file.metadata()?.len();
        if file_len < BLOCK_SIZE as u64 {
            return Err(HeapError::CorruptBlock(format!(
                "{}: file too short for header ({} bytes)",
                self.path.display(),
                file_len
            )));
        }

        let mut header_block = Block::zeroed();
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(header_block.as_bytes_mut())?;
        let header = FileHeader::decode(&header_block, &self.path)?;

        let slots = header.highest_id.checked_add(1).ok_or_else(|| {
            HeapError::CorruptBlock(format!(
                "{}: highest block id {} out of range",
                self.path.display(),
                header.highest_id
            ))
        })?;
        let expected_len = Self::block_offset(slots);
        if file_len < expected_len {
            return Err(HeapError::CorruptBlock(format!(
                "{}: header claims {} blocks but file is {} bytes",
                self.path.display(),
                header.highest_id,
                file_len
            )));
        }

        self.highest_id = header.highest_id;
        self.file = Some(file);

        tracing::debug!(
            "Opened block file {} (highest_id={})",
            self.path.display(),
            self.highest_id
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            tracing::debug!("Closed block file {}", self.path.display());
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.close()?;

        fs::remove_file(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HeapError::NotFound(self.path.display().to_string()),
            _ => HeapError::Io(e),
        })?;
        self.highest_id = 0;

        tracing::debug!("Removed block file {}", self.path.display());
        Ok(())
    }

    fn get(&mut self, id: BlockId) -> Result<Block> {
        if self.file.is_none() {
            return Err(HeapError::Closed(self.name.clone()));
        }
        if id == 0 || id > self.highest_id {
            return Err(HeapError::NotFound(format!("block {} in {}", id, self.name)));
        }

        let mut block = Block::zeroed();
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(Self::block_offset(id)))?;
        file.read_exact(block.as_bytes_mut())?;
        Ok(block)
    }

    fn put(&mut self, id: BlockId, block: &Block) -> Result<()> {
        if self.file.is_none() {
            return Err(HeapError::Closed(self.name.clone()));
        }
        if id == 0 || id > self.highest_id + 1 {
            return Err(HeapError::NotFound(format!("block {} in {}", id, self.name)));
        }

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(Self::block_offset(id)))?;
        file.write_all(block.as_bytes())?;

        // Appended past the end: record the new highest id
        if id == self.highest_id + 1 {
            self.highest_id = id;
            self.write_header()?;
        }

        self.sync_if_needed()
    }

    fn highest_id(&self) -> Result<BlockId> {
        if !self.is_open() {
            return Err(HeapError::Closed(self.name.clone()));
        }
        Ok(self.highest_id)
    }
}
