//! Storage Environment
//!
//! Explicit handle to a data directory. Hands out file-backed devices,
//! heap files and tables by name; nothing here is process-global.
//!
//! ## Layout
//! ```text
//! {data_dir}/
//!   ├── users.db      (heap file for table "users")
//!   └── orders.db
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{HeapError, Result};
use crate::storage::{FileBlockDevice, HeapFile};
use crate::table::{HeapTable, Schema};

/// Handle to a directory of heap files
#[derive(Debug, Clone)]
pub struct StorageEnv {
    config: Config,
}

impl StorageEnv {
    /// File extension of heap files
    const FILE_EXTENSION: &'static str = "db";

    /// Open the environment, creating the data directory if needed
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        tracing::debug!("Storage environment at {}", config.data_dir.display());
        Ok(Self { config })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// A closed device for the heap file called `name`
    pub fn device(&self, name: &str) -> Result<FileBlockDevice> {
        let path = self.file_path(name)?;
        Ok(FileBlockDevice::new(name, path, self.config.sync_strategy))
    }

    /// A (closed) heap file called `name`
    pub fn heap_file(&self, name: &str) -> Result<HeapFile<FileBlockDevice>> {
        Ok(HeapFile::new(name, self.device(name)?))
    }

    /// A (closed) table called `name` with the given schema
    pub fn table(&self, name: &str, schema: Schema) -> Result<HeapTable<FileBlockDevice>> {
        Ok(HeapTable::new(name, schema, self.device(name)?))
    }

    /// Path of the heap file called `name`
    ///
    /// Names are restricted to ASCII letters, digits and `_` so they map
    /// one-to-one onto file names.
    pub fn file_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(HeapError::Validation(format!(
                "invalid heap file name: {:?}",
                name
            )));
        }

        Ok(self
            .config
            .data_dir
            .join(format!("{}.{}", name, Self::FILE_EXTENSION)))
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
