//! Catalog: the minimal, in-memory registry mapping a table to its backing file.
//!
//! The catalog is not persisted and is not a schema catalog — it only hands
//! out monotonic file ids and remembers where each one lives on disk. Schema,
//! column types, and indexes are out of scope for the storage core.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::common::{CrioError, Result};

/// `file_id = 0` is reserved and never handed out by `create_table`.
pub const RESERVED_FILE_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Table,
    Index,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: String,
    path: PathBuf,
    kind: FileType,
}

/// In-memory `file_id -> (path, kind)` registry.
///
/// Construction never touches disk; `create_table` only computes a path and
/// reserves an id, it does not create the backing file (the `DiskManager`
/// creates files lazily on first access).
pub struct Catalog {
    base_dir: PathBuf,
    next_file_id: AtomicU32,
    entries: RwLock<HashMap<u32, CatalogEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_base_dir("data")
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            next_file_id: AtomicU32::new(RESERVED_FILE_ID + 1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new table and returns the file id assigned to it.
    ///
    /// Names are not required to be unique: each call mints a fresh file id
    /// and a fresh path, even if `name` repeats.
    pub fn create_table(&self, name: &str) -> Result<u32> {
        self.create_file(name, FileType::Table)
    }

    pub fn create_index(&self, name: &str) -> Result<u32> {
        self.create_file(name, FileType::Index)
    }

    fn create_file(&self, name: &str, kind: FileType) -> Result<u32> {
        if name.is_empty() {
            return Err(CrioError::InvalidArgument(
                "table/index name must not be empty".to_string(),
            ));
        }
        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let path = self.base_dir.join(format!("{name}.db"));
        self.entries.write().insert(
            file_id,
            CatalogEntry {
                name: name.to_string(),
                path,
                kind,
            },
        );
        Ok(file_id)
    }

    /// Returns the backing file path and type registered for `file_id`.
    pub fn get_file(&self, file_id: u32) -> Result<(PathBuf, FileType)> {
        self.entries
            .read()
            .get(&file_id)
            .map(|e| (e.path.clone(), e.kind))
            .ok_or_else(|| CrioError::InvalidArgument(format!("unknown file_id {file_id}")))
    }

    pub fn name_of(&self, file_id: u32) -> Result<String> {
        self.entries
            .read()
            .get(&file_id)
            .map(|e| e.name.clone())
            .ok_or_else(|| CrioError::InvalidArgument(format!("unknown file_id {file_id}")))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
