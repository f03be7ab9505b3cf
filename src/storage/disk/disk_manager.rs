//! Disk manager: durable, positional page storage on top of one file per table.
//!
//! Files are opened lazily on first access rather than eagerly at startup —
//! the Catalog may register a table without anything ever touching its file.
//! Offsets are computed directly from `page_number * FRAME_SIZE`; reads past
//! the current end of file are zero-filled rather than treated as an error,
//! since an unwritten page is a legitimate initial state for a fresh table.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::config::FRAME_SIZE;
use crate::common::error::{CrioError, Result};
use crate::common::types::PageId;

/// Owns file handles for every table/index file the Catalog knows about,
/// opening each lazily and caching it for the lifetime of the manager.
pub struct DiskManager {
    catalog: Arc<Catalog>,
    files: RwLock<HashMap<u32, Arc<Mutex<File>>>>,
    open_lock: Mutex<()>,
    num_reads: AtomicU64,
    num_writes: AtomicU64,
}

impl DiskManager {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            files: RwLock::new(HashMap::new()),
            open_lock: Mutex::new(()),
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        }
    }

    fn file_for(&self, file_id: u32) -> Result<Arc<Mutex<File>>> {
        if let Some(f) = self.files.read().get(&file_id) {
            return Ok(f.clone());
        }
        // Double-checked locking: only one thread opens a given file_id,
        // but different file_ids can open concurrently.
        let _guard = self.open_lock.lock();
        if let Some(f) = self.files.read().get(&file_id) {
            return Ok(f.clone());
        }
        let (path, _kind) = self.catalog.get_file(file_id)?;
        let file = Self::open_or_create(&path)?;
        let handle = Arc::new(Mutex::new(file));
        self.files.write().insert(file_id, handle.clone());
        Ok(handle)
    }

    fn open_or_create(path: &PathBuf) -> Result<File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(file)
    }

    /// Reads one frame-sized page into `out`. Bytes beyond the current end
    /// of file are zero-filled.
    pub fn read_page(&self, page_id: PageId, out: &mut [u8]) -> Result<()> {
        if out.len() != FRAME_SIZE {
            return Err(CrioError::InvalidArgument(format!(
                "read_page buffer must be {FRAME_SIZE} bytes, got {}",
                out.len()
            )));
        }
        let handle = self.file_for(page_id.file_id)?;
        let mut file = handle.lock();
        let offset = page_id.page_number as u64 * FRAME_SIZE as u64;
        let len = file.metadata()?.len();
        out.fill(0);
        if offset >= len {
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        let available = (len - offset).min(FRAME_SIZE as u64) as usize;
        file.read_exact(&mut out[..available])?;
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one frame-sized page at its fixed offset, extending the file
    /// with implicit zero-fill if this page lies past the current end.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != FRAME_SIZE {
            return Err(CrioError::InvalidArgument(format!(
                "write_page buffer must be {FRAME_SIZE} bytes, got {}",
                data.len()
            )));
        }
        let handle = self.file_for(page_id.file_id)?;
        let mut file = handle.lock();
        let offset = page_id.page_number as u64 * FRAME_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Forces the backing file for `page_id` to stable storage.
    pub fn flush(&self, page_id: PageId) -> Result<()> {
        let handle = self.file_for(page_id.file_id)?;
        let file = handle.lock();
        file.sync_all()?;
        Ok(())
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (Arc<Catalog>, DiskManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
        let disk_manager = DiskManager::new(catalog.clone());
        (catalog, disk_manager, dir)
    }

    #[test]
    fn test_read_unwritten_page_is_zero_filled() {
        let (catalog, disk_manager, _dir) = setup();
        let file_id = catalog.create_table("t").unwrap();
        let page_id = PageId::new(file_id, 0);
        let mut buf = vec![0xFFu8; FRAME_SIZE];
        disk_manager.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (catalog, disk_manager, _dir) = setup();
        let file_id = catalog.create_table("t").unwrap();
        let page_id = PageId::new(file_id, 0);
        let mut data = vec![0u8; FRAME_SIZE];
        data[0] = 42;
        data[FRAME_SIZE - 1] = 7;
        disk_manager.write_page(page_id, &data).unwrap();

        let mut out = vec![0u8; FRAME_SIZE];
        disk_manager.read_page(page_id, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_write_nonzero_page_number_extends_file_with_zero_fill() {
        let (catalog, disk_manager, _dir) = setup();
        let file_id = catalog.create_table("t").unwrap();
        let far_page = PageId::new(file_id, 5);
        let data = vec![9u8; FRAME_SIZE];
        disk_manager.write_page(far_page, &data).unwrap();

        let mut out = vec![0xAAu8; FRAME_SIZE];
        disk_manager.read_page(PageId::new(file_id, 2), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_two_tables_are_independent_files() {
        let (catalog, disk_manager, _dir) = setup();
        let a = catalog.create_table("a").unwrap();
        let b = catalog.create_table("b").unwrap();
        disk_manager
            .write_page(PageId::new(a, 0), &vec![1u8; FRAME_SIZE])
            .unwrap();
        disk_manager
            .write_page(PageId::new(b, 0), &vec![2u8; FRAME_SIZE])
            .unwrap();

        let mut out_a = vec![0u8; FRAME_SIZE];
        let mut out_b = vec![0u8; FRAME_SIZE];
        disk_manager.read_page(PageId::new(a, 0), &mut out_a).unwrap();
        disk_manager.read_page(PageId::new(b, 0), &mut out_b).unwrap();
        assert!(out_a.iter().all(|&b| b == 1));
        assert!(out_b.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_read_page_rejects_wrong_buffer_size() {
        let (catalog, disk_manager, _dir) = setup();
        let file_id = catalog.create_table("t").unwrap();
        let mut out = vec![0u8; FRAME_SIZE - 1];
        let err = disk_manager
            .read_page(PageId::new(file_id, 0), &mut out)
            .unwrap_err();
        assert!(matches!(err, CrioError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_file_id_errors() {
        let (_catalog, disk_manager, _dir) = setup();
        let mut out = vec![0u8; FRAME_SIZE];
        let err = disk_manager
            .read_page(PageId::new(999, 0), &mut out)
            .unwrap_err();
        assert!(matches!(err, CrioError::InvalidArgument(_)));
    }

    #[test]
    fn test_persistence_across_disk_manager_instances() {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
        let file_id = catalog.create_table("t").unwrap();
        {
            let disk_manager = DiskManager::new(catalog.clone());
            disk_manager
                .write_page(PageId::new(file_id, 0), &vec![5u8; FRAME_SIZE])
                .unwrap();
            disk_manager.flush(PageId::new(file_id, 0)).unwrap();
        }
        let disk_manager = DiskManager::new(catalog);
        let mut out = vec![0u8; FRAME_SIZE];
        disk_manager.read_page(PageId::new(file_id, 0), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 5));
    }
}
