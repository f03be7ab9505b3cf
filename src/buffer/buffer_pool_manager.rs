//! Buffer pool manager: the page table, the fixed frame array, and the
//! orchestration of the ARC replacer and the disk scheduler behind a
//! pin/unpin discipline realized as RAII guards.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::common::config::FRAME_SIZE;
use crate::common::error::{CrioError, Result};
use crate::common::types::{FrameId, PageId};

use crate::storage::disk::DiskScheduler;

use super::arc_replacer::ArcReplacer;
use super::frame_header::FrameHeader;
use super::page_guard::WritePageGuard;

/// Shared state referenced both by the manager and by the release callback
/// each outstanding page guard carries, so a guard never needs an unsafe
/// pointer back into its owning `BufferPoolManager`.
struct BpmShared {
    replacer: ArcReplacer,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    free_list: Mutex<VecDeque<FrameId>>,
}

/// Owns every frame the pool will ever use, the page table mapping resident
/// pages to frames, the ARC replacer, and the disk scheduler used to fetch
/// and flush pages.
pub struct BufferPoolManager {
    pool_size: usize,
    disk_scheduler: Arc<DiskScheduler>,
    frames: Vec<Arc<FrameHeader>>,
    shared: Arc<BpmShared>,
    /// Serializes the "is this page already resident, else pick a victim
    /// frame and install" sequence so two concurrent misses on the same
    /// page never race to install it twice.
    install_lock: Mutex<()>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_scheduler: Arc<DiskScheduler>) -> Self {
        let frames = (0..pool_size)
            .map(|i| Arc::new(FrameHeader::new(FrameId::new(i as u32))))
            .collect();
        let free_list = (0..pool_size).map(|i| FrameId::new(i as u32)).collect();
        Self {
            pool_size,
            disk_scheduler,
            frames,
            shared: Arc::new(BpmShared {
                replacer: ArcReplacer::new(pool_size),
                page_table: RwLock::new(HashMap::new()),
                free_list: Mutex::new(free_list),
            }),
            install_lock: Mutex::new(()),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.shared.free_list.lock().len()
    }

    /// Reads `page_id`, pinning it into a frame and returning a write-locked
    /// guard over the frame's bytes. Allocates and installs the page if it
    /// is not yet resident (fetching its current on-disk contents, which
    /// are zero if the page has never been written).
    pub fn read_page(&self, page_id: PageId) -> Result<WritePageGuard> {
        if let Some(frame_id) = self.shared.page_table.read().get(&page_id).copied() {
            return self.pin_resident(page_id, frame_id);
        }

        let _install_guard = self.install_lock.lock();
        // Re-check: another thread may have installed it while we waited.
        if let Some(frame_id) = self.shared.page_table.read().get(&page_id).copied() {
            return self.pin_resident(page_id, frame_id);
        }

        let frame_id = self.acquire_free_frame()?;
        let frame = self.frames[frame_id.as_usize()].clone();

        let data = self.disk_scheduler.schedule_read(page_id)?;
        frame.set_page_id(page_id);
        frame.copy_from(data.as_slice());
        frame.set_dirty(false);
        frame.pin();

        self.shared.page_table.write().insert(page_id, frame_id);
        self.shared.replacer.record_access(page_id);
        self.shared.replacer.set_evictable(page_id, false);

        Ok(self.make_write_guard(page_id, frame))
    }

    fn pin_resident(&self, page_id: PageId, frame_id: FrameId) -> Result<WritePageGuard> {
        let frame = self.frames[frame_id.as_usize()].clone();
        frame.pin();
        self.shared.replacer.record_access(page_id);
        self.shared.replacer.set_evictable(page_id, false);
        Ok(self.make_write_guard(page_id, frame))
    }

    fn make_write_guard(&self, page_id: PageId, frame: Arc<FrameHeader>) -> WritePageGuard {
        let shared = self.shared.clone();
        let frame_for_callback = frame.clone();
        let callback = Box::new(move |pid: PageId, is_dirty: bool| {
            if is_dirty {
                frame_for_callback.set_dirty(true);
            }
            if let Some(0) = frame_for_callback.unpin() {
                shared.replacer.set_evictable(pid, true);
            }
        });
        unsafe { WritePageGuard::new(page_id, frame, callback) }
    }

    /// Finds a frame to install a new page into: the free list first, then
    /// an ARC victim. Returns `AllPinned` if neither yields a frame.
    fn acquire_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.shared.free_list.lock().pop_front() {
            return Ok(frame_id);
        }

        let victim_page = self.shared.replacer.evict().ok_or(CrioError::AllPinned)?;
        let frame_id = self
            .shared
            .page_table
            .read()
            .get(&victim_page)
            .copied()
            .expect("replacer victim must be in the page table");
        let frame = self.frames[frame_id.as_usize()].clone();

        if frame.is_dirty() {
            let mut data: Box<[u8; FRAME_SIZE]> = Box::new([0u8; FRAME_SIZE]);
            frame.copy_to(data.as_mut_slice());
            if let Err(e) = self.disk_scheduler.schedule_write(victim_page, data) {
                // Leave the victim's frame state untouched so the caller can
                // retry; the replacer-side ghost transition already happened
                // and is not undone (see DESIGN.md).
                return Err(e);
            }
            frame.set_dirty(false);
        }

        self.shared.page_table.write().remove(&victim_page);
        frame.reset();
        Ok(frame_id)
    }

    /// Decrements the pin count of a resident page, OR-ing in `is_dirty`,
    /// and marks it evictable once unpinned. No-op if not resident.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) {
        let Some(frame_id) = self.shared.page_table.read().get(&page_id).copied() else {
            return;
        };
        let frame = &self.frames[frame_id.as_usize()];
        if is_dirty {
            frame.set_dirty(true);
        }
        if let Some(0) = frame.unpin() {
            self.shared.replacer.set_evictable(page_id, true);
        }
    }

    /// Deletes `page_id`. Returns `Ok(false)` without side effects if the
    /// page is resident and pinned. Zero-fills the on-disk page either way
    /// (whether or not it was resident).
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = self.shared.page_table.read().get(&page_id).copied();

        if let Some(frame_id) = frame_id {
            let frame = &self.frames[frame_id.as_usize()];
            if frame.pin_count() > 0 {
                return Ok(false);
            }
            self.disk_scheduler
                .schedule_write(page_id, Box::new([0u8; FRAME_SIZE]))?;
            self.shared.page_table.write().remove(&page_id);
            self.shared.replacer.remove(page_id);
            frame.reset();
            self.shared.free_list.lock().push_back(frame_id);
            return Ok(true);
        }

        self.disk_scheduler
            .schedule_write(page_id, Box::new([0u8; FRAME_SIZE]))?;
        Ok(true)
    }

    /// Flushes `page_id` to disk if resident and dirty, clearing the dirty
    /// bit on success. No-op if not resident or not dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let Some(frame_id) = self.shared.page_table.read().get(&page_id).copied() else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.as_usize()];
        if !frame.is_dirty() {
            return Ok(());
        }
        let mut data: Box<[u8; FRAME_SIZE]> = Box::new([0u8; FRAME_SIZE]);
        frame.copy_to(data.as_mut_slice());
        self.disk_scheduler.schedule_write(page_id, data)?;
        frame.set_dirty(false);
        Ok(())
    }

    /// Flushes every resident dirty page.
    pub fn flush_all(&self) -> Result<()> {
        let resident: Vec<PageId> = self.shared.page_table.read().keys().copied().collect();
        for page_id in resident {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Returns the current pin count of `page_id`, or `None` if not
    /// resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = self.shared.page_table.read().get(&page_id).copied()?;
        Some(self.frames[frame_id.as_usize()].pin_count())
    }

    /// Closes the disk scheduler. Subsequent I/O-bearing calls fail with
    /// `SchedulerClosed`.
    pub fn shutdown(&self) {
        self.disk_scheduler.shutdown();
    }
}
