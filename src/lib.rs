//! Crio - A disk-oriented storage core for a relational database.
//!
//! This crate provides the storage core of a disk-oriented DBMS: the
//! components that keep pages durable on disk and fast to access in memory.
//! Query execution, a schema-aware catalog, and query-facing indexes sit
//! above this layer and are out of scope here.
//!
//! # Architecture
//!
//! - **Catalog** (`catalog`): a minimal, in-memory registry mapping a table
//!   name to a `file_id` and a backing file path. Not a schema catalog, not
//!   persisted.
//!
//! - **Storage Layer** (`storage`): disk I/O and the physical page format
//!   - `DiskManager`: positional, per-file reads and writes
//!   - `DiskScheduler`: a background worker draining a queue of disk
//!     operations, so callers never block the buffer pool's latches on I/O
//!   - `BTreePage`: the slotted-page layout shared by B+-tree leaf and
//!     internal pages
//!
//! - **Buffer Pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: fetches pages from disk and caches them in memory
//!   - `ArcReplacer`: Adaptive Replacement Cache eviction policy
//!   - `FrameHeader`: per-frame metadata and data storage
//!   - `ReadPageGuard`/`WritePageGuard`: RAII guards for thread-safe page access
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crio::buffer::BufferPoolManager;
//! use crio::catalog::Catalog;
//! use crio::storage::disk::{DiskManager, DiskScheduler};
//! use crio::storage::page::{BTreePage, BTreePageType};
//!
//! let catalog = Arc::new(Catalog::new());
//! let file_id = catalog.create_table("accounts").unwrap();
//!
//! let disk_manager = Arc::new(DiskManager::new(catalog));
//! let disk_scheduler = Arc::new(DiskScheduler::new(disk_manager));
//! let bpm = BufferPoolManager::new(64, disk_scheduler);
//!
//! let page_id = crio::common::PageId::new(file_id, 0);
//! {
//!     let mut guard = bpm.read_page(page_id).unwrap();
//!     let mut page = BTreePage::new(guard.data_mut()).unwrap();
//!     page.init(BTreePageType::Leaf, 0);
//! }
//! bpm.unpin_page(page_id, true);
//! bpm.flush_page(page_id).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{CrioError, PageId, RecordId, Result, SlotId};
