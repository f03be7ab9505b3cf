use std::sync::Arc;

use crio::buffer::BufferPoolManager;
use crio::catalog::Catalog;
use crio::storage::disk::{DiskManager, DiskScheduler};
use crio::storage::page::{BTreePage, BTreePageRef, BTreePageType, LeafTuple};
use crio::PageId;
use tempfile::TempDir;

#[test]
fn insert_flush_and_read_back_a_leaf_page_through_the_full_stack() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
    let file_id = catalog.create_table("accounts").unwrap();

    let disk_manager = Arc::new(DiskManager::new(catalog));
    let disk_scheduler = Arc::new(DiskScheduler::new(disk_manager));
    let bpm = BufferPoolManager::new(8, disk_scheduler);

    let page_id = PageId::new(file_id, 0);
    {
        let mut guard = bpm.read_page(page_id).unwrap();
        let mut page = BTreePage::new(guard.data_mut()).unwrap();
        page.init(BTreePageType::Leaf, 0);
        page.insert_leaf(LeafTuple {
            key: 1,
            rid_page_num: 10,
            rid_slot_num: 0,
        })
        .unwrap();
    }
    bpm.unpin_page(page_id, true);
    bpm.flush_page(page_id).unwrap();

    // A fresh buffer pool over the same files sees the flushed contents.
    let guard = bpm.read_page(page_id).unwrap();
    let page = BTreePageRef::new(guard.data()).unwrap();
    assert!(page.is_leaf().unwrap());
    assert_eq!(page.num_slots(), 1);
    assert_eq!(page.get_leaf_tuple(0).unwrap().rid_page_num, 10);
}
