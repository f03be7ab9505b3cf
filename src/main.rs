use std::sync::Arc;

use crio::buffer::BufferPoolManager;
use crio::catalog::Catalog;
use crio::storage::disk::{DiskManager, DiskScheduler};
use crio::storage::page::{BTreePage, BTreePageRef, BTreePageType, LeafTuple};
use crio::PageId;

fn main() {
    println!("Crio - A disk-oriented storage core in Rust");
    println!("=============================================\n");

    let catalog = Arc::new(Catalog::with_base_dir("demo_data"));
    let file_id = match catalog.create_table("accounts") {
        Ok(id) => id,
        Err(e) => {
            eprintln!("failed to register table: {e}");
            return;
        }
    };
    println!("Registered table 'accounts' as file_id {file_id}");

    let disk_manager = Arc::new(DiskManager::new(catalog));
    let disk_scheduler = Arc::new(DiskScheduler::new(disk_manager));
    let bpm = BufferPoolManager::new(10, disk_scheduler);
    println!("Created buffer pool manager with 10 frames\n");

    let page_id = PageId::new(file_id, 0);

    {
        let mut guard = match bpm.read_page(page_id) {
            Ok(g) => g,
            Err(e) => {
                eprintln!("failed to read page: {e}");
                return;
            }
        };

        let mut page = BTreePage::new(guard.data_mut()).expect("frame is FRAME_SIZE bytes");
        page.init(BTreePageType::Leaf, 0);

        let rows = [(1i64, 100u32, 0u16), (2, 100, 1), (3, 101, 0)];
        for (key, rid_page_num, rid_slot_num) in rows {
            if let Err(e) = page.insert_leaf(LeafTuple {
                key,
                rid_page_num,
                rid_slot_num,
            }) {
                eprintln!("failed to insert leaf tuple: {e}");
                return;
            }
            println!("Inserted key {key}");
        }

        println!("\nPage stats:");
        println!("  - Slot count: {}", page.num_slots());
        println!("  - Free space: {} bytes", page.free_space());
    }

    bpm.unpin_page(page_id, true);
    if let Err(e) = bpm.flush_page(page_id) {
        eprintln!("failed to flush page: {e}");
        return;
    }
    println!("\nFlushed page to disk");

    {
        let guard = match bpm.read_page(page_id) {
            Ok(g) => g,
            Err(e) => {
                eprintln!("failed to read page back: {e}");
                return;
            }
        };
        let page = BTreePageRef::new(guard.data()).expect("frame is FRAME_SIZE bytes");

        println!("\nReading back from page {page_id}:");
        println!("  - Slot count: {}", page.num_slots());
        for slot in 0..page.num_slots() {
            if let Ok(tuple) = page.get_leaf_tuple(slot) {
                println!(
                    "  - key {} -> RID ({}, {})",
                    tuple.key, tuple.rid_page_num, tuple.rid_slot_num
                );
            }
        }
    }
    bpm.unpin_page(page_id, false);

    bpm.shutdown();
    std::fs::remove_dir_all("demo_data").ok();
    println!("\nDemo completed successfully!");
}
