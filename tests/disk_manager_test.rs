use std::sync::Arc;

use crio::catalog::Catalog;
use crio::storage::disk::DiskManager;
use crio::PageId;
use tempfile::tempdir;

const FRAME_SIZE: usize = 8192;

#[test]
fn write_read_roundtrip_across_two_tables() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
    let accounts = catalog.create_table("accounts").unwrap();
    let orders = catalog.create_table("orders").unwrap();
    let disk_manager = DiskManager::new(catalog);

    let mut accounts_page = vec![1u8; FRAME_SIZE];
    accounts_page[10] = 99;
    disk_manager
        .write_page(PageId::new(accounts, 0), &accounts_page)
        .unwrap();
    disk_manager
        .write_page(PageId::new(orders, 0), &vec![2u8; FRAME_SIZE])
        .unwrap();

    let mut out = vec![0u8; FRAME_SIZE];
    disk_manager.read_page(PageId::new(accounts, 0), &mut out).unwrap();
    assert_eq!(out, accounts_page);

    disk_manager.read_page(PageId::new(orders, 0), &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 2));
}

#[test]
fn pages_persist_after_the_disk_manager_is_dropped_and_reopened() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
    let file_id = catalog.create_table("accounts").unwrap();

    {
        let disk_manager = DiskManager::new(catalog.clone());
        disk_manager
            .write_page(PageId::new(file_id, 3), &vec![7u8; FRAME_SIZE])
            .unwrap();
        disk_manager.flush(PageId::new(file_id, 3)).unwrap();
    }

    let disk_manager = DiskManager::new(catalog);
    let mut out = vec![0u8; FRAME_SIZE];
    disk_manager.read_page(PageId::new(file_id, 3), &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 7));
}

#[test]
fn a_never_written_page_reads_as_zeros() {
    let dir = tempdir().unwrap();
    let catalog = Arc::new(Catalog::with_base_dir(dir.path()));
    let file_id = catalog.create_table("accounts").unwrap();
    let disk_manager = DiskManager::new(catalog);

    let mut out = vec![0xFFu8; FRAME_SIZE];
    disk_manager.read_page(PageId::new(file_id, 0), &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0));
}
