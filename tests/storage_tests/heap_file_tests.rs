//! Tests for HeapFile
//!
//! These tests verify:
//! - create/open/close/drop lifecycle
//! - Block allocation and the `block_ids` listing
//! - Page persistence through `put`
//! - Recovery of the last block id after reopening

use heapstore::storage::{BlockDevice, HeapFile, MemoryBlockDevice, MemoryStore};
use heapstore::{HeapError, StorageEnv, BLOCK_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn memory_file(store: &MemoryStore, name: &str) -> HeapFile<MemoryBlockDevice> {
    HeapFile::new(name, store.device(name))
}

fn setup_env() -> (TempDir, StorageEnv) {
    let temp_dir = TempDir::new().unwrap();
    let env = StorageEnv::open_path(temp_dir.path()).unwrap();
    (temp_dir, env)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_create_allocates_first_block() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");

    file.create().unwrap();

    assert!(file.is_open());
    assert_eq!(file.last_block_id(), 1);
    assert_eq!(file.block_ids(), vec![1]);

    let page = file.get(1).unwrap();
    assert_eq!(page.num_records(), 0);
    assert_eq!(page.end_free() as usize, BLOCK_SIZE - 1);
}

#[test]
fn test_create_twice_fails() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    let mut again = memory_file(&store, "t");
    let result = again.create();

    assert!(matches!(result, Err(HeapError::AlreadyExists(_))));
    assert_eq!(store.block_count("t"), 1);
}

#[test]
fn test_open_missing_fails() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "missing");

    assert!(matches!(file.open(), Err(HeapError::NotFound(_))));
    assert!(!file.is_open());
}

#[test]
fn test_open_and_close_are_idempotent() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    file.open().unwrap();
    file.open().unwrap();
    file.close().unwrap();
    file.close().unwrap();

    assert!(!file.is_open());
}

#[test]
fn test_closed_file_rejects_block_access() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();
    let page = file.get(1).unwrap();
    file.close().unwrap();

    assert!(matches!(file.get(1), Err(HeapError::Closed(_))));
    assert!(matches!(file.put(&page), Err(HeapError::Closed(_))));
    assert!(matches!(file.get_new(), Err(HeapError::Closed(_))));
}

#[test]
fn test_drop_file_removes_storage() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();
    file.get_new().unwrap();

    file.drop_file().unwrap();

    assert!(!store.contains("t"));
    assert!(!file.is_open());
    assert_eq!(file.last_block_id(), 0);
    assert!(matches!(file.open(), Err(HeapError::NotFound(_))));
}

#[test]
fn test_dropped_file_blocks_are_not_found() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();
    let page = file.get(1).unwrap();

    file.drop_file().unwrap();

    assert!(matches!(file.get(1), Err(HeapError::NotFound(_))));
    assert!(matches!(file.put(&page), Err(HeapError::NotFound(_))));
    assert!(matches!(file.get_new(), Err(HeapError::NotFound(_))));
}

#[test]
fn test_dropped_file_on_disk_blocks_are_not_found() {
    let (_temp, env) = setup_env();
    let mut file = env.heap_file("dropped").unwrap();
    file.create().unwrap();

    file.drop_file().unwrap();

    assert!(matches!(file.get(1), Err(HeapError::NotFound(_))));
}

#[test]
fn test_drop_file_then_create_again() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();
    file.get_new().unwrap();
    file.drop_file().unwrap();

    file.create().unwrap();

    assert_eq!(file.block_ids(), vec![1]);
}

#[test]
fn test_drop_closes_device() {
    let (_temp, env) = setup_env();
    {
        let mut file = env.heap_file("scoped").unwrap();
        file.create().unwrap();
    }

    // A fresh handle can attach after the first one went out of scope
    let mut file = env.heap_file("scoped").unwrap();
    file.open().unwrap();
    assert_eq!(file.last_block_id(), 1);
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_get_new_grows_monotonically() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    let ids: Vec<_> = (0..4).map(|_| file.get_new().unwrap().block_id()).collect();

    assert_eq!(ids, vec![2, 3, 4, 5]);
    assert_eq!(file.block_ids(), vec![1, 2, 3, 4, 5]);
    assert_eq!(store.block_count("t"), 5);
}

#[test]
fn test_get_unallocated_block_fails() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    assert!(matches!(file.get(0), Err(HeapError::NotFound(_))));
    assert!(matches!(file.get(2), Err(HeapError::NotFound(_))));
}

#[test]
fn test_put_persists_page() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    let mut page = file.get(1).unwrap();
    let id = page.add(b"persisted").unwrap();
    file.put(&page).unwrap();

    let reloaded = file.get(1).unwrap();
    assert_eq!(&reloaded.get(id).unwrap()[..], b"persisted");
}

#[test]
fn test_unput_changes_are_not_persisted() {
    let store = MemoryStore::new();
    let mut file = memory_file(&store, "t");
    file.create().unwrap();

    let mut page = file.get(1).unwrap();
    page.add(b"scratch").unwrap();

    let reloaded = file.get(1).unwrap();
    assert_eq!(reloaded.num_records(), 0);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_recovers_last_block() {
    let (_temp, env) = setup_env();
    let mut file = env.heap_file("growing").unwrap();
    file.create().unwrap();
    let mut page = file.get_new().unwrap();
    page.add(b"on block two").unwrap();
    file.put(&page).unwrap();
    file.get_new().unwrap();
    file.close().unwrap();

    let mut reopened = env.heap_file("growing").unwrap();
    reopened.open().unwrap();

    assert_eq!(reopened.last_block_id(), 3);
    assert_eq!(reopened.block_ids(), vec![1, 2, 3]);
    let page = reopened.get(2).unwrap();
    assert_eq!(&page.get(1).unwrap()[..], b"on block two");
}

#[test]
fn test_file_device_backs_heap_file() {
    let (_temp, env) = setup_env();
    let mut file = env.heap_file("on_disk").unwrap();
    file.create().unwrap();

    assert!(file.device().exists());
    assert_eq!(
        file.device().path(),
        env.data_dir().join("on_disk.db").as_path()
    );
}

#[test]
fn test_invalid_name_rejected() {
    let (_temp, env) = setup_env();

    assert!(matches!(
        env.heap_file("../escape"),
        Err(HeapError::Validation(_))
    ));
    assert!(matches!(env.heap_file(""), Err(HeapError::Validation(_))));
}
