//! Tests for HeapTable
//!
//! These tests verify:
//! - Table lifecycle (create, create_if_not_exists, drop, reopen)
//! - Row validation on insert
//! - select with and without predicates, in scan order
//! - project with column lists
//! - delete and handle stability
//! - Growth into new blocks when the last block fills

use heapstore::storage::{MemoryBlockDevice, MemoryStore, MAX_RECORD_SIZE};
use heapstore::{
    DataType, Handle, HeapError, HeapTable, Relation, Row, Schema, StorageEnv, Value,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn ab_schema() -> Schema {
    Schema::default()
        .with_column("a", DataType::Int)
        .with_column("b", DataType::Text)
}

fn ab_row(a: i32, b: &str) -> Row {
    Row::new().with("a", a).with("b", b)
}

fn memory_table(store: &MemoryStore, name: &str) -> HeapTable<MemoryBlockDevice> {
    HeapTable::new(name, ab_schema(), store.device(name))
}

fn created_table(store: &MemoryStore) -> HeapTable<MemoryBlockDevice> {
    let mut table = memory_table(store, "t");
    table.create().unwrap();
    table
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
fn test_end_to_end_round_trip() {
    let (_temp, env) = setup_env();

    let mut scratch = env.table("_test_create_drop", ab_schema()).unwrap();
    scratch.create().unwrap();
    scratch.drop_table().unwrap();
    assert!(!env.data_dir().join("_test_create_drop.db").exists());

    let mut table = env.table("_test_data", ab_schema()).unwrap();
    table.create_if_not_exists().unwrap();

    let row = ab_row(12, "Hello!");
    let handle = table.insert(&row).unwrap();
    assert_eq!(handle, Handle::new(1, 1));

    let handles = table.select(None).unwrap();
    assert_eq!(handles, vec![handle]);
    assert_eq!(table.project(handles[0], None).unwrap(), row);

    table.delete(handle).unwrap();
    assert!(table.select(None).unwrap().is_empty());

    table.drop_table().unwrap();
    assert!(!env.data_dir().join("_test_data.db").exists());
}

#[test]
fn test_create_if_not_exists_opens_existing() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let handle = table.insert(&ab_row(1, "kept")).unwrap();
    table.close().unwrap();

    let mut again = memory_table(&store, "t");
    again.create_if_not_exists().unwrap();

    assert_eq!(again.select(None).unwrap(), vec![handle]);
    assert_eq!(store.block_count("t"), 1);
}

#[test]
fn test_create_existing_fails() {
    let store = MemoryStore::new();
    let _table = created_table(&store);

    let mut again = memory_table(&store, "t");

    assert!(matches!(again.create(), Err(HeapError::AlreadyExists(_))));
}

#[test]
fn test_operations_open_on_demand() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    table.close().unwrap();

    let handle = table.insert(&ab_row(5, "lazy")).unwrap();

    assert!(table.file().is_open());
    assert_eq!(table.project(handle, None).unwrap(), ab_row(5, "lazy"));
}

#[test]
fn test_missing_table_fails_on_use() {
    let store = MemoryStore::new();
    let mut table = memory_table(&store, "nope");

    assert!(matches!(table.open(), Err(HeapError::NotFound(_))));
    assert!(matches!(table.select(None), Err(HeapError::NotFound(_))));
}

#[test]
fn test_reopen_persists_rows() {
    let (_temp, env) = setup_env();
    let mut handles = Vec::new();
    {
        let mut table = env.table("people", ab_schema()).unwrap();
        table.create().unwrap();
        for i in 0..50 {
            handles.push(table.insert(&ab_row(i, &format!("person-{}", i))).unwrap());
        }
        table.close().unwrap();
    }

    let mut table = env.table("people", ab_schema()).unwrap();
    table.open().unwrap();

    assert_eq!(table.select(None).unwrap(), handles);
    assert_eq!(
        table.project(handles[42], None).unwrap(),
        ab_row(42, "person-42")
    );
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_insert_missing_column_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);

    let result = table.insert(&Row::new().with("a", 1));

    assert!(matches!(result, Err(HeapError::Validation(_))));
    assert!(table.select(None).unwrap().is_empty());
}

#[test]
fn test_insert_wrong_type_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);

    let result = table.insert(&Row::new().with("a", "12").with("b", "x"));

    assert!(matches!(result, Err(HeapError::Validation(_))));
}

#[test]
fn test_insert_non_ascii_text_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);

    let result = table.insert(&ab_row(1, "café"));

    assert!(matches!(result, Err(HeapError::Validation(_))));
}

#[test]
fn test_validate_ignores_extra_columns() {
    let store = MemoryStore::new();
    let table = memory_table(&store, "t");
    let row = Row::new().with("extra", 9).with("b", "x").with("a", 1);

    let validated = table.validate(&row).unwrap();

    assert_eq!(validated, ab_row(1, "x"));
}

#[test]
fn test_insert_oversized_row_fails_without_growth() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let big = "x".repeat(MAX_RECORD_SIZE);

    let result = table.insert(&ab_row(1, &big));

    assert!(matches!(result, Err(HeapError::Validation(_))));
    assert_eq!(table.file().last_block_id(), 1);
}

#[test]
fn test_append_oversized_record_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);

    let result = table.append(&vec![0u8; MAX_RECORD_SIZE + 1]);

    assert!(matches!(result, Err(HeapError::Validation(_))));
    assert_eq!(table.file().last_block_id(), 1);
}

// =============================================================================
// Select / Project Tests
// =============================================================================

#[test]
fn test_select_with_predicate() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let h1 = table.insert(&ab_row(1, "x")).unwrap();
    let _h2 = table.insert(&ab_row(2, "y")).unwrap();
    let h3 = table.insert(&ab_row(1, "z")).unwrap();

    let by_a = table.select(Some(&Row::new().with("a", 1))).unwrap();
    let by_both = table.select(Some(&ab_row(1, "z"))).unwrap();
    let none = table.select(Some(&Row::new().with("b", "w"))).unwrap();

    assert_eq!(by_a, vec![h1, h3]);
    assert_eq!(by_both, vec![h3]);
    assert!(none.is_empty());
}

#[test]
fn test_select_unknown_predicate_column_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    table.insert(&ab_row(1, "x")).unwrap();

    let result = table.select(Some(&Row::new().with("c", 1)));

    assert!(matches!(result, Err(HeapError::Validation(_))));
}

#[test]
fn test_project_columns_in_requested_order() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let handle = table.insert(&ab_row(7, "seven")).unwrap();

    let only_b = table.project(handle, Some(&["b"])).unwrap();
    let reversed = table.project(handle, Some(&["b", "a"])).unwrap();

    assert_eq!(only_b, Row::new().with("b", "seven"));
    assert_eq!(reversed.columns().collect::<Vec<_>>(), vec!["b", "a"]);
    assert_eq!(reversed.get("a"), Some(&Value::Int(7)));
}

#[test]
fn test_project_unknown_column_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let handle = table.insert(&ab_row(7, "seven")).unwrap();

    let result = table.project(handle, Some(&["a", "missing"]));

    assert!(matches!(result, Err(HeapError::Validation(_))));
}

#[test]
fn test_rows_pairs_handles_with_values() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let h1 = table.insert(&ab_row(1, "x")).unwrap();
    let h2 = table.insert(&ab_row(2, "y")).unwrap();

    let rows = table.rows(None).unwrap();

    assert_eq!(rows, vec![(h1, ab_row(1, "x")), (h2, ab_row(2, "y"))]);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_then_project_not_found() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let handle = table.insert(&ab_row(1, "gone")).unwrap();

    table.delete(handle).unwrap();

    assert!(matches!(
        table.project(handle, None),
        Err(HeapError::NotFound(_))
    ));
}

#[test]
fn test_delete_keeps_other_handles_valid() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    let h1 = table.insert(&ab_row(1, "first")).unwrap();
    let h2 = table.insert(&ab_row(2, "second")).unwrap();
    let h3 = table.insert(&ab_row(3, "third")).unwrap();

    table.delete(h2).unwrap();
    let h4 = table.insert(&ab_row(4, "fourth")).unwrap();

    assert_eq!(table.select(None).unwrap(), vec![h1, h3, h4]);
    assert_eq!(h4, Handle::new(1, 4));
    assert_eq!(table.project(h1, None).unwrap(), ab_row(1, "first"));
    assert_eq!(table.project(h3, None).unwrap(), ab_row(3, "third"));
}

#[test]
fn test_delete_out_of_range_fails() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    table.insert(&ab_row(1, "x")).unwrap();

    assert!(matches!(
        table.delete(Handle::new(1, 9)),
        Err(HeapError::NotFound(_))
    ));
    assert!(matches!(
        table.delete(Handle::new(5, 1)),
        Err(HeapError::NotFound(_))
    ));
}

// =============================================================================
// Growth Tests
// =============================================================================

#[test]
fn test_full_block_allocates_new_block() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);
    // 4 + 2 + 2000 = 2006 bytes: two fit in an empty block, a third does not
    let text = "y".repeat(2000);

    let h1 = table.insert(&ab_row(1, &text)).unwrap();
    let h2 = table.insert(&ab_row(2, &text)).unwrap();
    let h3 = table.insert(&ab_row(3, &text)).unwrap();

    assert_eq!(h1, Handle::new(1, 1));
    assert_eq!(h2, Handle::new(1, 2));
    assert_eq!(h3, Handle::new(2, 1));
    assert_eq!(table.file().last_block_id(), 2);
    assert_eq!(table.project(h3, None).unwrap(), ab_row(3, &text));
}

#[test]
fn test_many_inserts_scan_in_order() {
    let store = MemoryStore::new();
    let mut table = created_table(&store);

    let inserted: Vec<_> = (0..1000)
        .map(|i| table.insert(&ab_row(i, "some text")).unwrap())
        .collect();

    let mut sorted = inserted.clone();
    sorted.sort();
    assert_eq!(inserted, sorted);
    assert_eq!(table.select(None).unwrap(), inserted);
    assert!(table.file().last_block_id() > 1);

    let last = *inserted.last().unwrap();
    assert_eq!(table.project(last, None).unwrap(), ab_row(999, "some text"));
}
