#![allow(clippy::all)]

use std::sync::Arc;

use eduflow_local::{
    config::{EmulatorOptions, StorageTarget, DEFAULT_STORAGE_KEY},
    storage::{seed::default_tables, DurableSlot, FileSlot, MemorySlot, Persistence, RecordStore},
    to_record, ChainMode, LocalClient,
};
use serde_json::{json, Value};

fn open(slot: Arc<dyn DurableSlot>) -> LocalClient {
    LocalClient::with_slot(slot, DEFAULT_STORAGE_KEY, ChainMode::Compat)
}

fn populate(client: &LocalClient) {
    let content = client
        .from("contents")
        .insert(to_record(json!({
            "title": "Intro to Binary",
            "category_id": "cat1",
            "creator_id": "demo-user-id",
            "status": "published",
        })))
        .into_record();
    client.from("view_history").insert(to_record(json!({
        "user_id": "demo-user-id",
        "content_id": content["id"].clone(),
    })));
    client.from("comments").insert(to_record(json!({
        "content_id": content["id"].clone(),
        "body": "Great lesson",
    })));
    client
        .from("profiles")
        .upsert(to_record(json!({ "id": "demo-user-id", "role": "creator" })));
}

#[test]
fn snapshot_survives_reopen() {
    let slot = Arc::new(MemorySlot::new());
    let client = open(slot.clone());
    populate(&client);
    let before = client.store().snapshot();

    let reopened = open(slot);
    assert_eq!(reopened.store().snapshot(), before);
    assert_eq!(reopened.store().persistence_metrics().load_fallbacks, 0);
}

#[test]
fn stored_blob_is_plain_json_under_the_key() {
    let slot = Arc::new(MemorySlot::new());
    let client = open(slot.clone());
    populate(&client);

    let raw = slot.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let blob: Value = serde_json::from_str(&raw).unwrap();
    assert!(blob["contents"].is_array());
    assert!(blob["profiles"]["demo-user-id"].is_object());
    assert_eq!(blob["comments"][0]["body"], json!("Great lesson"));
}

#[test]
fn quota_failure_keeps_memory_authoritative() {
    let slot = Arc::new(MemorySlot::with_capacity(16));
    let client = open(slot.clone());
    let row = client
        .from("contents")
        .insert(to_record(json!({ "title": "Too big to store" })))
        .select()
        .single();
    assert!(row.error.is_none());

    let metrics = client.store().persistence_metrics();
    assert_eq!(metrics.saves, 1);
    assert_eq!(metrics.save_failures, 1);
    assert_eq!(client.store().read("contents").len(), 1);
    assert!(slot.get(DEFAULT_STORAGE_KEY).unwrap().is_none());

    let reopened = open(slot);
    assert!(reopened.store().read("contents").is_empty());
}

#[test]
fn malformed_blob_falls_back_to_defaults() {
    for raw in [
        "{not json",
        "[1, 2, 3]",
        r#"{"contents": "nope"}"#,
        r#"{"profiles": []}"#,
        r#"{"contents": [{"id": "a"}, {"id": "a"}]}"#,
    ] {
        let slot = Arc::new(MemorySlot::new());
        slot.seed(DEFAULT_STORAGE_KEY, raw);
        let client = open(slot);
        assert_eq!(client.store().snapshot(), default_tables(), "blob {raw}");
        assert_eq!(client.store().persistence_metrics().load_fallbacks, 1);
    }
}

#[test]
fn partial_blob_gains_missing_tables() {
    let slot = Arc::new(MemorySlot::new());
    slot.seed(DEFAULT_STORAGE_KEY, r#"{"contents": [{"id": "c1", "title": "Kept"}]}"#);
    let client = open(slot);
    let names = client.store().table_names();
    for table in ["categories", "contents", "profiles", "view_history"] {
        assert!(names.iter().any(|n| n == table), "missing {table}");
    }
    assert_eq!(client.store().read("contents")[0]["title"], json!("Kept"));
    assert!(client.store().read("categories").is_empty());
}

#[test]
fn file_slot_round_trips_through_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let slot = Arc::new(FileSlot::open(dir.path()).unwrap());
    let client = open(slot.clone());
    populate(&client);
    let before = client.store().snapshot();

    assert!(slot.path_for(DEFAULT_STORAGE_KEY).exists());
    let reopened = open(Arc::new(FileSlot::open(dir.path()).unwrap()));
    assert_eq!(reopened.store().snapshot(), before);
}

#[test]
fn storage_key_isolates_datasets() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = EmulatorOptions {
        storage: StorageTarget::Directory(dir.path().to_path_buf()),
        ..EmulatorOptions::default()
    };
    let first = LocalClient::open(&options);
    first
        .from("contents")
        .insert(to_record(json!({ "title": "Only in default" })));

    options.storage_key = "eduflow_other_db".into();
    let other = LocalClient::open(&options);
    assert!(other.store().read("contents").is_empty());

    options.storage_key = DEFAULT_STORAGE_KEY.into();
    assert_eq!(LocalClient::open(&options).store().read("contents").len(), 1);
}

#[test]
fn store_opens_directly_over_persistence() {
    let slot = Arc::new(MemorySlot::new());
    let store = RecordStore::open(Persistence::new(slot, "custom"));
    assert_eq!(store.read("categories").len(), 4);
    assert_eq!(store.persistence_metrics().loads, 1);
    assert_eq!(store.persistence_metrics().saves, 0);
}
