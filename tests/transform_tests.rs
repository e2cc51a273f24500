//! Tests for snapshots and post-load transforms
//!
//! These tests verify:
//! - to_object() builds a flat map by explicit insertion
//! - Reserved-looking key names pass through literally
//! - load() applies the identity transform by default
//! - Injected and one-off transforms, including failing ones

use async_trait::async_trait;
use dockv::transform::{build_snapshot, transform_fn, Identity};
use dockv::{DocKvError, DocStore, KeyValueRecord, PreProcess, Snapshot, StoreConfig};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn memory_config() -> StoreConfig {
    StoreConfig::builder()
        .uri("memory://localhost/test")
        .collection("kv")
        .build()
}

async fn seeded(store: DocStore) -> DocStore {
    store.start().await.unwrap();
    store.put("a", json!({ "x": 1 })).await.unwrap();
    store.put("b", 2).await.unwrap();
    store
}

/// Keeps only numeric values and doubles them
struct DoubleNumbers;

#[async_trait]
impl PreProcess for DoubleNumbers {
    async fn pre_process(&self, snapshot: Snapshot) -> dockv::Result<Snapshot> {
        Ok(snapshot
            .into_iter()
            .filter_map(|(k, v)| v.as_i64().map(|n| (k, json!(n * 2))))
            .collect())
    }
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_build_snapshot_inserts_every_entry() {
    let snapshot = build_snapshot(vec![
        KeyValueRecord::new("a", json!(1)),
        KeyValueRecord::new("b", json!([1, 2])),
    ]);

    assert_eq!(Value::Object(snapshot), json!({ "a": 1, "b": [1, 2] }));
}

#[test]
fn test_build_snapshot_empty() {
    assert!(build_snapshot(Vec::new()).is_empty());
}

#[tokio::test]
async fn test_reserved_names_pass_through() {
    let store = DocStore::open(memory_config()).unwrap();
    store.start().await.unwrap();

    for key in ["__proto__", "constructor", "prototype", "toString", "hasOwnProperty"] {
        store.put(key, key.len()).await.unwrap();
    }

    let object = store.to_object().await.unwrap();

    assert_eq!(object.len(), 5);
    assert_eq!(object.get("__proto__"), Some(&json!(9)));
    assert_eq!(object.get("constructor"), Some(&json!(11)));
    assert_eq!(object.get("hasOwnProperty"), Some(&json!(14)));
}

#[tokio::test]
async fn test_to_object_matches_entries() {
    let store = seeded(DocStore::open(memory_config()).unwrap()).await;

    let object = store.to_object().await.unwrap();
    let entries = store.entries().await.unwrap();

    assert_eq!(object.len(), entries.len());
    for record in entries {
        assert_eq!(object.get(&record.key), Some(&record.value));
    }
}

// =============================================================================
// Load Tests
// =============================================================================

#[tokio::test]
async fn test_load_defaults_to_identity() {
    let store = seeded(DocStore::open(memory_config()).unwrap()).await;

    let loaded = store.load().await.unwrap();

    assert_eq!(loaded, store.to_object().await.unwrap());
}

#[tokio::test]
async fn test_load_applies_injected_transform() {
    let store = seeded(
        DocStore::open(memory_config())
            .unwrap()
            .with_transform(DoubleNumbers),
    )
    .await;

    let loaded = store.load().await.unwrap();

    assert_eq!(Value::Object(loaded), json!({ "b": 4 }));
    // The stored data is untouched
    assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
}

#[tokio::test]
async fn test_load_with_closure_transform() {
    let store = seeded(DocStore::open(memory_config()).unwrap()).await;
    let add_count = transform_fn(|mut snapshot: Snapshot| {
        let count = snapshot.len();
        snapshot.insert("count".to_string(), json!(count));
        Ok(snapshot)
    });

    let loaded = store.load_with(&add_count).await.unwrap();

    assert_eq!(
        Value::Object(loaded),
        json!({ "a": { "x": 1 }, "b": 2, "count": 2 })
    );
}

#[tokio::test]
async fn test_load_with_overrides_store_transform() {
    let store = seeded(
        DocStore::open(memory_config())
            .unwrap()
            .with_transform(DoubleNumbers),
    )
    .await;

    let loaded = store.load_with(&Identity).await.unwrap();

    assert_eq!(loaded.len(), 2);
}

#[tokio::test]
async fn test_failing_transform_propagates() {
    let store = seeded(
        DocStore::open(
            StoreConfig::builder()
                .uri("memory://localhost/test")
                .ignore_errors(true)
                .build(),
        )
        .unwrap()
        .with_transform(transform_fn(|_| {
            Err(DocKvError::Transform("rejected".to_string()))
        })),
    )
    .await;

    let result = store.load().await;

    assert!(matches!(result, Err(DocKvError::Transform(_))));
}
