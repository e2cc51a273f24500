//! Tests for DocStore
//!
//! These tests verify:
//! - Round trip of structured values
//! - Upsert semantics and record counts
//! - Removal and membership checks
//! - Key normalization
//! - Schema validation of keys and values
//! - Concurrent access from many tasks

use std::collections::HashSet;
use std::sync::Arc;

use dockv::backend::MemoryConnector;
use dockv::connection::ConnectionState;
use dockv::{DocKvError, DocStore, KeyValueRecord, StoreConfig};
use serde::{Deserialize, Serialize};
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

async fn setup_store() -> DocStore {
    let store = DocStore::open(memory_config()).unwrap();
    store.start().await.unwrap();
    store
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[tokio::test]
async fn test_start_connects() {
    let store = DocStore::open(memory_config()).unwrap();
    assert_eq!(store.connection_state(), ConnectionState::Disconnected);

    store.start().await.unwrap();
    assert_eq!(store.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_start_twice_is_noop() {
    let store = setup_store().await;
    store.put("a", 1).await.unwrap();

    store.start().await.unwrap();

    assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_put_get() {
    let store = setup_store().await;

    store.put("hello", "world").await.unwrap();

    assert_eq!(store.get("hello").await.unwrap(), Some(json!("world")));
}

#[tokio::test]
async fn test_get_nonexistent_key() {
    let store = setup_store().await;

    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_round_trip_structured_value() {
    let store = setup_store().await;
    let value = json!({
        "name": "alice",
        "tags": ["a", "b"],
        "nested": { "depth": 2, "flag": false, "nothing": null },
        "ratio": 0.5
    });

    store.put("doc", &value).await.unwrap();

    assert_eq!(store.get("doc").await.unwrap(), Some(value));
}

#[tokio::test]
async fn test_get_as_typed() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        font_size: u32,
    }

    let store = setup_store().await;
    let settings = Settings {
        theme: "dark".to_string(),
        font_size: 14,
    };

    store.put("settings", &settings).await.unwrap();

    let loaded: Option<Settings> = store.get_as("settings").await.unwrap();
    assert_eq!(loaded, Some(settings));
}

#[tokio::test]
async fn test_get_as_type_mismatch_is_operation_error() {
    let store = setup_store().await;
    store.put("n", "not a number").await.unwrap();

    let result = store.get_as::<u32>("n").await;

    assert!(matches!(result, Err(DocKvError::Operation { op: "get", .. })));
}

// =============================================================================
// Upsert Tests
// =============================================================================

#[tokio::test]
async fn test_put_overwrite() {
    let store = setup_store().await;

    store.put("key", "value1").await.unwrap();
    store.put("key", "value2").await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), Some(json!("value2")));
    assert_eq!(store.size().await.unwrap(), 1);
}

#[tokio::test]
async fn test_repeated_put_is_idempotent() {
    let store = setup_store().await;

    for _ in 0..10 {
        store.put("same", json!({ "x": 1 })).await.unwrap();
    }

    assert_eq!(store.size().await.unwrap(), 1);
    assert_eq!(store.keys().await.unwrap(), vec!["same".to_string()]);
}

#[tokio::test]
async fn test_size_grows_by_one_per_new_key() {
    let store = setup_store().await;

    for i in 0..5 {
        store.put(format!("key{}", i), i).await.unwrap();
        store.put(format!("key{}", i), i * 10).await.unwrap();
        assert_eq!(store.size().await.unwrap(), i as u64 + 1);
    }
}

// =============================================================================
// Removal Tests
// =============================================================================

#[tokio::test]
async fn test_remove() {
    let store = setup_store().await;
    store.put("key", "value").await.unwrap();
    assert!(store.contains_key("key").await.unwrap());

    store.remove("key").await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), None);
    assert!(!store.contains_key("key").await.unwrap());
    assert_eq!(store.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_remove_nonexistent_key() {
    let store = setup_store().await;
    store.put("other", 1).await.unwrap();

    store.remove("missing").await.unwrap();

    assert_eq!(store.size().await.unwrap(), 1);
}

#[tokio::test]
async fn test_put_after_remove() {
    let store = setup_store().await;

    store.put("key", 1).await.unwrap();
    store.remove("key").await.unwrap();
    store.put("key", 2).await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), Some(json!(2)));
    assert_eq!(store.size().await.unwrap(), 1);
}

// =============================================================================
// Key Normalization Tests
// =============================================================================

#[tokio::test]
async fn test_numeric_keys_are_normalized() {
    let store = setup_store().await;

    store.put(42, "answer").await.unwrap();

    assert_eq!(store.get("42").await.unwrap(), Some(json!("answer")));
    assert!(store.contains_key(42u8).await.unwrap());
    assert_eq!(store.keys().await.unwrap(), vec!["42".to_string()]);
}

#[tokio::test]
async fn test_bool_and_char_keys_are_normalized() {
    let store = setup_store().await;

    store.put(true, 1).await.unwrap();
    store.put('c', 2).await.unwrap();

    assert_eq!(store.get("true").await.unwrap(), Some(json!(1)));
    assert_eq!(store.get("c").await.unwrap(), Some(json!(2)));
}

// =============================================================================
// Schema Validation Tests
// =============================================================================

#[tokio::test]
async fn test_null_value_is_rejected() {
    let store = setup_store().await;

    let result = store.put("key", Value::Null).await;

    assert!(matches!(result, Err(DocKvError::Operation { op: "put", .. })));
    assert!(!store.contains_key("key").await.unwrap());
}

#[tokio::test]
async fn test_empty_key_is_rejected() {
    let store = setup_store().await;

    let result = store.put("", 1).await;

    assert!(matches!(result, Err(DocKvError::Operation { op: "put", .. })));
    assert_eq!(store.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_falsy_values_are_stored() {
    let store = setup_store().await;

    store.put("zero", 0).await.unwrap();
    store.put("false", false).await.unwrap();
    store.put("empty", "").await.unwrap();
    store.put("list", json!([])).await.unwrap();

    assert_eq!(store.size().await.unwrap(), 4);
    assert_eq!(store.get("zero").await.unwrap(), Some(json!(0)));
    assert_eq!(store.get("false").await.unwrap(), Some(json!(false)));
}

// =============================================================================
// Bulk Accessor Tests
// =============================================================================

#[tokio::test]
async fn test_worked_example() {
    let store = setup_store().await;

    store.put("a", json!({ "x": 1 })).await.unwrap();
    store.put("b", 2).await.unwrap();

    assert_eq!(store.size().await.unwrap(), 2);

    let mut entries = store.entries().await.unwrap();
    entries.sort_by(|l, r| l.key.cmp(&r.key));
    assert_eq!(
        entries,
        vec![
            KeyValueRecord::new("a", json!({ "x": 1 })),
            KeyValueRecord::new("b", json!(2)),
        ]
    );

    let object = store.to_object().await.unwrap();
    assert_eq!(Value::Object(object), json!({ "a": { "x": 1 }, "b": 2 }));
}

#[tokio::test]
async fn test_keys_and_values() {
    let store = setup_store().await;
    store.put("k1", "v1").await.unwrap();
    store.put("k2", "v2").await.unwrap();
    store.put("k3", "v3").await.unwrap();

    let keys: HashSet<String> = store.keys().await.unwrap().into_iter().collect();
    let mut values: Vec<String> = store
        .values()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    values.sort();

    assert_eq!(
        keys,
        ["k1", "k2", "k3"]
            .iter()
            .map(|s| s.to_string())
            .collect::<HashSet<String>>()
    );
    assert_eq!(values, vec!["v1", "v2", "v3"]);
}

#[tokio::test]
async fn test_empty_store_bulk_accessors() {
    let store = setup_store().await;

    assert!(store.keys().await.unwrap().is_empty());
    assert!(store.values().await.unwrap().is_empty());
    assert!(store.entries().await.unwrap().is_empty());
    assert!(store.to_object().await.unwrap().is_empty());
}

// =============================================================================
// Shared Collection Tests
// =============================================================================

#[tokio::test]
async fn test_stores_on_one_cluster_share_a_collection() {
    let connector = Arc::new(MemoryConnector::new());
    let first = DocStore::with_connector(memory_config(), connector.clone()).unwrap();
    let second = DocStore::with_connector(memory_config(), connector.clone()).unwrap();
    first.start().await.unwrap();
    second.start().await.unwrap();

    first.put("shared", 1).await.unwrap();

    assert_eq!(second.get("shared").await.unwrap(), Some(json!(1)));
    assert_eq!(connector.cluster().collection_count(), 1);
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let connector = Arc::new(MemoryConnector::new());
    let users = DocStore::with_connector(
        StoreConfig::builder()
            .uri("memory://localhost/test")
            .collection("users")
            .build(),
        connector.clone(),
    )
    .unwrap();
    let sessions = DocStore::with_connector(
        StoreConfig::builder()
            .uri("memory://localhost/test")
            .collection("sessions")
            .build(),
        connector.clone(),
    )
    .unwrap();
    users.start().await.unwrap();
    sessions.start().await.unwrap();

    users.put("id", "alice").await.unwrap();

    assert_eq!(sessions.get("id").await.unwrap(), None);
    assert_eq!(sessions.size().await.unwrap(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_distinct_keys() {
    let store = Arc::new(setup_store().await);
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                store.put(format!("t{}-k{}", t, i), i).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.size().await.unwrap(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_same_key_keep_one_record() {
    let store = Arc::new(setup_store().await);
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                store.put("contended", t).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.size().await.unwrap(), 1);
    let winner = store.get("contended").await.unwrap().unwrap();
    assert!((0..8).contains(&winner.as_i64().unwrap()));
}
