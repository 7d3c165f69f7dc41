//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the contract every backend shares.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;

use crate::cache::{CacheBackend, Datasource, DbCache, FileCache};

// == Test Configuration ==
const TEST_CASES: u32 = 32;

// == Strategies ==
/// Generates keys, including characters that are illegal in file names
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:/ .\\\\-]{0,48}"
}

/// Generates JSON values of a few shapes
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(|b| json!(b)),
        "[ -~]{0,64}".prop_map(|s| json!(s)),
        prop::collection::vec(any::<u16>(), 0..8).prop_map(|v| json!(v)),
        ("[a-z]{1,8}", any::<i32>()).prop_map(|(k, v)| json!({ k: v })),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string);
    prop_oneof![
        3 => (key.clone(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        1 => key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Backends ==
fn file_backend() -> (TempDir, FileCache) {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::in_base_dir(dir.path(), "prop");
    (dir, cache)
}

fn db_backend() -> DbCache {
    DbCache::new("prop", Datasource::open("default", ":memory:").unwrap())
}

fn check_model(cache: &dyn CacheBackend, ops: &[CacheOp]) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, Value> = HashMap::new();
    for op in ops {
        match op {
            CacheOp::Set { key, value } => {
                prop_assert!(cache.set(key, value, 60));
                model.insert(key.clone(), value.clone());
            }
            CacheOp::Delete { key } => {
                prop_assert!(cache.delete(key));
                model.remove(key);
            }
        }
    }
    for key in ["a", "b", "c", "d"] {
        let expected = model.get(key).cloned().unwrap_or(Value::Null);
        prop_assert_eq!(cache.get(key, Value::Null), expected, "key {}", key);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(TEST_CASES))]

    // Storing a value and reading it back before expiry returns the same value.
    #[test]
    fn prop_file_roundtrip(key in key_strategy(), value in value_strategy(), ttl in 0i64..3600) {
        let (_dir, cache) = file_backend();
        prop_assert!(cache.set(&key, &value, ttl));
        prop_assert_eq!(cache.get(&key, json!("__default__")), value);
    }

    #[test]
    fn prop_db_roundtrip(key in key_strategy(), value in value_strategy(), ttl in 0i64..3600) {
        let cache = db_backend();
        prop_assert!(cache.set(&key, &value, ttl));
        prop_assert_eq!(cache.get(&key, json!("__default__")), value);
    }

    // A key that was never written yields the caller's default.
    #[test]
    fn prop_unwritten_key_returns_default(written in key_strategy(), probe in key_strategy()) {
        prop_assume!(written != probe);
        let (_dir, file) = file_backend();
        let db = db_backend();

        for cache in [&file as &dyn CacheBackend, &db] {
            cache.set(&written, &json!(1), 60);
            prop_assert_eq!(cache.get(&probe, json!("dflt")), json!("dflt"));
        }
    }

    // Deleting twice succeeds both times and leaves nothing behind.
    #[test]
    fn prop_delete_is_idempotent(key in key_strategy(), value in value_strategy()) {
        let (_dir, file) = file_backend();
        let db = db_backend();

        for cache in [&file as &dyn CacheBackend, &db] {
            cache.set(&key, &value, 60);
            prop_assert!(cache.delete(&key));
            prop_assert!(cache.delete(&key));
            prop_assert_eq!(cache.get(&key, Value::Null), Value::Null);
        }
    }

    // Any interleaving of writes and deletes behaves like a last-writer-wins map.
    #[test]
    fn prop_behaves_like_a_map(ops in prop::collection::vec(cache_op_strategy(), 1..24)) {
        let (_dir, file) = file_backend();
        check_model(&file, &ops)?;
        check_model(&db_backend(), &ops)?;
    }

    // Keys lists every live key by its original spelling.
    #[test]
    fn prop_keys_lists_written_keys(keys in prop::collection::hash_set(key_strategy(), 1..8)) {
        let (_dir, file) = file_backend();
        let db = db_backend();

        for cache in [&file as &dyn CacheBackend, &db] {
            for key in &keys {
                cache.set(key, &json!(key), 60);
            }
            let listed = cache.keys();
            for key in &keys {
                prop_assert!(listed.contains(key), "missing key {:?}", key);
            }
        }
    }
}
