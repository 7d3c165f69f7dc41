//! Null backend: caching switched off.

use serde_json::Value;

use crate::cache::{CacheBackend, CacheInfo};

/// Backend that stores nothing. Reads always miss, writes always succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for NullCache {
    fn name(&self) -> &'static str {
        "off"
    }

    fn fetch(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: &Value, _ttl: i64) -> bool {
        true
    }

    fn delete(&self, _key: &str) -> bool {
        true
    }

    fn clear(&self, _expired_only: bool) -> bool {
        true
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn info(&self, _include_keys: bool) -> CacheInfo {
        CacheInfo::Off
    }
}
