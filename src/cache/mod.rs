//! Cache Module
//!
//! Defines the backend contract shared by every storage strategy and the
//! concrete backends: null, file and relational.
//!
//! All backend methods are total. Storage faults are logged and mapped to
//! the neutral outcome (`get` -> default, writes -> `true`, `keys` -> empty),
//! because a failing cache must never fail its caller.

mod cleanup;
mod datasource;
mod db;
mod entry;
mod file;
mod null;

#[cfg(test)]
mod property_tests;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

// Re-export public types
pub use cleanup::CleanupLock;
pub use datasource::Datasource;
pub use db::DbCache;
pub use entry::{current_timestamp, EntryHeader};
pub use file::{FileCache, FileCacheInfo};
pub use null::NullCache;

// == Public Constants ==
/// Length in hex characters of a key digest
pub const DIGEST_LEN: usize = 32;

/// Horizon in seconds applied by the file backend when no TTL is given
pub const DEFAULT_FILE_TTL: i64 = 86_400;

// == Digest ==
/// Returns the fixed-length physical identifier for a logical key.
pub fn digest(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(DIGEST_LEN);
    hex
}

// == Cache Info ==
/// Backend-specific description returned by [`CacheBackend::info`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "backend", content = "details", rename_all = "lowercase")]
pub enum CacheInfo {
    Off,
    File(FileCacheInfo),
    Db(String),
}

// == Backend Trait ==
/// Contract implemented by every cache backend.
pub trait CacheBackend: Send + Sync {
    /// Short backend name used in log lines.
    fn name(&self) -> &'static str;

    /// Returns the stored value, or `None` on miss, expiry or any failure.
    fn fetch(&self, key: &str) -> Option<Value>;

    /// Returns the stored value or `default`.
    fn get(&self, key: &str, default: Value) -> Value {
        self.fetch(key).unwrap_or(default)
    }

    /// Stores `value` under `key`. `ttl <= 0` requests the backend default.
    fn set(&self, key: &str, value: &Value, ttl: i64) -> bool;

    /// Removes `key`; succeeds whether or not it existed.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry, or only the expired ones.
    fn clear(&self, expired_only: bool) -> bool;

    /// Lists the original keys of all live entries.
    fn keys(&self) -> Vec<String>;

    /// Describes the backend state. `include_keys` asks backends that can
    /// enumerate their entries to list the keys as well.
    fn info(&self, include_keys: bool) -> CacheInfo;
}
