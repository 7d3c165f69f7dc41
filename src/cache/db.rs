//! Relational Cache Module
//!
//! Single-table cache keyed by the digest of the logical key. Writes are
//! upserts; expiry is computed by the database's own clock. The table is
//! created the first time a write finds it missing.

use rusqlite::params;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::datasource::Datasource;
use crate::cache::{digest, CacheBackend, CacheInfo};
use crate::config::Config;
use crate::error::Result;

/// Name of the cache table
pub const TABLE: &str = "globalcache";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS globalcache (
    ckey CHAR(32) NOT NULL,
    full_key TEXT NOT NULL,
    cvalue TEXT NOT NULL,
    valid_until DATETIME NULL,
    PRIMARY KEY (ckey)
);
"#;

// == Db Cache ==
/// Cache backend storing entries as rows of one table.
#[derive(Debug)]
pub struct DbCache {
    /// Identifier derived from the key prefix
    id: String,
    ds: Datasource,
}

impl DbCache {
    // == Constructor ==
    /// Creates a db cache for `key_prefix` on an already opened datasource.
    pub fn new(key_prefix: &str, ds: Datasource) -> Self {
        let mut id = digest(key_prefix);
        id.truncate(16);
        info!("Db cache {} ready on datasource '{}'", id, ds.name());
        Self { id, ds }
    }

    /// Creates a db cache on the datasource named by `config`.
    pub fn from_config(key_prefix: &str, config: &Config) -> Result<Self> {
        Ok(Self::new(key_prefix, Datasource::from_config(config)?))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn datasource(&self) -> &Datasource {
        &self.ds
    }

    /// Creates the cache table if it does not exist.
    pub fn ensure_schema(&self) -> Result<()> {
        self.ds.execute_batch(SCHEMA)
    }

    fn live_condition(&self) -> String {
        format!("(valid_until IS NULL OR valid_until >= {})", self.ds.now(0))
    }

    // == Get ==
    fn try_fetch(&self, key: &str) -> Result<Option<Value>> {
        let sql = format!(
            "SELECT cvalue FROM {TABLE} WHERE ckey = ?1 AND {}",
            self.live_condition()
        );
        let raw: Option<String> = self.ds.scalar(&sql, params![digest(key)])?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    // == Set ==
    fn upsert(&self, key: &str, payload: &str, ttl: i64) -> Result<usize> {
        let hash = digest(key);
        if ttl > 0 {
            let sql = format!(
                "REPLACE INTO {TABLE} (ckey, full_key, cvalue, valid_until) VALUES (?1, ?2, ?3, {})",
                self.ds.now(ttl)
            );
            self.ds.execute(&sql, params![hash, key, payload])
        } else {
            self.ds.execute(
                &format!("REPLACE INTO {TABLE} (ckey, full_key, cvalue) VALUES (?1, ?2, ?3)"),
                params![hash, key, payload],
            )
        }
    }

    fn try_set(&self, key: &str, value: &Value, ttl: i64) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        if let Err(e) = self.upsert(key, &payload, ttl) {
            debug!("Db cache upsert failed ({}), creating table and retrying", e);
            self.ensure_schema()?;
            self.upsert(key, &payload, ttl)?;
        }
        Ok(())
    }

    // == Info ==
    /// Human-readable summary. Stops at the first failing step.
    pub fn describe(&self) -> String {
        let mut ret = String::from("Global cache is handled by DB module.\n");
        ret.push_str(&format!("Datasource: {}\n", self.ds.name()));
        ret.push_str(&format!("DSN: {}\n", self.ds.dsn()));
        match self
            .ds
            .scalar::<i64, _>(&format!("SELECT count(*) FROM {TABLE}"), [])
        {
            Ok(count) => ret.push_str(&format!("Records: {}\n", count.unwrap_or(0))),
            Err(e) => debug!("Db cache info incomplete: {}", e),
        }
        ret
    }
}

impl CacheBackend for DbCache {
    fn name(&self) -> &'static str {
        "db"
    }

    fn fetch(&self, key: &str) -> Option<Value> {
        match self.try_fetch(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("Db cache miss for '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &Value, ttl: i64) -> bool {
        if let Err(e) = self.try_set(key, value, ttl) {
            warn!("Db cache write for '{}' failed: {}", key, e);
        }
        true
    }

    fn delete(&self, key: &str) -> bool {
        let sql = format!("DELETE FROM {TABLE} WHERE ckey = ?1");
        if let Err(e) = self.ds.execute(&sql, params![digest(key)]) {
            debug!("Db cache delete for '{}' failed: {}", key, e);
        }
        true
    }

    fn clear(&self, expired_only: bool) -> bool {
        let sql = if expired_only {
            format!("DELETE FROM {TABLE} WHERE valid_until < {}", self.ds.now(0))
        } else {
            format!("DELETE FROM {TABLE}")
        };
        match self.ds.execute(&sql, []) {
            Ok(removed) => info!("Db cache clear: removed {} rows", removed),
            Err(e) => debug!("Db cache clear failed: {}", e),
        }
        true
    }

    fn keys(&self) -> Vec<String> {
        let sql = format!(
            "SELECT DISTINCT full_key FROM {TABLE} WHERE {}",
            self.live_condition()
        );
        self.ds.enumerate(&sql, []).unwrap_or_else(|e| {
            debug!("Db cache keys failed: {}", e);
            Vec::new()
        })
    }

    fn info(&self, _include_keys: bool) -> CacheInfo {
        CacheInfo::Db(self.describe())
    }
}
