//! File Cache Module
//!
//! Filesystem-resident cache shared by every process that uses the same root.
//!
//! Layout: `<root>/<digest[0..2]>/<digest>`, one record per file. Writes go
//! to a temp file in the shard directory and are renamed into place, so a
//! concurrent reader sees either the old or the new record, never a partial
//! one. Expiry is lazy on `get` plus a time-boxed sweep that is scheduled
//! across processes through a persisted marker entry and an advisory lock.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::cleanup::{
    next_cleanup_from_now, CleanupLock, AUTO_CLEANUP_BUDGET, DEFAULT_CLEAR_BUDGET,
    NEXT_CLEANUP_KEY,
};
use crate::cache::entry::{encode_record, read_header, read_record, EntryHeader};
use crate::cache::{current_timestamp, digest, CacheBackend, CacheInfo, DEFAULT_FILE_TTL};
use crate::error::{CacheError, Result};

/// Directory under the base dir holding one root per key prefix
pub const ROOT_DIR_NAME: &str = "globalcache";

/// Most values memoized per instance before the memo is reset
pub const MEMO_CAPACITY: usize = 4096;

// == Memo Entry ==
/// Deserialized value remembered for an unchanged file.
#[derive(Debug, Clone)]
struct MemoEntry {
    modified: SystemTime,
    exp: Option<i64>,
    value: Value,
}

// == File Cache Info ==
/// Snapshot returned by [`FileCache::info_with`].
#[derive(Debug, Clone, Serialize)]
pub struct FileCacheInfo {
    /// Number of memoized values in this process
    pub map_size: usize,
    /// Number of entries on disk
    pub entries: usize,
    /// Original keys, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    /// Next scheduled sweep (RFC 3339, local time)
    pub next_cleanup: String,
    /// File holding the sweep marker
    pub next_cleanup_file: PathBuf,
}

// == File Cache ==
/// Cache backend storing one file per entry under a prefix-scoped root.
#[derive(Debug)]
pub struct FileCache {
    /// Root directory of this key prefix
    root: PathBuf,
    /// Per-process memoization keyed by original key
    memo: Mutex<HashMap<String, MemoEntry>>,
    /// Bound on `memo`; a full memo is dropped wholesale
    memo_capacity: usize,
}

impl FileCache {
    // == Constructor ==
    /// Creates a file cache for `key_prefix` under the system temp directory.
    pub fn new(key_prefix: &str) -> Self {
        Self::in_base_dir(&std::env::temp_dir(), key_prefix)
    }

    /// Creates a file cache for `key_prefix` under `base`.
    ///
    /// The root is `<base>/globalcache/<key_prefix>`.
    pub fn in_base_dir(base: &Path, key_prefix: &str) -> Self {
        Self::with_root(base.join(ROOT_DIR_NAME).join(key_prefix))
    }

    /// Creates a file cache rooted exactly at `root`.
    ///
    /// Creates the root if needed and runs the scheduled expiry sweep when it
    /// is due and no other process is already running it.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let cache = Self {
            root: root.into(),
            memo: Mutex::new(HashMap::new()),
            memo_capacity: MEMO_CAPACITY,
        };
        if let Err(e) = ensure_shared_dir(&cache.root) {
            warn!("Cannot create cache root {}: {}", cache.root.display(), e);
        }
        cache.run_scheduled_cleanup();
        info!("File cache ready at {}", cache.root.display());
        cache
    }

    /// Root directory of this cache
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path of the record for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let hash = digest(key);
        self.root.join(&hash[..2]).join(hash)
    }

    // == Scheduled Cleanup ==
    fn run_scheduled_cleanup(&self) {
        let due = self
            .fetch(NEXT_CLEANUP_KEY)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        if due >= current_timestamp() {
            return;
        }

        let lock = match CleanupLock::try_acquire(&self.root) {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                debug!("Cleanup already running elsewhere for {}", self.root.display());
                return;
            }
            Err(e) => {
                debug!("Cannot take cleanup lock for {}: {}", self.root.display(), e);
                return;
            }
        };

        // Push the marker first so concurrent constructors skip the check.
        self.set(NEXT_CLEANUP_KEY, &json!(next_cleanup_from_now()), 0);
        debug!("Starting auto-cleanup of {}", self.root.display());
        self.clear_with_budget(true, AUTO_CLEANUP_BUDGET);
        drop(lock);
    }

    // == Set ==
    fn try_set(&self, key: &str, value: &Value, ttl: i64) -> Result<()> {
        let ttl = if ttl > 0 { ttl } else { DEFAULT_FILE_TTL };
        let header = EntryHeader::new(key, ttl);
        let record = encode_record(&header, value)?;

        let dest = self.path_for(key);
        let shard = dest
            .parent()
            .ok_or_else(|| CacheError::Corrupt(format!("no shard for {}", dest.display())))?;
        ensure_shared_dir(shard)?;

        let file_name = dest.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
        let mut tmp = tempfile::Builder::new()
            .prefix(file_name)
            .suffix(".tmp")
            .tempfile_in(shard)?;
        tmp.write_all(&record)?;
        tmp.flush()?;
        share_file(tmp.path());
        tmp.persist(&dest).map_err(|e| e.error)?;

        self.memo.lock().remove(key);
        Ok(())
    }

    // == Get ==
    fn try_fetch(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let modified = match fs::metadata(&path) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.memo.lock().remove(key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let now = current_timestamp();

        if let Some(hit) = self.memo.lock().get(key) {
            if hit.modified == modified && !is_past(hit.exp, now) {
                return Ok(Some(hit.value.clone()));
            }
        }

        let (header, value) = match File::open(&path) {
            Ok(file) => read_record(&mut BufReader::new(file))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if header.key != key {
            return Err(CacheError::Corrupt(format!(
                "record at {} belongs to another key",
                path.display()
            )));
        }

        if header.is_expired_at(now) {
            self.delete(key);
            return Err(CacheError::Expired(key.to_string()));
        }

        let mut memo = self.memo.lock();
        if memo.len() >= self.memo_capacity && !memo.contains_key(key) {
            debug!("Memo full ({} values), resetting", memo.len());
            memo.clear();
        }
        memo.insert(
            key.to_string(),
            MemoEntry {
                modified,
                exp: header.exp,
                value: value.clone(),
            },
        );
        Ok(Some(value))
    }

    // == Clear ==
    /// Sweeps the cache, giving up after `budget`.
    ///
    /// With `expired_only` only the record headers are read. The budget is
    /// checked after every visited file, removed or not. When it runs out the
    /// sweep marker is set to now so the next constructor picks up the
    /// remaining work. Returns the number of files removed.
    pub fn clear_with_budget(&self, expired_only: bool, budget: Duration) -> usize {
        let started = Instant::now();
        let now = current_timestamp();
        let mut removed = 0;

        for path in self.entry_files() {
            if !expired_only || is_sweepable(&path, now) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => debug!("Cannot remove {}: {}", path.display(), e),
                }
            }

            // Kept entries count against the budget too.
            if started.elapsed() > budget {
                info!(
                    "Cache clear unfinished after {:?} ({} files removed), rescheduling",
                    budget, removed
                );
                self.set(NEXT_CLEANUP_KEY, &json!(current_timestamp()), 0);
                break;
            }
        }

        self.memo.lock().clear();
        if removed > 0 {
            info!("Cache clear: removed {} entries", removed);
        } else {
            debug!("Cache clear: nothing to remove");
        }
        removed
    }

    // == Info ==
    /// Describes this cache, optionally enumerating all keys.
    pub fn info_with(&self, include_keys: bool) -> FileCacheInfo {
        let (entries, keys) = if include_keys {
            let keys = self.keys();
            (keys.len(), Some(keys))
        } else {
            (self.entry_files().count(), None)
        };

        let next = self
            .fetch(NEXT_CLEANUP_KEY)
            .and_then(|v| v.as_i64())
            .unwrap_or_else(current_timestamp);
        let next_cleanup = Local
            .timestamp_opt(next, 0)
            .single()
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        FileCacheInfo {
            map_size: self.memo.lock().len(),
            entries,
            keys,
            next_cleanup,
            next_cleanup_file: self.path_for(NEXT_CLEANUP_KEY),
        }
    }

    /// Number of values currently memoized in this process
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    // == Walk ==
    /// All files at shard depth. The lock file lives directly in the root and
    /// is never yielded.
    fn entry_files(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
    }
}

impl CacheBackend for FileCache {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch(&self, key: &str) -> Option<Value> {
        match self.try_fetch(key) {
            Ok(value) => value,
            Err(CacheError::Expired(_)) => None,
            Err(e) => {
                debug!("File cache miss for '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &Value, ttl: i64) -> bool {
        if let Err(e) = self.try_set(key, value, ttl) {
            warn!("File cache write for '{}' failed: {}", key, e);
        }
        true
    }

    fn delete(&self, key: &str) -> bool {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!("Cannot remove {}: {}", path.display(), e),
        }
        self.memo.lock().remove(key);
        true
    }

    fn clear(&self, expired_only: bool) -> bool {
        self.clear_with_budget(expired_only, DEFAULT_CLEAR_BUDGET);
        true
    }

    fn keys(&self) -> Vec<String> {
        self.entry_files()
            .filter_map(|path| {
                let file = File::open(&path).ok()?;
                read_header(&mut BufReader::new(file)).ok()
            })
            .map(|header| header.key)
            .collect()
    }

    fn info(&self, include_keys: bool) -> CacheInfo {
        CacheInfo::File(self.info_with(include_keys))
    }
}

// == Helpers ==
fn is_past(exp: Option<i64>, now: i64) -> bool {
    exp.map_or(false, |exp| exp < now)
}

/// Decides whether an expired-only sweep may remove `path`.
///
/// Expired records go. Unreadable files only go once they are older than the
/// default horizon, which catches temp files orphaned by crashed writers
/// without racing writers that are still busy.
fn is_sweepable(path: &Path, now: i64) -> bool {
    let header = File::open(path)
        .map_err(CacheError::from)
        .and_then(|file| read_header(&mut BufReader::new(file)));
    match header {
        Ok(header) => header.is_expired_at(now),
        Err(_) => fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map_or(false, |age| age.as_secs() > DEFAULT_FILE_TTL as u64),
    }
}

/// Creates `dir` (and parents) and opens it up to every local user.
fn ensure_shared_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    if let Some(parent) = dir.parent() {
        ensure_shared_dir(parent)?;
    }
    match fs::create_dir(dir) {
        Ok(()) => set_mode(dir, 0o777),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Opens a cache file up to every local user. Failures are ignored: the file
/// may belong to another user who already did this.
pub(crate) fn share_file(path: &Path) {
    set_mode(path, 0o666);
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use tempfile::TempDir;

    fn test_cache() -> (TempDir, FileCache) {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::in_base_dir(dir.path(), "test");
        (dir, cache)
    }

    #[test]
    fn test_root_is_scoped_by_prefix() {
        let dir = TempDir::new().unwrap();
        let a = FileCache::in_base_dir(dir.path(), "app-a");
        let b = FileCache::in_base_dir(dir.path(), "app-b");

        assert!(a.root().ends_with("globalcache/app-a"));
        assert!(a.root().is_dir());

        a.set("shared", &json!("from a"), 60);
        assert_eq!(b.get("shared", json!(null)), json!(null));
    }

    #[test]
    fn test_path_is_sharded_by_digest() {
        let (_dir, cache) = test_cache();
        let path = cache.path_for("some key");
        let hash = digest("some key");

        assert_eq!(path.file_name().unwrap().to_str().unwrap(), hash);
        assert_eq!(
            path.parent().unwrap().file_name().unwrap().to_str().unwrap(),
            &hash[..2]
        );
    }

    #[test]
    fn test_shard_dirs_created_on_write_only() {
        let (_dir, cache) = test_cache();
        let path = cache.path_for("lazy");
        let shards = || fs::read_dir(cache.root()).unwrap().count();
        let before = shards();

        assert_eq!(cache.get("lazy", json!(0)), json!(0));
        assert_eq!(shards(), before, "Reads must not create directories");

        cache.set("lazy", &json!(1), 10);
        assert!(path.exists());
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, cache) = test_cache();

        assert!(cache.set("key1", &json!({"name": "value1"}), 60));
        assert_eq!(cache.get("key1", json!(null)), json!({"name": "value1"}));
    }

    #[test]
    fn test_get_missing_returns_default() {
        let (_dir, cache) = test_cache();
        assert_eq!(cache.get("nope", json!("dflt")), json!("dflt"));
    }

    #[test]
    fn test_no_ttl_uses_default_horizon() {
        let (_dir, cache) = test_cache();
        let before = current_timestamp();

        cache.set("k", &json!(1), 0);

        let file = File::open(cache.path_for("k")).unwrap();
        let header = read_header(&mut BufReader::new(file)).unwrap();
        let exp = header.exp.expect("file entries always carry an expiry");
        assert!(exp >= before + DEFAULT_FILE_TTL && exp <= before + DEFAULT_FILE_TTL + 1);
    }

    #[test]
    fn test_expired_entry_is_removed_on_get() {
        let (_dir, cache) = test_cache();
        cache.set("short", &json!("v"), 1);
        assert_eq!(cache.get("short", json!(null)), json!("v"));

        sleep(Duration::from_millis(2100));

        assert_eq!(cache.get("short", json!("gone")), json!("gone"));
        assert!(!cache.path_for("short").exists());
        assert_eq!(cache.memo_len(), 0);
    }

    #[test]
    fn test_memo_serves_unchanged_file() {
        let (_dir, cache) = test_cache();
        cache.set("m", &json!([1, 2, 3]), 60);

        assert_eq!(cache.get("m", json!(null)), json!([1, 2, 3]));
        assert_eq!(cache.memo_len(), 1);
        assert_eq!(cache.get("m", json!(null)), json!([1, 2, 3]));
        assert_eq!(cache.memo_len(), 1);
    }

    #[test]
    fn test_memo_stays_within_capacity() {
        let (_dir, mut cache) = test_cache();
        cache.memo_capacity = 3;
        for i in 0..10 {
            cache.set(&format!("k{i}"), &json!(i), 60);
            assert_eq!(cache.get(&format!("k{i}"), json!(null)), json!(i));
            assert!(cache.memo_len() <= 3);
        }

        // Values dropped from the memo are still served from disk.
        assert_eq!(cache.get("k0", json!(null)), json!(0));
    }

    #[test]
    fn test_memo_sees_writes_from_other_instances() {
        let dir = TempDir::new().unwrap();
        let reader = FileCache::in_base_dir(dir.path(), "shared");
        let writer = FileCache::in_base_dir(dir.path(), "shared");

        writer.set("k", &json!("v1"), 60);
        assert_eq!(reader.get("k", json!(null)), json!("v1"));

        sleep(Duration::from_millis(20));
        writer.set("k", &json!("v2"), 60);
        assert_eq!(reader.get("k", json!(null)), json!("v2"));
    }

    #[test]
    fn test_foreign_record_is_not_returned() {
        let (_dir, cache) = test_cache();
        cache.set("k1", &json!("secret"), 60);

        // Simulate a digest collision: k2's path holds k1's record.
        let k2_path = cache.path_for("k2");
        fs::create_dir_all(k2_path.parent().unwrap()).unwrap();
        fs::copy(cache.path_for("k1"), &k2_path).unwrap();

        assert_eq!(cache.get("k2", json!("default")), json!("default"));
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let (_dir, cache) = test_cache();
        let path = cache.path_for("bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a record").unwrap();

        assert_eq!(cache.get("bad", json!(7)), json!(7));
        assert!(!cache.keys().contains(&"bad".to_string()));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, cache) = test_cache();
        cache.set("d", &json!(1), 60);
        cache.get("d", json!(null));

        assert!(cache.delete("d"));
        assert!(cache.delete("d"));
        assert!(!cache.path_for("d").exists());
        assert_eq!(cache.memo_len(), 0);
    }

    #[test]
    fn test_overwrite_leaves_single_consistent_value() {
        let (_dir, cache) = test_cache();
        cache.set("race", &json!("first"), 60);
        cache.set("race", &json!("second"), 60);

        assert_eq!(cache.get("race", json!(null)), json!("second"));
        let shard = cache.path_for("race").parent().unwrap().to_path_buf();
        let leftovers = fs::read_dir(shard)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0, "No temp files should remain after a write");
    }

    #[test]
    fn test_clear_all() {
        let (_dir, cache) = test_cache();
        cache.set("a", &json!(1), 60);
        cache.set("b", &json!(2), 0);

        assert!(cache.clear(false));
        assert!(cache.keys().is_empty());
        assert_eq!(cache.get("a", json!(null)), json!(null));
    }

    #[test]
    fn test_clear_expired_only_keeps_live_entries() {
        let (_dir, cache) = test_cache();
        cache.set("short", &json!(1), 1);
        cache.set("long", &json!(2), 3600);

        sleep(Duration::from_millis(2100));

        assert!(cache.clear(true));
        assert!(!cache.path_for("short").exists());
        assert_eq!(cache.get("long", json!(null)), json!(2));
    }

    #[test]
    fn test_clear_drops_memo() {
        let (_dir, cache) = test_cache();
        cache.set("a", &json!(1), 60);
        cache.get("a", json!(null));
        assert_eq!(cache.memo_len(), 1);

        cache.clear(true);
        assert_eq!(cache.memo_len(), 0);
    }

    #[test]
    fn test_clear_over_budget_reschedules_now() {
        let (_dir, cache) = test_cache();
        for i in 0..5 {
            cache.set(&format!("k{i}"), &json!(i), 60);
        }

        let before = current_timestamp();
        let removed = cache.clear_with_budget(false, Duration::ZERO);

        assert_eq!(removed, 1, "Sweep should stop after the first removal");
        let marker = cache.get(NEXT_CLEANUP_KEY, json!(null)).as_i64().unwrap();
        assert!(marker >= before && marker <= current_timestamp());
    }

    #[test]
    fn test_expired_only_sweep_over_live_entries_respects_budget() {
        let (_dir, cache) = test_cache();
        for i in 0..200 {
            cache.set(&format!("live{i}"), &json!(i), 3600);
        }

        let before = current_timestamp();
        let removed = cache.clear_with_budget(true, Duration::ZERO);

        assert_eq!(removed, 0);
        let marker = cache.get(NEXT_CLEANUP_KEY, json!(null)).as_i64().unwrap();
        assert!(
            marker >= before && marker <= current_timestamp(),
            "Sweep out of budget must be rescheduled to now"
        );
        assert_eq!(cache.get("live199", json!(null)), json!(199));
    }

    #[test]
    fn test_keys_returns_original_keys() {
        let (_dir, cache) = test_cache();
        cache.set("user:1", &json!(1), 60);
        cache.set("path/with/slashes", &json!(2), 60);

        let keys = cache.keys();
        assert!(keys.contains(&"user:1".to_string()));
        assert!(keys.contains(&"path/with/slashes".to_string()));
    }

    #[test]
    fn test_construction_schedules_next_cleanup() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::in_base_dir(dir.path(), "sched");

        let next = cache.get(NEXT_CLEANUP_KEY, json!(0)).as_i64().unwrap();
        assert!(next > current_timestamp());
        assert!(cache.path_for(NEXT_CLEANUP_KEY).exists());
    }

    #[test]
    fn test_construction_sweeps_when_due() {
        let dir = TempDir::new().unwrap();
        let first = FileCache::in_base_dir(dir.path(), "sweep");
        first.set("short", &json!(1), 1);
        first.set("long", &json!(2), 3600);
        first.set(NEXT_CLEANUP_KEY, &json!(0), 0);

        sleep(Duration::from_millis(2100));

        let second = FileCache::in_base_dir(dir.path(), "sweep");
        assert!(!second.path_for("short").exists());
        assert!(second.path_for("long").exists());
        assert!(second.get(NEXT_CLEANUP_KEY, json!(0)).as_i64().unwrap() > current_timestamp());
    }

    #[test]
    fn test_construction_skips_sweep_when_locked() {
        let dir = TempDir::new().unwrap();
        let first = FileCache::in_base_dir(dir.path(), "locked");
        first.set("short", &json!(1), 1);
        first.set(NEXT_CLEANUP_KEY, &json!(0), 0);
        let _held = CleanupLock::try_acquire(first.root()).unwrap().unwrap();

        sleep(Duration::from_millis(2100));

        let second = FileCache::in_base_dir(dir.path(), "locked");
        assert!(second.path_for("short").exists(), "Locked sweep must not run");
        assert_eq!(second.get(NEXT_CLEANUP_KEY, json!(-1)), json!(0));
    }

    #[test]
    fn test_stale_garbage_is_swept_fresh_garbage_kept() {
        let (_dir, cache) = test_cache();
        let shard = cache.root().join("ab");
        fs::create_dir_all(&shard).unwrap();
        let fresh = shard.join("fresh.tmp");
        fs::write(&fresh, b"partial").unwrap();

        assert!(!is_sweepable(&fresh, current_timestamp()));
        cache.clear(true);
        assert!(fresh.exists(), "In-flight temp files must survive a sweep");
    }

    #[test]
    fn test_info_reports_entries_and_schedule() {
        let (_dir, cache) = test_cache();
        cache.set("a", &json!(1), 60);
        cache.get("a", json!(null));

        let info = cache.info_with(true);
        let keys = info.keys.unwrap();
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&NEXT_CLEANUP_KEY.to_string()));
        assert_eq!(info.entries, keys.len());
        assert!(!info.next_cleanup.is_empty());
        assert_eq!(info.next_cleanup_file, cache.path_for(NEXT_CLEANUP_KEY));

        let counted = cache.info_with(false);
        assert!(counted.keys.is_none());
        assert_eq!(counted.entries, info.entries);
    }

    #[test]
    fn test_base_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::with_root(dir.path().join("a").join("b").join("c"));
        assert!(cache.root().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_entries_are_shared_between_users() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, cache) = test_cache();
        cache.set("perm", &json!(1), 60);

        let path = cache.path_for("perm");
        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o666);
        assert_eq!(dir_mode, 0o777);
    }
}
