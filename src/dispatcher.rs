//! Dispatcher Module
//!
//! Picks one backend from configuration and routes the six cache operations
//! to it. Every operation is a no-op until the host marks the cache ready,
//! so nothing is cached before configuration is final.
//!
//! A process-wide instance is available through [`init`] and the free
//! functions of this module; [`GlobalCache`] can also be owned directly.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheInfo, DbCache, FileCache, NullCache};
use crate::config::{BackendKind, Config};

static GLOBAL: OnceCell<GlobalCache> = OnceCell::new();

// == Global Cache ==
/// One backend instance plus the readiness gate in front of it.
pub struct GlobalCache {
    backend: Box<dyn CacheBackend>,
    ready: AtomicBool,
}

impl std::fmt::Debug for GlobalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCache")
            .field("backend", &self.backend.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl GlobalCache {
    // == Constructor ==
    /// Wraps an existing backend. The cache starts out not ready.
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self {
            backend,
            ready: AtomicBool::new(false),
        }
    }

    /// Builds the backend selected by `config`.
    ///
    /// Legacy selectors, and a db backend whose datasource cannot be opened,
    /// fall back to the null backend with a warning.
    pub fn from_config(config: &Config) -> Self {
        let prefix = config.effective_key_prefix();
        let backend: Box<dyn CacheBackend> = match config.backend {
            BackendKind::File => Box::new(match &config.file_root {
                Some(base) => FileCache::in_base_dir(base, &prefix),
                None => FileCache::new(&prefix),
            }),
            BackendKind::Db => match DbCache::from_config(&prefix, config) {
                Ok(cache) => Box::new(cache),
                Err(e) => {
                    warn!("Cannot open cache datasource: {}, falling back to off", e);
                    Box::new(NullCache::new())
                }
            },
            BackendKind::Legacy => {
                warn!("Globalcache handler not found/deprecated, falling back to off");
                Box::new(NullCache::new())
            }
            BackendKind::Off => Box::new(NullCache::new()),
        };
        info!("Global cache using '{}' backend", backend.name());
        Self::new(backend)
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // == Readiness ==
    /// Opens the gate: from now on calls reach the backend.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    // == Operations ==
    /// Returns the cached value for `key` as `T`, or `default`.
    ///
    /// A stored value that does not fit `T` counts as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        if !self.is_ready() {
            return default;
        }
        match self.backend.fetch(key) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                debug!("Cached value for '{}' has unexpected shape: {}", key, e);
                default
            }),
            None => default,
        }
    }

    /// Returns the raw cached value for `key`, or `default`.
    pub fn get_value(&self, key: &str, default: Value) -> Value {
        if !self.is_ready() {
            return default;
        }
        self.backend.get(key, default)
    }

    /// Stores `value` under `key` for `ttl` seconds (`0` = backend default).
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: i64) -> bool {
        if !self.is_ready() {
            return false;
        }
        match serde_json::to_value(value) {
            Ok(value) => self.backend.set(key, &value, ttl),
            Err(e) => {
                warn!("Cannot serialize value for '{}': {}", key, e);
                true
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.is_ready() && self.backend.delete(key)
    }

    pub fn clear(&self, expired_only: bool) -> bool {
        self.is_ready() && self.backend.clear(expired_only)
    }

    pub fn keys(&self) -> Vec<String> {
        if !self.is_ready() {
            return Vec::new();
        }
        self.backend.keys()
    }

    /// Describes the backend; `include_keys` enumerates entries where supported.
    pub fn info(&self, include_keys: bool) -> Option<CacheInfo> {
        self.is_ready().then(|| self.backend.info(include_keys))
    }
}

// == Process-wide Cache ==
/// Builds the process-wide cache from `config`.
///
/// Only the first call has an effect; later calls return `false`.
pub fn init(config: &Config) -> bool {
    let mut created = false;
    GLOBAL.get_or_init(|| {
        created = true;
        GlobalCache::from_config(config)
    });
    if !created {
        warn!("Global cache already initialized, ignoring new configuration");
    }
    created
}

/// Marks the process-wide cache ready. No-op before [`init`].
pub fn mark_ready() {
    if let Some(cache) = GLOBAL.get() {
        cache.mark_ready();
    }
}

/// True once [`init`] and [`mark_ready`] have both run.
pub fn is_ready() -> bool {
    GLOBAL.get().map_or(false, GlobalCache::is_ready)
}

pub fn get<T: DeserializeOwned>(key: &str, default: T) -> T {
    match GLOBAL.get() {
        Some(cache) => cache.get(key, default),
        None => default,
    }
}

pub fn get_value(key: &str, default: Value) -> Value {
    match GLOBAL.get() {
        Some(cache) => cache.get_value(key, default),
        None => default,
    }
}

pub fn set<T: Serialize + ?Sized>(key: &str, value: &T, ttl: i64) -> bool {
    GLOBAL.get().map_or(false, |cache| cache.set(key, value, ttl))
}

pub fn delete(key: &str) -> bool {
    GLOBAL.get().map_or(false, |cache| cache.delete(key))
}

pub fn clear(expired_only: bool) -> bool {
    GLOBAL.get().map_or(false, |cache| cache.clear(expired_only))
}

pub fn keys() -> Vec<String> {
    GLOBAL.get().map(GlobalCache::keys).unwrap_or_default()
}

pub fn info(include_keys: bool) -> Option<CacheInfo> {
    GLOBAL.get().and_then(|cache| cache.info(include_keys))
}
