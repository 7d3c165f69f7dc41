//! Global Cache - a pluggable key-value cache with TTL expiry
//!
//! Provides one get/set/delete/clear/keys/info contract over interchangeable
//! backends (off, file, relational) that several processes can share safely.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;

pub use cache::{CacheBackend, CacheInfo, DbCache, FileCache, NullCache};
pub use config::{BackendKind, Config};
pub use dispatcher::GlobalCache;
pub use error::CacheError;
