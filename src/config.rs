//! Configuration Module
//!
//! Handles loading the cache configuration from environment variables:
//! backend selection, key prefix and datasource resolution.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::cache::digest;

/// Datasource name used when none is configured.
pub const DEFAULT_DATASOURCE: &str = "default";

// == Backend Kind ==
/// Storage strategy selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// No caching at all
    Off,
    /// Filesystem-backed cache
    File,
    /// Relational-table-backed cache
    Db,
    /// Handler that no longer exists; behaves like `Off`
    Legacy,
}

impl FromStr for BackendKind {
    type Err = String;

    /// Parses a backend selector, accepting names and the historic numeric codes.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "off" | "none" | "null" => Ok(BackendKind::Off),
            "7" | "file" | "files" => Ok(BackendKind::File),
            "5" | "db" | "database" | "relational" | "sql" => Ok(BackendKind::Db),
            "1" | "2" | "4" | "6" | "eaccelerator" | "memcache" | "apc" | "yac" => {
                Ok(BackendKind::Legacy)
            }
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

// == Config ==
/// Cache configuration supplied by the host application.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which backend to construct
    pub backend: BackendKind,
    /// Explicit key prefix; derived from host identity when unset
    pub key_prefix: Option<String>,
    /// Datasource name for the relational backend
    pub datasource: Option<String>,
    /// Known datasources: name -> DSN (SQLite path or `:memory:`)
    pub datasources: HashMap<String, String>,
    /// Base directory for the file backend (defaults to the system temp dir)
    pub file_root: Option<PathBuf>,
    /// Application name, part of the derived key prefix
    pub app_name: String,
    /// Application version, part of the derived key prefix
    pub app_version: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `GLOBALCACHE_BACKEND` - `off`, `file` or `db` (default: off)
    /// - `GLOBALCACHE_KEY_PREFIX` - explicit key prefix
    /// - `GLOBALCACHE_DATASOURCE` - datasource name for the db backend
    /// - `GLOBALCACHE_DATASOURCES` - `name=dsn;name2=dsn2`
    /// - `GLOBALCACHE_FILE_ROOT` - base directory for the file backend
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = match env::var("GLOBALCACHE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Invalid globalcache handler: {}, falling back to off", e);
                BackendKind::Off
            }),
            Err(_) => BackendKind::Off,
        };

        Self {
            backend,
            key_prefix: non_empty_var("GLOBALCACHE_KEY_PREFIX"),
            datasource: non_empty_var("GLOBALCACHE_DATASOURCE"),
            datasources: non_empty_var("GLOBALCACHE_DATASOURCES")
                .map(|raw| parse_datasources(&raw))
                .unwrap_or_default(),
            file_root: non_empty_var("GLOBALCACHE_FILE_ROOT").map(PathBuf::from),
            ..defaults
        }
    }

    /// Returns the configured key prefix, or one derived from host identity.
    ///
    /// The derived form is `K` followed by the digest of
    /// `{host}-{app_name}-{app_version}`, so different applications (or
    /// different releases of one) sharing a medium never see each other's entries.
    pub fn effective_key_prefix(&self) -> String {
        if let Some(prefix) = &self.key_prefix {
            return prefix.clone();
        }
        let host = env::var("HOSTNAME").unwrap_or_else(|_| "GLOBALCACHE_SERVER".to_string());
        format!(
            "K{}",
            digest(&format!("{}-{}-{}", host, self.app_name, self.app_version))
        )
    }

    /// Name of the datasource the db backend should use.
    ///
    /// Falls back to [`DEFAULT_DATASOURCE`] with a warning when unset.
    pub fn datasource_name(&self) -> String {
        match &self.datasource {
            Some(name) => name.clone(),
            None => {
                warn!(
                    "globalcache datasource not specified, using '{}'",
                    DEFAULT_DATASOURCE
                );
                DEFAULT_DATASOURCE.to_string()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Off,
            key_prefix: None,
            datasource: None,
            datasources: HashMap::new(),
            file_root: None,
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses `name=dsn;name2=dsn2`, skipping malformed pairs.
fn parse_datasources(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, dsn) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), dsn.trim().to_string()))
        })
        .collect()
}
