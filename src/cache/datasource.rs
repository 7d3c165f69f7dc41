//! SQLite datasource used by the relational backend.
//!
//! Wraps one connection with the handful of helpers the cache needs:
//! parameterized execution, scalar lookup, single-column enumeration and the
//! driver-specific "now plus offset" SQL expression.

use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, Params};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;

/// DSN selecting a private in-memory database
pub const MEMORY_DSN: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Datasource {
    name: String,
    dsn: String,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Datasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datasource")
            .field("name", &self.name)
            .field("dsn", &self.dsn)
            .finish_non_exhaustive()
    }
}

impl Datasource {
    /// Open the datasource `name` at `dsn` (a SQLite path or `:memory:`).
    pub fn open(name: impl Into<String>, dsn: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let dsn = dsn.into();
        let conn = if dsn == MEMORY_DSN {
            Connection::open_in_memory()?
        } else {
            let conn = Connection::open(&dsn)?;
            // Other processes share the file; wait on their locks instead of failing.
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn
        };
        debug!("Opened datasource '{}' ({})", name, dsn);
        Ok(Self {
            name,
            dsn,
            conn: Mutex::new(conn),
        })
    }

    /// Resolve the configured datasource by name.
    ///
    /// An unknown name degrades to a private in-memory database.
    pub fn from_config(config: &Config) -> Result<Self> {
        let name = config.datasource_name();
        let dsn = match config.datasources.get(&name) {
            Some(dsn) => dsn.clone(),
            None => {
                warn!(
                    "Datasource '{}' is not configured, using an in-memory database",
                    name
                );
                MEMORY_DSN.to_string()
            }
        };
        Self::open(name, dsn)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// SQL expression for the current UTC time plus `offset_secs`.
    pub fn now(&self, offset_secs: i64) -> String {
        if offset_secs == 0 {
            "datetime('now')".to_string()
        } else {
            format!("datetime('now', '{offset_secs:+} seconds')")
        }
    }

    /// Execute a statement, returning the number of affected rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn.lock().execute(sql, params)?)
    }

    /// Execute one or more statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.lock().execute_batch(sql)?)
    }

    /// First column of the first row, or `None` when no row matches.
    pub fn scalar<T: FromSql, P: Params>(&self, sql: &str, params: P) -> Result<Option<T>> {
        Ok(self
            .conn
            .lock()
            .query_row(sql, params, |row| row.get(0))
            .optional()?)
    }

    /// All values of the first column.
    pub fn enumerate<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let values = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }
}
