//! Cache Entry Module
//!
//! Defines the persisted record of the file backend: a one-line JSON header
//! carrying expiry and the original key, followed by the JSON payload.
//! Keeping the header on its own line lets sweeps read expiry without
//! touching the payload.

use std::io::{BufRead, Read};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Entry Header ==
/// Metadata stored in front of every payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Expiration timestamp (Unix seconds), None = no expiration
    pub exp: Option<i64>,
    /// The original, human-readable key
    pub key: String,
}

impl EntryHeader {
    // == Constructor ==
    /// Creates a header for `key` expiring `ttl_seconds` from now.
    ///
    /// # Arguments
    /// * `key` - The original key
    /// * `ttl_seconds` - Seconds until expiry; must be positive to set one
    pub fn new(key: impl Into<String>, ttl_seconds: i64) -> Self {
        let exp = (ttl_seconds > 0).then(|| current_timestamp() + ttl_seconds);
        Self {
            key: key.into(),
            exp,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Expiry has whole-second resolution and the expiry second itself still
    /// counts as live, so a one second TTL never expires before it is read back.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.exp {
            Some(exp) => exp < now,
            None => false,
        }
    }
}

// == Record Encoding ==
/// Serializes a header and payload into one record.
pub fn encode_record(header: &EntryHeader, payload: &Value) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(header)?;
    buf.push(b'\n');
    serde_json::to_writer(&mut buf, payload)?;
    Ok(buf)
}

/// Reads only the header line of a record.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<EntryHeader> {
    let mut line = String::new();
    let read = reader.read_line(&mut line)?;
    if read == 0 || !line.ends_with('\n') {
        return Err(CacheError::Corrupt("truncated record header".to_string()));
    }
    serde_json::from_str(line.trim_end())
        .map_err(|e| CacheError::Corrupt(format!("invalid record header: {e}")))
}

/// Reads a full record: header then payload.
pub fn read_record<R: BufRead>(reader: &mut R) -> Result<(EntryHeader, Value)> {
    let header = read_header(reader)?;
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    let payload = serde_json::from_slice(&rest)
        .map_err(|e| CacheError::Corrupt(format!("invalid payload for '{}': {e}", header.key)))?;
    Ok((header, payload))
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
