//! Expiry Sweep Scheduling
//!
//! Cross-process coordination for the file backend's active sweep. There is
//! no daemon and no shared memory: the next due time is persisted as a cache
//! entry, and an advisory file lock keeps concurrent processes from sweeping
//! the same root at once.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone};
use fs2::FileExt;
use tracing::debug;

/// Reserved key holding the Unix time of the next sweep
pub const NEXT_CLEANUP_KEY: &str = "FileCache::NextCleanupAt";

/// Budget for the sweep triggered while constructing a backend
pub const AUTO_CLEANUP_BUDGET: Duration = Duration::from_secs(1);

/// Budget for an explicit `clear`
pub const DEFAULT_CLEAR_BUDGET: Duration = Duration::from_secs(10);

const LOCK_FILE: &str = ".cleanup.lock";

// == Next Cleanup ==
/// Returns the Unix time 23 hours past the midnight following `now`.
pub fn next_cleanup_after<Tz: TimeZone>(now: DateTime<Tz>) -> i64 {
    let tz = now.timezone();
    now.date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(23, 0, 0))
        .and_then(|at| tz.from_local_datetime(&at).earliest())
        .map(|at| at.timestamp())
        .unwrap_or_else(|| now.timestamp() + 2 * super::DEFAULT_FILE_TTL)
}

/// [`next_cleanup_after`] in the host's local time zone.
pub fn next_cleanup_from_now() -> i64 {
    next_cleanup_after(Local::now())
}

// == Cleanup Lock ==
/// Non-blocking exclusive advisory lock on a cache root.
///
/// Released when dropped. Only guards sweeps, never individual reads/writes.
#[derive(Debug)]
pub struct CleanupLock {
    file: File,
    path: PathBuf,
}

impl CleanupLock {
    /// Tries to take the sweep lock for `root`.
    ///
    /// Returns `Ok(None)` if another process (or another handle in this one)
    /// already holds it.
    pub fn try_acquire(root: &Path) -> io::Result<Option<Self>> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        super::file::share_file(&path);

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired cleanup lock {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CleanupLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
