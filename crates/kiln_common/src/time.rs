//! File timestamps used for staleness checks.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time with nanosecond resolution, measured from the Unix epoch.
///
/// Used both for artifact modification times and for "last scanned at"
/// records. [`FileTime::OLDEST`] compares older than any real timestamp, so a
/// record that was never written is always stale.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize,
)]
pub struct FileTime(u64);

impl FileTime {
    /// The zero timestamp; older than anything read from disk.
    pub const OLDEST: FileTime = FileTime(0);

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the nanoseconds since the Unix epoch.
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the current wall-clock time.
    pub fn current_time() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a [`SystemTime`], clamping pre-epoch times to [`FileTime::OLDEST`].
    pub fn from_system_time(time: SystemTime) -> Self {
        time.duration_since(UNIX_EPOCH)
            .map(|d| Self(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)))
            .unwrap_or(Self::OLDEST)
    }

    /// Reads the modification time of a file.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self::from_system_time(modified))
    }

    /// Returns `true` unless this is [`FileTime::OLDEST`].
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        write!(f, "{secs}.{nanos:09}")
    }
}
