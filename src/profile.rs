//! Per-handle access records and their accumulation semantics.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cumulative transfer totals for one direction of I/O.
///
/// Totals only ever grow: sizes add arithmetically, durations add with the
/// sub-second carry handled by [`Duration`] itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoProfile {
    bytes: u64,
    elapsed: Duration,
}

impl IoProfile {
    /// Folds one completed transfer into the running totals.
    pub fn accumulate(&mut self, bytes: u64, elapsed: Duration) {
        self.bytes = self.bytes.saturating_add(bytes);
        self.elapsed = self.elapsed.saturating_add(elapsed);
    }

    /// Total bytes transferred.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Total elapsed transfer time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whole-second part of the cumulative elapsed time.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }

    /// Sub-second remainder of the cumulative elapsed time, in microseconds.
    pub fn elapsed_subsec_micros(&self) -> u32 {
        self.elapsed.subsec_micros()
    }
}

/// The monitoring record accumulated across one handle's open-to-close
/// lifetime.
///
/// A profile is owned by exactly one component at a time: the handle table
/// from open until close, then the transfer queue, then the persistence
/// worker, which drops it after the write attempt. Hand-off is always a move.
#[derive(Debug)]
pub struct AccessProfile {
    path: String,
    pid: u32,
    caller_path: String,
    opened_at: SystemTime,
    closed_at: Option<SystemTime>,
    read: IoProfile,
    write: IoProfile,
    hostname: Option<String>,
}

impl AccessProfile {
    /// Creates a profile for a freshly opened handle, stamped with the
    /// current time.
    pub fn new(pid: u32, path: &str, caller_path: String) -> Self {
        Self {
            path: path.to_string(),
            pid,
            caller_path,
            opened_at: SystemTime::now(),
            closed_at: None,
            read: IoProfile::default(),
            write: IoProfile::default(),
            hostname: None,
        }
    }

    /// Folds one completed read into the read accumulator.
    pub fn record_read(&mut self, bytes: u64, elapsed: Duration) {
        self.read.accumulate(bytes, elapsed);
    }

    /// Folds one completed write into the write accumulator.
    pub fn record_write(&mut self, bytes: u64, elapsed: Duration) {
        self.write.accumulate(bytes, elapsed);
    }

    /// Stamps the close time and the closing host. Called once, at close,
    /// and only when the close has a confirmed destination.
    pub fn finish(&mut self, hostname: &str) {
        self.closed_at = Some(SystemTime::now());
        self.hostname = Some(hostname.to_string());
    }

    /// File path as seen by the filesystem layer.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pid of the opening process.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Executable path of the opening process; empty when resolution failed.
    pub fn caller_path(&self) -> &str {
        &self.caller_path
    }

    /// Open time.
    pub fn opened_at(&self) -> SystemTime {
        self.opened_at
    }

    /// Close time, present once [`finish`](Self::finish) ran.
    pub fn closed_at(&self) -> Option<SystemTime> {
        self.closed_at
    }

    /// Open time as whole seconds since the epoch, the persisted
    /// `time_stamp` column.
    pub fn time_stamp(&self) -> u64 {
        self.opened_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Cumulative read totals.
    pub fn read(&self) -> &IoProfile {
        &self.read
    }

    /// Cumulative write totals.
    pub fn write(&self) -> &IoProfile {
        &self.write
    }

    /// Closing host identifier, present once [`finish`](Self::finish) ran.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }
}
