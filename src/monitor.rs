//! Monitoring lifecycle entry points.
//!
//! [`MonitorCore`] is one running instance of the pipeline: handle table,
//! transfer queue and persistence worker. The module-level functions wrap a
//! single process-wide instance behind a lock-free slot, which is what a
//! pass-through filesystem layer normally calls; while the slot is empty
//! every entry point reports the success-shaped [`Outcome::NotMonitored`]
//! and touches nothing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::caller;
use crate::config::Config;
use crate::error::{AccessError, CloseError, InitError, OpenError, Outcome};
use crate::handles::{HandleTable, RegisterError};
use crate::profile::AccessProfile;
use crate::queue::TransferQueue;
use crate::store::TraceStore;
use crate::worker::PersistenceWorker;

/// One running instance of the monitoring pipeline.
///
/// Entry points are callable from any thread and never wait on storage; the
/// only component that blocks is the persistence worker, on its own thread.
pub struct MonitorCore {
    handles: HandleTable,
    queue: Arc<TransferQueue<AccessProfile>>,
    worker: Mutex<Option<PersistenceWorker>>,
}

impl MonitorCore {
    /// Opens the trace store, builds the handle table and starts the
    /// persistence worker.
    pub fn new(cfg: &Config) -> Result<Self, InitError> {
        cfg.validate().map_err(InitError::Config)?;

        let store = TraceStore::open(
            &cfg.destination,
            cfg.purge_on_init,
            cfg.busy_retry_interval,
        )?;
        let queue = Arc::new(TransferQueue::new());
        let worker = PersistenceWorker::spawn(store, Arc::clone(&queue))?;

        info!(destination = %cfg.destination.display(), "monitoring started");

        Ok(Self {
            handles: HandleTable::new(
                cfg.table.shards,
                cfg.table.buckets_per_shard,
                cfg.table.max_entries,
            ),
            queue,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Registers a freshly opened handle: stamps path, open time and opener
    /// identity, and claims the handle's slot in the table.
    ///
    /// A rejected registration drops the new profile; a handle never ends
    /// up with two simultaneously live profiles.
    pub fn open(&self, pid: u32, handle: u64, path: &str) -> Result<(), OpenError> {
        let profile = AccessProfile::new(pid, path, caller::executable_path(pid));

        match self.handles.register(handle, profile) {
            Ok(()) => Ok(()),
            Err(RegisterError::AlreadyRegistered(_)) => {
                warn!(handle, path, "open for an already registered handle");
                Err(OpenError::AlreadyRegistered(handle))
            }
            Err(RegisterError::Full(_)) => {
                warn!(handle, path, "handle table is full");
                Err(OpenError::TableFull)
            }
        }
    }

    /// Folds one completed read into the handle's profile.
    ///
    /// An unknown handle is reported, never fatal: the filesystem operation
    /// that triggered this call already completed.
    pub fn read(&self, handle: u64, bytes: u64, elapsed: Duration) -> Result<(), AccessError> {
        if self.handles.record_read(handle, bytes, elapsed) {
            Ok(())
        } else {
            warn!(handle, "read on an unregistered handle");
            Err(AccessError::UnknownHandle(handle))
        }
    }

    /// Folds one completed write into the handle's profile.
    pub fn write(&self, handle: u64, bytes: u64, elapsed: Duration) -> Result<(), AccessError> {
        if self.handles.record_write(handle, bytes, elapsed) {
            Ok(())
        } else {
            warn!(handle, "write on an unregistered handle");
            Err(AccessError::UnknownHandle(handle))
        }
    }

    /// Removes the handle from the table and forwards its profile to the
    /// persistence queue.
    ///
    /// The removal happens exactly once whatever follows. Without a `host`
    /// the close has no confirmed destination: the profile is discarded and
    /// nothing is persisted.
    pub fn close(&self, handle: u64, host: Option<&str>) -> Result<(), CloseError> {
        let Some(mut profile) = self.handles.unregister(handle) else {
            warn!(handle, "close on an unregistered handle");
            return Err(CloseError::UnknownHandle(handle));
        };

        let Some(host) = host else {
            // Profile drops here, unpersisted.
            return Ok(());
        };

        profile.finish(host);
        self.queue.push(profile);
        Ok(())
    }

    /// Stops the persistence worker. Records still queued are abandoned;
    /// the worker's in-flight transaction finishes its iteration first.
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.stop();
            info!("monitoring stopped");
        }
    }

    /// Number of currently open monitored handles.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for MonitorCore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// --- Process-wide facade ---

static ACTIVE: ArcSwapOption<MonitorCore> = ArcSwapOption::const_empty();
static LIFECYCLE: Mutex<()> = Mutex::new(());

/// Starts process-wide monitoring with default settings, logging to the
/// trace database at `destination`.
pub fn init(destination: impl Into<PathBuf>) -> Result<(), InitError> {
    init_with_config(Config::new(destination))
}

/// Starts process-wide monitoring with an explicit configuration.
pub fn init_with_config(cfg: Config) -> Result<(), InitError> {
    let _lifecycle = LIFECYCLE.lock();

    if ACTIVE.load().is_some() {
        return Err(InitError::AlreadyInitialized);
    }

    let core = MonitorCore::new(&cfg)?;
    ACTIVE.store(Some(Arc::new(core)));
    Ok(())
}

/// Stops process-wide monitoring and releases its resources. Idempotent,
/// and a no-op if monitoring was never started.
pub fn destroy() {
    let _lifecycle = LIFECYCLE.lock();

    if let Some(core) = ACTIVE.swap(None) {
        core.shutdown();
    }
}

/// Records a file open of `path` on `handle` by `pid`.
pub fn open(pid: u32, handle: u64, path: &str) -> Result<Outcome, OpenError> {
    match ACTIVE.load_full() {
        Some(core) => core.open(pid, handle, path).map(|()| Outcome::Monitored),
        None => Ok(Outcome::NotMonitored),
    }
}

/// Records a completed read of `bytes` on `handle` taking `elapsed`.
pub fn read(handle: u64, bytes: u64, elapsed: Duration) -> Result<Outcome, AccessError> {
    match ACTIVE.load_full() {
        Some(core) => core.read(handle, bytes, elapsed).map(|()| Outcome::Monitored),
        None => Ok(Outcome::NotMonitored),
    }
}

/// Records a completed write of `bytes` on `handle` taking `elapsed`.
pub fn write(handle: u64, bytes: u64, elapsed: Duration) -> Result<Outcome, AccessError> {
    match ACTIVE.load_full() {
        Some(core) => core.write(handle, bytes, elapsed).map(|()| Outcome::Monitored),
        None => Ok(Outcome::NotMonitored),
    }
}

/// Records a file close on `handle`, persisting the profile when `host`
/// names the closing host.
pub fn close(handle: u64, host: Option<&str>) -> Result<Outcome, CloseError> {
    match ACTIVE.load_full() {
        Some(core) => core.close(handle, host).map(|()| Outcome::Monitored),
        None => Ok(Outcome::NotMonitored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_at(dir: &tempfile::TempDir) -> MonitorCore {
        MonitorCore::new(&Config::new(dir.path().join("trace.db"))).expect("core")
    }

    #[test]
    fn test_open_close_removes_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = core_at(&dir);

        core.open(1, 7, "/a").expect("open");
        assert_eq!(core.open_handles(), 1);

        core.close(7, Some("localhost")).expect("close");
        assert_eq!(core.open_handles(), 0);
    }

    #[test]
    fn test_duplicate_open_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = core_at(&dir);

        core.open(1, 7, "/a").expect("first open");
        assert_eq!(core.open(1, 7, "/a"), Err(OpenError::AlreadyRegistered(7)));
        assert_eq!(core.open_handles(), 1);
    }

    #[test]
    fn test_unknown_handle_errors_do_not_corrupt_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = core_at(&dir);

        assert_eq!(
            core.read(9, 1, Duration::ZERO),
            Err(AccessError::UnknownHandle(9))
        );
        assert_eq!(
            core.write(9, 1, Duration::ZERO),
            Err(AccessError::UnknownHandle(9))
        );
        assert_eq!(core.close(9, Some("h")), Err(CloseError::UnknownHandle(9)));

        // The table still works after the failed calls.
        core.open(1, 9, "/a").expect("open");
        core.close(9, None).expect("close");
    }

    #[test]
    fn test_close_without_host_discards_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = core_at(&dir);

        core.open(1, 7, "/a").expect("open");
        core.close(7, None).expect("close");

        // The handle is gone either way.
        assert_eq!(
            core.read(7, 1, Duration::ZERO),
            Err(AccessError::UnknownHandle(7))
        );
    }

    #[test]
    fn test_capacity_exhaustion_surfaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::new(dir.path().join("trace.db"));
        cfg.table.max_entries = 1;
        let core = MonitorCore::new(&cfg).expect("core");

        core.open(1, 1, "/a").expect("open");
        assert_eq!(core.open(1, 2, "/b"), Err(OpenError::TableFull));

        core.close(1, None).expect("close");
        core.open(1, 2, "/b").expect("capacity freed");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = Config::new("");
        assert!(matches!(
            MonitorCore::new(&cfg),
            Err(InitError::Config(_))
        ));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = core_at(&dir);
        core.shutdown();
        core.shutdown();
    }
}
