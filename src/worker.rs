//! The background persistence worker.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, warn};

use crate::profile::AccessProfile;
use crate::queue::{TransferQueue, WaitOutcome};
use crate::store::TraceStore;

/// Handle to the single background thread that drains the transfer queue
/// into the trace store.
pub struct PersistenceWorker {
    queue: Arc<TransferQueue<AccessProfile>>,
    thread: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    /// Spawns the worker thread. The store moves into the thread and is
    /// owned by it exclusively from here on.
    pub fn spawn(
        store: TraceStore,
        queue: Arc<TransferQueue<AccessProfile>>,
    ) -> io::Result<Self> {
        let drain = Arc::clone(&queue);
        let thread = std::thread::Builder::new()
            .name("fstrace-persist".to_string())
            .spawn(move || run(store, &drain))?;

        Ok(Self {
            queue,
            thread: Some(thread),
        })
    }

    /// Closes the queue and joins the thread. Records still queued are
    /// abandoned; an in-flight transaction finishes its iteration first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("persistence worker thread panicked");
            }
        }
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(store: TraceStore, queue: &TransferQueue<AccessProfile>) {
    debug!("persistence worker started");

    loop {
        if queue.wait() == WaitOutcome::Closed {
            break;
        }

        // The transaction opens before the dequeue is attempted; a wake-up
        // that finds the queue already drained commits the empty transaction.
        if let Err(e) = store.begin() {
            error!(error = %e, "could not open trace transaction");
            continue;
        }

        let profile = queue.pop();
        if let Some(profile) = &profile {
            if let Err(e) = store.insert_profile(profile) {
                warn!(path = profile.path(), error = %e, "dropping trace record");
            }
        }

        if let Err(e) = store.commit() {
            error!(error = %e, "trace commit failed");
        }
        // The popped profile drops here whatever the storage outcome, so
        // memory stays bounded by queue depth.
    }

    debug!("persistence worker stopped");
}
