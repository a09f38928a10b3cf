//! Per-handle file I/O access tracing for a pass-through filesystem.
//!
//! The filesystem layer reports every open, read, write and close to the
//! [`monitor`] entry points. Each open handle carries an [`AccessProfile`]
//! that accumulates transferred bytes and elapsed time until the handle
//! closes; completed profiles move through an unbounded transfer queue to a
//! single background worker that appends them to a SQLite trace log. The
//! read/write path never waits on storage.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! fstrace::monitor::init("/tmp/trace.db")?;
//! fstrace::monitor::open(42, 7, "/a")?;
//! fstrace::monitor::read(7, 100, Duration::from_micros(2_000))?;
//! fstrace::monitor::close(7, Some("localhost"))?;
//! fstrace::monitor::destroy();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod caller;
pub mod config;
pub mod error;
pub mod handles;
pub mod monitor;
pub mod profile;
pub mod queue;
pub mod store;
pub mod table;
mod worker;

pub use config::{Config, TableConfig};
pub use error::{AccessError, CloseError, InitError, OpenError, Outcome};
pub use monitor::MonitorCore;
pub use profile::{AccessProfile, IoProfile};
