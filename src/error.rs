//! Monitoring contract errors and the success discriminator.

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Success shape of the monitoring entry points.
///
/// `NotMonitored` is not a failure: monitoring is simply inactive, and the
/// caller's filesystem operation proceeds untouched. Callers that care must
/// distinguish it from `Monitored` explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Monitoring is active and the call was applied.
    Monitored,
    /// Monitoring is inactive; nothing was recorded.
    NotMonitored,
}

impl Outcome {
    /// True when the call was applied to monitoring state.
    pub fn is_monitored(self) -> bool {
        matches!(self, Outcome::Monitored)
    }
}

/// Failures starting the monitoring core.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("monitoring is already initialized")]
    AlreadyInitialized,
    #[error("invalid monitor configuration: {0}")]
    Config(anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not start persistence worker: {0}")]
    Worker(#[from] io::Error),
}

/// Failures registering a freshly opened handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenError {
    #[error("handle {0:#x} is already registered")]
    AlreadyRegistered(u64),
    #[error("handle table is full")]
    TableFull,
}

/// Failures accumulating a read or write.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("handle {0:#x} is not registered")]
    UnknownHandle(u64),
}

/// Failures closing a handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CloseError {
    #[error("handle {0:#x} is not registered")]
    UnknownHandle(u64),
}
