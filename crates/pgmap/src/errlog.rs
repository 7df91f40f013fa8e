//! Ordered error log.
//!
//! Failures are returned to the caller as [`OrmError`] *and* appended here, so a host
//! can inspect everything that went wrong during a request after the fact. Each record
//! keeps the error kind, its message, the source location that raised it, and the
//! nested cause chain.

use crate::error::OrmError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// One captured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: &'static str,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    pub cause: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A cloneable handle to an ordered list of [`ErrorRecord`]s.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    records: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide log, used when no other log is configured.
    pub fn global() -> &'static ErrorLog {
        static GLOBAL: OnceLock<ErrorLog> = OnceLock::new();
        GLOBAL.get_or_init(ErrorLog::new)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ErrorRecord>> {
        // A panic while holding the lock leaves the list itself intact.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `err`, attributing it to the caller's source location.
    #[track_caller]
    pub fn record(&self, err: &OrmError) {
        let location = Location::caller();
        let cause = cause_chain(err);

        tracing::warn!(
            target: "pgmap.errors",
            kind = err.kind(),
            file = location.file(),
            line = location.line(),
            cause = cause.as_deref().unwrap_or("-"),
            "{err}"
        );

        self.lock().push(ErrorRecord {
            kind: err.kind(),
            message: err.to_string(),
            file: location.file(),
            line: location.line(),
            cause,
            recorded_at: Utc::now(),
        });
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.lock().clone()
    }

    /// Most recent record, if any.
    pub fn last(&self) -> Option<ErrorRecord> {
        self.lock().last().cloned()
    }

    /// Remove and return all records.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn cause_chain(err: &OrmError) -> Option<String> {
    let mut parts = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    (!parts.is_empty()).then(|| parts.join(": "))
}
