//! Append-only diagnostics for debug request/response dumps.
//!
//! The generation core never fails because of diagnostics: serialization
//! errors, sink errors and sink panics are logged and dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

/// Log target used by [`TracingSink`].
pub const DIAGNOSTICS_TARGET: &str = "commit_assist::diagnostics";

/// Destination for titled diagnostic records.
pub trait DiagnosticsSink: Send + Sync {
    fn append(&self, title: &str, payload: &Value) -> io::Result<()>;
}

/// Emits records as `tracing` events under [`DIAGNOSTICS_TARGET`].
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn append(&self, title: &str, payload: &Value) -> io::Result<()> {
        tracing::info!(target: DIAGNOSTICS_TARGET, title, payload = %payload);
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticsSink for MemorySink {
    fn append(&self, title: &str, payload: &Value) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), payload.clone()));
        Ok(())
    }
}

/// Appends one JSON line per record to a file.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DiagnosticsSink for FileSink {
    fn append(&self, title: &str, payload: &Value) -> io::Result<()> {
        let line = json!({ "title": title, "payload": payload });
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{line}")
    }
}

/// Shared handle to the injected sink.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticsSink>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { sink }
    }

    /// Append records as JSON lines to the file at `path`.
    pub fn to_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(Arc::new(FileSink::open(path)?)))
    }

    /// Append `payload` under `title` when `enabled` is set.
    pub fn record<T: Serialize + ?Sized>(&self, enabled: bool, title: &str, payload: &T) {
        if !enabled {
            return;
        }

        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                debug!(title, error = %e, "Could not serialize diagnostics payload");
                return;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| self.sink.append(title, &value))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(title, error = %e, "Diagnostics sink rejected record"),
            Err(_) => debug!(title, "Diagnostics sink panicked"),
        }
    }
}
