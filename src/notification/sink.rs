//! Diagnostic sinks for the normalizer

use std::sync::Mutex;
use tracing::{info, warn};

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// Append-only destination for normalizer diagnostics
///
/// Everything handed to a sink has already been redacted.
pub trait DiagnosticSink: Send + Sync {
    fn append(&self, level: Level, record: &str);
}

/// Forwards records to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn append(&self, level: Level, record: &str) {
        match level {
            Level::Info => info!(target: "omada_to_gotify::normalizer", "{}", record),
            Level::Warn => warn!(target: "omada_to_gotify::normalizer", "{}", record),
        }
    }
}

/// Keeps records in memory, for tests and the `parse` command
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn records(&self) -> Vec<(Level, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All records joined into one string
    pub fn contents(&self) -> String {
        self.records()
            .into_iter()
            .map(|(_, record)| record)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DiagnosticSink for MemorySink {
    fn append(&self, level: Level, record: &str) {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push((level, record.to_string()));
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn append(&self, level: Level, record: &str) {
        (**self).append(level, record)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn append(&self, level: Level, record: &str) {
        (**self).append(level, record)
    }
}
