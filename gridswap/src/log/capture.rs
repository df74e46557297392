//! In-memory logger for tests and diagnostics.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;
use std::sync::{Arc, Mutex};

/// One captured log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Logger that records every message.
///
/// Clones share the same record buffer, so a clone can be handed to a grid
/// while the original is kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct CapturingLogger {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Whether a message at `level` containing `needle` was logged.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.level == level && record.message.contains(needle))
    }

    /// Number of messages at `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        if let Ok(mut records) = self.records.lock() {
            records.push(CapturedRecord {
                level,
                message: args.to_string(),
            });
        }
    }
}
