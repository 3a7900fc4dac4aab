//! Diagnostic output for the console engine.
//!
//! The engine never writes to a logging backend directly. Every diagnostic is
//! handed to a [`LogSink`], which makes the channel observable in tests and
//! swappable in hosts that route console diagnostics elsewhere.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Severity of a console diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Something was refused or is broken.
    Error,
    /// Something suspicious happened but execution continued.
    Warning,
    /// Informational output.
    Info,
}

impl LogLevel {
    /// Short prefix used when a diagnostic is echoed to interactive output.
    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::Error => "[Error]",
            LogLevel::Warning => "[Warning]",
            LogLevel::Info => "",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
        };
        f.write_str(name)
    }
}

/// Receiver for console diagnostics.
pub trait LogSink: Send + Sync {
    /// Record one diagnostic line.
    fn log(&self, level: LogLevel, message: &str);
}

/// Default sink that forwards to `bevy::log`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BevyLogSink;

impl LogSink for BevyLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => bevy::log::error!(target: "cvars", "{}", message),
            LogLevel::Warning => bevy::log::warn!(target: "cvars", "{}", message),
            LogLevel::Info => bevy::log::info!(target: "cvars", "{}", message),
        }
    }
}

/// A recorded diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

/// Sink that keeps every line in memory.
///
/// Clones share the same buffer, so a clone can be handed to the console while
/// the original is kept for inspection.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{Console, LogLevel, MemoryLogSink};
///
/// let logs = MemoryLogSink::new();
/// let mut console = Console::with_log_sink(logs.clone());
/// console.execute_string("no_such_thing", false, false);
/// assert_eq!(logs.count(LogLevel::Warning), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLogSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of lines recorded at `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }

    /// Whether any line at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    /// Drop all recorded lines.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}
