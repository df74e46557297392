//! The [`Logger`] seam and its `log_*!` macros.

use std::fmt::Arguments;

/// Severity of a grid event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-chunk traffic: loads, writes, evictions, registry changes
    Debug,
    /// Grid lifecycle and the start of a recovery pass
    Info,
    /// Recovery exhausted, chunk type mismatches, skipped statistics
    Warn,
    /// Lost data, such as a grid that could not be flushed on drop
    Error,
}

/// Sink for the events grids and the memory manager report.
///
/// One logger is usually shared by a [`MemoryManager`](crate::memory::MemoryManager)
/// and every grid built against it, hence `Send + Sync`.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, args: Arguments<'_>);

    fn debug(&self, args: Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    fn info(&self, args: Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    fn warn(&self, args: Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    fn error(&self, args: Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

/// Log through a [`Logger`] with `format!` arguments:
/// `log_debug!(self.logger, "Evicted {} of {}", id, name)`.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(format_args!($($arg)*))
    };
}
