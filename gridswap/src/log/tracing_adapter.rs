//! Tracing library adapter implementation.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;

/// Logger that forwards to the `tracing` crate under the `gridswap` target.
///
/// Output only appears once a subscriber is installed, for example with
/// [`crate::logging::init_logging`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "gridswap", "{}", args),
            LogLevel::Info => tracing::info!(target: "gridswap", "{}", args),
            LogLevel::Warn => tracing::warn!(target: "gridswap", "{}", args),
            LogLevel::Error => tracing::error!(target: "gridswap", "{}", args),
        }
    }
}
