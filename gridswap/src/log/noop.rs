//! Silent logger.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;

/// Drops every grid event. Used by tests that assert on data, not output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline]
    fn log(&self, _level: LogLevel, _args: Arguments<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConfig, MemoryManager};
    use std::sync::Arc;

    #[test]
    fn test_manager_with_silent_logger() {
        let memory = MemoryManager::with_logger(
            MemoryConfig::with_limit(64).reserve_bytes(128),
            Arc::new(NoOpLogger),
        );
        assert!(!memory.reserve_held());
        crate::log_warn!(memory.logger(), "reserve of {} bytes not filled", 128);
    }
}
