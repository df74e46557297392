//! Logging abstraction layer.
//!
//! Grids and the memory manager log through the [`Logger`] trait rather than
//! calling `tracing` directly, so tests can silence or capture output.
//!
//! - [`TracingLogger`]: production adapter that forwards to `tracing`
//! - [`NoOpLogger`]: discards everything
//! - [`CapturingLogger`]: keeps messages in memory for assertions
//!
//! ```
//! use gridswap::log::{CapturingLogger, LogLevel, Logger};
//! use gridswap::log_warn;
//!
//! let logger = CapturingLogger::new();
//! log_warn!(logger, "chunk {} skipped", 3);
//! assert!(logger.contains(LogLevel::Warn, "chunk 3 skipped"));
//! ```

mod capture;
mod noop;
mod tracing_adapter;
mod r#trait;

pub use capture::{CapturedRecord, CapturingLogger};
pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
