//! User configuration for gridswap.
//!
//! Settings are read from an INI file (default `~/.gridswap/config.ini`)
//! and overlaid on built-in defaults. A missing file yields the defaults.
//!
//! # Example
//!
//! ```
//! use gridswap::config::{parse_size, ConfigFile};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.grid.chunk_rows, 64);
//! assert_eq!(config.memory.reserve_bytes, parse_size("1MB").unwrap());
//! assert!(config.memory.limit.is_none());
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{
    default_grid_directory, default_log_file, DEFAULT_CHUNK_COLS, DEFAULT_CHUNK_ROWS,
    DEFAULT_MAX_RECOVERY_ATTEMPTS, DEFAULT_RESERVE_BYTES,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, GridDefaults, LoggingSettings};
pub use size::{format_size, parse_size, Size, SizeParseError};
