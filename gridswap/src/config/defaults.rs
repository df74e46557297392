//! Built-in configuration defaults.

use std::path::PathBuf;

/// Nominal chunk height in cells.
pub const DEFAULT_CHUNK_ROWS: i32 = 64;

/// Nominal chunk width in cells.
pub const DEFAULT_CHUNK_COLS: i32 = 64;

/// Memory reserve size (1 MB).
pub const DEFAULT_RESERVE_BYTES: usize = 1024 * 1024;

/// Recovery passes allowed for one operation.
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: usize = 64;

/// Root directory for grid directories (`<data_local_dir>/gridswap`).
pub fn default_grid_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gridswap")
}

/// Log file (`~/.gridswap/gridswap.log`).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join("gridswap.log")
}
