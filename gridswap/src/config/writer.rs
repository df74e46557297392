//! Serialization of [`ConfigFile`] to a commented INI string.

use super::settings::ConfigFile;
use super::size::format_size;
use std::path::Path;

/// Render `config` as the text written to `config.ini`.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let limit = config
        .memory
        .limit
        .map(format_size)
        .unwrap_or_default();

    format!(
        r#"[memory]
; Byte limit for resident chunk data across all grids, e.g. 512MB or 2GB
; Empty means no limit; allocation failures still trigger recovery
limit = {}
; Headroom released at the start of recovery and refilled afterwards
reserve = {}
; Recovery passes allowed for a single grid operation
max_recovery_attempts = {}

[grid]
; Root directory for grid directories
directory = {}
; Nominal chunk size in cells
chunk_rows = {}
chunk_cols = {}

[logging]
; Log file path (default: ~/.gridswap/gridswap.log)
file = {}
"#,
        limit,
        format_size(config.memory.reserve_bytes),
        config.memory.max_recovery_attempts,
        path_to_string(&config.grid.directory),
        config.grid.chunk_rows,
        config.grid.chunk_cols,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
