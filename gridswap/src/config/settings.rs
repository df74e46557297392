//! Configuration structs.

use super::defaults::*;
use crate::memory::MemoryConfig;
use std::path::PathBuf;

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// `[memory]`: budget limit, reserve and recovery bound
    pub memory: MemoryConfig,
    /// `[grid]`: where grids live and how they are chunked
    pub grid: GridDefaults,
    /// `[logging]`
    pub logging: LoggingSettings,
}

/// Defaults applied to newly built grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDefaults {
    /// Root for grid directories
    pub directory: PathBuf,
    pub chunk_rows: i32,
    pub chunk_cols: i32,
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self {
            directory: default_grid_directory(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
            chunk_cols: DEFAULT_CHUNK_COLS,
        }
    }
}

impl GridDefaults {
    /// Directory for the grid called `name` under the configured root.
    pub fn grid_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

impl LoggingSettings {
    /// Directory part of the log file path.
    pub fn directory(&self) -> PathBuf {
        self.file
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// File name part of the log file path.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("gridswap.log")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.grid.chunk_rows, DEFAULT_CHUNK_ROWS);
        assert_eq!(config.grid.chunk_cols, DEFAULT_CHUNK_COLS);
        assert!(config.grid.directory.ends_with("gridswap"));
        assert_eq!(config.memory.reserve_bytes, DEFAULT_RESERVE_BYTES);
        assert_eq!(config.memory.max_recovery_attempts, DEFAULT_MAX_RECOVERY_ATTEMPTS);
    }

    #[test]
    fn test_logging_split() {
        let logging = LoggingSettings {
            file: PathBuf::from("/var/log/gridswap/run.log"),
        };
        assert_eq!(logging.directory(), PathBuf::from("/var/log/gridswap"));
        assert_eq!(logging.file_name(), "run.log");
    }

    #[test]
    fn test_grid_path() {
        let defaults = GridDefaults {
            directory: PathBuf::from("/data"),
            ..GridDefaults::default()
        };
        assert_eq!(defaults.grid_path("dem"), PathBuf::from("/data/dem"));
    }
}
