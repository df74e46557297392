//! INI parsing: overlays `config.ini` values on the defaults.

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::{parse_size, Size};
use ini::Ini;
use std::path::PathBuf;

/// Build a [`ConfigFile`] from parsed INI, starting from defaults.
///
/// Unknown sections and keys are ignored. Empty values keep the default,
/// except `memory.limit` where empty means no limit.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("memory")) {
        if let Some(v) = section.get("limit") {
            let v = v.trim();
            config.memory.limit = if v.is_empty() {
                None
            } else {
                Some(
                    parse_size(v)
                        .map_err(|e| ConfigFileError::invalid("memory", "limit", v, e.to_string()))?,
                )
            };
        }
        if let Some(v) = non_empty(section.get("reserve")) {
            let reserve: Size = v
                .parse()
                .map_err(|e: super::size::SizeParseError| {
                    ConfigFileError::invalid("memory", "reserve", v, e.to_string())
                })?;
            config.memory.reserve_bytes = reserve.bytes();
        }
        if let Some(v) = non_empty(section.get("max_recovery_attempts")) {
            let attempts: usize = v.parse().map_err(|_| {
                ConfigFileError::invalid(
                    "memory",
                    "max_recovery_attempts",
                    v,
                    "must be a positive integer",
                )
            })?;
            if attempts == 0 {
                return Err(ConfigFileError::invalid(
                    "memory",
                    "max_recovery_attempts",
                    v,
                    "must be at least 1",
                ));
            }
            config.memory.max_recovery_attempts = attempts;
        }
    }

    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.grid.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("chunk_rows")) {
            config.grid.chunk_rows = parse_chunk_extent("chunk_rows", v)?;
        }
        if let Some(v) = non_empty(section.get("chunk_cols")) {
            config.grid.chunk_cols = parse_chunk_extent("chunk_cols", v)?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_chunk_extent(key: &str, value: &str) -> Result<i32, ConfigFileError> {
    match value.parse::<i32>() {
        Ok(extent) if extent > 0 => Ok(extent),
        _ => Err(ConfigFileError::invalid(
            "grid",
            key,
            value,
            "must be a positive integer",
        )),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
