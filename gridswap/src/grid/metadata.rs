//! Grid root file (`thisFile`).

use super::path::metadata_path;
use crate::chunk::ValueKind;
use crate::coord::Dimensions;
use crate::error::GridError;
use crate::stats::StatsSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Format version written to new root files.
pub const METADATA_VERSION: u32 = 1;

/// Everything about a grid except chunk contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMetadata {
    pub version: u32,
    pub name: String,
    pub kind: ValueKind,
    pub n_rows: i64,
    pub n_cols: i64,
    pub chunk_n_rows: i32,
    pub chunk_n_cols: i32,
    pub dimensions: Dimensions,
    /// No-data sentinel, widened to `f64`
    pub no_data: f64,
    #[serde(default)]
    pub statistics: Option<StatsSnapshot>,
}

impl GridMetadata {
    /// Read `thisFile` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, GridError> {
        let path = metadata_path(dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GridError::NotAGrid(dir.to_path_buf()));
            }
            Err(e) => return Err(GridError::io(&path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| GridError::Metadata { path, source })
    }

    /// Write `thisFile` into `dir`, replacing any previous one.
    pub fn store(&self, dir: &Path) -> Result<(), GridError> {
        let path = metadata_path(dir);
        let json = serde_json::to_vec_pretty(self).map_err(|source| GridError::Metadata {
            path: path.clone(),
            source,
        })?;

        let temp = path.with_extension("tmp");
        fs::write(&temp, json).map_err(|e| GridError::io(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| GridError::io(&path, e))
    }
}
