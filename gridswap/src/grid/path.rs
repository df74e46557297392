//! On-disk layout of a grid directory.
//!
//! ```text
//! <grid_dir>/thisFile        grid metadata (JSON)
//! <grid_dir>/lock            directory lock
//! <grid_dir>/<row>_<col>     one file per swapped chunk
//! ```

use crate::coord::ChunkId;
use std::path::{Path, PathBuf};

/// Name of the grid root file.
pub const METADATA_FILE: &str = "thisFile";

/// Name of the directory lock file.
pub const LOCK_FILE: &str = "lock";

/// File name of the swap file for `id`.
///
/// # Example
///
/// ```
/// use gridswap::coord::ChunkId;
/// use gridswap::grid::chunk_file_name;
///
/// assert_eq!(chunk_file_name(ChunkId::new(3, 12)), "3_12");
/// ```
pub fn chunk_file_name(id: ChunkId) -> String {
    format!("{}_{}", id.row, id.col)
}

/// Full path of the swap file for `id` under `dir`.
pub fn chunk_path(dir: &Path, id: ChunkId) -> PathBuf {
    dir.join(chunk_file_name(id))
}

/// Parse a chunk identity from a swap file name.
///
/// Returns `None` for anything that is not `<row>_<col>` with non-negative
/// integers, including the metadata and lock files.
pub fn parse_chunk_file_name(name: &str) -> Option<ChunkId> {
    let (row, col) = name.split_once('_')?;
    let row: i32 = row.parse().ok()?;
    let col: i32 = col.parse().ok()?;
    if row < 0 || col < 0 {
        return None;
    }
    Some(ChunkId::new(row, col))
}

pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

pub fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}
