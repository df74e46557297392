//! Crate-wide error type.

use crate::chunk::{CodecError, ValueKind};
use crate::coord::{ChunkId, CoordError};
use crate::grid::ImportError;
use crate::memory::OutOfMemory;
use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by grid operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// Allocation pressure; the only error recovery retries on
    #[error(transparent)]
    OutOfMemory(#[from] OutOfMemory),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Coord(#[from] CoordError),

    /// A chunk file could not be decoded
    #[error("Corrupt chunk file {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// Another grid already holds the directory lock
    #[error("Grid directory is locked: {0}")]
    DirectoryLocked(PathBuf),

    /// A chunk file holds a different cell type than the grid
    #[error("Chunk {chunk} holds {found} values but the grid stores {expected}")]
    ChunkTypeMismatch {
        chunk: ChunkId,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The grid root file could not be read or written
    #[error("Invalid grid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The directory has no grid root file
    #[error("Not a grid directory: {0}")]
    NotAGrid(PathBuf),

    /// A new grid was requested in a directory that already holds one
    #[error("Directory already holds a grid: {0}")]
    AlreadyAGrid(PathBuf),

    /// The grid on disk stores a different cell type
    #[error("Grid stores {found} values, cannot open as {expected}")]
    GridKindMismatch { expected: ValueKind, found: ValueKind },

    #[error("Cell ({row}, {col}) is outside a {n_rows}x{n_cols} grid")]
    CellOutOfRange {
        row: i64,
        col: i64,
        n_rows: i64,
        n_cols: i64,
    },

    #[error("Point ({x}, {y}) is outside the grid extent")]
    PointOutOfRange { x: Decimal, y: Decimal },

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl GridError {
    /// Whether this is allocation pressure that recovery may resolve.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, GridError::OutOfMemory(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GridError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a codec failure, surfacing allocation failure as [`GridError::OutOfMemory`].
    pub(crate) fn codec(path: impl Into<PathBuf>, source: CodecError) -> Self {
        match source {
            CodecError::OutOfMemory(oom) => GridError::OutOfMemory(oom),
            source => GridError::Codec {
                path: path.into(),
                source,
            },
        }
    }
}

/// Result alias for grid operations.
pub type GridResult<T> = Result<T, GridError>;
