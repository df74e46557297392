//! Coordinate type definitions

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Identity of one chunk: its position in the grid of chunks.
///
/// Ordering is row-major (chunk row first, then chunk column), which is the
/// order every sweeping swap operation follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId {
    /// Chunk row, 0 at the first (lowest) row of chunks
    pub row: i32,
    /// Chunk column, 0 at the first (leftmost) column of chunks
    pub col: i32,
}

impl ChunkId {
    /// Create a chunk identity.
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk({}, {})", self.row, self.col)
    }
}

/// Global cell coordinates.
///
/// Signed so that queries outside the grid can be represented and rejected
/// by the bounds test instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    pub row: i64,
    pub col: i64,
}

impl CellId {
    #[inline]
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell({}, {})", self.row, self.col)
    }
}

/// Cell coordinates relative to the origin of the chunk that holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCell {
    pub row: i32,
    pub col: i32,
}

impl ChunkCell {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Errors that can occur while building a layout or mapping coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Grid must have at least one row and one column
    #[error("Invalid grid size: {n_rows} rows x {n_cols} cols")]
    InvalidGridSize { n_rows: i64, n_cols: i64 },

    /// Chunks must have at least one row and one column
    #[error("Invalid chunk size: {rows} rows x {cols} cols")]
    InvalidChunkSize { rows: i32, cols: i32 },

    /// The number of chunk rows or columns does not fit in 32 bits
    #[error("Too many chunks: {n_chunk_rows} chunk rows x {n_chunk_cols} chunk cols")]
    TooManyChunks { n_chunk_rows: i64, n_chunk_cols: i64 },

    /// Cell size must be strictly positive
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(Decimal),

    /// The grid extent cannot be represented as a decimal
    #[error("Grid extent overflows decimal range")]
    ExtentOverflow,
}
