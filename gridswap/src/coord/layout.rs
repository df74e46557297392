//! Grid-to-chunk-to-cell index arithmetic.

use super::types::{CellId, ChunkCell, ChunkId, CoordError};

/// Partitioning of an `n_rows` x `n_cols` grid into chunks.
///
/// All chunks are `chunk_n_rows` x `chunk_n_cols` except those in the last
/// chunk row and last chunk column, which are truncated to the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    n_rows: i64,
    n_cols: i64,
    chunk_n_rows: i32,
    chunk_n_cols: i32,
    n_chunk_rows: i32,
    n_chunk_cols: i32,
}

impl ChunkLayout {
    /// Create a layout.
    ///
    /// # Errors
    ///
    /// Fails if either grid dimension or chunk dimension is not positive, or
    /// if the resulting number of chunk rows/columns does not fit in an `i32`.
    pub fn new(
        n_rows: i64,
        n_cols: i64,
        chunk_n_rows: i32,
        chunk_n_cols: i32,
    ) -> Result<Self, CoordError> {
        if n_rows <= 0 || n_cols <= 0 {
            return Err(CoordError::InvalidGridSize { n_rows, n_cols });
        }
        if chunk_n_rows <= 0 || chunk_n_cols <= 0 {
            return Err(CoordError::InvalidChunkSize {
                rows: chunk_n_rows,
                cols: chunk_n_cols,
            });
        }

        let n_chunk_rows = ceil_div(n_rows, chunk_n_rows as i64);
        let n_chunk_cols = ceil_div(n_cols, chunk_n_cols as i64);
        let (Ok(rows), Ok(cols)) = (i32::try_from(n_chunk_rows), i32::try_from(n_chunk_cols))
        else {
            return Err(CoordError::TooManyChunks {
                n_chunk_rows,
                n_chunk_cols,
            });
        };

        Ok(Self {
            n_rows,
            n_cols,
            chunk_n_rows,
            chunk_n_cols,
            n_chunk_rows: rows,
            n_chunk_cols: cols,
        })
    }

    pub fn n_rows(&self) -> i64 {
        self.n_rows
    }

    pub fn n_cols(&self) -> i64 {
        self.n_cols
    }

    /// Nominal chunk height in cells.
    pub fn chunk_n_rows(&self) -> i32 {
        self.chunk_n_rows
    }

    /// Nominal chunk width in cells.
    pub fn chunk_n_cols(&self) -> i32 {
        self.chunk_n_cols
    }

    pub fn n_chunk_rows(&self) -> i32 {
        self.n_chunk_rows
    }

    pub fn n_chunk_cols(&self) -> i32 {
        self.n_chunk_cols
    }

    /// Total number of chunks.
    pub fn n_chunks(&self) -> u64 {
        self.n_chunk_rows as u64 * self.n_chunk_cols as u64
    }

    #[inline]
    pub fn chunk_row_of(&self, row: i64) -> i32 {
        row.div_euclid(self.chunk_n_rows as i64) as i32
    }

    #[inline]
    pub fn chunk_col_of(&self, col: i64) -> i32 {
        col.div_euclid(self.chunk_n_cols as i64) as i32
    }

    #[inline]
    pub fn cell_row_in_chunk(&self, row: i64) -> i32 {
        (row - self.chunk_row_of(row) as i64 * self.chunk_n_rows as i64) as i32
    }

    #[inline]
    pub fn cell_col_in_chunk(&self, col: i64) -> i32 {
        (col - self.chunk_col_of(col) as i64 * self.chunk_n_cols as i64) as i32
    }

    #[inline]
    pub fn global_row(&self, chunk_row: i32, cell_row: i32) -> i64 {
        chunk_row as i64 * self.chunk_n_rows as i64 + cell_row as i64
    }

    #[inline]
    pub fn global_col(&self, chunk_col: i32, cell_col: i32) -> i64 {
        chunk_col as i64 * self.chunk_n_cols as i64 + cell_col as i64
    }

    /// Chunk holding `cell`.
    #[inline]
    pub fn chunk_id_of(&self, cell: CellId) -> ChunkId {
        ChunkId::new(self.chunk_row_of(cell.row), self.chunk_col_of(cell.col))
    }

    /// Chunk holding `cell` and the cell's position inside it.
    #[inline]
    pub fn split(&self, cell: CellId) -> (ChunkId, ChunkCell) {
        (
            self.chunk_id_of(cell),
            ChunkCell::new(
                self.cell_row_in_chunk(cell.row),
                self.cell_col_in_chunk(cell.col),
            ),
        )
    }

    /// Inverse of [`split`](Self::split).
    #[inline]
    pub fn join(&self, id: ChunkId, cell: ChunkCell) -> CellId {
        CellId::new(
            self.global_row(id.row, cell.row),
            self.global_col(id.col, cell.col),
        )
    }

    /// Actual height of the chunks in `chunk_row`.
    pub fn chunk_rows_in(&self, chunk_row: i32) -> i32 {
        if chunk_row == self.n_chunk_rows - 1 {
            (self.n_rows - (self.n_chunk_rows as i64 - 1) * self.chunk_n_rows as i64) as i32
        } else {
            self.chunk_n_rows
        }
    }

    /// Actual width of the chunks in `chunk_col`.
    pub fn chunk_cols_in(&self, chunk_col: i32) -> i32 {
        if chunk_col == self.n_chunk_cols - 1 {
            (self.n_cols - (self.n_chunk_cols as i64 - 1) * self.chunk_n_cols as i64) as i32
        } else {
            self.chunk_n_cols
        }
    }

    /// Actual `(rows, cols)` extent of chunk `id`.
    pub fn chunk_shape(&self, id: ChunkId) -> (i32, i32) {
        (self.chunk_rows_in(id.row), self.chunk_cols_in(id.col))
    }

    /// Bounds test: `0 <= row < n_rows` and `0 <= col < n_cols`.
    #[inline]
    pub fn in_grid(&self, row: i64, col: i64) -> bool {
        (0..self.n_rows).contains(&row) && (0..self.n_cols).contains(&col)
    }

    #[inline]
    pub fn contains(&self, cell: CellId) -> bool {
        self.in_grid(cell.row, cell.col)
    }

    pub fn contains_chunk(&self, id: ChunkId) -> bool {
        (0..self.n_chunk_rows).contains(&id.row) && (0..self.n_chunk_cols).contains(&id.col)
    }

    /// All chunk identities in row-major order.
    pub fn chunk_ids(&self) -> ChunkIds {
        ChunkIds {
            n_chunk_cols: self.n_chunk_cols,
            current: 0,
            end: self.n_chunks(),
        }
    }
}

fn ceil_div(n: i64, d: i64) -> i64 {
    (n - 1) / d + 1
}

/// Iterator over every chunk of a layout in row-major order.
#[derive(Debug, Clone)]
pub struct ChunkIds {
    n_chunk_cols: i32,
    current: u64,
    end: u64,
}

impl Iterator for ChunkIds {
    type Item = ChunkId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }

        let cols = self.n_chunk_cols as u64;
        let id = ChunkId::new((self.current / cols) as i32, (self.current % cols) as i32);
        self.current += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIds {}
