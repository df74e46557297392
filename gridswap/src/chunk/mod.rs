//! Chunk storage.
//!
//! A [`Chunk`] holds the cells of one rectangular sub-region of a grid. Two
//! encodings exist: [`ChunkData::Uniform`], a single value standing for every
//! cell (trivial, never worth swapping), and [`ChunkData::Dense`], a row-major
//! buffer. Writing a differing value into a uniform chunk expands it.

mod codec;
mod value;

pub use codec::{decode, encode, peek_header, ChunkHeader, CodecError, Encoding};
pub use value::{CellValue, ValueKind};

use crate::coord::ChunkCell;
use crate::memory::OutOfMemory;

/// Cell storage of a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkData<T> {
    /// Every cell holds the same value.
    Uniform(T),
    /// Row-major cell values, `n_rows * n_cols` long.
    Dense(Vec<T>),
}

/// The cells of one chunk plus its swap bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    n_rows: i32,
    n_cols: i32,
    data: ChunkData<T>,
    /// Whether the on-disk copy matches this one.
    swap_up_to_date: bool,
}

impl<T: CellValue> Chunk<T> {
    /// A trivial chunk in which every cell is `value`.
    ///
    /// Uniform chunks start clean: they stand for the grid default and have
    /// nothing to persist.
    pub fn uniform(n_rows: i32, n_cols: i32, value: T) -> Self {
        Self {
            n_rows,
            n_cols,
            data: ChunkData::Uniform(value),
            swap_up_to_date: true,
        }
    }

    /// A dense chunk with every cell set to `fill`.
    pub fn dense(n_rows: i32, n_cols: i32, fill: T) -> Result<Self, OutOfMemory> {
        let values = filled_buffer(cell_count(n_rows, n_cols), fill)?;
        Ok(Self {
            n_rows,
            n_cols,
            data: ChunkData::Dense(values),
            swap_up_to_date: false,
        })
    }

    /// Rebuild a chunk from decoded parts. The result is marked clean.
    pub(crate) fn from_parts(n_rows: i32, n_cols: i32, data: ChunkData<T>) -> Self {
        Self {
            n_rows,
            n_cols,
            data,
            swap_up_to_date: true,
        }
    }

    pub fn n_rows(&self) -> i32 {
        self.n_rows
    }

    pub fn n_cols(&self) -> i32 {
        self.n_cols
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        cell_count(self.n_rows, self.n_cols)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self) -> &ChunkData<T> {
        &self.data
    }

    /// Uniform chunks are trivial: cheap to regenerate, never swapped.
    pub fn is_trivial(&self) -> bool {
        matches!(self.data, ChunkData::Uniform(_))
    }

    /// Heap bytes owned by the cell buffer.
    pub fn heap_bytes(&self) -> usize {
        match &self.data {
            ChunkData::Uniform(_) => 0,
            ChunkData::Dense(_) => self.dense_bytes(),
        }
    }

    /// Heap bytes a dense buffer of this shape needs.
    pub fn dense_bytes(&self) -> usize {
        self.len() * T::WIDTH
    }

    pub fn get(&self, cell: ChunkCell) -> T {
        match &self.data {
            ChunkData::Uniform(value) => *value,
            ChunkData::Dense(values) => values[self.index(cell)],
        }
    }

    /// Whether writing `value` at `cell` would require expanding to dense.
    pub fn needs_expansion(&self, cell: ChunkCell, value: T) -> bool {
        self.is_trivial() && !self.get(cell).same(value)
    }

    /// Convert a uniform chunk to a dense one. No-op when already dense.
    pub fn expand(&mut self) -> Result<(), OutOfMemory> {
        if let ChunkData::Uniform(value) = self.data {
            self.data = ChunkData::Dense(filled_buffer(self.len(), value)?);
        }
        Ok(())
    }

    /// Write `value` at `cell`, returning the previous value.
    ///
    /// The chunk is marked dirty only when the value actually changes.
    pub fn set(&mut self, cell: ChunkCell, value: T) -> Result<T, OutOfMemory> {
        let old = self.get(cell);
        if old.same(value) {
            return Ok(old);
        }

        self.expand()?;
        let index = self.index(cell);
        if let ChunkData::Dense(values) = &mut self.data {
            values[index] = value;
        }
        self.swap_up_to_date = false;
        Ok(old)
    }

    /// Copy the chunk, reporting allocator failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self, OutOfMemory> {
        let data = match &self.data {
            ChunkData::Uniform(value) => ChunkData::Uniform(*value),
            ChunkData::Dense(values) => {
                let mut copy = Vec::new();
                copy.try_reserve_exact(values.len())
                    .map_err(|_| OutOfMemory::Heap {
                        requested: self.dense_bytes(),
                    })?;
                copy.extend_from_slice(values);
                ChunkData::Dense(copy)
            }
        };
        Ok(Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            data,
            swap_up_to_date: self.swap_up_to_date,
        })
    }

    pub fn is_swap_up_to_date(&self) -> bool {
        self.swap_up_to_date
    }

    pub fn mark_dirty(&mut self) {
        self.swap_up_to_date = false;
    }

    pub fn mark_clean(&mut self) {
        self.swap_up_to_date = true;
    }

    #[inline]
    fn index(&self, cell: ChunkCell) -> usize {
        debug_assert!(cell.row >= 0 && cell.row < self.n_rows);
        debug_assert!(cell.col >= 0 && cell.col < self.n_cols);
        cell.row as usize * self.n_cols as usize + cell.col as usize
    }
}

fn cell_count(n_rows: i32, n_cols: i32) -> usize {
    n_rows.max(0) as usize * n_cols.max(0) as usize
}

/// Allocate a buffer of `len` copies of `fill`, reporting allocator failure.
pub(crate) fn filled_buffer<T: CellValue>(len: usize, fill: T) -> Result<Vec<T>, OutOfMemory> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| OutOfMemory::Heap {
            requested: len.saturating_mul(T::WIDTH),
        })?;
    values.resize(len, fill);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_chunk_is_trivial_and_clean() {
        let chunk = Chunk::uniform(4, 3, -9999.0f64);
        assert!(chunk.is_trivial());
        assert!(chunk.is_swap_up_to_date());
        assert_eq!(chunk.heap_bytes(), 0);
        assert_eq!(chunk.dense_bytes(), 12 * 8);
        assert_eq!(chunk.get(ChunkCell::new(3, 2)), -9999.0);
    }

    #[test]
    fn test_set_same_value_keeps_uniform() {
        let mut chunk = Chunk::uniform(2, 2, 0i32);
        let old = chunk.set(ChunkCell::new(1, 1), 0).unwrap();

        assert_eq!(old, 0);
        assert!(chunk.is_trivial());
        assert!(chunk.is_swap_up_to_date());
    }

    #[test]
    fn test_set_nan_over_nan_keeps_uniform() {
        let mut chunk = Chunk::uniform(2, 2, f64::NAN);
        assert!(!chunk.needs_expansion(ChunkCell::new(0, 0), f64::NAN));

        let old = chunk.set(ChunkCell::new(0, 0), f64::NAN).unwrap();

        assert!(old.is_nan());
        assert!(chunk.is_trivial());
        assert!(chunk.is_swap_up_to_date());
    }

    #[test]
    fn test_set_different_value_expands() {
        let mut chunk = Chunk::uniform(2, 3, 0i32);
        assert!(chunk.needs_expansion(ChunkCell::new(0, 1), 7));

        let old = chunk.set(ChunkCell::new(0, 1), 7).unwrap();

        assert_eq!(old, 0);
        assert!(!chunk.is_trivial());
        assert!(!chunk.is_swap_up_to_date());
        assert_eq!(chunk.heap_bytes(), 6 * 4);
        assert_eq!(chunk.get(ChunkCell::new(0, 1)), 7);
        assert_eq!(chunk.get(ChunkCell::new(1, 2)), 0);
        assert_eq!(chunk.data(), &ChunkData::Dense(vec![0, 7, 0, 0, 0, 0]));
    }

    #[test]
    fn test_dense_chunk_starts_dirty() {
        let mut chunk = Chunk::dense(2, 2, 1.0f64).unwrap();
        assert!(!chunk.is_trivial());
        assert!(!chunk.is_swap_up_to_date());

        chunk.mark_clean();
        assert!(chunk.is_swap_up_to_date());
        chunk.mark_dirty();
        assert!(!chunk.is_swap_up_to_date());
    }

    #[test]
    fn test_try_clone_keeps_flags() {
        let mut chunk = Chunk::uniform(2, 2, 0i32);
        chunk.set(ChunkCell::new(1, 0), 3).unwrap();
        let copy = chunk.try_clone().unwrap();

        assert_eq!(copy, chunk);
        assert!(!copy.is_swap_up_to_date());
    }

    #[test]
    fn test_truncated_chunk_shape() {
        let chunk = Chunk::uniform(232, 256, 0.0f64);
        assert_eq!(chunk.len(), 232 * 256);
        assert!(!chunk.is_empty());
    }
}
