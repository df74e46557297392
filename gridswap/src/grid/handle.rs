//! Public grid handle.

use super::builder::GridBuilder;
use super::metadata::GridMetadata;
use super::stats::SwapStats;
use super::store::{GridStore, Residency};
use crate::chunk::{CellValue, Chunk};
use crate::coord::{CellId, ChunkCell, ChunkId, ChunkLayout, Dimensions};
use crate::error::GridError;
use crate::memory::{retry_with_recovery, Evictable, Exclusion, GridId, MemoryManager};
use crate::stats::StatsSnapshot;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A chunked grid whose chunks swap between memory and its directory.
///
/// Every accessor runs under [`retry_with_recovery`]: allocation pressure
/// evicts chunks (from this grid first, then from any other grid registered
/// with the same [`MemoryManager`]) and the call is retried. Callers only see
/// [`GridError::OutOfMemory`] when nothing at all could be evicted.
///
/// Rows grow with `y`: row 0 is the bottom row of the extent.
pub struct Grid<T: CellValue> {
    store: Rc<RefCell<GridStore<T>>>,
    memory: MemoryManager,
    id: GridId,
    name: String,
    dir: PathBuf,
    layout: ChunkLayout,
    dimensions: Dimensions,
    no_data: T,
}

/// Grid of `f64` cells.
pub type DoubleGrid = Grid<f64>;

/// Grid of `i32` cells.
pub type IntGrid = Grid<i32>;

impl<T: CellValue> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<T: CellValue> Grid<T> {
    /// Wrap a store and register it with `memory`.
    pub(crate) fn from_store(store: GridStore<T>, memory: MemoryManager) -> Self {
        let id = store.id();
        let name = store.name().to_string();
        let dir = store.directory().to_path_buf();
        let layout = *store.layout();
        let dimensions = store.dimensions().clone();
        let no_data = store.no_data();

        let store = Rc::new(RefCell::new(store));
        let handle: Rc<RefCell<dyn Evictable>> = store.clone();
        memory.register(id, &name, Rc::downgrade(&handle));

        Self {
            store,
            memory,
            id,
            name,
            dir,
            layout,
            dimensions,
            no_data,
        }
    }

    /// Open an existing grid directory with default options.
    pub fn open(dir: impl AsRef<Path>, memory: &MemoryManager) -> Result<Self, GridError> {
        GridBuilder::new(dir.as_ref()).open(memory)
    }

    /// Start building a new grid in `dir`.
    pub fn builder(dir: impl AsRef<Path>) -> GridBuilder<T> {
        GridBuilder::new(dir.as_ref())
    }

    fn with_recovery<R>(
        &self,
        exclusion: &Exclusion,
        op: impl FnMut(&mut GridStore<T>) -> Result<R, GridError>,
    ) -> Result<R, GridError> {
        retry_with_recovery(&self.store, &self.memory, exclusion, op)
    }

    fn protect(&self, chunk: ChunkId) -> Exclusion {
        Exclusion::chunk(self.id, chunk)
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn no_data(&self) -> T {
        self.no_data
    }

    pub fn n_rows(&self) -> i64 {
        self.layout.n_rows()
    }

    pub fn n_cols(&self) -> i64 {
        self.layout.n_cols()
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Value at (`row`, `col`); no-data for cells of chunks never written.
    pub fn get_cell(&self, row: i64, col: i64) -> Result<T, GridError> {
        let cell = CellId::new(row, col);
        let exclusion = self.protect(self.layout.chunk_id_of(cell));
        self.with_recovery(&exclusion, |store| store.get_cell(cell))
    }

    /// Write `value` at (`row`, `col`), returning the previous value.
    pub fn set_cell(&self, row: i64, col: i64, value: T) -> Result<T, GridError> {
        let cell = CellId::new(row, col);
        let exclusion = self.protect(self.layout.chunk_id_of(cell));
        self.with_recovery(&exclusion, |store| store.set_cell(cell, value))
    }

    /// Write into a cell known to hold no-data, as when populating a new grid.
    pub fn init_cell(&self, row: i64, col: i64, value: T) -> Result<(), GridError> {
        let cell = CellId::new(row, col);
        let exclusion = self.protect(self.layout.chunk_id_of(cell));
        self.with_recovery(&exclusion, |store| store.init_cell(cell, value))
    }

    /// Cell containing real-world point (`x`, `y`); max edges are inside.
    pub fn cell_at(&self, x: Decimal, y: Decimal) -> Option<CellId> {
        self.dimensions.cell_of(x, y, &self.layout)
    }

    /// Cell nearest to (`x`, `y`), clamping points outside the extent.
    pub fn nearest_cell(&self, x: Decimal, y: Decimal) -> CellId {
        self.dimensions.nearest_cell(x, y, &self.layout)
    }

    pub fn get_cell_at(&self, x: Decimal, y: Decimal) -> Result<T, GridError> {
        let cell = self
            .cell_at(x, y)
            .ok_or(GridError::PointOutOfRange { x, y })?;
        self.get_cell(cell.row, cell.col)
    }

    pub fn set_cell_at(&self, x: Decimal, y: Decimal, value: T) -> Result<T, GridError> {
        let cell = self
            .cell_at(x, y)
            .ok_or(GridError::PointOutOfRange { x, y })?;
        self.set_cell(cell.row, cell.col, value)
    }

    /// Load chunk `id` if it has a file. Returns whether it is resident.
    pub fn ensure_resident(&self, id: ChunkId) -> Result<bool, GridError> {
        let residency = self.with_recovery(&self.protect(id), |store| store.ensure_resident(id))?;
        Ok(residency == Residency::Resident)
    }

    pub fn is_resident(&self, id: ChunkId) -> bool {
        self.store.borrow().residency().is_resident(&id)
    }

    pub fn is_trivial(&self, id: ChunkId) -> bool {
        self.store.borrow().residency().is_trivial(&id)
    }

    /// Resident and non-trivial: an eviction candidate.
    pub fn is_worth_swapping(&self, id: ChunkId) -> bool {
        self.store.borrow().residency().is_worth_swapping(&id)
    }

    /// Resident chunk identities, row-major.
    pub fn resident_chunks(&self) -> Vec<ChunkId> {
        self.store.borrow().residency().resident_ids().collect()
    }

    /// Eviction candidates in the order [`persist_and_evict_one`](Self::persist_and_evict_one) takes them.
    pub fn eviction_candidates(&self) -> Vec<ChunkId> {
        self.store.borrow().residency().candidates().collect()
    }

    /// Resident chunks with unsaved changes.
    pub fn dirty_count(&self) -> usize {
        self.store.borrow().dirty_count()
    }

    /// Write chunk `id` to disk if dirty. `false` when it is not resident.
    pub fn persist_one(&self, id: ChunkId) -> Result<bool, GridError> {
        self.with_recovery(&self.protect(id), |store| store.persist_one(id))
    }

    /// Swap out the oldest eviction candidate.
    ///
    /// Candidates are taken in the order they became candidates, not
    /// row-major.
    pub fn persist_and_evict_one(&self) -> Result<Option<ChunkId>, GridError> {
        self.with_recovery(&Exclusion::none(), |store| store.persist_and_evict_one())
    }

    /// Swap out every candidate except `excluded`.
    pub fn persist_and_evict_all_except(&self, excluded: ChunkId) -> Result<BTreeSet<ChunkId>, GridError> {
        let mut evicted = BTreeSet::new();
        self.with_recovery(&self.protect(excluded), |store| {
            store.persist_and_evict_all_except(excluded, &mut evicted)
        })?;
        Ok(evicted)
    }

    /// Swap out every candidate not in `excluded`.
    pub fn persist_and_evict_all_except_set(
        &self,
        excluded: &BTreeSet<ChunkId>,
    ) -> Result<BTreeSet<ChunkId>, GridError> {
        let mut exclusion = Exclusion::none();
        for id in excluded {
            exclusion.insert(self.id, *id);
        }
        let mut evicted = BTreeSet::new();
        self.with_recovery(&exclusion, |store| {
            store.persist_and_evict_all_except_set(excluded, &mut evicted)
        })?;
        Ok(evicted)
    }

    /// Swap out candidates from `first` to `last` inclusive, row-major.
    /// Returns how many were evicted.
    pub fn persist_and_evict_range(&self, first: ChunkId, last: ChunkId) -> Result<usize, GridError> {
        let mut evicted = BTreeSet::new();
        self.with_recovery(&Exclusion::none(), |store| {
            store.persist_and_evict_range(first, last, &mut evicted)
        })?;
        Ok(evicted.len())
    }

    /// Swap out every candidate.
    pub fn persist_and_evict_all(&self) -> Result<BTreeSet<ChunkId>, GridError> {
        let mut evicted = BTreeSet::new();
        self.with_recovery(&Exclusion::none(), |store| store.persist_and_evict_all(&mut evicted))?;
        Ok(evicted)
    }

    /// Persist dirty chunks (keeping them resident) and rewrite `thisFile`.
    /// Returns how many chunk files were written.
    pub fn save(&self) -> Result<usize, GridError> {
        self.with_recovery(&Exclusion::none(), |store| store.save())
    }

    /// Save and release the grid.
    pub fn close(self) -> Result<(), GridError> {
        self.save().map(|_| ())
    }

    /// Visit every cell: chunks in row-major order, cells row-major within
    /// each chunk.
    ///
    /// Each chunk is copied out before `f` runs, so `f` may access this grid.
    pub fn for_each_cell(&self, mut f: impl FnMut(CellId, T)) -> Result<(), GridError> {
        for id in self.layout.chunk_ids() {
            let snapshot = self.with_recovery(&self.protect(id), |store| store.chunk_snapshot(id))?;
            let (n_rows, n_cols) = self.layout.chunk_shape(id);
            for row in 0..n_rows {
                for col in 0..n_cols {
                    let offset = ChunkCell::new(row, col);
                    let value = snapshot
                        .as_ref()
                        .map_or(self.no_data, |chunk| chunk.get(offset));
                    f(self.layout.join(id, offset), value);
                }
            }
            if let Some(chunk) = snapshot {
                self.memory.release(chunk.heap_bytes());
            }
        }
        Ok(())
    }

    /// Copy every cell of `source` that falls inside this grid, by row and
    /// column. Values pass through `f64`; the source no-data sentinel maps
    /// to this grid's sentinel. Returns the number of cells that changed.
    ///
    /// Recovery protects both the source chunk being read and the
    /// destination chunk being written.
    pub fn copy_from<S: CellValue>(&self, source: &Grid<S>) -> Result<u64, GridError> {
        let mut changed = 0u64;
        for source_id in source.layout.chunk_ids() {
            let guard = source.protect(source_id);
            let snapshot =
                source.with_recovery(&guard, |store| store.chunk_snapshot(source_id))?;
            let result = self.copy_chunk(source, source_id, snapshot.as_ref(), &guard);
            if let Some(chunk) = &snapshot {
                source.memory.release(chunk.heap_bytes());
            }
            changed += result?;
        }
        Ok(changed)
    }

    fn copy_chunk<S: CellValue>(
        &self,
        source: &Grid<S>,
        source_id: ChunkId,
        snapshot: Option<&Chunk<S>>,
        guard: &Exclusion,
    ) -> Result<u64, GridError> {
        let mut changed = 0;
        let (n_rows, n_cols) = source.layout.chunk_shape(source_id);
        for row in 0..n_rows {
            for col in 0..n_cols {
                let offset = ChunkCell::new(row, col);
                let cell = source.layout.join(source_id, offset);
                if !self.layout.contains(cell) {
                    continue;
                }

                let value = snapshot.map_or(source.no_data, |chunk| chunk.get(offset));
                let value = if value.same(source.no_data) {
                    self.no_data
                } else {
                    T::from_f64(value.to_f64())
                };

                let exclusion = guard.clone().with(self.id, self.layout.chunk_id_of(cell));
                let old = self.with_recovery(&exclusion, |store| store.set_cell(cell, value))?;
                if !old.same(value) {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    pub fn swap_stats(&self) -> SwapStats {
        self.store.borrow().swap_stats()
    }

    /// Saved form of the statistics collaborator, if it has one.
    pub fn statistics(&self) -> Option<StatsSnapshot> {
        self.store.borrow().statistics().snapshot()
    }

    /// Current root file contents.
    pub fn metadata(&self) -> GridMetadata {
        self.store.borrow().metadata()
    }
}

impl<T: CellValue> Drop for Grid<T> {
    fn drop(&mut self) {
        self.memory.unregister(self.id);
        if let Ok(mut store) = self.store.try_borrow_mut() {
            store.flush_and_release();
        }
    }
}
