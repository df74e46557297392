//! Non-retrying grid core.
//!
//! Every operation here may fail with [`GridError::OutOfMemory`]; the public
//! [`super::Grid`] handle wraps each call in recovery. Chunks are always
//! written to disk before their in-memory entry is dropped.

use super::lock::DirectoryLock;
use super::metadata::{GridMetadata, METADATA_VERSION};
use super::path::chunk_path;
use super::stats::SwapStats;
use crate::chunk::{decode, encode, peek_header, CellValue, Chunk, CodecError, ValueKind};
use crate::coord::{CellId, ChunkCell, ChunkId, ChunkLayout, Dimensions};
use crate::error::GridError;
use crate::log::Logger;
use crate::memory::{Evictable, Exclusion, GridId, MemoryManager};
use crate::residency::ResidencyMap;
use crate::stats::Statistics;
use crate::{log_debug, log_error, log_warn};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of [`GridStore::ensure_resident`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// The chunk is in memory
    Resident,
    /// No chunk object and no file; every cell is no-data
    Missing,
    /// The file holds another cell type and the grid is lenient; every
    /// cell reads as no-data
    Mismatched,
}

/// Grid state and the operations that do not retry.
pub struct GridStore<T: CellValue> {
    id: GridId,
    name: String,
    dir: PathBuf,
    layout: ChunkLayout,
    dimensions: Dimensions,
    no_data: T,
    residency: ResidencyMap<T>,
    statistics: Box<dyn Statistics>,
    swap_stats: SwapStats,
    strict_chunk_types: bool,
    memory: MemoryManager,
    logger: Arc<dyn Logger>,
    _lock: DirectoryLock,
}

/// Construction parameters for [`GridStore`].
pub(crate) struct StoreParts<T> {
    pub id: GridId,
    pub name: String,
    pub dir: PathBuf,
    pub layout: ChunkLayout,
    pub dimensions: Dimensions,
    pub no_data: T,
    pub statistics: Box<dyn Statistics>,
    pub strict_chunk_types: bool,
    pub memory: MemoryManager,
    pub logger: Arc<dyn Logger>,
    pub lock: DirectoryLock,
}

impl<T: CellValue> GridStore<T> {
    pub(crate) fn new(parts: StoreParts<T>) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            dir: parts.dir,
            layout: parts.layout,
            dimensions: parts.dimensions,
            no_data: parts.no_data,
            residency: ResidencyMap::new(),
            statistics: parts.statistics,
            swap_stats: SwapStats::new(),
            strict_chunk_types: parts.strict_chunk_types,
            memory: parts.memory,
            logger: parts.logger,
            _lock: parts.lock,
        }
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

    pub fn residency(&self) -> &ResidencyMap<T> {
        &self.residency
    }

    pub fn statistics(&self) -> &dyn Statistics {
        self.statistics.as_ref()
    }

    pub fn swap_stats(&self) -> SwapStats {
        let mut stats = self.swap_stats.clone();
        stats.update_resident(self.residency.resident_count(), self.residency.resident_bytes());
        stats
    }

    /// Register every chunk file found in the grid directory as known but
    /// evicted.
    pub(crate) fn scan_chunk_files(&mut self) -> Result<usize, GridError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| GridError::io(&self.dir, e))?;
        let mut found = 0;
        for entry in entries {
            let entry = entry.map_err(|e| GridError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(super::path::parse_chunk_file_name) else {
                continue;
            };
            if !self.layout.contains_chunk(id) {
                log_warn!(self.logger, "Ignoring {} outside {}", id, self.name);
                continue;
            }
            if self.residency.register(id) {
                found += 1;
            }
        }
        Ok(found)
    }

    fn check_cell(&self, cell: CellId) -> Result<(), GridError> {
        if self.layout.contains(cell) {
            Ok(())
        } else {
            Err(GridError::CellOutOfRange {
                row: cell.row,
                col: cell.col,
                n_rows: self.layout.n_rows(),
                n_cols: self.layout.n_cols(),
            })
        }
    }

    /// Load chunk `id` from its file unless it is already resident.
    ///
    /// A missing file is not an error. No chunk object is created for it.
    pub fn ensure_resident(&mut self, id: ChunkId) -> Result<Residency, GridError> {
        if self.residency.is_resident(&id) {
            self.swap_stats.record_resident_hit();
            return Ok(Residency::Resident);
        }

        let path = chunk_path(&self.dir, id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.swap_stats.record_missing_load();
                return Ok(Residency::Missing);
            }
            Err(e) => return Err(GridError::io(&path, e)),
        };

        let header = peek_header(&bytes).map_err(|e| GridError::codec(&path, e))?;
        if header.kind != T::KIND {
            return self.type_mismatch(id, header.kind);
        }
        let (n_rows, n_cols) = self.layout.chunk_shape(id);
        if (header.n_rows, header.n_cols) != (n_rows, n_cols) {
            return Err(GridError::codec(
                &path,
                CodecError::InvalidShape {
                    n_rows: header.n_rows,
                    n_cols: header.n_cols,
                },
            ));
        }

        let charged = header.heap_bytes();
        self.memory.charge(charged)?;
        let chunk = match decode::<T>(&bytes) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.memory.release(charged);
                return Err(GridError::codec(&path, e));
            }
        };

        self.residency.insert(id, chunk);
        self.swap_stats.record_load();
        log_debug!(self.logger, "Loaded {} of {}", id, self.name);
        Ok(Residency::Resident)
    }

    fn type_mismatch(&mut self, id: ChunkId, found: ValueKind) -> Result<Residency, GridError> {
        self.swap_stats.record_type_mismatch();
        if self.strict_chunk_types {
            return Err(GridError::ChunkTypeMismatch {
                chunk: id,
                expected: T::KIND,
                found,
            });
        }
        log_warn!(
            self.logger,
            "{} of {} holds {} values, expected {}; reading as no-data",
            id,
            self.name,
            found,
            T::KIND
        );
        Ok(Residency::Mismatched)
    }

    pub fn get_cell(&mut self, cell: CellId) -> Result<T, GridError> {
        self.check_cell(cell)?;
        let (id, offset) = self.layout.split(cell);
        match self.ensure_resident(id)? {
            Residency::Resident => Ok(self
                .residency
                .get(&id)
                .map_or(self.no_data, |chunk| chunk.get(offset))),
            Residency::Missing | Residency::Mismatched => Ok(self.no_data),
        }
    }

    /// Write `value`, returning the previous value.
    pub fn set_cell(&mut self, cell: CellId, value: T) -> Result<T, GridError> {
        self.check_cell(cell)?;
        let (id, offset) = self.layout.split(cell);
        let Some(old) = self.write(id, offset, value)? else {
            return Ok(self.no_data);
        };
        if !old.same(value) {
            self.statistics
                .on_change(value.to_f64(), old.to_f64(), self.no_data.to_f64());
        }
        Ok(old)
    }

    /// Write `value` into a cell of a grid being populated.
    ///
    /// The cell is taken to hold no-data beforehand, so statistics see a new
    /// data value whenever `value` is not the sentinel.
    pub fn init_cell(&mut self, cell: CellId, value: T) -> Result<(), GridError> {
        self.check_cell(cell)?;
        let (id, offset) = self.layout.split(cell);
        if self.write(id, offset, value)?.is_some() && !value.same(self.no_data) {
            self.statistics
                .on_change(value.to_f64(), self.no_data.to_f64(), self.no_data.to_f64());
        }
        Ok(())
    }

    /// Write into chunk `id`, creating it on first write.
    ///
    /// Returns `None` when the chunk file holds another cell type and the
    /// write was skipped.
    fn write(&mut self, id: ChunkId, offset: ChunkCell, value: T) -> Result<Option<T>, GridError> {
        match self.ensure_resident(id)? {
            Residency::Resident => {}
            Residency::Missing => {
                let (n_rows, n_cols) = self.layout.chunk_shape(id);
                self.residency
                    .insert(id, Chunk::uniform(n_rows, n_cols, self.no_data));
            }
            Residency::Mismatched => return Ok(None),
        }

        let charged = match self.residency.get(&id) {
            Some(chunk) if chunk.needs_expansion(offset, value) => chunk.dense_bytes(),
            _ => 0,
        };
        self.memory.charge(charged)?;

        match self.residency.update(&id, |chunk| chunk.set(offset, value)) {
            Some(Ok(old)) => Ok(Some(old)),
            Some(Err(e)) => {
                self.memory.release(charged);
                Err(e.into())
            }
            None => {
                self.memory.release(charged);
                Ok(None)
            }
        }
    }

    /// Copy of chunk `id`, or `None` when every cell is no-data.
    ///
    /// The copy's heap bytes are charged to the budget; the caller releases
    /// them with [`MemoryManager::release`] once done.
    pub fn chunk_snapshot(&mut self, id: ChunkId) -> Result<Option<Chunk<T>>, GridError> {
        if self.ensure_resident(id)? != Residency::Resident {
            return Ok(None);
        }
        let Some(chunk) = self.residency.get(&id) else {
            return Ok(None);
        };
        let charged = chunk.heap_bytes();
        self.memory.charge(charged)?;
        match chunk.try_clone() {
            Ok(copy) => Ok(Some(copy)),
            Err(e) => {
                self.memory.release(charged);
                Err(e.into())
            }
        }
    }

    /// Write chunk `id` to its file if it is dirty.
    ///
    /// Returns `false` when `id` has no resident chunk. Trivial chunks are
    /// never written and report `true`.
    pub fn persist_one(&mut self, id: ChunkId) -> Result<bool, GridError> {
        let Some(chunk) = self.residency.get(&id) else {
            return Ok(false);
        };
        if chunk.is_trivial() {
            return Ok(true);
        }
        if chunk.is_swap_up_to_date() {
            self.swap_stats.record_clean_skip();
            return Ok(true);
        }

        let bytes = encode(chunk)?;
        let path = chunk_path(&self.dir, id);
        let temp = path.with_extension("tmp");
        fs::write(&temp, &bytes).map_err(|e| GridError::io(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| GridError::io(&path, e))?;

        self.residency.clear_dirty(&id);
        self.swap_stats.record_write(bytes.len());
        log_debug!(self.logger, "Wrote {} of {} ({} bytes)", id, self.name, bytes.len());
        Ok(true)
    }

    /// Persist then evict `id` if it is an eviction candidate.
    fn persist_and_evict(&mut self, id: ChunkId) -> Result<bool, GridError> {
        if !self.residency.is_worth_swapping(&id) {
            return Ok(false);
        }
        self.persist_one(id)?;
        if let Some(chunk) = self.residency.evict(&id) {
            self.memory.release(chunk.heap_bytes());
            self.swap_stats.record_eviction();
            log_debug!(self.logger, "Evicted {} of {}", id, self.name);
        }
        Ok(true)
    }

    /// Swap out the oldest eviction candidate (candidate insertion order).
    pub fn persist_and_evict_one(&mut self) -> Result<Option<ChunkId>, GridError> {
        self.persist_and_evict_first(|_| true)
    }

    fn persist_and_evict_first(
        &mut self,
        keep: impl FnMut(&ChunkId) -> bool,
    ) -> Result<Option<ChunkId>, GridError> {
        let Some(id) = self.residency.first_candidate_where(keep) else {
            return Ok(None);
        };
        self.persist_and_evict(id)?;
        Ok(Some(id))
    }

    fn persist_and_evict_each(
        &mut self,
        ids: Vec<ChunkId>,
        evicted: &mut BTreeSet<ChunkId>,
    ) -> Result<(), GridError> {
        for id in ids {
            if self.persist_and_evict(id)? {
                evicted.insert(id);
            }
        }
        Ok(())
    }

    /// Swap out every candidate except `excluded`, row-major.
    ///
    /// Evicted identities are added to `evicted` as they go, so a retry
    /// after memory pressure keeps earlier progress.
    pub fn persist_and_evict_all_except(
        &mut self,
        excluded: ChunkId,
        evicted: &mut BTreeSet<ChunkId>,
    ) -> Result<(), GridError> {
        let mut ids = self.residency.candidates_row_major();
        ids.retain(|id| *id != excluded);
        self.persist_and_evict_each(ids, evicted)
    }

    /// Swap out every candidate not in `excluded`, row-major.
    pub fn persist_and_evict_all_except_set(
        &mut self,
        excluded: &BTreeSet<ChunkId>,
        evicted: &mut BTreeSet<ChunkId>,
    ) -> Result<(), GridError> {
        let mut ids = self.residency.candidates_row_major();
        ids.retain(|id| !excluded.contains(id));
        self.persist_and_evict_each(ids, evicted)
    }

    /// Swap out the candidates from `first` to `last` inclusive, row-major.
    pub fn persist_and_evict_range(
        &mut self,
        first: ChunkId,
        last: ChunkId,
        evicted: &mut BTreeSet<ChunkId>,
    ) -> Result<(), GridError> {
        let ids = self.residency.candidates_in(first..=last);
        self.persist_and_evict_each(ids, evicted)
    }

    /// Swap out every candidate, row-major.
    pub fn persist_and_evict_all(&mut self, evicted: &mut BTreeSet<ChunkId>) -> Result<(), GridError> {
        let ids = self.residency.candidates_row_major();
        self.persist_and_evict_each(ids, evicted)
    }

    /// Persist every dirty chunk without evicting, then rewrite `thisFile`.
    pub fn save(&mut self) -> Result<usize, GridError> {
        let mut written = 0;
        for id in self.residency.candidates_row_major() {
            let dirty = self
                .residency
                .get(&id)
                .is_some_and(|chunk| !chunk.is_swap_up_to_date());
            self.persist_one(id)?;
            if dirty {
                written += 1;
            }
        }
        self.metadata().store(&self.dir)?;
        log_debug!(self.logger, "Saved {} ({} chunks written)", self.name, written);
        Ok(written)
    }

    pub fn metadata(&self) -> GridMetadata {
        GridMetadata {
            version: METADATA_VERSION,
            name: self.name.clone(),
            kind: T::KIND,
            n_rows: self.layout.n_rows(),
            n_cols: self.layout.n_cols(),
            chunk_n_rows: self.layout.chunk_n_rows(),
            chunk_n_cols: self.layout.chunk_n_cols(),
            dimensions: self.dimensions.clone(),
            no_data: self.no_data.to_f64(),
            statistics: self.statistics.snapshot(),
        }
    }

    /// Number of resident chunks with unsaved changes.
    pub fn dirty_count(&self) -> usize {
        self.residency
            .resident_ids()
            .filter(|id| {
                self.residency
                    .get(id)
                    .is_some_and(|chunk| !chunk.is_trivial() && !chunk.is_swap_up_to_date())
            })
            .count()
    }

    /// Return the budget held by resident chunks.
    /// Flush dirty chunks and return every resident byte to the budget.
    ///
    /// Failures are logged at error level.
    pub(crate) fn flush_and_release(&mut self) {
        if let Err(e) = self.save() {
            log_error!(self.logger, "Could not flush {} on drop: {}", self.name, e);
        }
        let bytes = self.residency.resident_bytes();
        self.memory.release(bytes);
    }
}

impl<T: CellValue> Evictable for GridStore<T> {
    fn grid_id(&self) -> GridId {
        self.id
    }

    fn grid_name(&self) -> &str {
        &self.name
    }

    fn swap_out_one(&mut self, exclusion: &Exclusion) -> Result<Option<ChunkId>, GridError> {
        let grid = self.id;
        self.persist_and_evict_first(|id| !exclusion.contains(grid, *id))
    }
}
