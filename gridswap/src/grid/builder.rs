//! Grid construction, reopening and import.

use super::handle::Grid;
use super::import::{GridSource, ImportError};
use super::lock::DirectoryLock;
use super::metadata::GridMetadata;
use super::path::metadata_path;
use super::store::{GridStore, StoreParts};
use crate::chunk::CellValue;
use crate::config::{GridDefaults, DEFAULT_CHUNK_COLS, DEFAULT_CHUNK_ROWS};
use crate::coord::{ChunkLayout, Dimensions};
use crate::error::GridError;
use crate::log::Logger;
use crate::log_info;
use crate::memory::MemoryManager;
use crate::stats::{NoStatistics, Statistics};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builder for [`Grid`].
///
/// # Example
///
/// ```
/// use gridswap::grid::DoubleGrid;
/// use gridswap::memory::MemoryManager;
///
/// let dir = tempfile::tempdir().unwrap();
/// let memory = MemoryManager::unlimited();
/// let grid = DoubleGrid::builder(dir.path().join("dem"))
///     .size(1000, 800)
///     .chunk_size(256, 256)
///     .build(&memory)
///     .unwrap();
///
/// grid.set_cell(999, 0, 12.5).unwrap();
/// assert_eq!(grid.get_cell(999, 0).unwrap(), 12.5);
/// assert_eq!(grid.layout().chunk_rows_in(3), 232);
/// ```
pub struct GridBuilder<T: CellValue> {
    dir: PathBuf,
    name: Option<String>,
    n_rows: i64,
    n_cols: i64,
    chunk_n_rows: i32,
    chunk_n_cols: i32,
    x_min: Decimal,
    y_min: Decimal,
    cell_size: Decimal,
    no_data: T,
    statistics: Option<Box<dyn Statistics>>,
    strict_chunk_types: bool,
    logger: Option<Arc<dyn Logger>>,
}

impl<T: CellValue> GridBuilder<T> {
    /// Builder for the grid stored in `dir`.
    ///
    /// Chunk type mismatches are errors in debug builds and read as no-data
    /// in release builds unless [`strict_chunk_types`](Self::strict_chunk_types)
    /// says otherwise.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: None,
            n_rows: 0,
            n_cols: 0,
            chunk_n_rows: DEFAULT_CHUNK_ROWS,
            chunk_n_cols: DEFAULT_CHUNK_COLS,
            x_min: Decimal::ZERO,
            y_min: Decimal::ZERO,
            cell_size: Decimal::ONE,
            no_data: T::default_no_data(),
            statistics: None,
            strict_chunk_types: cfg!(debug_assertions),
            logger: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Apply chunk sizes from configuration.
    pub fn with_defaults(mut self, defaults: &GridDefaults) -> Self {
        self.chunk_n_rows = defaults.chunk_rows;
        self.chunk_n_cols = defaults.chunk_cols;
        self
    }

    /// Display name; defaults to the directory name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn size(mut self, n_rows: i64, n_cols: i64) -> Self {
        self.n_rows = n_rows;
        self.n_cols = n_cols;
        self
    }

    /// Nominal chunk height and width in cells.
    pub fn chunk_size(mut self, chunk_n_rows: i32, chunk_n_cols: i32) -> Self {
        self.chunk_n_rows = chunk_n_rows;
        self.chunk_n_cols = chunk_n_cols;
        self
    }

    /// Real-world coordinates of the bottom-left corner.
    pub fn origin(mut self, x_min: Decimal, y_min: Decimal) -> Self {
        self.x_min = x_min;
        self.y_min = y_min;
        self
    }

    pub fn cell_size(mut self, cell_size: Decimal) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn no_data(mut self, no_data: T) -> Self {
        self.no_data = no_data;
        self
    }

    pub fn statistics(mut self, statistics: Box<dyn Statistics>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Whether a chunk file of another cell type is an error (`true`) or
    /// logged and read as no-data (`false`).
    pub fn strict_chunk_types(mut self, strict: bool) -> Self {
        self.strict_chunk_types = strict;
        self
    }

    /// Logger for this grid; defaults to the memory manager's.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.dir
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("grid")
                .to_string()
        })
    }

    /// Create a new grid in the builder's directory.
    ///
    /// The directory is created if needed and locked. It must not already
    /// hold a grid.
    pub fn build(self, memory: &MemoryManager) -> Result<Grid<T>, GridError> {
        let layout = ChunkLayout::new(self.n_rows, self.n_cols, self.chunk_n_rows, self.chunk_n_cols)?;
        let dimensions = Dimensions::new(self.x_min, self.y_min, self.cell_size, &layout)?;

        fs::create_dir_all(&self.dir).map_err(|e| GridError::io(&self.dir, e))?;
        let logger = self.logger.clone().unwrap_or_else(|| memory.logger());
        let lock = DirectoryLock::acquire(&self.dir, Arc::clone(&logger))?;
        if metadata_path(&self.dir).exists() {
            return Err(GridError::AlreadyAGrid(self.dir));
        }

        let name = self.display_name();
        let store = GridStore::new(StoreParts {
            id: memory.allocate_grid_id(),
            name,
            dir: self.dir,
            layout,
            dimensions,
            no_data: self.no_data,
            statistics: self.statistics.unwrap_or_else(|| Box::new(NoStatistics)),
            strict_chunk_types: self.strict_chunk_types,
            memory: memory.clone(),
            logger: Arc::clone(&logger),
            lock,
        });
        store.metadata().store(store.directory())?;

        log_info!(
            logger,
            "Created {} ({}x{} cells in {}x{} chunks) at {}",
            store.name(),
            layout.n_rows(),
            layout.n_cols(),
            layout.n_chunk_rows(),
            layout.n_chunk_cols(),
            store.directory().display()
        );
        Ok(Grid::from_store(store, memory.clone()))
    }

    /// Reopen the grid stored in the builder's directory.
    ///
    /// Shape, placement and no-data come from `thisFile`; only the name,
    /// statistics, logger and type policy of the builder apply. Chunk files
    /// found in the directory are registered as evicted and load on demand.
    pub fn open(self, memory: &MemoryManager) -> Result<Grid<T>, GridError> {
        let metadata = GridMetadata::load(&self.dir)?;
        if metadata.kind != T::KIND {
            return Err(GridError::GridKindMismatch {
                expected: T::KIND,
                found: metadata.kind,
            });
        }
        let layout = ChunkLayout::new(
            metadata.n_rows,
            metadata.n_cols,
            metadata.chunk_n_rows,
            metadata.chunk_n_cols,
        )?;

        let logger = self.logger.clone().unwrap_or_else(|| memory.logger());
        let lock = DirectoryLock::acquire(&self.dir, Arc::clone(&logger))?;

        let mut statistics = self.statistics.unwrap_or_else(|| Box::new(NoStatistics));
        if let Some(snapshot) = &metadata.statistics {
            statistics.restore(snapshot);
        }

        let mut store = GridStore::new(StoreParts {
            id: memory.allocate_grid_id(),
            name: self.name.unwrap_or(metadata.name),
            dir: self.dir,
            layout,
            dimensions: metadata.dimensions,
            no_data: T::from_f64(metadata.no_data),
            statistics,
            strict_chunk_types: self.strict_chunk_types,
            memory: memory.clone(),
            logger: Arc::clone(&logger),
            lock,
        });
        let found = store.scan_chunk_files()?;

        log_info!(
            logger,
            "Opened {} at {} ({} chunk files)",
            store.name(),
            store.directory().display(),
            found
        );
        Ok(Grid::from_store(store, memory.clone()))
    }

    /// Create a grid shaped by `source` and fill it with its values.
    ///
    /// The source header replaces size, origin, cell size and no-data set on
    /// the builder. Source rows arrive top row first and land in grid rows
    /// `n_rows - 1` down to `0`. The grid is saved once populated.
    pub fn import(
        mut self,
        source: &mut impl GridSource,
        memory: &MemoryManager,
    ) -> Result<Grid<T>, GridError> {
        let header = source.header().clone();
        if header.n_rows <= 0 || header.n_cols <= 0 {
            return Err(ImportError::InvalidHeader(format!(
                "{} rows x {} cols",
                header.n_rows, header.n_cols
            ))
            .into());
        }

        self.n_rows = header.n_rows;
        self.n_cols = header.n_cols;
        self.x_min = header.x_min;
        self.y_min = header.y_min;
        self.cell_size = header.cell_size;
        self.no_data = T::from_f64(header.no_data);
        let grid = self.build(memory)?;

        let expected = header.n_rows as u64 * header.n_cols as u64;
        for index in 0..expected {
            let value = source
                .next_value()?
                .ok_or(ImportError::Truncated {
                    expected,
                    found: index,
                })?;
            if value.same(header.no_data) {
                continue;
            }
            let row = header.n_rows - 1 - (index / header.n_cols as u64) as i64;
            let col = (index % header.n_cols as u64) as i64;
            grid.init_cell(row, col, T::from_f64(value))?;
        }

        grid.save()?;
        Ok(grid)
    }
}
