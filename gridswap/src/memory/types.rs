//! Core types for memory management.

use crate::config::{DEFAULT_MAX_RECOVERY_ATTEMPTS, DEFAULT_RESERVE_BYTES};
use crate::coord::ChunkId;
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a grid registered with a [`super::MemoryManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid#{}", self.0)
    }
}

/// Memory manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Byte limit for resident chunk buffers plus the reserve, `None` for no limit
    pub limit: Option<usize>,
    /// Size of the headroom buffer drained at the start of recovery (default: 1 MB)
    pub reserve_bytes: usize,
    /// Upper bound on recovery passes for a single operation (default: 64)
    pub max_recovery_attempts: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            limit: None,
            reserve_bytes: DEFAULT_RESERVE_BYTES,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
        }
    }
}

impl MemoryConfig {
    /// Configuration with a byte limit and defaults for the rest.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn reserve_bytes(mut self, bytes: usize) -> Self {
        self.reserve_bytes = bytes;
        self
    }

    pub fn max_recovery_attempts(mut self, attempts: usize) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }
}

/// State of the memory reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveState {
    /// The reserve is held
    Normal,
    /// The reserve was drained and has not been refilled yet
    Recovering,
    /// The last recovery found nothing to evict
    Exhausted,
}

/// Counters kept by the recovery controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Recovery passes started
    pub recoveries: u64,
    /// Chunks evicted on behalf of recovery, across all grids
    pub evictions: u64,
    /// Evictions that came from a grid other than the one under pressure
    pub cross_grid_evictions: u64,
    /// Successful reserve refills
    pub refills: u64,
    /// Passes that found nothing to evict
    pub exhaustions: u64,
}

/// Chunks that recovery must not evict.
///
/// Keyed by grid as well as chunk so an operation touching two grids can
/// protect the chunk it reads and the chunk it writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusion {
    chunks: BTreeSet<(GridId, ChunkId)>,
}

impl Exclusion {
    /// Nothing excluded.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exclude a single chunk.
    pub fn chunk(grid: GridId, chunk: ChunkId) -> Self {
        Self::none().with(grid, chunk)
    }

    pub fn with(mut self, grid: GridId, chunk: ChunkId) -> Self {
        self.insert(grid, chunk);
        self
    }

    pub fn insert(&mut self, grid: GridId, chunk: ChunkId) {
        self.chunks.insert((grid, chunk));
    }

    pub fn contains(&self, grid: GridId, chunk: ChunkId) -> bool {
        self.chunks.contains(&(grid, chunk))
    }

    /// Excluded chunks belonging to `grid`.
    pub fn chunks_of(&self, grid: GridId) -> impl Iterator<Item = ChunkId> + '_ {
        self.chunks
            .iter()
            .filter(move |(g, _)| *g == grid)
            .map(|(_, chunk)| *chunk)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
