//! Process-wide memory coordinator shared by every grid.

use super::budget::{MemoryBudget, OutOfMemory};
use super::recovery::Evictable;
use super::reserve::MemoryReserve;
use super::types::{Exclusion, GridId, MemoryConfig, RecoveryStats, ReserveState};
use crate::coord::ChunkId;
use crate::error::GridError;
use crate::log::{Logger, TracingLogger};
use crate::{log_debug, log_info, log_warn};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

struct RegisteredGrid {
    id: GridId,
    name: String,
    handle: Weak<RefCell<dyn Evictable>>,
}

struct ManagerInner {
    budget: RefCell<MemoryBudget>,
    reserve: RefCell<MemoryReserve>,
    state: Cell<ReserveState>,
    grids: RefCell<Vec<RegisteredGrid>>,
    next_grid_id: Cell<u64>,
    max_recovery_attempts: usize,
    stats: RefCell<RecoveryStats>,
    logger: Arc<dyn Logger>,
}

/// Budget, reserve and grid registry behind a cheap clonable handle.
///
/// Every grid holds a clone. Grids register a weak handle on construction
/// so that memory pressure in one grid can evict chunks from another; a
/// dropped grid simply stops upgrading and is pruned.
#[derive(Clone)]
pub struct MemoryManager {
    inner: Rc<ManagerInner>,
}

impl fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryManager")
            .field("budget", &*self.inner.budget.borrow())
            .field("state", &self.inner.state.get())
            .field("grids", &self.grid_count())
            .finish()
    }
}

impl MemoryManager {
    /// Create a manager that logs through `tracing`.
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_logger(config, Arc::new(TracingLogger))
    }

    /// Create a manager with a custom logger.
    ///
    /// The reserve is filled immediately. If it does not fit the budget the
    /// manager starts in [`ReserveState::Recovering`] and retries the fill
    /// before each operation.
    pub fn with_logger(config: MemoryConfig, logger: Arc<dyn Logger>) -> Self {
        let mut budget = MemoryBudget::new(config.limit);
        let mut reserve = MemoryReserve::new(config.reserve_bytes);
        let state = match reserve.fill(&mut budget) {
            Ok(()) => ReserveState::Normal,
            Err(e) => {
                log_warn!(logger, "Memory reserve of {} bytes not filled: {}", config.reserve_bytes, e);
                ReserveState::Recovering
            }
        };

        Self {
            inner: Rc::new(ManagerInner {
                budget: RefCell::new(budget),
                reserve: RefCell::new(reserve),
                state: Cell::new(state),
                grids: RefCell::new(Vec::new()),
                next_grid_id: Cell::new(1),
                max_recovery_attempts: config.max_recovery_attempts,
                stats: RefCell::new(RecoveryStats::default()),
                logger,
            }),
        }
    }

    /// No byte limit; only the allocator can report pressure.
    pub fn unlimited() -> Self {
        Self::new(MemoryConfig::default())
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.inner.logger)
    }

    /// Charge `bytes` of chunk buffer against the budget.
    pub fn charge(&self, bytes: usize) -> Result<(), OutOfMemory> {
        self.inner.budget.borrow_mut().charge(bytes)
    }

    /// Return `bytes` previously charged.
    pub fn release(&self, bytes: usize) {
        self.inner.budget.borrow_mut().release(bytes);
    }

    /// Bytes currently charged, reserve included.
    pub fn used(&self) -> usize {
        self.inner.budget.borrow().used()
    }

    pub fn peak(&self) -> usize {
        self.inner.budget.borrow().peak()
    }

    pub fn limit(&self) -> Option<usize> {
        self.inner.budget.borrow().limit()
    }

    pub fn available(&self) -> Option<usize> {
        self.inner.budget.borrow().available()
    }

    pub fn state(&self) -> ReserveState {
        self.inner.state.get()
    }

    pub fn reserve_held(&self) -> bool {
        self.inner.reserve.borrow().is_held()
    }

    pub fn stats(&self) -> RecoveryStats {
        self.inner.stats.borrow().clone()
    }

    pub fn max_recovery_attempts(&self) -> usize {
        self.inner.max_recovery_attempts
    }

    /// Hand out a fresh grid identity.
    pub fn allocate_grid_id(&self) -> GridId {
        let id = self.inner.next_grid_id.get();
        self.inner.next_grid_id.set(id + 1);
        GridId(id)
    }

    /// Add a grid to the registry consulted by cross-grid eviction.
    pub fn register(&self, id: GridId, name: &str, handle: Weak<RefCell<dyn Evictable>>) {
        let mut grids = self.inner.grids.borrow_mut();
        grids.retain(|grid| grid.handle.strong_count() > 0 && grid.id != id);
        grids.push(RegisteredGrid {
            id,
            name: name.to_string(),
            handle,
        });
        log_debug!(self.inner.logger, "Registered {} ({})", id, name);
    }

    /// Remove a grid from the registry. Returns `false` if it was unknown.
    pub fn unregister(&self, id: GridId) -> bool {
        let mut grids = self.inner.grids.borrow_mut();
        let before = grids.len();
        grids.retain(|grid| grid.id != id);
        let removed = grids.len() != before;
        if removed {
            log_debug!(self.inner.logger, "Unregistered {}", id);
        }
        removed
    }

    /// Number of registered grids still alive.
    pub fn grid_count(&self) -> usize {
        self.inner
            .grids
            .borrow()
            .iter()
            .filter(|grid| grid.handle.strong_count() > 0)
            .count()
    }

    /// Names of registered grids still alive, in registration order.
    pub fn grid_names(&self) -> Vec<String> {
        self.inner
            .grids
            .borrow()
            .iter()
            .filter(|grid| grid.handle.strong_count() > 0)
            .map(|grid| grid.name.clone())
            .collect()
    }

    /// Try to hold the reserve again. Returns whether it is held afterwards.
    pub fn restore_reserve(&self) -> bool {
        let filled = {
            let mut reserve = self.inner.reserve.borrow_mut();
            if reserve.is_held() {
                return true;
            }
            let mut budget = self.inner.budget.borrow_mut();
            reserve.fill(&mut budget).is_ok()
        };
        if filled {
            self.inner.state.set(ReserveState::Normal);
            self.inner.stats.borrow_mut().refills += 1;
            log_info!(self.inner.logger, "Memory reserve refilled");
        }
        filled
    }

    fn drain_reserve(&self) {
        let mut reserve = self.inner.reserve.borrow_mut();
        let mut budget = self.inner.budget.borrow_mut();
        reserve.drain(&mut budget);
    }

    /// Whether a charge of `bytes` would fit the budget now.
    pub fn fits(&self, bytes: usize) -> bool {
        self.available().is_none_or(|available| available >= bytes)
    }

    /// One recovery pass on behalf of `current`.
    ///
    /// Drains the reserve, then evicts chunks until the reserve fits again
    /// and `needed` more bytes can be charged, or nothing is left to evict.
    /// Returns `Ok(false)` when not a single chunk could be evicted in any
    /// registered grid, in which case the state becomes
    /// [`ReserveState::Exhausted`].
    pub fn recover(
        &self,
        current: &mut dyn Evictable,
        exclusion: &Exclusion,
        needed: usize,
    ) -> Result<bool, GridError> {
        self.drain_reserve();
        self.inner.state.set(ReserveState::Recovering);
        self.inner.stats.borrow_mut().recoveries += 1;
        log_info!(
            self.inner.logger,
            "Memory pressure in {}: recovering ({} bytes in use)",
            current.grid_name(),
            self.used()
        );

        let mut evicted = 0usize;
        while let Some((grid, chunk)) = self.evict_one(current, exclusion)? {
            evicted += 1;
            log_debug!(self.inner.logger, "Recovery evicted {} from {}", chunk, grid);
            if self.restore_reserve() && self.fits(needed) {
                break;
            }
        }

        if evicted == 0 {
            self.inner.state.set(ReserveState::Exhausted);
            self.inner.stats.borrow_mut().exhaustions += 1;
            log_warn!(
                self.inner.logger,
                "Memory recovery exhausted for {}: no chunk can be evicted",
                current.grid_name()
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Evict one chunk, preferring `current` over other registered grids.
    ///
    /// Excluded chunks are never evicted.
    pub fn evict_one(
        &self,
        current: &mut dyn Evictable,
        exclusion: &Exclusion,
    ) -> Result<Option<(GridId, ChunkId)>, GridError> {
        if let Some(chunk) = current.swap_out_one(exclusion)? {
            self.inner.stats.borrow_mut().evictions += 1;
            return Ok(Some((current.grid_id(), chunk)));
        }
        self.evict_from_other_grids(current.grid_id(), exclusion)
    }

    /// Evict one chunk from any live grid other than `current`.
    ///
    /// Grids that are mid-operation (already borrowed) are skipped.
    pub fn evict_from_other_grids(
        &self,
        current: GridId,
        exclusion: &Exclusion,
    ) -> Result<Option<(GridId, ChunkId)>, GridError> {
        let handles: Vec<(GridId, Rc<RefCell<dyn Evictable>>)> = {
            let mut grids = self.inner.grids.borrow_mut();
            grids.retain(|grid| grid.handle.strong_count() > 0);
            grids
                .iter()
                .filter(|grid| grid.id != current)
                .filter_map(|grid| grid.handle.upgrade().map(|handle| (grid.id, handle)))
                .collect()
        };

        for (id, handle) in handles {
            let Ok(mut grid) = handle.try_borrow_mut() else {
                log_debug!(self.inner.logger, "Skipping busy {} during recovery", id);
                continue;
            };
            if let Some(chunk) = grid.swap_out_one(exclusion)? {
                let mut stats = self.inner.stats.borrow_mut();
                stats.evictions += 1;
                stats.cross_grid_evictions += 1;
                return Ok(Some((id, chunk)));
            }
        }
        Ok(None)
    }
}
