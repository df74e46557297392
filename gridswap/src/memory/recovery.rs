//! Retry-after-eviction control flow shared by every grid accessor.

use super::manager::MemoryManager;
use super::types::{Exclusion, GridId};
use crate::coord::ChunkId;
use crate::error::GridError;
use crate::{log_debug, log_warn};
use std::cell::RefCell;

/// Something recovery can evict chunks from.
pub trait Evictable {
    fn grid_id(&self) -> GridId;

    fn grid_name(&self) -> &str;

    /// Persist and evict one eviction candidate not covered by `exclusion`.
    ///
    /// Returns the evicted chunk, or `None` when no candidate is left.
    fn swap_out_one(&mut self, exclusion: &Exclusion) -> Result<Option<ChunkId>, GridError>;
}

/// Run `op` against `store`, recovering from memory pressure.
///
/// `op` is the non-retrying core operation. When it fails with an
/// out-of-memory error, a recovery pass runs (chunks in `exclusion` are
/// protected) until the failed charge fits, and `op` is called again. The
/// original error is returned once recovery evicts nothing in any grid, or
/// after `max_recovery_attempts` consecutive passes that freed no bytes.
/// Any other error is returned immediately.
///
/// # Panics
///
/// Panics if `store` is already mutably borrowed, which means `op` (or a
/// callback it runs) re-entered the same grid.
pub fn retry_with_recovery<S, R, F>(
    store: &RefCell<S>,
    memory: &MemoryManager,
    exclusion: &Exclusion,
    mut op: F,
) -> Result<R, GridError>
where
    S: Evictable,
    F: FnMut(&mut S) -> Result<R, GridError>,
{
    memory.restore_reserve();

    let mut passes = 0usize;
    let mut stalled = 0usize;
    loop {
        let result = {
            let mut guard = store.borrow_mut();
            op(&mut *guard)
        };
        let err = match result {
            Err(err) if err.is_out_of_memory() => err,
            other => return other,
        };
        let needed = match &err {
            GridError::OutOfMemory(oom) => oom.budget_needed(),
            _ => 0,
        };

        if stalled >= memory.max_recovery_attempts() {
            log_warn!(
                memory.logger(),
                "Giving up after {} recovery passes freed nothing: {}",
                stalled,
                err
            );
            return Err(err);
        }
        passes += 1;

        let used_before = memory.used();
        let recovered = {
            let mut guard = store.borrow_mut();
            memory.recover(&mut *guard, exclusion, needed)?
        };
        if !recovered {
            return Err(err);
        }
        if memory.used() < used_before {
            stalled = 0;
        } else {
            stalled += 1;
        }
        log_debug!(memory.logger(), "Retrying after recovery pass {}", passes);
    }
}
