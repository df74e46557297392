//! Memory pressure handling.
//!
//! A single [`MemoryManager`] is shared by every grid. It accounts the heap
//! bytes of resident chunk buffers against an optional [`MemoryBudget`]
//! limit, holds a [`MemoryReserve`] of headroom, and keeps a registry of
//! live grids. Nothing is evicted proactively: when an operation fails with
//! [`OutOfMemory`], [`retry_with_recovery`] drains the reserve, evicts
//! chunks (the current grid first, then any other registered grid, never an
//! [`Exclusion`]-protected chunk), refills the reserve and retries.

mod budget;
mod manager;
mod recovery;
mod reserve;
mod types;

pub use budget::{MemoryBudget, OutOfMemory};
pub use manager::MemoryManager;
pub use recovery::{retry_with_recovery, Evictable};
pub use reserve::MemoryReserve;
pub use types::{Exclusion, GridId, MemoryConfig, RecoveryStats, ReserveState};
