//! Byte accounting for resident chunk buffers.

use thiserror::Error;

/// An allocation could not be satisfied.
///
/// This is the only error the recovery loop retries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutOfMemory {
    /// Charging the allocation would exceed the configured budget
    #[error("Memory budget exceeded: requested {requested} bytes, {available} of {limit} available")]
    Budget {
        requested: usize,
        available: usize,
        limit: usize,
    },

    /// The allocator refused the allocation
    #[error("Heap allocation of {requested} bytes failed")]
    Heap { requested: usize },
}

impl OutOfMemory {
    /// Budget room the failed charge needed; zero for allocator failures.
    pub fn budget_needed(&self) -> usize {
        match self {
            OutOfMemory::Budget { requested, .. } => *requested,
            OutOfMemory::Heap { .. } => 0,
        }
    }
}

/// Tracks heap bytes held by resident chunks and the memory reserve.
///
/// With no limit configured, charges always succeed and only the real
/// allocator can report pressure.
#[derive(Debug, Clone, Default)]
pub struct MemoryBudget {
    limit: Option<usize>,
    used: usize,
    peak: usize,
}

impl MemoryBudget {
    /// Create a budget with an optional limit in bytes.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            used: 0,
            peak: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Reserve `bytes` against the limit.
    pub fn charge(&mut self, bytes: usize) -> Result<(), OutOfMemory> {
        if let Some(limit) = self.limit {
            let available = limit.saturating_sub(self.used);
            if bytes > available {
                return Err(OutOfMemory::Budget {
                    requested: bytes,
                    available,
                    limit,
                });
            }
        }
        self.used += bytes;
        self.peak = self.peak.max(self.used);
        Ok(())
    }

    /// Return `bytes` previously charged.
    pub fn release(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Highest value `used` has reached.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Bytes left before the limit, `None` when unlimited.
    pub fn available(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }
}
