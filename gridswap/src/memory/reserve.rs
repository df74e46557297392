//! Pre-allocated headroom released when recovery starts.

use super::budget::{MemoryBudget, OutOfMemory};

/// A real heap buffer charged against the budget while held.
#[derive(Debug)]
pub struct MemoryReserve {
    size: usize,
    buffer: Option<Vec<u8>>,
}

impl MemoryReserve {
    /// An empty reserve of `size` bytes; call [`fill`](Self::fill) to hold it.
    pub fn new(size: usize) -> Self {
        Self { size, buffer: None }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_held(&self) -> bool {
        self.buffer.is_some()
    }

    /// Charge and allocate the reserve. No-op when already held.
    pub fn fill(&mut self, budget: &mut MemoryBudget) -> Result<(), OutOfMemory> {
        if self.is_held() {
            return Ok(());
        }
        budget.charge(self.size)?;

        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(self.size).is_err() {
            budget.release(self.size);
            return Err(OutOfMemory::Heap {
                requested: self.size,
            });
        }
        buffer.resize(self.size, 0);
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Free the reserve. Returns `false` when nothing was held.
    pub fn drain(&mut self, budget: &mut MemoryBudget) -> bool {
        match self.buffer.take() {
            Some(_) => {
                budget.release(self.size);
                true
            }
            None => false,
        }
    }
}
