//! Statistics collaborators notified on every cell value change.
//!
//! The grid does not interpret the aggregates. It only guarantees that
//! [`Statistics::on_change`] runs exactly once per logical value change,
//! after the new value is in the chunk. Writes that leave a cell unchanged
//! are not reported.

mod summary;

pub use summary::{StatsSnapshot, SummaryStatistics};

/// Receives cell value changes from a grid.
pub trait Statistics {
    /// A cell changed from `old` to `new`. Either may equal `no_data`.
    fn on_change(&mut self, new: f64, old: f64, no_data: f64);

    /// Serializable state stored in the grid root file.
    fn snapshot(&self) -> Option<StatsSnapshot> {
        None
    }

    /// Reload state saved by [`snapshot`](Self::snapshot).
    fn restore(&mut self, _snapshot: &StatsSnapshot) {}
}

/// Ignores every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatistics;

impl Statistics for NoStatistics {
    fn on_change(&mut self, _new: f64, _old: f64, _no_data: f64) {}
}
