//! Count, sum and extremes of the data cells of a grid.

use super::Statistics;
use crate::chunk::CellValue;
use crate::log::{Logger, NoOpLogger};
use crate::log_warn;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Saved form of [`SummaryStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub count: u64,
    pub sum: Decimal,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

/// Running count, exact decimal sum, min and max over cells holding data.
///
/// Min and max are tracked with multiplicities. Overwriting the last cell
/// that held an extreme leaves the old extreme in place as a bound and sets
/// [`extremes_exact`](Self::extremes_exact) to `false`.
///
/// Values that cannot be represented as a `Decimal` (NaN, infinities,
/// magnitudes beyond ~7.9e28) are logged and the update is skipped.
pub struct SummaryStatistics {
    count: u64,
    sum: Decimal,
    min: Option<(Decimal, u64)>,
    max: Option<(Decimal, u64)>,
    extremes_exact: bool,
    skipped: u64,
    logger: Arc<dyn Logger>,
}

impl Default for SummaryStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryStatistics {
    pub fn new() -> Self {
        Self::with_logger(Arc::new(NoOpLogger))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            count: 0,
            sum: Decimal::ZERO,
            min: None,
            max: None,
            extremes_exact: true,
            skipped: 0,
            logger,
        }
    }

    /// Number of cells holding data.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> Decimal {
        self.sum
    }

    pub fn min(&self) -> Option<Decimal> {
        self.min.map(|(value, _)| value)
    }

    pub fn max(&self) -> Option<Decimal> {
        self.max.map(|(value, _)| value)
    }

    /// Mean of the data cells, `None` when there are none.
    pub fn mean(&self) -> Option<Decimal> {
        if self.count == 0 {
            return None;
        }
        self.sum.checked_div(Decimal::from(self.count))
    }

    /// Whether min and max are exact rather than bounds.
    pub fn extremes_exact(&self) -> bool {
        self.extremes_exact
    }

    /// Updates dropped because a value had no decimal form.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn remove(&mut self, value: Decimal) {
        self.count = self.count.saturating_sub(1);
        for extreme in [&mut self.min, &mut self.max] {
            if let Some((current, n)) = extreme {
                if *current == value {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        self.extremes_exact = false;
                    }
                }
            }
        }
        if self.count == 0 {
            self.min = None;
            self.max = None;
            self.extremes_exact = true;
        }
    }

    fn add(&mut self, value: Decimal) {
        self.count += 1;
        self.min = Some(match self.min {
            Some((current, n)) if current == value => (current, n + 1),
            Some((current, n)) if current < value => (current, n),
            _ => (value, 1),
        });
        self.max = Some(match self.max {
            Some((current, n)) if current == value => (current, n + 1),
            Some((current, n)) if current > value => (current, n),
            _ => (value, 1),
        });
    }

    fn skip(&mut self, value: f64) {
        self.skipped += 1;
        log_warn!(
            self.logger,
            "Statistics update skipped: {} has no decimal representation",
            value
        );
    }
}

impl Statistics for SummaryStatistics {
    fn on_change(&mut self, new: f64, old: f64, no_data: f64) {
        let old = (!old.same(no_data)).then_some(old);
        let new = (!new.same(no_data)).then_some(new);

        let mut decimals = [None, None];
        for (slot, value) in decimals.iter_mut().zip([old, new]) {
            if let Some(value) = value {
                match Decimal::from_f64(value) {
                    Some(decimal) => *slot = Some(decimal),
                    None => return self.skip(value),
                }
            }
        }
        let [old, new] = decimals;

        let sum = self
            .sum
            .checked_sub(old.unwrap_or_default())
            .and_then(|sum| sum.checked_add(new.unwrap_or_default()));
        let Some(sum) = sum else {
            self.skipped += 1;
            log_warn!(self.logger, "Statistics update skipped: sum overflow");
            return;
        };
        self.sum = sum;

        if let Some(value) = old {
            self.remove(value);
        }
        if let Some(value) = new {
            self.add(value);
        }
    }

    fn snapshot(&self) -> Option<StatsSnapshot> {
        Some(StatsSnapshot {
            count: self.count,
            sum: self.sum,
            min: self.min(),
            max: self.max(),
        })
    }

    fn restore(&mut self, snapshot: &StatsSnapshot) {
        self.count = snapshot.count;
        self.sum = snapshot.sum;
        self.min = snapshot.min.map(|value| (value, 1));
        self.max = snapshot.max.map(|value| (value, 1));
        self.extremes_exact = false;
    }
}
