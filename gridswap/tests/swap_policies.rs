//! Swap policy tests: persistence, eviction order and trivial chunks.

use gridswap::coord::ChunkId;
use gridswap::grid::{chunk_path, DoubleGrid};
use gridswap::log::NoOpLogger;
use gridswap::memory::{MemoryConfig, MemoryManager};
use gridswap::stats::Statistics;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::TempDir;

const NO_DATA: f64 = -9999.0;

/// Counts every change reported to it.
struct CountingStatistics(Rc<Cell<usize>>);

impl Statistics for CountingStatistics {
    fn on_change(&mut self, _new: f64, _old: f64, _no_data: f64) {
        self.0.set(self.0.get() + 1);
    }
}

fn manager() -> MemoryManager {
    MemoryManager::with_logger(MemoryConfig::default(), Arc::new(NoOpLogger))
}

/// 6x6 grid of 2x2 chunks: a 3x3 chunk layout.
fn grid(temp: &TempDir, memory: &MemoryManager) -> DoubleGrid {
    DoubleGrid::builder(temp.path().join("grid"))
        .size(6, 6)
        .chunk_size(2, 2)
        .no_data(NO_DATA)
        .build(memory)
        .unwrap()
}

#[test]
fn test_persist_one_writes_once() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);
    let id = ChunkId::new(0, 0);
    grid.set_cell(1, 1, 7.5).unwrap();

    assert!(grid.persist_one(id).unwrap());
    assert!(grid.persist_one(id).unwrap());

    let stats = grid.swap_stats();
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.clean_skips, 1);
    assert!(chunk_path(grid.directory(), id).exists());
    assert_eq!(grid.dirty_count(), 0);
}

#[test]
fn test_persist_one_after_write_writes_again() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);
    let id = ChunkId::new(0, 0);

    grid.set_cell(0, 0, 1.0).unwrap();
    grid.persist_one(id).unwrap();
    grid.set_cell(0, 1, 2.0).unwrap();
    grid.persist_one(id).unwrap();

    assert_eq!(grid.swap_stats().writes, 2);
}

#[test]
fn test_persist_one_not_resident() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    assert!(!grid.persist_one(ChunkId::new(2, 2)).unwrap());
}

#[test]
fn test_evicted_chunk_reloads_last_written_values() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    grid.set_cell(2, 3, 11.0).unwrap();
    grid.set_cell(3, 2, 12.0).unwrap();
    grid.set_cell(2, 3, 13.0).unwrap();

    let evicted = grid.persist_and_evict_one().unwrap();
    let id = ChunkId::new(1, 1);
    assert_eq!(evicted, Some(id));
    assert!(!grid.is_resident(id));

    assert!(grid.ensure_resident(id).unwrap());
    assert_eq!(grid.get_cell(2, 3).unwrap(), 13.0);
    assert_eq!(grid.get_cell(3, 2).unwrap(), 12.0);
    assert_eq!(grid.get_cell(3, 3).unwrap(), NO_DATA);
    assert_eq!(grid.swap_stats().loads, 1);
}

#[test]
fn test_evict_one_follows_candidate_order() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    grid.set_cell(4, 4, 1.0).unwrap();
    grid.set_cell(0, 0, 2.0).unwrap();
    grid.set_cell(2, 0, 3.0).unwrap();

    assert_eq!(
        grid.eviction_candidates(),
        vec![ChunkId::new(2, 2), ChunkId::new(0, 0), ChunkId::new(1, 0)]
    );
    assert_eq!(grid.persist_and_evict_one().unwrap(), Some(ChunkId::new(2, 2)));
    assert_eq!(grid.persist_and_evict_one().unwrap(), Some(ChunkId::new(0, 0)));
    assert_eq!(grid.persist_and_evict_one().unwrap(), Some(ChunkId::new(1, 0)));
    assert_eq!(grid.persist_and_evict_one().unwrap(), None);
}

#[test]
fn test_evict_all_except_keeps_excluded() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);
    let a = ChunkId::new(0, 0);
    let b = ChunkId::new(0, 1);
    let c = ChunkId::new(0, 2);

    grid.set_cell(0, 0, 1.0).unwrap();
    grid.set_cell(0, 2, 2.0).unwrap();
    grid.set_cell(0, 4, 3.0).unwrap();

    let evicted = grid.persist_and_evict_all_except(b).unwrap();
    assert_eq!(evicted, BTreeSet::from([a, c]));
    assert!(grid.is_resident(b));
    assert!(!grid.is_resident(a));
    assert!(!grid.is_resident(c));
}

#[test]
fn test_evict_all_except_set() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    for row in [0, 2, 4] {
        grid.set_cell(row, 0, row as f64).unwrap();
    }
    let keep = BTreeSet::from([ChunkId::new(0, 0), ChunkId::new(2, 0)]);

    let evicted = grid.persist_and_evict_all_except_set(&keep).unwrap();
    assert_eq!(evicted, BTreeSet::from([ChunkId::new(1, 0)]));
    assert_eq!(grid.resident_chunks(), vec![ChunkId::new(0, 0), ChunkId::new(2, 0)]);
}

#[test]
fn test_evict_range_is_row_major_between_bounds() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    for row in 0..3 {
        for col in 0..3 {
            grid.set_cell(row * 2, col * 2, 1.0).unwrap();
        }
    }

    let count = grid
        .persist_and_evict_range(ChunkId::new(0, 2), ChunkId::new(1, 1))
        .unwrap();
    assert_eq!(count, 3);
    assert!(!grid.is_resident(ChunkId::new(0, 2)));
    assert!(!grid.is_resident(ChunkId::new(1, 0)));
    assert!(!grid.is_resident(ChunkId::new(1, 1)));
    assert!(grid.is_resident(ChunkId::new(0, 1)));
    assert!(grid.is_resident(ChunkId::new(1, 2)));
}

#[test]
fn test_evict_all() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    grid.set_cell(0, 0, 1.0).unwrap();
    grid.set_cell(5, 5, 2.0).unwrap();
    let before = memory.used();

    let evicted = grid.persist_and_evict_all().unwrap();
    assert_eq!(evicted.len(), 2);
    assert!(grid.resident_chunks().is_empty());
    assert_eq!(memory.used(), before - 2 * 4 * 8);
    assert_eq!(grid.get_cell(5, 5).unwrap(), 2.0);
}

#[test]
fn test_trivial_chunks_are_never_evicted() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);
    let id = ChunkId::new(0, 0);

    // Writing the sentinel leaves the chunk uniform.
    grid.set_cell(0, 0, NO_DATA).unwrap();
    assert!(grid.is_resident(id));
    assert!(grid.is_trivial(id));
    assert!(!grid.is_worth_swapping(id));

    assert_eq!(grid.persist_and_evict_one().unwrap(), None);
    assert!(grid.persist_and_evict_all().unwrap().is_empty());
    assert!(grid.persist_and_evict_all_except(ChunkId::new(1, 1)).unwrap().is_empty());
    assert_eq!(
        grid.persist_and_evict_range(ChunkId::new(0, 0), ChunkId::new(2, 2)).unwrap(),
        0
    );
    assert!(grid.is_resident(id));
    assert!(grid.persist_one(id).unwrap());
    assert!(!chunk_path(grid.directory(), id).exists());
}

#[test]
fn test_nan_sentinel_keeps_chunk_trivial() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = DoubleGrid::builder(temp.path().join("nan"))
        .size(6, 6)
        .chunk_size(2, 2)
        .no_data(f64::NAN)
        .build(&memory)
        .unwrap();
    let id = ChunkId::new(0, 0);

    grid.set_cell(0, 0, f64::NAN).unwrap();
    assert!(grid.is_trivial(id));
    assert!(!grid.is_worth_swapping(id));
    assert_eq!(grid.dirty_count(), 0);
    assert!(grid.eviction_candidates().is_empty());
}

#[test]
fn test_rewriting_nan_reports_one_change() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let changes = Rc::new(Cell::new(0));
    let grid = DoubleGrid::builder(temp.path().join("grid"))
        .size(6, 6)
        .chunk_size(2, 2)
        .no_data(NO_DATA)
        .statistics(Box::new(CountingStatistics(Rc::clone(&changes))))
        .build(&memory)
        .unwrap();

    grid.set_cell(0, 0, f64::NAN).unwrap();
    assert!(grid.persist_one(ChunkId::new(0, 0)).unwrap());
    grid.set_cell(0, 0, f64::NAN).unwrap();

    assert_eq!(changes.get(), 1);
    assert_eq!(grid.dirty_count(), 0);
    assert!(grid.get_cell(0, 0).unwrap().is_nan());
}

#[test]
fn test_unwritten_cells_read_no_data_without_files() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    assert_eq!(grid.get_cell(5, 0).unwrap(), NO_DATA);
    assert!(!grid.ensure_resident(ChunkId::new(2, 0)).unwrap());
    assert!(grid.resident_chunks().is_empty());
    assert_eq!(grid.swap_stats().missing_loads, 2);
}

#[test]
fn test_out_of_range_cell() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = grid(&temp, &memory);

    assert!(grid.get_cell(6, 0).is_err());
    assert!(grid.set_cell(0, -1, 1.0).is_err());
}
