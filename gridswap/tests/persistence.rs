//! Grid directories on disk: save, reopen, locking, import and copying.

use gridswap::chunk::ValueKind;
use gridswap::coord::ChunkId;
use gridswap::grid::{
    chunk_path, metadata_path, DoubleGrid, GridMetadata, ImportError, IntGrid, MemorySource,
    SourceHeader,
};
use gridswap::log::{CapturingLogger, LogLevel, NoOpLogger};
use gridswap::memory::{MemoryConfig, MemoryManager};
use gridswap::stats::SummaryStatistics;
use gridswap::GridError;
use rust_decimal::Decimal;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn manager() -> MemoryManager {
    MemoryManager::with_logger(MemoryConfig::default(), Arc::new(NoOpLogger))
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn test_close_and_reopen() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("dem");
    let memory = manager();

    let grid = DoubleGrid::builder(&dir)
        .size(10, 7)
        .chunk_size(4, 3)
        .origin(dec("100.5"), dec("-20"))
        .cell_size(dec("0.25"))
        .no_data(-1.0)
        .build(&memory)
        .unwrap();
    grid.set_cell(0, 0, 1.25).unwrap();
    grid.set_cell(9, 6, 2.5).unwrap();
    grid.set_cell(5, 3, 3.75).unwrap();
    grid.close().unwrap();
    assert!(metadata_path(&dir).exists());

    let reopened = DoubleGrid::open(&dir, &memory).unwrap();
    assert_eq!(reopened.n_rows(), 10);
    assert_eq!(reopened.n_cols(), 7);
    assert_eq!(reopened.layout().chunk_n_rows(), 4);
    assert_eq!(reopened.no_data(), -1.0);
    assert_eq!(reopened.dimensions().x_min(), dec("100.5"));
    assert_eq!(reopened.dimensions().cell_size(), dec("0.25"));
    assert!(reopened.resident_chunks().is_empty());

    assert_eq!(reopened.get_cell(0, 0).unwrap(), 1.25);
    assert_eq!(reopened.get_cell(9, 6).unwrap(), 2.5);
    assert_eq!(reopened.get_cell(5, 3).unwrap(), 3.75);
    assert_eq!(reopened.get_cell(5, 4).unwrap(), -1.0);
}

#[test]
fn test_save_keeps_chunks_resident() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = DoubleGrid::builder(temp.path().join("g"))
        .size(4, 4)
        .chunk_size(2, 2)
        .build(&memory)
        .unwrap();

    grid.set_cell(0, 0, 1.0).unwrap();
    grid.set_cell(3, 3, 2.0).unwrap();
    assert_eq!(grid.dirty_count(), 2);

    assert_eq!(grid.save().unwrap(), 2);
    assert_eq!(grid.dirty_count(), 0);
    assert_eq!(grid.resident_chunks().len(), 2);
    assert_eq!(grid.save().unwrap(), 0);
}

#[test]
fn test_drop_flushes_dirty_chunks() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("g");
    let memory = manager();
    {
        let grid = DoubleGrid::builder(&dir)
            .size(4, 4)
            .chunk_size(2, 2)
            .build(&memory)
            .unwrap();
        grid.set_cell(0, 0, 1.0).unwrap();
        grid.save().unwrap();
        grid.set_cell(0, 0, 5.0).unwrap();
        grid.set_cell(3, 3, 6.0).unwrap();
    }
    assert_eq!(memory.grid_count(), 0);

    let grid = DoubleGrid::open(&dir, &memory).unwrap();
    assert_eq!(grid.get_cell(0, 0).unwrap(), 5.0);
    assert_eq!(grid.get_cell(3, 3).unwrap(), 6.0);
    assert_eq!(grid.get_cell(1, 1).unwrap(), grid.no_data());
}

#[test]
fn test_directory_lock() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("g");
    let memory = manager();
    let grid = DoubleGrid::builder(&dir).size(2, 2).build(&memory).unwrap();

    let err = DoubleGrid::open(&dir, &memory).unwrap_err();
    assert!(matches!(err, GridError::DirectoryLocked(_)));

    drop(grid);
    assert!(DoubleGrid::open(&dir, &memory).is_ok());
}

#[test]
fn test_build_refuses_existing_grid() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("g");
    let memory = manager();
    DoubleGrid::builder(&dir)
        .size(2, 2)
        .build(&memory)
        .unwrap()
        .close()
        .unwrap();

    let err = DoubleGrid::builder(&dir).size(2, 2).build(&memory).unwrap_err();
    assert!(matches!(err, GridError::AlreadyAGrid(_)));
}

#[test]
fn test_open_errors() {
    let temp = TempDir::new().unwrap();
    let memory = manager();

    let err = DoubleGrid::open(temp.path(), &memory).unwrap_err();
    assert!(matches!(err, GridError::NotAGrid(_)));

    let dir = temp.path().join("ints");
    IntGrid::builder(&dir)
        .size(2, 2)
        .build(&memory)
        .unwrap()
        .close()
        .unwrap();
    let err = DoubleGrid::open(&dir, &memory).unwrap_err();
    assert!(matches!(
        err,
        GridError::GridKindMismatch {
            expected: ValueKind::Double,
            found: ValueKind::Int
        }
    ));
}

#[test]
fn test_invalid_shape_rejected() {
    let temp = TempDir::new().unwrap();
    let memory = manager();

    assert!(DoubleGrid::builder(temp.path().join("a"))
        .size(0, 5)
        .build(&memory)
        .is_err());
    assert!(DoubleGrid::builder(temp.path().join("b"))
        .size(5, 5)
        .chunk_size(0, 2)
        .build(&memory)
        .is_err());
}

/// Writes a double chunk file into an int grid's directory.
fn mismatched_int_grid(temp: &TempDir, memory: &MemoryManager) -> std::path::PathBuf {
    let doubles = temp.path().join("doubles");
    let ints = temp.path().join("ints");

    let grid = DoubleGrid::builder(&doubles)
        .size(4, 4)
        .chunk_size(2, 2)
        .build(memory)
        .unwrap();
    grid.set_cell(0, 0, 1.5).unwrap();
    grid.close().unwrap();

    IntGrid::builder(&ints)
        .size(4, 4)
        .chunk_size(2, 2)
        .build(memory)
        .unwrap()
        .close()
        .unwrap();

    let id = ChunkId::new(0, 0);
    fs::copy(chunk_path(&doubles, id), chunk_path(&ints, id)).unwrap();
    ints
}

#[test]
fn test_type_mismatch_lenient_reads_no_data() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let dir = mismatched_int_grid(&temp, &memory);
    let logger = CapturingLogger::new();

    let grid = IntGrid::builder(&dir)
        .strict_chunk_types(false)
        .logger(Arc::new(logger.clone()))
        .open(&memory)
        .unwrap();

    assert_eq!(grid.get_cell(0, 0).unwrap(), grid.no_data());
    assert_eq!(grid.set_cell(1, 1, 8).unwrap(), grid.no_data());
    assert_eq!(grid.get_cell(1, 1).unwrap(), grid.no_data());
    assert!(!grid.is_resident(ChunkId::new(0, 0)));
    assert!(grid.swap_stats().type_mismatches >= 1);
    assert!(logger.contains(LogLevel::Warn, "holds double values"));
}

#[test]
fn test_type_mismatch_strict_is_an_error() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let dir = mismatched_int_grid(&temp, &memory);

    let grid = IntGrid::builder(&dir)
        .strict_chunk_types(true)
        .open(&memory)
        .unwrap();

    let err = grid.get_cell(0, 0).unwrap_err();
    assert!(matches!(
        err,
        GridError::ChunkTypeMismatch {
            expected: ValueKind::Int,
            found: ValueKind::Double,
            ..
        }
    ));
}

#[test]
fn test_import_flips_rows() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let header = SourceHeader {
        n_rows: 3,
        n_cols: 2,
        x_min: dec("10"),
        y_min: dec("20"),
        cell_size: dec("5"),
        no_data: -9999.0,
    };
    // Top row first.
    let values = vec![1.0, 2.0, 3.0, -9999.0, 5.0, 6.0];
    let mut source = MemorySource::new(header, values);

    let grid = DoubleGrid::builder(temp.path().join("imported"))
        .chunk_size(2, 2)
        .statistics(Box::new(SummaryStatistics::new()))
        .import(&mut source, &memory)
        .unwrap();

    assert_eq!(grid.n_rows(), 3);
    assert_eq!(grid.get_cell(2, 0).unwrap(), 1.0);
    assert_eq!(grid.get_cell(2, 1).unwrap(), 2.0);
    assert_eq!(grid.get_cell(1, 0).unwrap(), 3.0);
    assert_eq!(grid.get_cell(1, 1).unwrap(), -9999.0);
    assert_eq!(grid.get_cell(0, 0).unwrap(), 5.0);
    assert_eq!(grid.get_cell(0, 1).unwrap(), 6.0);

    // Top-left corner of the extent is the first source value.
    assert_eq!(grid.get_cell_at(dec("10"), dec("35")).unwrap(), 1.0);

    let stats = grid.statistics().unwrap();
    assert_eq!(stats.count, 5);
    assert_eq!(stats.sum, dec("17"));
    assert_eq!(stats.min, Some(dec("1")));
    assert_eq!(stats.max, Some(dec("6")));
    assert_eq!(grid.dirty_count(), 0);
}

#[test]
fn test_import_truncated_source() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let header = SourceHeader {
        n_rows: 2,
        n_cols: 2,
        x_min: Decimal::ZERO,
        y_min: Decimal::ZERO,
        cell_size: Decimal::ONE,
        no_data: -9999.0,
    };
    let mut source = MemorySource::new(header, vec![1.0, 2.0, 3.0]);

    let err = DoubleGrid::builder(temp.path().join("short"))
        .import(&mut source, &memory)
        .unwrap_err();
    assert!(matches!(
        err,
        GridError::Import(ImportError::Truncated {
            expected: 4,
            found: 3
        })
    ));
}

#[test]
fn test_statistics_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("g");
    let memory = manager();

    let grid = DoubleGrid::builder(&dir)
        .size(4, 4)
        .chunk_size(2, 2)
        .statistics(Box::new(SummaryStatistics::new()))
        .build(&memory)
        .unwrap();
    grid.set_cell(0, 0, 2.5).unwrap();
    grid.set_cell(1, 1, 4.0).unwrap();
    grid.set_cell(1, 1, 4.0).unwrap();
    let saved = grid.statistics().unwrap();
    assert_eq!(saved.count, 2);
    grid.close().unwrap();

    let metadata = GridMetadata::load(&dir).unwrap();
    assert_eq!(metadata.statistics.as_ref(), Some(&saved));

    let reopened = DoubleGrid::builder(&dir)
        .statistics(Box::new(SummaryStatistics::new()))
        .open(&memory)
        .unwrap();
    assert_eq!(reopened.statistics(), Some(saved));
}

#[test]
fn test_copy_from_converts_and_clips() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let source = DoubleGrid::builder(temp.path().join("source"))
        .size(4, 4)
        .chunk_size(2, 2)
        .no_data(-1.0)
        .build(&memory)
        .unwrap();
    source.set_cell(0, 0, 1.9).unwrap();
    source.set_cell(2, 2, 7.0).unwrap();
    source.set_cell(3, 3, 9.0).unwrap();
    source.persist_and_evict_all().unwrap();

    let target = IntGrid::builder(temp.path().join("target"))
        .size(3, 3)
        .chunk_size(2, 2)
        .no_data(-5)
        .build(&memory)
        .unwrap();
    target.set_cell(1, 1, 4).unwrap();

    let changed = target.copy_from(&source).unwrap();
    // (0, 0) and (2, 2) gain data, (1, 1) goes back to no-data.
    assert_eq!(changed, 3);
    assert_eq!(target.get_cell(0, 0).unwrap(), 1);
    assert_eq!(target.get_cell(2, 2).unwrap(), 7);
    assert_eq!(target.get_cell(1, 1).unwrap(), -5);
    assert_eq!(target.get_cell(0, 1).unwrap(), -5);
}

#[test]
fn test_for_each_cell_visits_every_cell() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = IntGrid::builder(temp.path().join("g"))
        .size(5, 3)
        .chunk_size(2, 2)
        .no_data(0)
        .build(&memory)
        .unwrap();
    grid.set_cell(4, 2, 42).unwrap();

    let mut visited = 0;
    let mut found = Vec::new();
    grid.for_each_cell(|cell, value| {
        visited += 1;
        if value != 0 {
            found.push((cell.row, cell.col, value));
        }
    })
    .unwrap();

    assert_eq!(visited, 15);
    assert_eq!(found, vec![(4, 2, 42)]);
}

#[test]
fn test_real_world_access() {
    let temp = TempDir::new().unwrap();
    let memory = manager();
    let grid = DoubleGrid::builder(temp.path().join("g"))
        .size(4, 4)
        .chunk_size(2, 2)
        .origin(dec("0"), dec("0"))
        .cell_size(dec("10"))
        .build(&memory)
        .unwrap();

    grid.set_cell_at(dec("15"), dec("5"), 3.0).unwrap();
    assert_eq!(grid.get_cell(0, 1).unwrap(), 3.0);
    assert_eq!(grid.get_cell_at(dec("19.99"), dec("0")).unwrap(), 3.0);

    let err = grid.get_cell_at(dec("41"), dec("5")).unwrap_err();
    assert!(matches!(err, GridError::PointOutOfRange { .. }));

    let corner = grid.nearest_cell(dec("500"), dec("500"));
    assert_eq!((corner.row, corner.col), (0, 3));
    assert_eq!(grid.nearest_cell(dec("500"), dec("500")), corner);
}
