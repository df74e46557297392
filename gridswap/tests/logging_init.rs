//! Global subscriber installation. Kept in its own test binary because the
//! subscriber can only be installed once per process.

use gridswap::config::LoggingSettings;
use gridswap::grid::DoubleGrid;
use gridswap::logging::{init_logging, init_logging_from};
use gridswap::memory::{MemoryConfig, MemoryManager};
use std::fs;
use std::io::ErrorKind;
use tempfile::TempDir;

#[test]
fn test_init_logging_writes_grid_events() {
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("logs");
    fs::create_dir_all(&log_dir).unwrap();
    fs::write(log_dir.join("gridswap.log"), "stale").unwrap();

    let guard = init_logging(&log_dir, "gridswap.log").unwrap();

    let memory = MemoryManager::new(MemoryConfig::default());
    let grid = DoubleGrid::builder(temp.path().join("logged"))
        .size(2, 2)
        .build(&memory)
        .unwrap();
    grid.close().unwrap();

    let second = init_logging_from(&LoggingSettings {
        file: temp.path().join("other").join("second.log"),
    });
    assert_eq!(second.err().map(|e| e.kind()), Some(ErrorKind::AlreadyExists));

    drop(guard);
    let contents = fs::read_to_string(log_dir.join("gridswap.log")).unwrap();
    assert!(!contents.contains("stale"));
    assert!(contents.contains("Created logged"));
}
