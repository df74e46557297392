//! gridswap - out-of-core raster grids
//!
//! Large 2-D grids of `f64` or `i32` cells split into chunks that are
//! swapped to a per-grid directory when memory runs short and reloaded on
//! demand. A process-wide [`memory::MemoryManager`] keeps a byte budget and
//! a reserve; when an allocation fails it evicts chunks from the current
//! grid and then from every other registered grid, and the failed operation
//! is retried.
//!
//! # Example
//!
//! ```
//! use gridswap::grid::DoubleGrid;
//! use gridswap::memory::{MemoryConfig, MemoryManager};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let memory = MemoryManager::new(MemoryConfig::default());
//!
//! let grid = DoubleGrid::builder(dir.path().join("elevation"))
//!     .size(512, 512)
//!     .chunk_size(128, 128)
//!     .no_data(-9999.0)
//!     .build(&memory)
//!     .unwrap();
//!
//! grid.set_cell(10, 20, 431.5).unwrap();
//! grid.persist_and_evict_all().unwrap();
//! assert_eq!(grid.get_cell(10, 20).unwrap(), 431.5);
//! assert_eq!(grid.get_cell(11, 20).unwrap(), -9999.0);
//! ```

pub mod chunk;
pub mod config;
pub mod coord;
pub mod error;
pub mod grid;
pub mod log;
pub mod logging;
pub mod memory;
pub mod residency;
pub mod stats;

pub use error::{GridError, GridResult};
pub use grid::{DoubleGrid, Grid, GridBuilder, IntGrid};
pub use memory::{MemoryConfig, MemoryManager};

/// Version of the gridswap library, from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
