//! Chunked raster grids backed by a swap directory.
//!
//! A grid is a fixed-size 2-D array of cells split into chunks. Chunks live
//! in memory until swapped out to one file each in the grid's directory, and
//! are reloaded transparently on the next access. `thisFile` in the same
//! directory records the grid's shape so it can be reopened later.
//!
//! [`Grid`] is the handle callers use: every operation on it retries through
//! the [`MemoryManager`](crate::memory::MemoryManager) when memory runs out.
//! [`GridStore`] holds the state and performs single attempts.

mod builder;
mod handle;
mod import;
mod lock;
mod metadata;
mod path;
mod stats;
mod store;

pub use builder::GridBuilder;
pub use handle::{DoubleGrid, Grid, IntGrid};
pub use import::{GridSource, ImportError, MemorySource, SourceHeader};
pub use lock::DirectoryLock;
pub use metadata::{GridMetadata, METADATA_VERSION};
pub use path::{
    chunk_file_name, chunk_path, lock_path, metadata_path, parse_chunk_file_name, LOCK_FILE,
    METADATA_FILE,
};
pub use stats::SwapStats;
pub use store::{GridStore, Residency};
