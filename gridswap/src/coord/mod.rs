//! Coordinate mapping module
//!
//! Translates between global cell coordinates, chunk identities and
//! intra-chunk cell coordinates ([`ChunkLayout`]), and between real-world
//! coordinates and cells ([`Dimensions`]).
//!
//! ```
//! use gridswap::coord::{CellId, ChunkId, ChunkLayout};
//!
//! let layout = ChunkLayout::new(1000, 1000, 256, 256).unwrap();
//! assert_eq!(layout.n_chunk_rows(), 4);
//! assert_eq!(layout.chunk_rows_in(3), 232);
//!
//! let (chunk, cell) = layout.split(CellId::new(700, 10));
//! assert_eq!(chunk, ChunkId::new(2, 0));
//! assert_eq!(layout.join(chunk, cell), CellId::new(700, 10));
//! ```

mod dimensions;
mod layout;
mod types;

pub use dimensions::Dimensions;
pub use layout::{ChunkIds, ChunkLayout};
pub use types::{CellId, ChunkCell, ChunkId, CoordError};
