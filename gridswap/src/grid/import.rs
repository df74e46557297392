//! Import boundary: building a grid from a streamed raster source.
//!
//! Parsers for concrete formats live outside this crate. They hand over a
//! [`SourceHeader`] and then cell values row by row, top row first, the way
//! ESRI ASCII grids are laid out.

use rust_decimal::Decimal;
use thiserror::Error;

/// Shape, placement and no-data sentinel of a source raster.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHeader {
    pub n_rows: i64,
    pub n_cols: i64,
    /// X of the left edge
    pub x_min: Decimal,
    /// Y of the bottom edge
    pub y_min: Decimal,
    pub cell_size: Decimal,
    pub no_data: f64,
}

/// Errors raised while reading a source.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid source header: {0}")]
    InvalidHeader(String),

    #[error("Source ended after {found} of {expected} values")]
    Truncated { expected: u64, found: u64 },

    #[error("Failed to read source: {0}")]
    Read(String),
}

/// A raster streamed in row-major order, top row first.
pub trait GridSource {
    fn header(&self) -> &SourceHeader;

    /// The next cell value, or `None` once every value has been read.
    fn next_value(&mut self) -> Result<Option<f64>, ImportError>;
}

/// A source backed by an in-memory vector.
#[derive(Debug, Clone)]
pub struct MemorySource {
    header: SourceHeader,
    values: Vec<f64>,
    position: usize,
}

impl MemorySource {
    pub fn new(header: SourceHeader, values: Vec<f64>) -> Self {
        Self {
            header,
            values,
            position: 0,
        }
    }
}

impl GridSource for MemorySource {
    fn header(&self) -> &SourceHeader {
        &self.header
    }

    fn next_value(&mut self) -> Result<Option<f64>, ImportError> {
        let value = self.values.get(self.position).copied();
        if value.is_some() {
            self.position += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_streams_in_order() {
        let header = SourceHeader {
            n_rows: 1,
            n_cols: 2,
            x_min: Decimal::ZERO,
            y_min: Decimal::ZERO,
            cell_size: Decimal::ONE,
            no_data: -9999.0,
        };
        let mut source = MemorySource::new(header.clone(), vec![1.0, 2.0]);

        assert_eq!(source.header(), &header);
        assert_eq!(source.next_value().unwrap(), Some(1.0));
        assert_eq!(source.next_value().unwrap(), Some(2.0));
        assert_eq!(source.next_value().unwrap(), None);
    }
}
