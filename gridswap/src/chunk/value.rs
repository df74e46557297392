//! Cell value types a grid can hold.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying the numeric type stored in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// 64-bit floating point cells
    Double,
    /// 32-bit integer cells
    Int,
}

impl ValueKind {
    /// Tag byte used in chunk files.
    pub fn tag(self) -> u8 {
        match self {
            ValueKind::Double => 1,
            ValueKind::Int => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ValueKind::Double),
            2 => Some(ValueKind::Int),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Double => write!(f, "double"),
            ValueKind::Int => write!(f, "int"),
        }
    }
}

/// A numeric cell type.
///
/// Implemented for `f64` and `i32`; the set is closed so that chunk files can
/// carry a [`ValueKind`] tag and be checked on load.
pub trait CellValue: Copy + PartialEq + fmt::Debug + 'static {
    const KIND: ValueKind;
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Conventional no-data sentinel for this type.
    fn default_no_data() -> Self;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from exactly [`WIDTH`](Self::WIDTH) little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    fn to_f64(self) -> f64;

    /// Convert from `f64`, saturating for integer types.
    fn from_f64(value: f64) -> Self;

    /// Whether two cells hold the same value. NaN is the same as itself.
    fn same(self, other: Self) -> bool;
}

impl CellValue for f64 {
    const KIND: ValueKind = ValueKind::Double;
    const WIDTH: usize = 8;

    fn default_no_data() -> Self {
        -9999.0
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        f64::from_le_bytes(buf)
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn same(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl CellValue for i32 {
    const KIND: ValueKind = ValueKind::Int;
    const WIDTH: usize = 4;

    fn default_no_data() -> Self {
        -9999
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        i32::from_le_bytes(buf)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as i32
    }

    fn same(self, other: Self) -> bool {
        self == other
    }
}
