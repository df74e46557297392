//! Binary encoding of chunk files.
//!
//! Layout (little-endian):
//!
//! ```text
//! offset  size  field
//! 0       4     magic "GSCK"
//! 4       1     version (1)
//! 5       1     value kind tag
//! 6       1     encoding (0 = uniform, 1 = dense)
//! 7       1     reserved (0)
//! 8       4     n_rows (i32)
//! 12      4     n_cols (i32)
//! 16      ...   one value (uniform) or n_rows * n_cols values (dense)
//! ```

use super::value::{CellValue, ValueKind};
use super::{filled_buffer, Chunk, ChunkData};
use crate::memory::OutOfMemory;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"GSCK";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 16;

/// Cell encoding recorded in a chunk file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Uniform,
    Dense,
}

impl Encoding {
    fn tag(self) -> u8 {
        match self {
            Encoding::Uniform => 0,
            Encoding::Dense => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Encoding::Uniform),
            1 => Some(Encoding::Dense),
            _ => None,
        }
    }
}

/// Decoded chunk file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: ValueKind,
    pub encoding: Encoding,
    pub n_rows: i32,
    pub n_cols: i32,
}

impl ChunkHeader {
    /// Heap bytes the decoded chunk will own.
    pub fn heap_bytes(&self) -> usize {
        match self.encoding {
            Encoding::Uniform => 0,
            Encoding::Dense => self.cell_count() * width_of(self.kind),
        }
    }

    fn cell_count(&self) -> usize {
        self.n_rows.max(0) as usize * self.n_cols.max(0) as usize
    }

    fn payload_len(&self) -> usize {
        let values = match self.encoding {
            Encoding::Uniform => 1,
            Encoding::Dense => self.cell_count(),
        };
        values * width_of(self.kind)
    }
}

fn width_of(kind: ValueKind) -> usize {
    match kind {
        ValueKind::Double => f64::WIDTH,
        ValueKind::Int => i32::WIDTH,
    }
}

/// Chunk file decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Chunk file too short: {0} bytes")]
    TooShort(usize),

    #[error("Not a chunk file (bad magic)")]
    BadMagic,

    #[error("Unsupported chunk file version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown value kind tag {0}")]
    UnknownKind(u8),

    #[error("Unknown chunk encoding tag {0}")]
    UnknownEncoding(u8),

    #[error("Invalid chunk shape {n_rows}x{n_cols}")]
    InvalidShape { n_rows: i32, n_cols: i32 },

    /// The file holds a different numeric type than requested
    #[error("Chunk holds {found} values, expected {expected}")]
    KindMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Chunk payload is {found} bytes, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error(transparent)]
    OutOfMemory(#[from] OutOfMemory),
}

/// Serialize a chunk.
pub fn encode<T: CellValue>(chunk: &Chunk<T>) -> Result<Vec<u8>, OutOfMemory> {
    let (encoding, payload_len) = match chunk.data() {
        ChunkData::Uniform(_) => (Encoding::Uniform, T::WIDTH),
        ChunkData::Dense(values) => (Encoding::Dense, values.len() * T::WIDTH),
    };
    let total = HEADER_LEN + payload_len;

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(total)
        .map_err(|_| OutOfMemory::Heap { requested: total })?;

    bytes.extend_from_slice(MAGIC);
    bytes.push(VERSION);
    bytes.push(T::KIND.tag());
    bytes.push(encoding.tag());
    bytes.push(0);
    bytes.extend_from_slice(&chunk.n_rows().to_le_bytes());
    bytes.extend_from_slice(&chunk.n_cols().to_le_bytes());

    match chunk.data() {
        ChunkData::Uniform(value) => value.write_le(&mut bytes),
        ChunkData::Dense(values) => {
            for value in values {
                value.write_le(&mut bytes);
            }
        }
    }

    Ok(bytes)
}

/// Read and validate the header of a chunk file.
pub fn peek_header(bytes: &[u8]) -> Result<ChunkHeader, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TooShort(bytes.len()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if bytes[4] != VERSION {
        return Err(CodecError::UnsupportedVersion(bytes[4]));
    }

    let kind = ValueKind::from_tag(bytes[5]).ok_or(CodecError::UnknownKind(bytes[5]))?;
    let encoding = Encoding::from_tag(bytes[6]).ok_or(CodecError::UnknownEncoding(bytes[6]))?;
    let n_rows = read_i32(&bytes[8..12]);
    let n_cols = read_i32(&bytes[12..16]);
    if n_rows <= 0 || n_cols <= 0 {
        return Err(CodecError::InvalidShape { n_rows, n_cols });
    }

    let header = ChunkHeader {
        kind,
        encoding,
        n_rows,
        n_cols,
    };
    let found = bytes.len() - HEADER_LEN;
    if found != header.payload_len() {
        return Err(CodecError::LengthMismatch {
            expected: header.payload_len(),
            found,
        });
    }

    Ok(header)
}

/// Deserialize a chunk of cell type `T`. The decoded chunk is clean.
pub fn decode<T: CellValue>(bytes: &[u8]) -> Result<Chunk<T>, CodecError> {
    let header = peek_header(bytes)?;
    if header.kind != T::KIND {
        return Err(CodecError::KindMismatch {
            expected: T::KIND,
            found: header.kind,
        });
    }

    let payload = &bytes[HEADER_LEN..];
    let data = match header.encoding {
        Encoding::Uniform => ChunkData::Uniform(T::read_le(payload)),
        Encoding::Dense => {
            let first = T::read_le(&payload[..T::WIDTH]);
            let mut values = filled_buffer(header.cell_count(), first)?;
            for (slot, raw) in values.iter_mut().zip(payload.chunks_exact(T::WIDTH)) {
                *slot = T::read_le(raw);
            }
            ChunkData::Dense(values)
        }
    };

    Ok(Chunk::from_parts(header.n_rows, header.n_cols, data))
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    i32::from_le_bytes(buf)
}
