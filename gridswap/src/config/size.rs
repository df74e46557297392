//! Byte sizes written as `512MB`, `64K` or `1048576`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// Suffixes, longest first within each unit so `MB` wins over `M`.
const UNITS: [(&str, usize); 6] = [
    ("GB", GB),
    ("G", GB),
    ("MB", MB),
    ("M", MB),
    ("KB", KB),
    ("K", KB),
];

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected a byte count with an optional K, KB, M, MB, G or GB suffix")]
pub struct SizeParseError {
    input: String,
}

/// Parse a size string into bytes.
///
/// Suffixes are binary (`1K` is 1024 bytes) and case-insensitive, and
/// whitespace between number and suffix is allowed.
///
/// # Examples
///
/// ```
/// use gridswap::config::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("64 kb").unwrap(), 64 * 1024);
/// assert_eq!(parse_size("512M").unwrap(), 512 * 1024 * 1024);
/// assert!(parse_size("1.5GB").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let err = || SizeParseError {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            upper
                .strip_suffix(suffix)
                .map(|rest| (&trimmed[..rest.len()], *multiplier))
        })
        .unwrap_or((trimmed, 1));

    let digits = digits.trim_end();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(err)
}

/// Format a byte count using the largest unit that divides it exactly.
///
/// ```
/// use gridswap::config::format_size;
///
/// assert_eq!(format_size(3 * 1024 * 1024), "3MB");
/// assert_eq!(format_size(1536), "1536");
/// assert_eq!(format_size(0), "0");
/// ```
pub fn format_size(bytes: usize) -> String {
    for (suffix, unit) in [("GB", GB), ("MB", MB), ("KB", KB)] {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    bytes.to_string()
}

/// Byte count that parses from and displays as a size string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Size(pub usize);

impl Size {
    pub fn bytes(self) -> usize {
        self.0
    }

    pub fn from_kb(kb: usize) -> Self {
        Self(kb * KB)
    }

    pub fn from_mb(mb: usize) -> Self {
        Self(mb * MB)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_size(self.0))
    }
}

impl FromStr for Size {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_size(s).map(Size)
    }
}
