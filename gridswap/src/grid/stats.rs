//! Swap statistics tracking and reporting.

use crate::config::format_size;

/// Swap activity counters for one grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapStats {
    // Access
    pub resident_hits: u64,
    pub loads: u64,
    pub missing_loads: u64,
    pub type_mismatches: u64,

    // Persistence
    pub writes: u64,
    pub bytes_written: u64,
    pub clean_skips: u64,
    pub evictions: u64,

    // Current footprint
    pub resident_chunks: usize,
    pub resident_bytes: usize,
}

impl SwapStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of chunk lookups served without touching disk (0.0 to 1.0).
    pub fn resident_hit_rate(&self) -> f64 {
        let total = self.resident_hits + self.loads + self.missing_loads;
        if total == 0 {
            0.0
        } else {
            self.resident_hits as f64 / total as f64
        }
    }

    pub fn record_resident_hit(&mut self) {
        self.resident_hits += 1;
    }

    /// A chunk file was read back into memory.
    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    /// A chunk was looked up but has no file (all no-data).
    pub fn record_missing_load(&mut self) {
        self.missing_loads += 1;
    }

    pub fn record_type_mismatch(&mut self) {
        self.type_mismatches += 1;
    }

    pub fn record_write(&mut self, bytes: usize) {
        self.writes += 1;
        self.bytes_written += bytes as u64;
    }

    /// A persist request found the chunk already clean.
    pub fn record_clean_skip(&mut self) {
        self.clean_skips += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn update_resident(&mut self, chunks: usize, bytes: usize) {
        self.resident_chunks = chunks;
        self.resident_bytes = bytes;
    }

    /// Format statistics as a human-readable report.
    pub fn format(&self, grid: &str) -> String {
        format!(
            r#"Swap statistics for {}

RESIDENT
  Chunks:      {}
  Size:        {}
  Hit Rate:    {:.1}%

DISK
  Loads:       {}
  Missing:     {}
  Writes:      {}
  Written:     {}
  Clean Skips: {}
  Evictions:   {}
  Mismatches:  {}
"#,
            grid,
            self.resident_chunks,
            format_size(self.resident_bytes),
            self.resident_hit_rate() * 100.0,
            self.loads,
            self.missing_loads,
            self.writes,
            format_size(self.bytes_written as usize),
            self.clean_skips,
            self.evictions,
            self.type_mismatches,
        )
    }
}
