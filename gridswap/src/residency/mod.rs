//! Chunk residency map.
//!
//! Tracks every chunk identity a grid knows about, whether its chunk is
//! currently in memory, and which resident chunks are worth swapping
//! (resident and non-trivial). The candidate set is kept consistent with the
//! map on every insert, update and eviction.

mod candidates;

pub use candidates::CandidateSet;

use crate::chunk::{CellValue, Chunk};
use crate::coord::ChunkId;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Ordered map from chunk identity to an optional resident chunk.
///
/// `None` means the chunk is known (registered) but evicted; an identity
/// missing from the map was never registered.
#[derive(Debug, Clone)]
pub struct ResidencyMap<T> {
    entries: BTreeMap<ChunkId, Option<Chunk<T>>>,
    candidates: CandidateSet,
}

impl<T: CellValue> Default for ResidencyMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CellValue> ResidencyMap<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            candidates: CandidateSet::new(),
        }
    }

    /// Record that `id` exists without making it resident.
    ///
    /// Returns `false` if it was already registered.
    pub fn register(&mut self, id: ChunkId) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, None);
        true
    }

    /// Make `chunk` resident under `id`, returning any chunk it replaces.
    pub fn insert(&mut self, id: ChunkId, chunk: Chunk<T>) -> Option<Chunk<T>> {
        let trivial = chunk.is_trivial();
        let previous = self.entries.insert(id, Some(chunk)).flatten();
        if trivial {
            self.candidates.remove(&id);
        } else {
            self.candidates.insert(id);
        }
        previous
    }

    /// Resident chunk for `id`; `None` if evicted or never registered.
    pub fn get(&self, id: &ChunkId) -> Option<&Chunk<T>> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    /// Run `f` on the resident chunk for `id`, then refresh its candidacy.
    pub fn update<R>(&mut self, id: &ChunkId, f: impl FnOnce(&mut Chunk<T>) -> R) -> Option<R> {
        let chunk = self.entries.get_mut(id).and_then(Option::as_mut)?;
        let result = f(chunk);
        if chunk.is_trivial() {
            self.candidates.remove(id);
        } else {
            self.candidates.insert(*id);
        }
        Some(result)
    }

    pub fn is_registered(&self, id: &ChunkId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_resident(&self, id: &ChunkId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` is resident with a trivial (uniform) encoding.
    pub fn is_trivial(&self, id: &ChunkId) -> bool {
        self.get(id).is_some_and(Chunk::is_trivial)
    }

    /// Resident and non-trivial.
    pub fn is_worth_swapping(&self, id: &ChunkId) -> bool {
        self.get(id).is_some_and(|chunk| !chunk.is_trivial())
    }

    /// Drop the in-memory chunk for `id`, keeping the identity registered.
    ///
    /// Idempotent: evicting an evicted or unknown identity returns `None`.
    pub fn evict(&mut self, id: &ChunkId) -> Option<Chunk<T>> {
        self.candidates.remove(id);
        self.entries.get_mut(id).and_then(Option::take)
    }

    /// Mark the resident chunk dirty. Returns `false` if not resident.
    pub fn mark_dirty(&mut self, id: &ChunkId) -> bool {
        self.update(id, Chunk::mark_dirty).is_some()
    }

    /// Mark the resident chunk clean. Returns `false` if not resident.
    pub fn clear_dirty(&mut self, id: &ChunkId) -> bool {
        self.update(id, Chunk::mark_clean).is_some()
    }

    /// Oldest eviction candidate, in candidate insertion order.
    pub fn first_candidate(&self) -> Option<ChunkId> {
        self.candidates.first()
    }

    /// Oldest eviction candidate accepted by `keep`.
    pub fn first_candidate_where(&self, mut keep: impl FnMut(&ChunkId) -> bool) -> Option<ChunkId> {
        self.candidates.iter().find(|id| keep(id))
    }

    /// Eviction candidates in insertion order.
    pub fn candidates(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.candidates.iter()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Eviction candidates in row-major order.
    pub fn candidates_row_major(&self) -> Vec<ChunkId> {
        self.entries
            .iter()
            .filter(|(_, chunk)| chunk.as_ref().is_some_and(|c| !c.is_trivial()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Eviction candidates between `range` bounds (inclusive), row-major.
    ///
    /// Row-major ordering of [`ChunkId`] makes this the partial first row,
    /// full middle rows and partial last row between the two bounds.
    pub fn candidates_in(&self, range: RangeInclusive<ChunkId>) -> Vec<ChunkId> {
        if range.start() > range.end() {
            return Vec::new();
        }
        self.entries
            .range(range)
            .filter(|(_, chunk)| chunk.as_ref().is_some_and(|c| !c.is_trivial()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Registered identities in row-major order.
    pub fn registered_ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.entries.keys().copied()
    }

    /// Resident identities in row-major order.
    pub fn resident_ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.entries
            .iter()
            .filter(|(_, chunk)| chunk.is_some())
            .map(|(id, _)| *id)
    }

    pub fn registered_count(&self) -> usize {
        self.entries.len()
    }

    pub fn resident_count(&self) -> usize {
        self.entries.values().filter(|chunk| chunk.is_some()).count()
    }

    /// Heap bytes held by resident chunks.
    pub fn resident_bytes(&self) -> usize {
        self.entries
            .values()
            .flatten()
            .map(Chunk::heap_bytes)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::ChunkCell;

    fn dense(value: f64) -> Chunk<f64> {
        Chunk::dense(2, 2, value).unwrap()
    }

    #[test]
    fn test_registered_but_evicted_is_distinct_from_unknown() {
        let mut map = ResidencyMap::<f64>::new();
        let id = ChunkId::new(0, 0);

        assert!(!map.is_registered(&id));
        assert!(map.register(id));
        assert!(!map.register(id));
        assert!(map.is_registered(&id));
        assert!(!map.is_resident(&id));
        assert!(map.get(&id).is_none());
    }

    #[test]
    fn test_insert_non_trivial_becomes_candidate() {
        let mut map = ResidencyMap::new();
        let id = ChunkId::new(1, 2);
        map.insert(id, dense(1.0));

        assert!(map.is_resident(&id));
        assert!(map.is_worth_swapping(&id));
        assert!(!map.is_trivial(&id));
        assert_eq!(map.first_candidate(), Some(id));
    }

    #[test]
    fn test_trivial_chunk_is_never_a_candidate() {
        let mut map = ResidencyMap::new();
        let id = ChunkId::new(0, 0);
        map.insert(id, Chunk::uniform(2, 2, -9999.0));

        assert!(map.is_resident(&id));
        assert!(map.is_trivial(&id));
        assert!(!map.is_worth_swapping(&id));
        assert_eq!(map.candidate_count(), 0);
    }

    #[test]
    fn test_update_refreshes_candidacy() {
        let mut map = ResidencyMap::new();
        let id = ChunkId::new(0, 0);
        map.insert(id, Chunk::uniform(2, 2, 0.0));
        assert_eq!(map.candidate_count(), 0);

        let old = map.update(&id, |chunk| chunk.set(ChunkCell::new(0, 0), 4.0));
        assert_eq!(old, Some(Ok(0.0)));
        assert!(map.is_worth_swapping(&id));
        assert_eq!(map.candidates().collect::<Vec<_>>(), vec![id]);
    }

    #[test]
    fn test_evict_is_idempotent() {
        let mut map = ResidencyMap::new();
        let id = ChunkId::new(0, 0);
        map.insert(id, dense(1.0));

        assert!(map.evict(&id).is_some());
        assert!(map.evict(&id).is_none());
        assert!(map.evict(&ChunkId::new(9, 9)).is_none());
        assert!(map.is_registered(&id));
        assert!(!map.is_resident(&id));
        assert_eq!(map.candidate_count(), 0);
    }

    #[test]
    fn test_dirty_flags() {
        let mut map = ResidencyMap::new();
        let id = ChunkId::new(0, 0);
        map.insert(id, dense(1.0));

        assert!(map.clear_dirty(&id));
        assert!(map.get(&id).unwrap().is_swap_up_to_date());
        assert!(map.mark_dirty(&id));
        assert!(!map.get(&id).unwrap().is_swap_up_to_date());
        assert!(!map.mark_dirty(&ChunkId::new(5, 5)));
    }

    #[test]
    fn test_candidate_orders() {
        let mut map = ResidencyMap::new();
        map.insert(ChunkId::new(1, 0), dense(1.0));
        map.insert(ChunkId::new(0, 1), dense(2.0));
        map.insert(ChunkId::new(0, 0), Chunk::uniform(2, 2, 0.0));

        assert_eq!(map.first_candidate(), Some(ChunkId::new(1, 0)));
        assert_eq!(
            map.candidates_row_major(),
            vec![ChunkId::new(0, 1), ChunkId::new(1, 0)]
        );
        assert_eq!(
            map.first_candidate_where(|id| *id != ChunkId::new(1, 0)),
            Some(ChunkId::new(0, 1))
        );
    }

    #[test]
    fn test_candidates_in_range() {
        let mut map = ResidencyMap::new();
        for row in 0..3 {
            for col in 0..3 {
                map.insert(ChunkId::new(row, col), dense(1.0));
            }
        }

        let ids = map.candidates_in(ChunkId::new(0, 2)..=ChunkId::new(2, 0));
        assert_eq!(
            ids,
            vec![
                ChunkId::new(0, 2),
                ChunkId::new(1, 0),
                ChunkId::new(1, 1),
                ChunkId::new(1, 2),
                ChunkId::new(2, 0),
            ]
        );
        assert!(map
            .candidates_in(ChunkId::new(2, 0)..=ChunkId::new(0, 0))
            .is_empty());
    }

    #[test]
    fn test_counts_and_bytes() {
        let mut map = ResidencyMap::new();
        map.insert(ChunkId::new(0, 0), dense(1.0));
        map.insert(ChunkId::new(0, 1), Chunk::uniform(2, 2, 0.0));
        map.register(ChunkId::new(0, 2));

        assert_eq!(map.registered_count(), 3);
        assert_eq!(map.resident_count(), 2);
        assert_eq!(map.resident_bytes(), 4 * 8);
        assert_eq!(
            map.resident_ids().collect::<Vec<_>>(),
            vec![ChunkId::new(0, 0), ChunkId::new(0, 1)]
        );
    }
}
