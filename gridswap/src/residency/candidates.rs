//! Insertion-ordered set of eviction candidates.

use crate::coord::ChunkId;
use std::collections::{BTreeMap, HashMap};

/// Set of chunk identities that remembers the order they were first added.
///
/// Re-inserting an identity that is already present keeps its original
/// position; removing and adding it again moves it to the back.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    by_id: HashMap<ChunkId, u64>,
    by_seq: BTreeMap<u64, ChunkId>,
    next_seq: u64,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: ChunkId) -> bool {
        if self.by_id.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(id, seq);
        self.by_seq.insert(seq, id);
        true
    }

    /// Remove `id`; returns `false` if it was absent.
    pub fn remove(&mut self, id: &ChunkId) -> bool {
        match self.by_id.remove(id) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &ChunkId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Oldest member.
    pub fn first(&self) -> Option<ChunkId> {
        self.by_seq.values().next().copied()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.by_seq.values().copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
