//! Analysis Cache
//!
//! Per-position memo keyed by the structural hash: engine evaluations plus the
//! legal move list and game status, so revisiting a position costs nothing.
//! Bounded; the least recently touched entry goes first.

use crate::engine::score::Score;
use crate::moves::Move;
use crate::rules::GameStatus;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Cached engine verdict
#[derive(Clone, Debug, PartialEq)]
pub struct CachedEvaluation {
    /// From White's point of view
    pub score: Score,
    pub white_win_probability: f64,
    pub depth: u32,
    pub best_move: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub hash: u64,
    pub evaluation: Option<CachedEvaluation>,
    pub legal_moves: Option<Vec<Move>>,
    pub status: Option<GameStatus>,
    stamp: u64,
}

impl CacheEntry {
    fn new(hash: u64) -> Self {
        CacheEntry {
            hash,
            evaluation: None,
            legal_moves: None,
            status: None,
            stamp: 0,
        }
    }
}

pub struct AnalysisCache {
    entries: HashMap<u64, CacheEntry>,
    /// stamp -> hash, oldest first
    recency: BTreeMap<u64, u64>,
    capacity: usize,
    clock: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        AnalysisCache {
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            capacity,
            clock: 0,
            hits: 0,
            misses: 0,
            writes: 0,
        }
    }

    /// Look up a position, counting the hit or miss and refreshing its age
    pub fn probe(&mut self, hash: u64) -> Option<&CacheEntry> {
        if self.entries.contains_key(&hash) {
            self.hits += 1;
            self.touch(hash);
            self.entries.get(&hash)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Look up without touching statistics or age
    pub fn peek(&self, hash: u64) -> Option<&CacheEntry> {
        self.entries.get(&hash)
    }

    /// Evaluation at `min_depth` or deeper
    pub fn evaluation(&mut self, hash: u64, min_depth: u32) -> Option<CachedEvaluation> {
        self.probe(hash)
            .and_then(|e| e.evaluation.clone())
            .filter(|ev| ev.depth >= min_depth)
    }

    /// Store an engine result. A shallower result never replaces a deeper one.
    pub fn store_evaluation(&mut self, hash: u64, evaluation: CachedEvaluation) -> bool {
        let should_replace = match self.entries.get(&hash).and_then(|e| e.evaluation.as_ref()) {
            None => true,
            Some(existing) => evaluation.depth >= existing.depth,
        };
        if should_replace {
            self.entry_mut(hash).evaluation = Some(evaluation);
            self.writes += 1;
        }
        should_replace
    }

    pub fn legal_moves(&mut self, hash: u64) -> Option<Vec<Move>> {
        self.probe(hash).and_then(|e| e.legal_moves.clone())
    }

    pub fn store_legal_moves(&mut self, hash: u64, moves: Vec<Move>) {
        self.entry_mut(hash).legal_moves = Some(moves);
        self.writes += 1;
    }

    pub fn status(&mut self, hash: u64) -> Option<GameStatus> {
        self.probe(hash).and_then(|e| e.status)
    }

    pub fn store_status(&mut self, hash: u64, status: GameStatus) {
        self.entry_mut(hash).status = Some(status);
        self.writes += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.hits = 0;
        self.misses = 0;
        self.writes = 0;
    }

    /// Fill level in permille
    pub fn fill(&self) -> usize {
        (self.entries.len() * 1000 / self.capacity).min(1000)
    }

    fn entry_mut(&mut self, hash: u64) -> &mut CacheEntry {
        let is_new = !self.entries.contains_key(&hash);
        if is_new {
            self.entries.insert(hash, CacheEntry::new(hash));
        }
        self.touch(hash);
        if is_new {
            self.evict();
        }
        self.entries.entry(hash).or_insert_with(|| CacheEntry::new(hash))
    }

    fn touch(&mut self, hash: u64) {
        self.clock += 1;
        let stamp = self.clock;
        if let Some(entry) = self.entries.get_mut(&hash) {
            self.recency.remove(&entry.stamp);
            entry.stamp = stamp;
            self.recency.insert(stamp, hash);
        }
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            trace!(hash = oldest, "evicted cache entry");
        }
    }
}
