//! In-memory resolution cache keyed by the exact `(name, kind)` pair.
//!
//! Values are shared `Arc`s, so repeated lookups return the very same record.
//! Failures are cached too; drop them with `invalidate` or `clear`.
//! Unbounded unless a capacity is given, in which case the least recently
//! used entry is evicted.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::types::{LocationKind, Resolution};

type CacheKey = (String, LocationKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub capacity: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<CacheKey, Arc<Resolution>>,
    /// Recency order, oldest first. Only maintained when bounded.
    order: VecDeque<CacheKey>,
    capacity: Option<usize>,
    hits: u64,
    misses: u64,
}

impl ResolutionCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|c| c.max(1)),
            ..Self::default()
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn get(&mut self, name: &str, kind: LocationKind) -> Option<Arc<Resolution>> {
        let key = (name.to_string(), kind);
        match self.entries.get(&key) {
            Some(found) => {
                let found = Arc::clone(found);
                self.hits += 1;
                self.touch(&key);
                Some(found)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a resolution and hand back the shared copy.
    pub fn insert(&mut self, name: &str, kind: LocationKind, resolution: Resolution) -> Arc<Resolution> {
        let key = (name.to_string(), kind);
        let shared = Arc::new(resolution);
        self.entries.insert(key.clone(), Arc::clone(&shared));
        self.touch(&key);

        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                let Some(oldest) = self.order.pop_front() else { break };
                self.entries.remove(&oldest);
                tracing::debug!("evicted {} '{}' from resolution cache", oldest.1, oldest.0);
            }
        }
        shared
    }

    pub fn invalidate(&mut self, name: &str, kind: LocationKind) -> bool {
        let key = (name.to_string(), kind);
        self.order.retain(|k| *k != key);
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            capacity: self.capacity,
        }
    }

    /// Move `key` to the most-recent end. Costs a scan of the recency queue,
    /// so a hit is O(capacity); unbounded caches keep no order at all.
    fn touch(&mut self, key: &CacheKey) {
        if self.capacity.is_none() {
            return;
        }
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }
}
