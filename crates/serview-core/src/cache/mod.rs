//! Bounded LRU cache of decoded frames.
//!
//! One mutex guards lookup, insertion and eviction. Decoding happens outside
//! the lock; an index being decoded is recorded as in flight so concurrent
//! requests for it wait on a condition variable instead of decoding twice.
//! This holds for cache-through reads too: a `get` that waits on one is
//! handed the transient frame through the cache.

mod prefetch;

pub use prefetch::Prefetcher;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Result, SerError};
use crate::frame::DecodedFrame;

/// Anything that can decode frame `i` on demand.
pub trait FrameSource: Send + Sync {
    fn frame_count(&self) -> usize;

    fn decode(&self, index: usize) -> Result<DecodedFrame>;
}

/// Counters for cache behaviour, mostly useful in logs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub decodes: u64,
    pub evictions: u64,
}

struct CacheEntry {
    frame: Arc<DecodedFrame>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<usize, CacheEntry>,
    in_flight: HashSet<usize>,
    /// In-flight indices a caching `get` is waiting on.
    wanted: HashSet<usize>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn touch(&mut self, index: usize) -> Option<Arc<DecodedFrame>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(&index).map(|entry| {
            entry.last_used = clock;
            Arc::clone(&entry.frame)
        })
    }

    fn peek(&self, index: usize) -> Option<Arc<DecodedFrame>> {
        self.entries.get(&index).map(|entry| Arc::clone(&entry.frame))
    }

    fn insert(&mut self, index: usize, frame: Arc<DecodedFrame>, capacity: usize) {
        self.clock += 1;
        let entry = CacheEntry {
            frame,
            last_used: self.clock,
        };
        if self.entries.insert(index, entry).is_some() {
            return;
        }
        while self.entries.len() > capacity {
            let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(&i, _)| i)
            else {
                break;
            };
            self.entries.remove(&victim);
            self.stats.evictions += 1;
            debug!(evicted = victim, inserted = index, "Frame cache eviction");
        }
    }
}

/// Bounded frame cache in front of a [`FrameSource`].
pub struct FrameCache {
    source: Arc<dyn FrameSource>,
    capacity: usize,
    state: Mutex<CacheState>,
    ready: Condvar,
}

impl FrameCache {
    /// `capacity` is clamped to at least one entry.
    pub fn new(source: Arc<dyn FrameSource>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            ready: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frame_count(&self) -> usize {
        self.source.frame_count()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lock().entries.contains_key(&index)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Cached indices from least to most recently used.
    pub fn cached_indices(&self) -> Vec<usize> {
        let state = self.lock();
        let mut order: Vec<(u64, usize)> = state
            .entries
            .iter()
            .map(|(&i, entry)| (entry.last_used, i))
            .collect();
        order.sort_unstable();
        order.into_iter().map(|(_, i)| i).collect()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Return frame `index`, decoding and caching it on a miss.
    pub fn get(&self, index: usize) -> Result<Arc<DecodedFrame>> {
        self.check_index(index)?;

        let mut state = self.lock();
        loop {
            if let Some(frame) = state.touch(index) {
                state.stats.hits += 1;
                return Ok(frame);
            }
            if !state.in_flight.contains(&index) {
                break;
            }
            state.wanted.insert(index);
            state = self.wait(state);
        }
        state.stats.misses += 1;
        let _claim = self.claim(&mut state, index);
        drop(state);

        let frame = Arc::new(self.source.decode(index)?);
        self.lock()
            .insert(index, Arc::clone(&frame), self.capacity);
        Ok(frame)
    }

    /// Cache-through read: a cached frame is returned without refreshing its
    /// recency, and a miss is decoded without being inserted unless a `get`
    /// for the same index is waiting on it.
    pub fn get_transient(&self, index: usize) -> Result<Arc<DecodedFrame>> {
        self.check_index(index)?;

        let mut state = self.lock();
        loop {
            if let Some(frame) = state.peek(index) {
                state.stats.hits += 1;
                return Ok(frame);
            }
            if !state.in_flight.contains(&index) {
                break;
            }
            state = self.wait(state);
        }
        state.stats.misses += 1;
        let _claim = self.claim(&mut state, index);
        drop(state);

        let frame = Arc::new(self.source.decode(index)?);
        let mut state = self.lock();
        if state.wanted.remove(&index) {
            state.insert(index, Arc::clone(&frame), self.capacity);
        }
        Ok(frame)
    }

    /// Insert an already decoded frame. A present index only has its recency refreshed.
    pub fn insert(&self, frame: Arc<DecodedFrame>) {
        let index = frame.index;
        let mut state = self.lock();
        if state.touch(index).is_none() {
            state.insert(index, frame, self.capacity);
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let total = self.source.frame_count();
        if index >= total {
            return Err(SerError::out_of_bounds(index, total));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, CacheState>) -> MutexGuard<'a, CacheState> {
        self.ready.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, state: &mut CacheState, index: usize) -> InFlight<'_> {
        state.in_flight.insert(index);
        state.stats.decodes += 1;
        InFlight { cache: self, index }
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// Marks an index as being decoded; releasing it wakes waiters whether the
/// decode succeeded, failed or panicked.
struct InFlight<'a> {
    cache: &'a FrameCache,
    index: usize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        state.in_flight.remove(&self.index);
        state.wanted.remove(&self.index);
        drop(state);
        self.cache.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Arc<DecodedFrame> {
        Arc::new(DecodedFrame::new(index, ndarray::Array3::zeros((1, 1, 3))))
    }

    #[test]
    fn state_evicts_oldest() {
        let mut state = CacheState::default();
        for i in 0..3 {
            state.insert(i, frame(i), 2);
        }
        assert!(!state.entries.contains_key(&0));
        assert_eq!(state.stats.evictions, 1);
    }

    #[test]
    fn reinsert_keeps_size() {
        let mut state = CacheState::default();
        state.insert(1, frame(1), 2);
        state.insert(1, frame(1), 2);
        assert_eq!(state.entries.len(), 1);
        assert_eq!(state.stats.evictions, 0);
    }
}
