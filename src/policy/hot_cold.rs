//! Hot/cold segmented cache, single-threaded build.
//!
//! Approximates LRU with two regions on one circular list. Reads never touch
//! the list: they only bump a per-entry visit counter. All reordering is
//! deferred to eviction time, when the promotion sweep rotates the region
//! markers past cold tails that were visited often enough.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          HotColdCache<K, V> Layout                          │
//! │                                                                             │
//! │   index: FxHashMap<K, SlotId>          ring: SegmentedRing<Entry<K, V>>     │
//! │   ┌──────────┬──────────┐              ┌────────┬────────────────────────┐  │
//! │   │   Key    │  SlotId  │              │ SlotId │ key, value, visits     │  │
//! │   ├──────────┼──────────┤              ├────────┼────────────────────────┤  │
//! │   │  "a"     │  id_0    │─────────────►│ id_0   │ "a", 1, visits=0       │  │
//! │   │  "b"     │  id_1    │─────────────►│ id_1   │ "b", 2, visits=3       │  │
//! │   └──────────┴──────────┘              └────────┴────────────────────────┘  │
//! │                                                                             │
//! │          head                  cold_head                 tail (head.prev)   │
//! │           ▼                        ▼                        ▼               │
//! │   ──► [ hot ... hot ] ◄──► [ cold ... cold ... cold ] ◄─────┘               │
//! │       hot_size nodes        evicted from the tail                           │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Insert Flow (new key)
//!
//! ```text
//!   count < max_size:
//!     push at hot front; the last hot node slides into the cold region
//!
//!   count == max_size:
//!     1. sweep: while tail.visits >= 2 { tail.visits = 0; rotate markers }
//!     2. evict the tail (unlink + index removal; its slot is reused)
//!     3. push at cold front: new keys must earn promotion
//! ```
//!
//! ## Operations
//!
//! | Operation    | Time   | Notes                                  |
//! |--------------|--------|----------------------------------------|
//! | `try_get`    | O(1)   | Bumps visits, no list mutation         |
//! | `contains`   | O(1)   | Index lookup only                      |
//! | `add`        | O(1)*  | *Sweep is O(k) in promoted tails       |
//! | `get_or_add` | O(1)*  | Factory runs only on a miss            |
//! | `remove`     | O(1)   | No-op for absent keys                  |
//! | `clear`      | O(n)   |                                        |
//!
//! ## Example Usage
//!
//! ```
//! use hotcold::policy::hot_cold::HotColdCache;
//!
//! let mut cache = HotColdCache::new(3).unwrap();
//! cache.add(1, "one");
//! cache.add(2, "two");
//! cache.add(3, "three");
//!
//! // Key 1 was never read again, so it is the first to go
//! cache.add(4, "four");
//! assert!(!cache.contains(&1));
//! assert_eq!(cache.count(), 3);
//! ```
//!
//! ## Thread Safety
//!
//! - [`HotColdCache`]: not internally synchronized
//! - For shared use see
//!   [`ConcurrentHotColdCache`](crate::policy::concurrent_hot_cold::ConcurrentHotColdCache)

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builder::HotColdConfig;
use crate::ds::segmented_ring::SegmentedRing;
use crate::ds::slot_arena::SlotId;
use crate::error::{ConfigError, InvariantError};
use crate::policy::PROMOTION_THRESHOLD;
use crate::traits::Cache;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    visits: u32,
}

/// Bounded hot/cold cache without internal synchronization.
pub struct HotColdCache<K, V> {
    index: FxHashMap<K, SlotId>,
    ring: SegmentedRing<Entry<K, V>>,
    max_size: usize,
}

impl<K, V> HotColdCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `max_size` entries, half of them hot.
    ///
    /// # Errors
    ///
    /// Fails when `max_size < 2`.
    ///
    /// # Example
    ///
    /// ```
    /// use hotcold::policy::hot_cold::HotColdCache;
    ///
    /// let cache: HotColdCache<String, u32> = HotColdCache::new(100).unwrap();
    /// assert_eq!(cache.max_size(), 100);
    /// assert_eq!(cache.hot_size(), 50);
    /// assert!(HotColdCache::<String, u32>::new(1).is_err());
    /// ```
    pub fn new(max_size: usize) -> Result<Self, ConfigError> {
        Self::from_config(HotColdConfig::new(max_size))
    }

    /// Creates a cache giving `hot_fraction` of `max_size` to the hot region.
    pub fn with_hot_fraction(max_size: usize, hot_fraction: f64) -> Result<Self, ConfigError> {
        Self::from_config(HotColdConfig {
            max_size,
            hot_fraction,
        })
    }

    pub fn from_config(config: HotColdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let hot_size = config.hot_size();
        debug!(max_size = config.max_size, hot_size, "created hot/cold cache");
        Ok(Self {
            index: FxHashMap::with_capacity_and_hasher(config.max_size, Default::default()),
            ring: SegmentedRing::with_capacity(hot_size, config.max_size),
            max_size: config.max_size,
        })
    }

    /// Inserts `key`, or overwrites its value and counts a visit if present.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&id) = self.index.get(&key) {
            let entry = self.ring.get_mut(id).expect("index/ring out of sync");
            entry.value = value;
            entry.visits = entry.visits.saturating_add(1);
            return;
        }
        self.insert_new(key, value);
    }

    /// Returns the value for `key`, inserting `factory(&key)` on a miss.
    ///
    /// # Example
    ///
    /// ```
    /// use hotcold::policy::hot_cold::HotColdCache;
    ///
    /// let mut cache = HotColdCache::new(10).unwrap();
    /// let mut calls = 0;
    /// assert_eq!(*cache.get_or_add(7, |k| { calls += 1; k * 2 }), 14);
    /// assert_eq!(*cache.get_or_add(7, |_| unreachable!()), 14);
    /// assert_eq!(calls, 1);
    /// ```
    pub fn get_or_add<F>(&mut self, key: K, factory: F) -> &V
    where
        F: FnOnce(&K) -> V,
    {
        let id = match self.index.get(&key) {
            Some(&id) => {
                self.touch(id);
                id
            },
            None => {
                let value = factory(&key);
                self.insert_new(key, value)
            },
        };
        &self.ring.get(id).expect("index/ring out of sync").value
    }

    /// Like [`get_or_add`](Self::get_or_add), passing `arg` to the factory.
    pub fn get_or_add_with<A, F>(&mut self, key: K, arg: A, factory: F) -> &V
    where
        F: FnOnce(&K, A) -> V,
    {
        self.get_or_add(key, |k| factory(k, arg))
    }

    /// Returns `true` if `key` is cached. Not counted as a visit.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the value for `key` and counts a visit.
    pub fn try_get(&mut self, key: &K) -> Option<&V> {
        let &id = self.index.get(key)?;
        self.touch(id);
        self.ring.get(id).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without counting a visit.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let &id = self.index.get(key)?;
        self.ring.get(id).map(|entry| &entry.value)
    }

    /// Visits counted for `key` since it was inserted or last promoted.
    pub fn visits(&self, key: &K) -> Option<u32> {
        let &id = self.index.get(key)?;
        self.ring.get(id).map(|entry| entry.visits)
    }

    /// Removes `key`, returning its value. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.ring.remove(id).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        debug!(count = self.ring.len(), "clearing hot/cold cache");
        self.index.clear();
        self.ring.clear();
    }

    pub fn count(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Size of the hot region once the cache holds more than that many entries.
    pub fn hot_size(&self) -> usize {
        self.ring.hot_capacity()
    }

    /// Keys from the hot front to the eviction candidate.
    pub fn keys_hot_to_cold(&self) -> Vec<K> {
        self.ring
            .iter()
            .map(|(_, _, entry)| entry.key.clone())
            .collect()
    }

    /// Checks that index, ring and counters agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.ring.check_invariants()?;
        if self.ring.len() > self.max_size {
            return Err(InvariantError::new(format!(
                "count {} exceeds max_size {}",
                self.ring.len(),
                self.max_size
            )));
        }
        if self.index.len() != self.ring.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but ring holds {} nodes",
                self.index.len(),
                self.ring.len()
            )));
        }
        for (id, _, entry) in self.ring.iter() {
            if self.index.get(&entry.key) != Some(&id) {
                return Err(InvariantError::new(
                    "ring node is not the index entry for its key",
                ));
            }
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("hot/cold cache invariant violated: {}", err);
        }
    }

    fn touch(&mut self, id: SlotId) {
        if let Some(entry) = self.ring.get_mut(id) {
            entry.visits = entry.visits.saturating_add(1);
        }
    }

    fn insert_new(&mut self, key: K, value: V) -> SlotId {
        let entry = Entry {
            key: key.clone(),
            value,
            visits: 0,
        };
        let id = if self.ring.len() < self.max_size {
            self.ring.push_hot_front(entry)
        } else {
            self.evict();
            self.ring.push_cold_front(entry)
        };
        self.index.insert(key, id);
        id
    }

    fn evict(&mut self) {
        let promoted = self.ring.rotate_while(|entry| {
            let frequent = entry.visits >= PROMOTION_THRESHOLD;
            if frequent {
                entry.visits = 0;
            }
            frequent
        });
        if let Some(victim) = self.ring.pop_tail() {
            self.index.remove(&victim.key);
            trace!(promoted, "evicted cold tail");
        }
    }
}

impl<K, V> fmt::Debug for HotColdCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotColdCache")
            .field("max_size", &self.max_size)
            .field("hot_size", &self.ring.hot_capacity())
            .field("count", &self.ring.len())
            .field("cold_len", &self.ring.cold_len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V> for HotColdCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn add(&mut self, key: K, value: V) {
        HotColdCache::add(self, key, value);
    }

    fn clear(&mut self) {
        HotColdCache::clear(self);
    }

    fn contains(&self, key: &K) -> bool {
        HotColdCache::contains(self, key)
    }

    fn get_or_add<F>(&mut self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        HotColdCache::get_or_add(self, key, factory).clone()
    }

    fn get_or_add_with<A, F>(&mut self, key: K, arg: A, factory: F) -> V
    where
        F: FnOnce(&K, A) -> V,
    {
        HotColdCache::get_or_add_with(self, key, arg, factory).clone()
    }

    fn remove(&mut self, key: &K) {
        HotColdCache::remove(self, key);
    }

    fn try_get(&mut self, key: &K) -> Option<V> {
        HotColdCache::try_get(self, key).cloned()
    }

    fn count(&self) -> usize {
        HotColdCache::count(self)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}
