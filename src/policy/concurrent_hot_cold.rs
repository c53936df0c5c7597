//! Hot/cold segmented cache, thread-safe build.
//!
//! Runs the same algorithm as [`HotColdCache`](crate::policy::hot_cold::HotColdCache)
//! but splits the state so that reads never wait on list mutation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────────┐
//! │                     ConcurrentHotColdCache<K, V> Layout                      │
//! │                                                                              │
//! │   index: DashMap<K, Arc<Node>>           ring: Mutex<SegmentedRing<Arc<Node>>>│
//! │   (sharded, no global lock)              (every link / unlink / rotation)    │
//! │            │                                         │                       │
//! │            └──────────────┐        ┌─────────────────┘                       │
//! │                           ▼        ▼                                         │
//! │              Node { key, value cell, init, visits, state, slot }             │
//! │                                                                              │
//! │   visits: AtomicU32, bumped without any lock (lost updates tolerated)        │
//! │   value:  Arc<OnceLock<V>>, forced at most once                              │
//! │   init:   held by the publishing caller until its factory returns            │
//! │   state:  Pending → Live → Tombstoned, or Pending → Tombstoned               │
//! │   slot:   packed SlotId, only touched while the ring mutex is held           │
//! └──────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Miss Flow
//!
//! ```text
//!   get_or_add(key, factory):
//!     1. build a Pending node with an empty value cell and lock its init
//!     2. publish it with an insert-if-absent on the index
//!          lost the race → drop our node and our factory untouched,
//!          wait for the winner's init, read the winner's cell
//!     3. lock the ring; Pending → Live, then link (evicting if full)
//!          tombstoned meanwhile → do not link
//!     4. run our factory into the cell, then release init
//!          factory panicked → withdraw the node from index and ring
//! ```
//!
//! Readers that find a node with an empty cell (`try_get`, a `get_or_add`
//! hit) wait on `init` and never run their own factory. A factory must not
//! read the key it is computing.
//!
//! ## Remove Flow
//!
//! ```text
//!   remove(key):
//!     1. take the node out of the index
//!     2. mark it Tombstoned (a Pending node will never be linked)
//!     3. lock the ring; unlink only if the node still owns a slot
//! ```
//!
//! Lock order is always ring mutex before index shard; index guards are
//! released before the ring mutex is taken.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use hotcold::policy::concurrent_hot_cold::ConcurrentHotColdCache;
//!
//! let cache = Arc::new(ConcurrentHotColdCache::new(64).unwrap());
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             for i in 0..16u64 {
//!                 cache.get_or_add(t * 100 + i, |k| k * 2);
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(cache.count(), 64);
//! assert_eq!(cache.try_get(&301), Some(602));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace};

use crate::builder::HotColdConfig;
use crate::ds::segmented_ring::SegmentedRing;
use crate::ds::slot_arena::SlotId;
use crate::error::{ConfigError, InvariantError};
use crate::policy::PROMOTION_THRESHOLD;
use crate::traits::{Cache, ConcurrentCache};

/// Lifecycle of a node in the concurrent build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeState {
    /// Published in the index, not linked yet.
    Pending = 0,
    /// Linked into the ring.
    Live = 1,
    /// Removed or evicted; must never be linked again.
    Tombstoned = 2,
}

impl NodeState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Pending,
            1 => NodeState::Live,
            _ => NodeState::Tombstoned,
        }
    }
}

type ValueCell<V> = Arc<OnceLock<V>>;

/// Ring position of a node. Read and written only under the ring mutex, so
/// relaxed ordering is enough.
struct SlotCell(AtomicU64);

impl SlotCell {
    const EMPTY: u64 = u64::MAX;

    fn new() -> Self {
        Self(AtomicU64::new(Self::EMPTY))
    }

    fn get(&self) -> Option<SlotId> {
        match self.0.load(Ordering::Relaxed) {
            Self::EMPTY => None,
            bits => Some(SlotId::from_bits(bits)),
        }
    }

    fn set(&self, id: SlotId) {
        self.0.store(id.to_bits(), Ordering::Relaxed);
    }

    fn take(&self) -> Option<SlotId> {
        match self.0.swap(Self::EMPTY, Ordering::Relaxed) {
            Self::EMPTY => None,
            bits => Some(SlotId::from_bits(bits)),
        }
    }
}

struct Node<K, V> {
    key: K,
    value: RwLock<ValueCell<V>>,
    init: Mutex<()>,
    visits: AtomicU32,
    state: AtomicU8,
    slot: SlotCell,
}

impl<K, V> Node<K, V> {
    fn new(key: K, cell: ValueCell<V>) -> Self {
        Self {
            key,
            value: RwLock::new(cell),
            init: Mutex::new(()),
            visits: AtomicU32::new(0),
            state: AtomicU8::new(NodeState::Pending as u8),
            slot: SlotCell::new(),
        }
    }

    fn cell(&self) -> ValueCell<V> {
        Arc::clone(&self.value.read())
    }

    /// Current value, waiting for the publishing caller's factory if it is
    /// still running. `None` only if that factory panicked.
    fn read(&self) -> Option<V>
    where
        V: Clone,
    {
        if let Some(value) = self.cell().get() {
            return Some(value.clone());
        }
        drop(self.init.lock());
        self.cell().get().cloned()
    }

    fn store(&self, cell: ValueCell<V>) {
        *self.value.write() = cell;
    }

    fn touch(&self) {
        self.visits.fetch_add(1, Ordering::Relaxed);
    }

    fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Pending → Live. Fails if the node was tombstoned first.
    fn go_live(&self) -> bool {
        self.state
            .compare_exchange(
                NodeState::Pending as u8,
                NodeState::Live as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn tombstone(&self) -> NodeState {
        NodeState::from_u8(
            self.state
                .swap(NodeState::Tombstoned as u8, Ordering::AcqRel),
        )
    }
}

/// Thread-safe bounded hot/cold cache.
///
/// All methods take `&self`; share it through an `Arc`.
pub struct ConcurrentHotColdCache<K, V> {
    index: DashMap<K, Arc<Node<K, V>>, FxBuildHasher>,
    ring: Mutex<SegmentedRing<Arc<Node<K, V>>>>,
    count: AtomicUsize,
    max_size: usize,
    hot_size: usize,
}

impl<K, V> ConcurrentHotColdCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `max_size` entries, half of them hot.
    ///
    /// # Errors
    ///
    /// Fails when `max_size < 2`.
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
        debug!(
            max_size = config.max_size,
            hot_size, "created concurrent hot/cold cache"
        );
        Ok(Self {
            index: DashMap::with_capacity_and_hasher(config.max_size, FxBuildHasher),
            ring: Mutex::new(SegmentedRing::with_capacity(hot_size, config.max_size)),
            count: AtomicUsize::new(0),
            max_size: config.max_size,
            hot_size,
        })
    }

    /// Inserts `key`, or overwrites its value and counts a visit if present.
    pub fn add(&self, key: K, value: V) {
        let cell = Arc::new(OnceLock::from(value));
        if let Some(node) = self.lookup(&key) {
            node.store(cell);
            node.touch();
            return;
        }

        let candidate = Arc::new(Node::new(key.clone(), Arc::clone(&cell)));
        match self.index.entry(key) {
            Entry::Occupied(occupied) => {
                let existing = Arc::clone(occupied.get());
                drop(occupied);
                existing.store(cell);
                existing.touch();
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&candidate));
                self.link(&candidate);
            },
        }
    }

    /// Returns the value for `key`, computing it with `factory` on a miss.
    ///
    /// Only the caller whose node wins the index race runs its factory;
    /// every other caller for the same key drops its factory unrun and
    /// waits for the winner's value. If the winning factory panics the
    /// entry is withdrawn and waiting callers retry.
    ///
    /// `factory` must not access `key` in this cache.
    pub fn get_or_add<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
        V: Clone,
    {
        if let Some(node) = self.lookup(&key) {
            node.touch();
            return match node.read() {
                Some(value) => value,
                None => self.get_or_add(key, factory),
            };
        }

        let candidate = Arc::new(Node::new(key.clone(), Arc::new(OnceLock::new())));
        let init = candidate.init.lock();
        match self.index.entry(key) {
            Entry::Occupied(occupied) => {
                let winner = Arc::clone(occupied.get());
                drop(occupied);
                drop(init);
                winner.touch();
                return match winner.read() {
                    Some(value) => value,
                    None => self.get_or_add(winner.key.clone(), factory),
                };
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&candidate));
            },
        }
        self.link(&candidate);

        let guard = WithdrawOnUnwind {
            cache: self,
            node: &candidate,
            armed: true,
        };
        let value = candidate
            .cell()
            .get_or_init(|| factory(&candidate.key))
            .clone();
        guard.disarm();
        drop(init);
        value
    }

    /// Like [`get_or_add`](Self::get_or_add), passing `arg` to the factory.
    pub fn get_or_add_with<A, F>(&self, key: K, arg: A, factory: F) -> V
    where
        F: FnOnce(&K, A) -> V,
        V: Clone,
    {
        self.get_or_add(key, |k| factory(k, arg))
    }

    /// Returns `true` if `key` is in the index. Not counted as a visit.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns a copy of the value for `key` and counts a visit.
    ///
    /// Waits if another thread is still computing the value.
    pub fn try_get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let node = self.lookup(key)?;
        node.touch();
        node.read()
    }

    /// Removes `key`, returning its value if it had been computed.
    ///
    /// Does not wait for a factory still running for `key`.
    pub fn remove(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let (_, node) = self.index.remove(key)?;
        node.tombstone();
        self.unlink(&node);
        node.cell().get().cloned()
    }

    pub fn clear(&self) {
        let mut ring = self.ring.lock();
        debug!(count = ring.len(), "clearing concurrent hot/cold cache");
        self.index.retain(|_, node| {
            node.tombstone();
            false
        });
        for (_, _, node) in ring.iter() {
            node.tombstone();
            node.slot.take();
        }
        ring.clear();
        self.count.store(0, Ordering::Release);
    }

    /// Number of linked entries.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn hot_size(&self) -> usize {
        self.hot_size
    }

    /// Keys from the hot front to the eviction candidate.
    pub fn keys_hot_to_cold(&self) -> Vec<K> {
        let ring = self.ring.lock();
        ring.iter().map(|(_, _, node)| node.key.clone()).collect()
    }

    /// Checks that index, ring and node states agree.
    ///
    /// Only meaningful while no other thread is mutating the cache; a
    /// concurrent insert legitimately has its node in the index before it
    /// is linked.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let ring = self.ring.lock();
        ring.check_invariants()?;
        if ring.len() > self.max_size {
            return Err(InvariantError::new(format!(
                "count {} exceeds max_size {}",
                ring.len(),
                self.max_size
            )));
        }
        if self.count() != ring.len() {
            return Err(InvariantError::new(format!(
                "count mirror {} disagrees with ring length {}",
                self.count(),
                ring.len()
            )));
        }
        if self.index.len() != ring.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but ring holds {} nodes",
                self.index.len(),
                ring.len()
            )));
        }
        for (id, _, node) in ring.iter() {
            if node.state() != NodeState::Live {
                return Err(InvariantError::new(format!(
                    "linked node in state {:?}",
                    node.state()
                )));
            }
            if node.slot.get() != Some(id) {
                return Err(InvariantError::new("node slot does not match its ring position"));
            }
            let indexed = self
                .index
                .get(&node.key)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), node));
            if !indexed {
                return Err(InvariantError::new(
                    "ring node is not the index entry for its key",
                ));
            }
        }
        Ok(())
    }

    fn lookup(&self, key: &K) -> Option<Arc<Node<K, V>>> {
        self.index.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Links a freshly published node unless it was removed in the meantime.
    fn link(&self, node: &Arc<Node<K, V>>) {
        let mut ring = self.ring.lock();
        if !node.go_live() {
            trace!("entry removed before it was linked");
            return;
        }
        let id = if ring.len() < self.max_size {
            ring.push_hot_front(Arc::clone(node))
        } else {
            self.evict(&mut ring);
            ring.push_cold_front(Arc::clone(node))
        };
        node.slot.set(id);
        self.count.store(ring.len(), Ordering::Release);
    }

    /// Unlinks `node` if it still owns a ring slot.
    fn unlink(&self, node: &Arc<Node<K, V>>) {
        let mut ring = self.ring.lock();
        if let Some(id) = node.slot.take() {
            ring.remove(id);
            self.count.store(ring.len(), Ordering::Release);
        }
    }

    /// Takes a node whose factory panicked out of the index and the ring.
    fn withdraw(&self, node: &Arc<Node<K, V>>) {
        self.index
            .remove_if(&node.key, |_, current| Arc::ptr_eq(current, node));
        node.tombstone();
        self.unlink(node);
        trace!("withdrew entry after its factory panicked");
    }

    fn evict(&self, ring: &mut SegmentedRing<Arc<Node<K, V>>>) {
        let promoted = ring.rotate_while(|node| {
            let frequent = node.visits.load(Ordering::Relaxed) >= PROMOTION_THRESHOLD;
            if frequent {
                node.visits.store(0, Ordering::Relaxed);
            }
            frequent
        });
        if let Some(victim) = ring.pop_tail() {
            victim.slot.take();
            victim.tombstone();
            self.index
                .remove_if(&victim.key, |_, current| Arc::ptr_eq(current, &victim));
            trace!(promoted, "evicted cold tail");
        }
    }
}

struct WithdrawOnUnwind<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    cache: &'a ConcurrentHotColdCache<K, V>,
    node: &'a Arc<Node<K, V>>,
    armed: bool,
}

impl<K, V> WithdrawOnUnwind<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<K, V> Drop for WithdrawOnUnwind<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if self.armed {
            self.cache.withdraw(self.node);
        }
    }
}

impl<K, V> fmt::Debug for ConcurrentHotColdCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentHotColdCache")
            .field("max_size", &self.max_size)
            .field("hot_size", &self.hot_size)
            .field("count", &self.count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V> for ConcurrentHotColdCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn add(&mut self, key: K, value: V) {
        ConcurrentHotColdCache::add(self, key, value);
    }

    fn clear(&mut self) {
        ConcurrentHotColdCache::clear(self);
    }

    fn contains(&self, key: &K) -> bool {
        ConcurrentHotColdCache::contains(self, key)
    }

    fn get_or_add<F>(&mut self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        ConcurrentHotColdCache::get_or_add(self, key, factory)
    }

    fn get_or_add_with<A, F>(&mut self, key: K, arg: A, factory: F) -> V
    where
        F: FnOnce(&K, A) -> V,
    {
        ConcurrentHotColdCache::get_or_add_with(self, key, arg, factory)
    }

    fn remove(&mut self, key: &K) {
        ConcurrentHotColdCache::remove(self, key);
    }

    fn try_get(&mut self, key: &K) -> Option<V> {
        ConcurrentHotColdCache::try_get(self, key)
    }

    fn count(&self) -> usize {
        ConcurrentHotColdCache::count(self)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<K, V> ConcurrentCache for ConcurrentHotColdCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
}
