//! # Cache Contract
//!
//! The capability contract shared by both builds of the hot/cold cache.
//! Callers that only need "a bounded cache" (factories, wiring code, tests)
//! are written against [`Cache`] and work with either build.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                Cache<K, V>                   │
//!                     │                                              │
//!                     │  add(&mut, K, V)                             │
//!                     │  get_or_add(&mut, K, FnOnce(&K) → V) → V     │
//!                     │  get_or_add_with(&mut, K, A, FnOnce(&K, A))  │
//!                     │  try_get(&mut, &K) → Option<V>               │
//!                     │  contains(&, &K) → bool                      │
//!                     │  remove(&mut, &K)                            │
//!                     │  clear(&mut)                                 │
//!                     │  count(&) / max_size(&) / is_empty(&)        │
//!                     └──────────────────────┬───────────────────────┘
//!                                            │
//!                 ┌──────────────────────────┴──────────────────────────┐
//!                 ▼                                                     ▼
//!   ┌────────────────────────────┐                    ┌─────────────────────────────────┐
//!   │     HotColdCache<K, V>     │                    │  ConcurrentHotColdCache<K, V>   │
//!   │  single-threaded, &mut     │                    │  + ConcurrentCache (Send+Sync)  │
//!   └────────────────────────────┘                    └─────────────────────────────────┘
//! ```
//!
//! Values cross the contract by clone (`V: Clone`) so the same signatures fit
//! both the single-threaded build, which could lend `&V`, and the concurrent
//! build, which cannot hand out references past its locks. The inherent
//! methods on [`HotColdCache`](crate::policy::hot_cold::HotColdCache) still
//! return references when cloning is not wanted.
//!
//! ## Thread Safety
//!
//! - `HotColdCache` is **not** internally synchronized
//! - `ConcurrentHotColdCache` implements [`ConcurrentCache`]; its inherent
//!   methods take `&self` and can be called through an `Arc` from any thread

/// Bounded key/value cache operations.
///
/// `get_or_add` and `get_or_add_with` run `factory` only on a miss, and never
/// more than once per key for a given miss, even in the concurrent build.
///
/// # Example
///
/// ```
/// use hotcold::policy::hot_cold::HotColdCache;
/// use hotcold::traits::Cache;
///
/// fn warm<C: Cache<u64, String>>(cache: &mut C, keys: &[u64]) {
///     for &key in keys {
///         cache.get_or_add(key, |k| format!("value-{}", k));
///     }
/// }
///
/// let mut cache = HotColdCache::new(8).unwrap();
/// warm(&mut cache, &[1, 2, 3]);
/// assert_eq!(Cache::count(&cache), 3);
/// assert_eq!(Cache::try_get(&mut cache, &2), Some("value-2".to_string()));
/// ```
pub trait Cache<K, V> {
    /// Inserts or overwrites `key`.
    fn add(&mut self, key: K, value: V);

    /// Drops every entry.
    fn clear(&mut self);

    /// Returns `true` if `key` is present. Does not count as an access.
    fn contains(&self, key: &K) -> bool;

    /// Returns the cached value for `key`, computing and inserting it with
    /// `factory` on a miss.
    fn get_or_add<F>(&mut self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V;

    /// Like [`get_or_add`](Self::get_or_add), threading `arg` to the factory
    /// so it does not need to capture state.
    fn get_or_add_with<A, F>(&mut self, key: K, arg: A, factory: F) -> V
    where
        F: FnOnce(&K, A) -> V;

    /// Removes `key`. Absent keys are a no-op.
    fn remove(&mut self, key: &K);

    /// Returns a copy of the value for `key`, counting it as an access.
    fn try_get(&mut self, key: &K) -> Option<V>;

    /// Number of live entries.
    fn count(&self) -> usize;

    /// Hard capacity.
    fn max_size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Marker trait for caches that are safe to share across threads.
///
/// # Example
///
/// ```
/// use hotcold::traits::{Cache, ConcurrentCache};
///
/// fn share<K, V, C>(_cache: &C)
/// where
///     C: Cache<K, V> + ConcurrentCache,
/// {
/// }
/// ```
pub trait ConcurrentCache: Send + Sync {}
