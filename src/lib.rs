//! hotcold: a bounded key/value cache with a segmented hot/cold
//! replacement policy.
//!
//! Entries live on one circular list split into a protected hot region and
//! a probationary cold region. New keys enter the cold region once the
//! cache is full; keys read at least twice while cold are promoted instead
//! of evicted. Two builds share one algorithm:
//!
//! - [`HotColdCache`]: single-threaded, `&mut self`
//! - [`ConcurrentHotColdCache`]: `&self` from any thread, compute-once misses
//!   (`concurrency` feature, on by default)

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod traits;

pub use crate::builder::{CacheBuilder, HotColdConfig};
pub use crate::ds::{Segment, SegmentedRing, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::hot_cold::HotColdCache;
pub use crate::traits::{Cache, ConcurrentCache};

#[cfg(feature = "concurrency")]
pub use crate::policy::concurrent_hot_cold::ConcurrentHotColdCache;
