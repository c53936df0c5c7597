//! Cache engines.
//!
//! Both builds run the same hot/cold algorithm over
//! [`SegmentedRing`](crate::ds::segmented_ring::SegmentedRing):
//!
//! - [`hot_cold::HotColdCache`]: single-threaded
//! - [`concurrent_hot_cold::ConcurrentHotColdCache`]: thread-safe
//!   (`concurrency` feature)

pub mod hot_cold;

#[cfg(feature = "concurrency")]
pub mod concurrent_hot_cold;

/// Visits a cold tail needs to be promoted instead of evicted.
pub const PROMOTION_THRESHOLD: u32 = 2;
