pub use crate::builder::{CacheBuilder, HotColdConfig};
pub use crate::ds::{Segment, SegmentedRing, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::hot_cold::HotColdCache;
pub use crate::traits::{Cache, ConcurrentCache};

#[cfg(feature = "concurrency")]
pub use crate::policy::concurrent_hot_cold::ConcurrentHotColdCache;
