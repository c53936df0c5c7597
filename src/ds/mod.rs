pub mod segmented_ring;
pub mod slot_arena;

pub use segmented_ring::{RingIter, Segment, SegmentedRing};
pub use slot_arena::{SlotArena, SlotId};
