//! Circular doubly linked ring split into a hot and a cold region.
//!
//! All live nodes sit on one ring stored in a [`SlotArena`] and linked by
//! [`SlotId`]. Two markers cut the ring into regions:
//!
//! ```text
//!             head                       cold_head
//!              │                             │
//!              ▼                             ▼
//!   ┌──────► [H1] ◄─► [H2] ◄─► [H3] ◄─► [C1] ◄─► [C2] ◄─► [C3] ◄──┐
//!   │                                                             │
//!   └─────────────────────────── tail = head.prev ◄───────────────┘
//!
//!   hot region:  head .. cold_head (exclusive), exactly min(len, hot_capacity) nodes
//!   cold region: cold_head .. tail, absent (None) while len <= hot_capacity
//! ```
//!
//! ## Promotion by rotation
//!
//! Nodes never move on access. When a cold tail deserves to stay, the sweep
//! rotates both markers one step toward the tail:
//!
//! ```text
//!   before:  head=H1  cold_head=C1   ring: H1 H2 H3 C1 C2 C3
//!   rotate:  head=C3  cold_head=H3   ring: C3 H1 H2 | H3 C1 C2
//! ```
//!
//! C3 becomes hot and H3 slides into the cold region; no link changes.
//!
//! ## Operations
//!
//! | Operation          | Time | Notes                                    |
//! |--------------------|------|------------------------------------------|
//! | `push_hot_front`   | O(1) | may demote the last hot node             |
//! | `push_cold_front`  | O(1) | used once the owner is at capacity       |
//! | `rotate_while`     | O(k) | k promoted tails, bounded by `len`       |
//! | `remove`           | O(1) | refills the hot region from the cold one |
//! | `pop_tail`         | O(1) | eviction                                 |
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

/// Region a ring node currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Recently inserted or promoted; never scanned for eviction.
    Hot,
    /// Eviction candidates, oldest at the tail.
    Cold,
}

#[derive(Debug)]
struct Link<T> {
    value: T,
    prev: SlotId,
    next: SlotId,
    segment: Segment,
}

/// Hot/cold segmented circular list.
#[derive(Debug)]
pub struct SegmentedRing<T> {
    arena: SlotArena<Link<T>>,
    head: Option<SlotId>,
    cold_head: Option<SlotId>,
    hot_capacity: usize,
    hot_len: usize,
}

impl<T> SegmentedRing<T> {
    /// Creates an empty ring whose hot region holds at most `hot_capacity`
    /// nodes (at least one).
    pub fn new(hot_capacity: usize) -> Self {
        Self::with_capacity(hot_capacity, 0)
    }

    /// Creates an empty ring with room reserved for `capacity` nodes.
    pub fn with_capacity(hot_capacity: usize, capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            cold_head: None,
            hot_capacity: hot_capacity.max(1),
            hot_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn hot_capacity(&self) -> usize {
        self.hot_capacity
    }

    /// Number of nodes between `head` and `cold_head`.
    pub fn hot_len(&self) -> usize {
        self.hot_len
    }

    pub fn cold_len(&self) -> usize {
        self.len() - self.hot_len
    }

    pub fn head_id(&self) -> Option<SlotId> {
        self.head
    }

    pub fn cold_head_id(&self) -> Option<SlotId> {
        self.cold_head
    }

    /// The eviction candidate: `head.prev`.
    pub fn tail_id(&self) -> Option<SlotId> {
        self.head.map(|head| self.prev_of(head))
    }

    pub fn tail(&self) -> Option<&T> {
        self.tail_id().and_then(|id| self.get(id))
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|link| &link.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|link| &mut link.value)
    }

    pub fn segment_of(&self, id: SlotId) -> Option<Segment> {
        self.arena.get(id).map(|link| link.segment)
    }

    /// Links `value` in front of `head` and makes it the new head.
    ///
    /// With the hot region already full, the node just before `cold_head`
    /// is demoted into the cold region. The first time the ring grows past
    /// `hot_capacity`, the tail becomes the sole cold node.
    pub fn push_hot_front(&mut self, value: T) -> SlotId {
        let id = match self.head {
            Some(head) => self.link_before(head, value, Segment::Hot),
            None => self.arena.insert_with(|id| Link {
                value,
                prev: id,
                next: id,
                segment: Segment::Hot,
            }),
        };
        self.head = Some(id);

        if let Some(cold_head) = self.cold_head {
            let demoted = self.prev_of(cold_head);
            self.set_segment(demoted, Segment::Cold);
            self.cold_head = Some(demoted);
        } else if self.hot_len == self.hot_capacity {
            let tail = self.prev_of(id);
            self.set_segment(tail, Segment::Cold);
            self.cold_head = Some(tail);
        } else {
            self.hot_len += 1;
        }
        id
    }

    /// Links `value` in front of `cold_head` and makes it the new cold head.
    ///
    /// An empty cold region sits between the tail and `head`, so the node is
    /// linked at the tail position. While the hot region still has room the
    /// node goes to the hot front instead.
    pub fn push_cold_front(&mut self, value: T) -> SlotId {
        if self.hot_len < self.hot_capacity {
            return self.push_hot_front(value);
        }
        let Some(at) = self.cold_head.or(self.head) else {
            return self.push_hot_front(value);
        };
        let id = self.link_before(at, value, Segment::Cold);
        self.cold_head = Some(id);
        id
    }

    /// Promotion sweep.
    ///
    /// While `promote` accepts the tail, that node becomes the new head and
    /// the last hot node is demoted, by moving `head` and `cold_head` one
    /// step backwards. `promote` may mutate the payload (e.g. reset a visit
    /// counter). Stops at the first rejected tail or after one full turn.
    /// Returns the number of promoted nodes.
    pub fn rotate_while(&mut self, mut promote: impl FnMut(&mut T) -> bool) -> usize {
        if self.cold_head.is_none() {
            return 0;
        }
        let mut promoted = 0;
        for _ in 0..self.len() {
            let (Some(tail), Some(cold_head)) = (self.tail_id(), self.cold_head) else {
                break;
            };
            let Some(link) = self.arena.get_mut(tail) else {
                break;
            };
            if !promote(&mut link.value) {
                break;
            }
            link.segment = Segment::Hot;
            self.head = Some(tail);

            let demoted = self.prev_of(cold_head);
            self.set_segment(demoted, Segment::Cold);
            self.cold_head = Some(demoted);
            promoted += 1;
        }
        promoted
    }

    /// Unlinks `id` and frees its slot.
    ///
    /// Removing a hot node pulls `cold_head` into the hot region so the hot
    /// region keeps `min(len, hot_capacity)` nodes.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let Link {
            value,
            prev,
            next,
            segment,
        } = self.arena.remove(id)?;

        if prev == id {
            self.head = None;
            self.cold_head = None;
            self.hot_len = 0;
            return Some(value);
        }
        if let Some(link) = self.arena.get_mut(prev) {
            link.next = next;
        }
        if let Some(link) = self.arena.get_mut(next) {
            link.prev = prev;
        }

        match segment {
            Segment::Hot => {
                if self.head == Some(id) {
                    self.head = Some(next);
                }
                match self.cold_head {
                    Some(cold_head) => {
                        self.set_segment(cold_head, Segment::Hot);
                        let after = self.next_of(cold_head);
                        self.cold_head = (Some(after) != self.head).then_some(after);
                    },
                    None => self.hot_len -= 1,
                }
            },
            Segment::Cold => {
                if self.cold_head == Some(id) {
                    self.cold_head = (Some(next) != self.head).then_some(next);
                }
            },
        }
        Some(value)
    }

    /// Unlinks and returns the tail.
    pub fn pop_tail(&mut self) -> Option<T> {
        let tail = self.tail_id()?;
        self.remove(tail)
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.cold_head = None;
        self.hot_len = 0;
    }

    /// Iterates from `head` to the tail.
    pub fn iter(&self) -> RingIter<'_, T> {
        RingIter {
            ring: self,
            current: self.head,
            remaining: self.len(),
        }
    }

    /// Walks the whole ring and checks links, markers and segment tags.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let len = self.len();
        let Some(head) = self.head else {
            if len != 0 || self.cold_head.is_some() || self.hot_len != 0 {
                return Err(InvariantError::new("empty ring has stale markers"));
            }
            return Ok(());
        };

        let expected_hot = len.min(self.hot_capacity);
        if self.hot_len != expected_hot {
            return Err(InvariantError::new(format!(
                "hot region holds {} nodes, expected {}",
                self.hot_len, expected_hot
            )));
        }
        if (len > self.hot_capacity) != self.cold_head.is_some() {
            return Err(InvariantError::new(format!(
                "cold region presence mismatch: len={} hot_capacity={} cold_head={:?}",
                len, self.hot_capacity, self.cold_head
            )));
        }

        let tagged_hot = self
            .arena
            .iter()
            .filter(|(_, link)| link.segment == Segment::Hot)
            .count();
        if tagged_hot != self.hot_len {
            return Err(InvariantError::new(format!(
                "{} slots tagged hot, hot_len is {}",
                tagged_hot, self.hot_len
            )));
        }

        let mut current = head;
        for position in 0..len {
            let link = self
                .arena
                .get(current)
                .ok_or_else(|| InvariantError::new("ring links to a vacant slot"))?;
            let next_prev = self.arena.get(link.next).map(|next| next.prev);
            if next_prev != Some(current) {
                return Err(InvariantError::new("next.prev does not point back"));
            }
            if position == expected_hot && self.cold_head != Some(current) {
                return Err(InvariantError::new(format!(
                    "cold_head is not the node at position {}",
                    expected_hot
                )));
            }
            let expected_segment = if position < expected_hot {
                Segment::Hot
            } else {
                Segment::Cold
            };
            if link.segment != expected_segment {
                return Err(InvariantError::new(format!(
                    "node at position {} tagged {:?}, expected {:?}",
                    position, link.segment, expected_segment
                )));
            }
            current = link.next;
        }
        if current != head {
            return Err(InvariantError::new(format!(
                "walking {} nodes from head does not return to head",
                len
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("segmented ring invariant violated: {}", err);
        }
    }

    fn link_before(&mut self, at: SlotId, value: T, segment: Segment) -> SlotId {
        let prev = self.prev_of(at);
        let id = self.arena.insert(Link {
            value,
            prev,
            next: at,
            segment,
        });
        if let Some(link) = self.arena.get_mut(prev) {
            link.next = id;
        }
        if let Some(link) = self.arena.get_mut(at) {
            link.prev = id;
        }
        id
    }

    fn prev_of(&self, id: SlotId) -> SlotId {
        self.arena.get(id).map_or(id, |link| link.prev)
    }

    fn next_of(&self, id: SlotId) -> SlotId {
        self.arena.get(id).map_or(id, |link| link.next)
    }

    fn set_segment(&mut self, id: SlotId, segment: Segment) {
        if let Some(link) = self.arena.get_mut(id) {
            link.segment = segment;
        }
    }
}

/// Iterator over `(SlotId, Segment, &T)` from head to tail.
pub struct RingIter<'a, T> {
    ring: &'a SegmentedRing<T>,
    current: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for RingIter<'a, T> {
    type Item = (SlotId, Segment, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.current?;
        let link = self.ring.arena.get(id)?;
        self.current = Some(link.next);
        self.remaining -= 1;
        Some((id, link.segment, &link.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<T: Copy>(ring: &SegmentedRing<T>) -> Vec<T> {
        ring.iter().map(|(_, _, v)| *v).collect()
    }

    fn segments<T>(ring: &SegmentedRing<T>) -> Vec<Segment> {
        ring.iter().map(|(_, s, _)| s).collect()
    }

    mod filling {
        use super::*;

        #[test]
        fn empty_ring_has_no_markers() {
            let ring: SegmentedRing<u32> = SegmentedRing::new(2);
            assert!(ring.is_empty());
            assert_eq!(ring.head_id(), None);
            assert_eq!(ring.cold_head_id(), None);
            assert_eq!(ring.tail(), None);
            ring.debug_validate_invariants();
        }

        #[test]
        fn sole_node_links_to_itself() {
            let mut ring = SegmentedRing::new(1);
            let id = ring.push_hot_front(1);
            assert_eq!(ring.head_id(), Some(id));
            assert_eq!(ring.tail_id(), Some(id));
            assert_eq!(ring.cold_head_id(), None);
            ring.debug_validate_invariants();
        }

        #[test]
        fn hot_pushes_stack_at_front() {
            let mut ring = SegmentedRing::new(3);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            ring.push_hot_front(3);
            assert_eq!(values(&ring), vec![3, 2, 1]);
            assert_eq!(ring.tail(), Some(&1));
            assert_eq!(ring.hot_len(), 3);
            assert_eq!(ring.cold_head_id(), None);
            ring.debug_validate_invariants();
        }

        #[test]
        fn growing_past_hot_capacity_creates_cold_region_at_tail() {
            let mut ring = SegmentedRing::new(1);
            let first = ring.push_hot_front(1);
            ring.push_hot_front(2);
            assert_eq!(ring.cold_head_id(), Some(first));
            assert_eq!(segments(&ring), vec![Segment::Hot, Segment::Cold]);
            ring.debug_validate_invariants();
        }

        #[test]
        fn hot_push_with_cold_region_demotes_last_hot_node() {
            let mut ring = SegmentedRing::new(2);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            ring.push_hot_front(3);
            ring.push_hot_front(4);
            assert_eq!(values(&ring), vec![4, 3, 2, 1]);
            assert_eq!(
                segments(&ring),
                vec![Segment::Hot, Segment::Hot, Segment::Cold, Segment::Cold]
            );
            assert_eq!(ring.cold_len(), 2);
            ring.debug_validate_invariants();
        }
    }

    mod cold_insertion {
        use super::*;

        #[test]
        fn cold_push_lands_at_cold_front() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            let id = ring.push_cold_front(9);
            assert_eq!(ring.cold_head_id(), Some(id));
            assert_eq!(values(&ring), vec![2, 9, 1]);
            ring.debug_validate_invariants();
        }

        #[test]
        fn cold_push_with_empty_cold_region_goes_to_tail() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front(1);
            let id = ring.push_cold_front(2);
            assert_eq!(ring.tail_id(), Some(id));
            assert_eq!(ring.cold_head_id(), Some(id));
            assert_eq!(values(&ring), vec![1, 2]);
            ring.debug_validate_invariants();
        }

        #[test]
        fn cold_push_into_unfilled_hot_region_goes_hot() {
            let mut ring = SegmentedRing::new(3);
            ring.push_hot_front(1);
            ring.push_cold_front(2);
            assert_eq!(values(&ring), vec![2, 1]);
            assert_eq!(ring.cold_head_id(), None);
            ring.debug_validate_invariants();
        }
    }

    mod rotation {
        use super::*;

        #[test]
        fn rotation_promotes_tail_without_relinking() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            ring.push_hot_front(3);
            assert_eq!(values(&ring), vec![3, 2, 1]);

            let promoted = ring.rotate_while(|v| *v == 1);
            assert_eq!(promoted, 1);
            assert_eq!(values(&ring), vec![1, 3, 2]);
            assert_eq!(ring.tail(), Some(&2));
            assert_eq!(
                segments(&ring),
                vec![Segment::Hot, Segment::Cold, Segment::Cold]
            );
            ring.debug_validate_invariants();
        }

        #[test]
        fn rotation_stops_at_first_rejected_tail() {
            let mut ring = SegmentedRing::new(2);
            for v in 1..=5 {
                ring.push_hot_front(v);
            }
            let promoted = ring.rotate_while(|v| *v <= 2);
            assert_eq!(promoted, 2);
            assert_eq!(ring.tail(), Some(&3));
            ring.debug_validate_invariants();
        }

        #[test]
        fn rotation_mutates_payload() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front((1, 5u32));
            ring.push_hot_front((2, 0u32));
            ring.rotate_while(|(_, visits)| {
                let frequent = *visits >= 2;
                *visits = 0;
                frequent
            });
            assert!(ring.iter().all(|(_, _, (_, visits))| *visits == 0));
        }

        #[test]
        fn rotation_is_bounded_by_one_turn() {
            let mut ring = SegmentedRing::new(1);
            for v in 0..4 {
                ring.push_hot_front(v);
            }
            let promoted = ring.rotate_while(|_| true);
            assert_eq!(promoted, 4);
            ring.debug_validate_invariants();
        }

        #[test]
        fn rotation_without_cold_region_is_noop() {
            let mut ring = SegmentedRing::new(4);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            assert_eq!(ring.rotate_while(|_| true), 0);
            assert_eq!(values(&ring), vec![2, 1]);
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn removing_sole_node_empties_ring() {
            let mut ring = SegmentedRing::new(1);
            let id = ring.push_hot_front(1);
            assert_eq!(ring.remove(id), Some(1));
            assert!(ring.is_empty());
            assert_eq!(ring.head_id(), None);
            ring.debug_validate_invariants();
        }

        #[test]
        fn removing_twice_is_noop() {
            let mut ring = SegmentedRing::new(1);
            let id = ring.push_hot_front(1);
            ring.push_hot_front(2);
            assert_eq!(ring.remove(id), Some(1));
            assert_eq!(ring.remove(id), None);
            assert_eq!(ring.len(), 1);
            ring.debug_validate_invariants();
        }

        #[test]
        fn removing_head_advances_head_and_refills_hot() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            let head = ring.push_hot_front(3);
            ring.remove(head);
            assert_eq!(values(&ring), vec![2, 1]);
            assert_eq!(segments(&ring), vec![Segment::Hot, Segment::Cold]);
            ring.debug_validate_invariants();
        }

        #[test]
        fn removing_hot_node_with_single_cold_node_drops_cold_region() {
            let mut ring = SegmentedRing::new(1);
            let first = ring.push_hot_front(1);
            let second = ring.push_hot_front(2);
            assert_eq!(ring.cold_head_id(), Some(first));
            ring.remove(second);
            assert_eq!(ring.cold_head_id(), None);
            assert_eq!(ring.head_id(), Some(first));
            ring.debug_validate_invariants();
        }

        #[test]
        fn removing_cold_head_advances_it() {
            let mut ring = SegmentedRing::new(1);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            ring.push_hot_front(3);
            let cold_head = ring.cold_head_id().unwrap();
            assert_eq!(ring.get(cold_head), Some(&2));
            ring.remove(cold_head);
            assert_eq!(ring.cold_head_id().and_then(|id| ring.get(id)), Some(&1));
            ring.debug_validate_invariants();
        }

        #[test]
        fn pop_tail_removes_eviction_candidate() {
            let mut ring = SegmentedRing::new(2);
            for v in 1..=4 {
                ring.push_hot_front(v);
            }
            assert_eq!(ring.pop_tail(), Some(1));
            assert_eq!(ring.pop_tail(), Some(2));
            assert_eq!(values(&ring), vec![4, 3]);
            ring.debug_validate_invariants();
        }

        #[test]
        fn clear_resets_everything() {
            let mut ring = SegmentedRing::new(2);
            for v in 1..=5 {
                ring.push_hot_front(v);
            }
            ring.clear();
            assert!(ring.is_empty());
            assert_eq!(ring.hot_len(), 0);
            assert_eq!(ring.iter().count(), 0);
            ring.debug_validate_invariants();
        }
    }

    mod invariant_checks {
        use super::*;

        #[test]
        fn mistagged_hot_node_is_reported() {
            let mut ring = SegmentedRing::new(2);
            ring.push_hot_front(1);
            ring.push_hot_front(2);
            let head = ring.push_hot_front(3);
            ring.check_invariants().unwrap();

            if let Some(link) = ring.arena.get_mut(head) {
                link.segment = Segment::Cold;
            }
            let err = ring.check_invariants().unwrap_err();
            assert_eq!(err.message(), "1 slots tagged hot, hot_len is 2");
        }

        #[test]
        fn broken_back_link_is_reported() {
            let mut ring = SegmentedRing::new(1);
            let first = ring.push_hot_front(1);
            let second = ring.push_hot_front(2);

            if let Some(link) = ring.arena.get_mut(first) {
                link.prev = first;
            }
            let err = ring.check_invariants().unwrap_err();
            assert!(err.message().contains("does not point back"));
            assert!(ring.contains(second));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            PushHot(u16),
            PushCold(u16),
            Rotate(u16),
            Remove(usize),
            PopTail,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<u16>().prop_map(Op::PushHot),
                any::<u16>().prop_map(Op::PushCold),
                any::<u16>().prop_map(Op::Rotate),
                any::<usize>().prop_map(Op::Remove),
                Just(Op::PopTail),
            ]
        }

        proptest! {
            #[test]
            fn invariants_hold_for_arbitrary_ops(
                hot_capacity in 1usize..6,
                ops in prop::collection::vec(op(), 0..200)
            ) {
                let mut ring = SegmentedRing::new(hot_capacity);
                let mut ids = Vec::new();
                for op in ops {
                    match op {
                        Op::PushHot(v) => ids.push(ring.push_hot_front(v)),
                        Op::PushCold(v) => ids.push(ring.push_cold_front(v)),
                        Op::Rotate(threshold) => {
                            ring.rotate_while(|v| *v < threshold);
                        },
                        Op::Remove(pick) => {
                            if !ids.is_empty() {
                                let id = ids.swap_remove(pick % ids.len());
                                ring.remove(id);
                            }
                        },
                        Op::PopTail => {
                            ring.pop_tail();
                        },
                    }
                    prop_assert!(ring.check_invariants().is_ok(), "{:?}", ring.check_invariants());
                    prop_assert_eq!(ring.iter().count(), ring.len());
                }
            }
        }
    }
}
