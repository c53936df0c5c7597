//! Generational slot arena.
//!
//! Stores values in a `Vec` of slots addressed by [`SlotId`]. Freed slots are
//! pushed onto a free list and reused by later inserts, so a full cache that
//! evicts one entry per insert never reallocates. Each slot carries a
//! generation that is bumped on removal; a stale `SlotId` held across a
//! remove/insert cycle no longer resolves.
//!
//! ```text
//!   slots: [ {gen 0, Some(a)} | {gen 3, None} | {gen 1, Some(c)} ]
//!   free_list: [1]
//!
//!   insert(d) → reuses index 1 → SlotId { index: 1, generation: 3 }
//!   old SlotId { index: 1, generation: 2 } → get() == None
//! ```

/// Stable handle to a value stored in a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: usize,
    generation: u32,
}

impl SlotId {
    /// Position of the slot in the arena.
    pub fn index(self) -> usize {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Packs the handle into one word, generation in the high half.
    ///
    /// Indices must fit in 32 bits.
    pub(crate) fn to_bits(self) -> u64 {
        debug_assert!(self.index <= u32::MAX as usize);
        (u64::from(self.generation) << 32) | (self.index as u64 & 0xFFFF_FFFF)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            index: (bits & 0xFFFF_FFFF) as usize,
            generation: (bits >> 32) as u32,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Vec-backed arena with slot reuse and generation-checked handles.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` in a free slot (or a new one) and returns its handle.
    pub fn insert(&mut self, value: T) -> SlotId {
        let id = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            SlotId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            SlotId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        };
        self.len += 1;
        id
    }

    /// Like [`insert`](Self::insert), but hands the id the value will live
    /// under to `make` first, so self-referencing values can be built.
    pub fn insert_with(&mut self, make: impl FnOnce(SlotId) -> T) -> SlotId {
        let id = match self.free_list.last() {
            Some(&index) => SlotId {
                index,
                generation: self.slots[index].generation,
            },
            None => SlotId {
                index: self.slots.len(),
                generation: 0,
            },
        };
        let inserted = self.insert(make(id));
        debug_assert_eq!(inserted, id);
        inserted
    }

    /// Frees the slot behind `id`, returning its value.
    ///
    /// Returns `None` for vacant slots and stale handles.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frees every occupied slot. Allocated slots are kept for reuse and all
    /// outstanding handles are invalidated.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_list.push(index);
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    SlotId {
                        index,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
