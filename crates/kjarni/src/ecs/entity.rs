//! # Entity — Generational Identifiers
//!
//! An [`Entity`] is an opaque identity — it doesn't contain anything. The
//! [`EntityRegistry`](super::registry::EntityRegistry) maps entities to their
//! components.
//!
//! Identifiers pair a slot index with a generation counter. Destroying an
//! entity bumps its slot's generation, so every identifier handed out before
//! the destruction fails validity checks from then on — O(1) invalidation
//! with no bookkeeping of outstanding handles, and safe cross-frame
//! references even after the slot is recycled.

use std::fmt;

/// An opaque entity identifier issued by the
/// [`EntityRegistry`](super::registry::EntityRegistry).
///
/// Valid from creation until explicit destruction, and only within the
/// registry (and [`Core`](crate::core::Core)) that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Slot index in the allocator. Recycled when the entity is destroyed.
    pub(crate) index: u32,
    /// Generation counter, incremented each time the slot is reused.
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw slot index. Useful for diagnostics, not identity.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation counter.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// State of one identifier slot.
#[derive(Clone, Copy)]
struct Slot {
    generation: u32,
    occupied: bool,
}

/// Issues and retires entity identifiers.
///
/// Each slot remembers its current generation and whether it is occupied.
/// Releasing a slot bumps the generation and queues the index for reuse, so
/// an identifier is live iff its slot is occupied *and* the generations
/// agree.
pub(crate) struct EntityAllocator {
    slots: Vec<Slot>,
    /// Retired slot indices awaiting reuse, most recently freed first.
    reusable: Vec<u32>,
    live: usize,
}

impl EntityAllocator {
    /// Room for `capacity` entities before the slot table reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            reusable: Vec::new(),
            live: 0,
        }
    }

    /// Issue a fresh identifier, preferring a retired slot.
    pub fn allocate(&mut self) -> Entity {
        self.live += 1;
        match self.reusable.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.occupied = true;
                Entity {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupied: true,
                });
                Entity {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Retire an identifier. Returns `false` when it was already stale,
    /// leaving the allocator untouched.
    pub fn release(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.slots[entity.index as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.reusable.push(entity.index);
        self.live -= 1;
        true
    }

    /// Retire every live identifier at once. Returns how many were live.
    pub fn release_all(&mut self) -> usize {
        let released = self.live;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.occupied {
                slot.occupied = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.reusable.push(index as u32);
            }
        }
        self.live = 0;
        released
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.occupied && slot.generation == entity.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}
