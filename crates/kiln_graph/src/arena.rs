//! Generational arena for graph nodes that can be removed mid-build.
//!
//! The [`Arena`] provides O(1) insertion, lookup, and removal by opaque
//! [`ArenaId`] keys. Every slot carries a generation counter that is bumped on
//! removal, so an id taken before a removal never aliases whatever is stored
//! in the recycled slot afterwards.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// An id is a slot index plus the generation the slot had when the item was
/// allocated.
pub trait ArenaId: Copy {
    /// Creates an ID from a slot index and generation.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Returns the slot index.
    fn index(self) -> u32;

    /// Returns the slot generation.
    fn generation(self) -> u32;
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A slot-recycling container whose ids go dead on removal.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates a new item, reusing a freed slot when one is available.
    pub fn alloc(&mut self, item: T) -> I {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(item);
            return I::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(item),
        });
        I::from_parts(index, 0)
    }

    /// Removes an item and retires its id. Returns `None` for dead ids.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns a reference to a live item.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Returns a mutable reference to a live item.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns `true` if the id still refers to a live item.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena contains no live items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live `(ID, &T)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (I::from_parts(i as u32, slot.generation), v))
        })
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the id is dead or out of bounds.
    fn index(&self, id: I) -> &T {
        match self.get(id) {
            Some(v) => v,
            None => panic!("dead arena id at slot {}", id.index()),
        }
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        let index = id.index();
        match self.get_mut(id) {
            Some(v) => v,
            None => panic!("dead arena id at slot {index}"),
        }
    }
}
