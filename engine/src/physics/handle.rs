//! Arena storage and typed handles.
//!
//! The world keeps bodies, shapes and joints in [`Arena`]s and hands out
//! small `Copy` handles instead of references. Slots are never reused, so
//! iteration follows insertion order and a handle to a removed entity stays
//! dead forever.

use serde::{Deserialize, Serialize};

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Build a handle from its raw slot index.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Raw slot index.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a [`Body`](super::Body) owned by a world.
    BodyHandle,
    "Body"
);
define_handle!(
    /// Handle to a [`Shape`](super::Shape) owned by a world.
    ShapeHandle,
    "Shape"
);
define_handle!(
    /// Handle to a [`Joint`](super::Joint) owned by a world.
    JointHandle,
    "Joint"
);

/// Insertion-ordered slot storage.
///
/// Removed values leave an empty slot behind, so `slot_count` only grows.
/// A world that has seen many edits keeps paying for its dead slots in
/// the solver buffer; rebuilding the world from a snapshot compacts it.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Store a value, returning its slot index.
    pub fn insert(&mut self, value: T) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Some(value));
        self.live += 1;
        index
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Take a value out of its slot. The slot stays empty.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take();
        if value.is_some() {
            self.live -= 1;
        }
        value
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live or dead).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live values with their slot index, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (i, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_insert_remove() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.remove(a as usize), Some("a"));
        assert_eq!(arena.remove(a as usize), None);
        assert_eq!(arena.len(), 1);
        assert!(!arena.contains(a as usize));
        assert!(arena.contains(b as usize));
    }

    #[test]
    fn test_arena_never_reuses_slots() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        arena.remove(a as usize);
        let b = arena.insert(2);
        assert_ne!(a, b);
        assert_eq!(arena.slot_count(), 2);
    }

    #[test]
    fn test_arena_iter_is_insertion_ordered() {
        let mut arena = Arena::new();
        for v in 0..5 {
            arena.insert(v);
        }
        arena.remove(2);
        let values: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(JointHandle::from_raw(3).to_string(), "Joint(3)");
        assert_eq!(ShapeHandle::from_raw(0).index(), 0);
    }
}
