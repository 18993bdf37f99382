// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage shared by the node arena and the edge pool.
//!
//! Stable handles (index + generation) let edges refer to producers and
//! consumers without dangling on slot reuse, and let a stale handle held
//! by a caller be recognized as disposed rather than silently aliasing
//! whatever now occupies that slot.

use std::fmt;

/// Handle to a node (`Source`, `Derived`, or `Watcher`) in an
/// [`Engine`](crate::engine::Engine).
///
/// Equality and the generation check are what let `free`d slots be
/// reused without a freed `NodeId` ever resolving to the wrong node.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}#{})", self.index, self.generation)
    }
}

/// Handle to a dependency edge in the pooled edge arena.
///
/// Never exposed outside the crate: edges are wholly owned by their two
/// endpoints, so no caller can hold a stale `EdgeId` across a free.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EdgeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({}#{})", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// A `Vec`-backed arena with O(1) insert/remove and generation-checked
/// handles, used for both nodes and edges.
pub(crate) struct GenArena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> GenArena<T> {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            slots: Vec::with_capacity(cap),
            free_head: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Inserts `value`, returning its `(index, generation)` handle
    /// components. Reuses a freed slot when one is available.
    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let Slot::Vacant {
                generation,
                next_free,
            } = *slot
            else {
                unreachable!("free list pointed at an occupied slot")
            };
            self.free_head = next_free;
            *slot = Slot::Occupied { generation, value };
            (index, generation)
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena index overflowed u32");
            self.slots.push(Slot::Occupied {
                generation: 0,
                value,
            });
            (index, 0)
        }
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> Option<&T> {
        match self.slots.get(index as usize)? {
            Slot::Occupied {
                generation: g,
                value,
            } if *g == generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        match self.slots.get_mut(index as usize)? {
            Slot::Occupied {
                generation: g,
                value,
            } if *g == generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn contains(&self, index: u32, generation: u32) -> bool {
        self.get(index, generation).is_some()
    }

    /// Removes and returns the value at `(index, generation)`, bumping
    /// the slot's generation so any other copy of the old handle is
    /// recognized as stale.
    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if !matches!(slot, Slot::Occupied { generation: g, .. } if *g == generation) {
            return None;
        }
        let old = std::mem::replace(
            slot,
            Slot::Vacant {
                generation: generation.wrapping_add(1),
                next_free: self.free_head,
            },
        );
        self.free_head = Some(index);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => unreachable!("checked occupied above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GenArena;

    #[test]
    fn freed_slot_is_reused_by_the_next_insert() {
        let mut arena: GenArena<&'static str> = GenArena::with_capacity(0);
        let (i0, _) = arena.insert("a");
        let (i1, _) = arena.insert("b");
        arena.remove(i0, 0);
        assert_eq!(arena.len(), 1);

        let (i2, g2) = arena.insert("c");
        assert_eq!(i2, i0, "the freed slot must be reused before growing the vec");
        assert_eq!(g2, 1, "reuse bumps the generation");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(i1, 0), Some(&"b"));
        assert_eq!(arena.get(i2, g2), Some(&"c"));
    }

    #[test]
    fn stale_handle_to_a_freed_slot_is_rejected_even_after_reuse() {
        let mut arena: GenArena<i32> = GenArena::with_capacity(0);
        let (index, old_generation) = arena.insert(1);
        arena.remove(index, old_generation);
        let (reused_index, new_generation) = arena.insert(2);
        assert_eq!(reused_index, index);

        assert_eq!(arena.get(index, old_generation), None, "stale generation must not resolve");
        assert!(!arena.contains(index, old_generation));
        assert_eq!(arena.get(index, new_generation), Some(&2));
    }

    #[test]
    fn remove_is_a_no_op_on_an_unknown_or_already_removed_handle() {
        let mut arena: GenArena<i32> = GenArena::with_capacity(0);
        let (index, generation) = arena.insert(1);
        assert_eq!(arena.remove(index, generation), Some(1));
        assert_eq!(arena.remove(index, generation), None, "double remove must not resolve");
        assert_eq!(arena.remove(index + 1, 0), None, "out-of-range handle must not resolve");
    }
}
