//! Private-index allocator (C1).
//!
//! Penrose's own `AnyMap`-based [`State::extension`][crate::x::XConn] slot
//! is the direct ancestor of this module: the teacher stores one typed value
//! per extension type behind an `Arc<RefCell<_>>`. The design notes (§9)
//! ask for something closer to the original's "every plugin gets an index
//! into an untyped per-object array" while staying safe, so this module
//! keeps that index-based allocation contract (stable offsets, freed slots
//! become holes that get reused) but makes each slot's *storage* type-safe
//! rather than byte-addressed: we key each type's registry on a
//! `TypeId`-per-plugin marker instead of `unsafe` pointer casts.
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A stable integer slot handed out to a plugin for a particular object
/// type. Index `i` always refers to the same storage for every live object
/// of that type until the index is freed and reused (invariant I8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrivateIndex(usize);

/// Per object-type registry of allocated private indices.
///
/// `sizes[i] == 0` marks a free slot; freeing an index retains the vector's
/// length so that a future allocation can reuse the hole, matching the
/// allocator contract of §4.1.
#[derive(Debug, Default)]
pub struct PrivateIndexRegistry {
    sizes: Vec<usize>,
    owners: HashMap<TypeId, PrivateIndex>,
}

impl PrivateIndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a private index of `size` slots (in units of "one opaque
    /// plugin value"; in this safe re-implementation `size` is always 1,
    /// since storage per index is a boxed `Any` rather than raw bytes, but
    /// the parameter is kept so the allocator's "packed storage vector"
    /// contract from §4.1 is visible at the call site).
    ///
    /// Scans for the lowest free slot (`sizes[i] == 0`) before extending the
    /// vector, so that free-then-allocate reuses holes.
    pub fn allocate<P: 'static>(&mut self, size: usize) -> PrivateIndex {
        let type_id = TypeId::of::<P>();
        if let Some(existing) = self.owners.get(&type_id) {
            return *existing;
        }

        let idx = match self.sizes.iter().position(|&s| s == 0) {
            Some(i) => {
                self.sizes[i] = size.max(1);
                i
            }
            None => {
                self.sizes.push(size.max(1));
                self.sizes.len() - 1
            }
        };

        let index = PrivateIndex(idx);
        self.owners.insert(type_id, index);
        index
    }

    /// Free a previously allocated index. The slot offset is retained
    /// (`sizes[i] = 0`) so a later allocation of a different size can reuse
    /// the hole without shifting every other index's offset.
    pub fn free(&mut self, index: PrivateIndex) {
        if let Some(size) = self.sizes.get_mut(index.0) {
            *size = 0;
        }
        self.owners.retain(|_, v| *v != index);
    }

    /// Offset for index `i`. Storage is addressed by slot position
    /// ([PrivateStorage] indexes its vector directly by `index.0`), not by
    /// a cumulative byte count, so this is just `index.0` — stable for the
    /// life of the allocation, including across a same- or different-sized
    /// `free`-then-`allocate` of some *other* index (P8, §4.1 contract).
    /// `size` only ever affects [PrivateIndexRegistry::total_size].
    pub fn offset(&self, index: PrivateIndex) -> usize {
        index.0
    }

    /// Total slot storage currently committed across every live index.
    pub fn total_size(&self) -> usize {
        self.sizes.iter().sum()
    }
}

/// Per-object storage for private plugin slots: one contiguous vector of
/// boxed values, indexed by [PrivateIndex]. Every live object of a type
/// shares the same `PrivateIndexRegistry` and therefore the same slot
/// layout, so inserting a new plugin grows every object's storage in
/// lock-step (§4.1's "walk every live object … and reallocate").
#[derive(Debug, Default)]
pub struct PrivateStorage {
    slots: Vec<Option<Box<dyn Any>>>,
}

impl PrivateStorage {
    /// Create empty storage, sized for `registry`'s current slot count.
    pub fn new(registry: &PrivateIndexRegistry) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(registry.sizes.len(), || None);
        Self { slots }
    }

    /// Grow (or shrink, on free) this object's storage vector to track the
    /// registry. Existing slot contents at unaffected indices are
    /// preserved, matching the "reallocate copying old slots" contract.
    pub fn sync_with(&mut self, registry: &PrivateIndexRegistry) {
        self.slots.resize_with(registry.sizes.len(), || None);
    }

    /// Read the plugin value at `index`, if one has been set.
    pub fn get<P: 'static>(&self, index: PrivateIndex) -> Option<&P> {
        self.slots
            .get(index.0)
            .and_then(|s| s.as_ref())
            .and_then(|b| b.downcast_ref())
    }

    /// Mutably access the plugin value at `index`.
    pub fn get_mut<P: 'static>(&mut self, index: PrivateIndex) -> Option<&mut P> {
        self.slots
            .get_mut(index.0)
            .and_then(|s| s.as_mut())
            .and_then(|b| b.downcast_mut())
    }

    /// Set the plugin value at `index`, allocating the slot if needed.
    pub fn set<P: 'static>(&mut self, index: PrivateIndex, value: P) {
        if index.0 >= self.slots.len() {
            self.slots.resize_with(index.0 + 1, || None);
        }
        self.slots[index.0] = Some(Box::new(value));
    }

    /// Invalidate the slot at `index` (as happens when the owning index is
    /// freed fleet-wide).
    pub fn clear(&mut self, index: PrivateIndex) {
        if let Some(slot) = self.slots.get_mut(index.0) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PluginA;
    struct PluginB;
    struct PluginC;

    // P8: allocate a, b; create N objects; free a; allocate c of a
    // different size; b's offset and contents are unchanged everywhere.
    #[test]
    fn private_slot_stability_across_free_and_realloc() {
        let mut registry = PrivateIndexRegistry::new();
        let a = registry.allocate::<PluginA>(1);
        let b = registry.allocate::<PluginB>(1);

        let mut objects: Vec<PrivateStorage> = (0..5)
            .map(|_| {
                let mut s = PrivateStorage::new(&registry);
                s.set(a, PluginA);
                s.set(b, 42u32);
                s
            })
            .collect();

        let b_offset_before = registry.offset(b);

        registry.free(a);
        for o in &mut objects {
            o.clear(a);
        }

        // c reuses a's freed hole at a different size; b must not move.
        let c = registry.allocate::<PluginC>(3);
        for o in &mut objects {
            o.sync_with(&registry);
        }

        assert_eq!(registry.offset(b), b_offset_before);
        assert_eq!(registry.offset(c), 0);
        for o in &objects {
            assert_eq!(*o.get::<u32>(b).unwrap(), 42);
        }
    }

    #[test]
    fn allocate_is_idempotent_per_plugin_type() {
        let mut registry = PrivateIndexRegistry::new();
        let first = registry.allocate::<PluginA>(1);
        let second = registry.allocate::<PluginA>(1);
        assert_eq!(first, second);
    }

    #[test]
    fn freed_slot_is_reused_by_next_allocation() {
        let mut registry = PrivateIndexRegistry::new();
        let a = registry.allocate::<PluginA>(1);
        registry.free(a);
        let b = registry.allocate::<PluginB>(1);
        assert_eq!(a, b);
    }
}
