//! The object/plugin substrate (C2): a named tree of polymorphic objects
//! that holds core data, exposes properties/methods/signals, and lets
//! plugins wrap virtual operations and store per-object private slots.
//!
//! Grounded on the teacher's `core::State::{extension, add_extension,
//! remove_extension}` `AnyMap` mechanism (per-type typed storage) and its
//! `core::hooks` module (ordered hook points called around WindowManager
//! actions), generalised here into the reflective tree + wrapped-hook
//! contract described in §4.2.
pub mod hook;
pub mod reflect;
pub mod signal;
pub mod tree;

pub use hook::{HookLayer, WrappedHook};
pub use reflect::{
    Defaults, InterfaceDescriptor, MethodDescriptor, PropRange, PropValue, PropertyDescriptor,
    PropertyStore, Reflective, SignalDescriptor,
};
pub use signal::{HandlerId, SignalArgs, SignalBus, SignalHandler};
pub use tree::{ObjectId, ObjectKind, ObjectTree, TreeEvent};

use crate::private_index::{PrivateIndex, PrivateIndexRegistry, PrivateStorage};
use std::collections::HashMap;

/// Everything the object substrate owns: the tree shape, the signal bus,
/// per-object-type private-index registries, and per-object property
/// stores / private storage. [crate::display::Display], [crate::screen::
/// Screen] and [crate::window::Window] each hold their [ObjectId] and look
/// their reflective state up here rather than embedding it, so that the
/// tree, the signal bus and private storage all stay in lock-step.
#[derive(Default)]
pub struct ObjectSubstrate {
    pub tree: ObjectTree,
    pub signals: SignalBus,
    pub properties: HashMap<ObjectId, PropertyStore>,
    registries: HashMap<ObjectKind, PrivateIndexRegistry>,
    storage: HashMap<ObjectId, PrivateStorage>,
}

impl ObjectSubstrate {
    pub fn new() -> Self {
        let mut s = Self {
            tree: ObjectTree::new(),
            ..Default::default()
        };
        let root = s.tree.root();
        s.properties.insert(root, PropertyStore::new());
        s
    }

    /// Insert a new object, wiring up its property store and private
    /// storage, then emit `childObjectAdded` to the signal bus.
    pub fn insert_object(
        &mut self,
        parent: ObjectId,
        name: impl Into<String>,
        kind: ObjectKind,
    ) -> Option<ObjectId> {
        let id = self.tree.insert_object(parent, name, kind)?;
        self.properties.insert(id, PropertyStore::new());

        let registry = self.registries.entry(kind).or_default();
        self.storage.insert(id, PrivateStorage::new(registry));

        for event in self.tree.drain_events() {
            if let TreeEvent::ChildAdded { parent, id } = event {
                self.signals.emit(
                    &self.tree,
                    parent,
                    "core",
                    "childObjectAdded",
                    &vec![Box::new(id)],
                );
            }
        }

        Some(id)
    }

    /// Unlink and finalize `id`, emitting `childObjectRemoved` before
    /// dropping its storage.
    pub fn remove_object(&mut self, id: ObjectId) {
        if !self.tree.remove_object(id) {
            return;
        }

        for event in self.tree.drain_events() {
            if let TreeEvent::ChildRemoved { parent, id } = event {
                self.signals.emit(
                    &self.tree,
                    parent,
                    "core",
                    "childObjectRemoved",
                    &vec![Box::new(id)],
                );
            }
        }

        self.signals.drop_source(id);
        self.properties.remove(&id);
        self.storage.remove(&id);
        self.tree.finalize_removed(id);
    }

    /// Allocate a private index for plugin `P` on every object of `kind`,
    /// reallocating storage for every live object of that kind (§4.1).
    pub fn allocate_private_index<P: 'static>(&mut self, kind: ObjectKind, size: usize) -> PrivateIndex {
        let index = self.registries.entry(kind).or_default().allocate::<P>(size);
        let registry = &self.registries[&kind];

        for (oid, store) in self.storage.iter_mut() {
            if self.tree.kind(*oid) == Some(kind) {
                store.sync_with(registry);
            }
        }

        index
    }

    /// Free a private index for `kind`, invalidating the slot fleet-wide.
    pub fn free_private_index(&mut self, kind: ObjectKind, index: PrivateIndex) {
        if let Some(registry) = self.registries.get_mut(&kind) {
            registry.free(index);
        }
        for (oid, store) in self.storage.iter_mut() {
            if self.tree.kind(*oid) == Some(kind) {
                store.clear(index);
            }
        }
    }

    pub fn private_storage(&self, id: ObjectId) -> Option<&PrivateStorage> {
        self.storage.get(&id)
    }

    pub fn private_storage_mut(&mut self, id: ObjectId) -> Option<&mut PrivateStorage> {
        self.storage.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plugin;

    #[test]
    fn insert_remove_notifies_and_tears_down_storage() {
        let mut sub = ObjectSubstrate::new();
        let root = sub.tree.root();

        let idx = sub.allocate_private_index::<Plugin>(ObjectKind::Window, 1);
        let window = sub
            .insert_object(root, "0x1", ObjectKind::Window)
            .unwrap();

        sub.private_storage_mut(window).unwrap().set(idx, 7u32);
        assert_eq!(*sub.private_storage(window).unwrap().get::<u32>(idx).unwrap(), 7);

        sub.remove_object(window);
        assert!(sub.private_storage(window).is_none());
        assert!(!sub.tree.is_live(window));
    }
}
