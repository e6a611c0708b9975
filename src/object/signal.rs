//! Signal connect/disconnect/emit primitives (§4.2).
//!
//! A signal emission walks the source object's own handler chain, then
//! bubbles to the parent and repeats, recursively, all the way to the
//! root. Handlers are plain closures here rather than "rebind the target's
//! vtable to the bound interface" — the Rust-idiomatic substitute the
//! design notes call for: a handler closes over whatever state it needs to
//! act as if it were dispatched through that interface layer.
use super::tree::{ObjectId, ObjectTree};
use std::collections::HashMap;

/// The values carried by one signal emission, boxed so arbitrary payload
/// shapes can ride the same bus (method marshalling in the original; here,
/// a type-erased but downcastable payload).
pub type SignalArgs = Vec<Box<dyn std::any::Any>>;

/// A registered signal handler.
pub type SignalHandler = Box<dyn FnMut(ObjectId, &SignalArgs)>;

/// An opaque handle returned by [SignalBus::connect], used to
/// [SignalBus::disconnect] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct SignalBus {
    // Keyed by the *source* object a handler was registered against.
    handlers: HashMap<(ObjectId, &'static str, &'static str), Vec<(HandlerId, SignalHandler)>>,
    next_id: u64,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `connect(iface, name, target …) -> id`. Here `target` identity is
    /// captured inside the handler closure by the caller rather than
    /// threaded through the bus, keeping this API monomorphic.
    pub fn connect(
        &mut self,
        source: ObjectId,
        iface: &'static str,
        signal: &'static str,
        handler: SignalHandler,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;

        self.handlers
            .entry((source, iface, signal))
            .or_default()
            .push((id, handler));

        id
    }

    /// `disconnect(iface, signal, id)`.
    pub fn disconnect(&mut self, source: ObjectId, iface: &'static str, signal: &'static str, id: HandlerId) {
        if let Some(v) = self.handlers.get_mut(&(source, iface, signal)) {
            v.retain(|(hid, _)| *hid != id);
        }
    }

    /// Drop every handler registered directly against `source` (called when
    /// an object is finalized).
    pub fn drop_source(&mut self, source: ObjectId) {
        self.handlers.retain(|(s, _, _), _| *s != source);
    }

    /// `signal(path, iface, name, signature, values)` — emit from `source`,
    /// walking its own handlers then bubbling up through every ancestor in
    /// `tree`.
    pub fn emit(
        &mut self,
        tree: &ObjectTree,
        source: ObjectId,
        iface: &'static str,
        signal: &'static str,
        args: &SignalArgs,
    ) {
        let mut current = Some(source);
        while let Some(id) = current {
            if let Some(handlers) = self.handlers.get_mut(&(id, iface, signal)) {
                for (_, handler) in handlers.iter_mut() {
                    handler(source, args);
                }
            }
            current = tree.parent(id);
        }
    }
}
