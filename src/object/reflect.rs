//! Static reflection descriptors: interfaces, methods, signals and
//! properties, plus the typed property storage every object exposes.
//!
//! The original keeps these as runtime-mutable string-keyed tables built by
//! the XML metadata loader (§6). The design notes prefer a compile-time
//! checked builder internally while keeping the description "externally
//! parseable" — here that means [InterfaceDescriptor] tables are `const`
//! data built by each object module, and [Defaults::apply] is the seam
//! where an external metadata reader can override them before first use.
use std::collections::HashMap;

/// The four property value kinds §4.2 names: bool, int32, double, string.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// A boolean property value.
    Bool(bool),
    /// A 32 bit integer property value.
    Int32(i32),
    /// A double precision property value.
    Double(f64),
    /// A string property value.
    String(String),
}

/// Declared min/max clamp for numeric properties, applied both to
/// compiled-in defaults and to metadata-supplied overrides (§4.2, §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct PropRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PropRange {
    pub fn clamp_i32(&self, v: i32) -> i32 {
        let mut v = v;
        if let Some(min) = self.min {
            v = v.max(min as i32);
        }
        if let Some(max) = self.max {
            v = v.min(max as i32);
        }
        v
    }

    pub fn clamp_f64(&self, v: f64) -> f64 {
        let mut v = v;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

/// Static description of one property on an interface.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub range: PropRange,
}

/// Static description of one method on an interface.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub input_signature: &'static str,
    pub output_signature: &'static str,
}

/// Static description of one signal on an interface.
#[derive(Debug, Clone, Copy)]
pub struct SignalDescriptor {
    pub name: &'static str,
    pub signature: &'static str,
}

/// An interface: a named, versioned bundle of methods/signals/properties
/// that a plugin may layer onto an object type (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    pub version: u32,
    pub methods: &'static [MethodDescriptor],
    pub signals: &'static [SignalDescriptor],
    pub properties: &'static [PropertyDescriptor],
}

impl InterfaceDescriptor {
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn signal(&self, name: &str) -> Option<&SignalDescriptor> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Anything offering the capability set of §3: enumerate its own
/// interfaces (including those of any base types it layers on top of).
pub trait Reflective {
    /// Every interface this object type exposes, base types first.
    fn interfaces() -> &'static [InterfaceDescriptor];

    /// `forEachInterface` — visit every interface by reference.
    fn for_each_interface(mut callback: impl FnMut(&InterfaceDescriptor)) {
        for iface in Self::interfaces() {
            callback(iface);
        }
    }
}

/// Per-object typed property storage, keyed by `(interface, property)`.
/// Setting a value only emits a changed notification when it actually
/// differs from the stored one (§4.2).
#[derive(Debug, Default, Clone)]
pub struct PropertyStore {
    values: HashMap<(&'static str, &'static str), PropValue>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, iface: &'static str, prop: &'static str) -> Option<&PropValue> {
        self.values.get(&(iface, prop))
    }

    pub fn get_bool(&self, iface: &'static str, prop: &'static str) -> Option<bool> {
        match self.get(iface, prop) {
            Some(PropValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, iface: &'static str, prop: &'static str) -> Option<i32> {
        match self.get(iface, prop) {
            Some(PropValue::Int32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, iface: &'static str, prop: &'static str) -> Option<f64> {
        match self.get(iface, prop) {
            Some(PropValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, iface: &'static str, prop: &'static str) -> Option<&str> {
        match self.get(iface, prop) {
            Some(PropValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Set a value, returning `true` iff it actually changed (the signal
    /// a caller should emit a `*Changed` signal on `true`).
    pub fn set(&mut self, iface: &'static str, prop: &'static str, value: PropValue) -> bool {
        let key = (iface, prop);
        let changed = self.values.get(&key) != Some(&value);
        if changed {
            self.values.insert(key, value);
        }
        changed
    }
}

/// Metadata-supplied default overrides for one interface's properties,
/// consumed from the external `<iface>.xml` reader of §6. Out of this
/// crate's scope to parse XML; this is the seam it plugs into.
#[derive(Debug, Default, Clone)]
pub struct Defaults {
    overrides: HashMap<(&'static str, &'static str), PropValue>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, iface: &'static str, prop: &'static str, value: PropValue) {
        self.overrides.insert((iface, prop), value);
    }

    /// Apply any overrides this set carries onto `store`, clamping
    /// ints/doubles against `iface`'s declared property ranges.
    pub fn apply(&self, iface: &InterfaceDescriptor, store: &mut PropertyStore) {
        for prop in iface.properties {
            let Some(value) = self.overrides.get(&(iface.name, prop.name)) else {
                continue;
            };

            let clamped = match value {
                PropValue::Int32(v) => PropValue::Int32(prop.range.clamp_i32(*v)),
                PropValue::Double(v) => PropValue::Double(prop.range.clamp_f64(*v)),
                other => other.clone(),
            };

            store.set(iface.name, prop.name, clamped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &[PropertyDescriptor] = &[PropertyDescriptor {
        name: "opacity",
        range: PropRange {
            min: Some(0.0),
            max: Some(100.0),
        },
    }];

    const IFACE: InterfaceDescriptor = InterfaceDescriptor {
        name: "core",
        version: 1,
        methods: &[],
        signals: &[],
        properties: PROPS,
    };

    #[test]
    fn property_set_reports_change_only_when_value_differs() {
        let mut store = PropertyStore::new();
        assert!(store.set("core", "opacity", PropValue::Double(50.0)));
        assert!(!store.set("core", "opacity", PropValue::Double(50.0)));
        assert!(store.set("core", "opacity", PropValue::Double(10.0)));
    }

    #[test]
    fn defaults_clamp_out_of_range_overrides() {
        let mut defaults = Defaults::new();
        defaults.insert("core", "opacity", PropValue::Double(500.0));

        let mut store = PropertyStore::new();
        defaults.apply(&IFACE, &mut store);

        assert_eq!(store.get_f64("core", "opacity"), Some(100.0));
    }
}
