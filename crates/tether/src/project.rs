//! Struct and Interface Projectors
//!
//! A projection is a plain foreign object synthesised from a record:
//! exported fields in declaration order, then the value-receiver methods,
//! then the reference-receiver methods. Names have their first character
//! folded to lower case and are otherwise unchanged; a later binding
//! overwrites an earlier one of the same name.
//!
//! Records reached through a pointer are shared with the projection. A record
//! passed by value is first promoted to an addressable copy owned by the
//! projection's closures. Projections are never cached.
//!
//! There is no cycle protection: a record whose field points back at itself
//! recurses until the stack is exhausted.

use tether_sdk::{BridgeError, BridgeResult, ForeignValue, Realm};

use crate::convert::Converter;
use crate::host::{HostValue, InterfaceValue, Pointer, RecordRef};

/// Name → value mapping produced by a projector, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedObject {
    entries: Vec<(String, ForeignValue)>,
}

impl ProjectedObject {
    /// Empty projection
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, overwriting an existing binding in place
    pub fn insert(&mut self, name: String, value: ForeignValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a binding
    pub fn get(&self, name: &str) -> Option<ForeignValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Whether a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bound names in order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over bindings
    pub fn iter(&self) -> impl Iterator<Item = (&str, ForeignValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Materialise as a plain object in the realm
    pub fn into_foreign(self, realm: &dyn Realm) -> BridgeResult<ForeignValue> {
        let obj = realm.create_object();
        for (name, value) in self.entries {
            realm.set_property(obj, &name, value)?;
        }
        Ok(obj)
    }
}

/// Fold the first character to lower case
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<'a> Converter<'a> {
    /// Project a record, by value or behind a pointer
    pub fn project_struct(&self, value: &HostValue) -> BridgeResult<ProjectedObject> {
        let target = match value {
            HostValue::Record(record) => record.promote()?,
            HostValue::Pointer(Pointer::Record(record)) => record.clone(),
            other => {
                return Err(BridgeError::Signature(format!(
                    "expected a record or a pointer to a record, got {}",
                    other.kind_name()
                )))
            }
        };
        self.project_record(&target)
    }

    fn project_record(&self, target: &RecordRef) -> BridgeResult<ProjectedObject> {
        let mut projected = ProjectedObject::new();
        for field in target.fields()? {
            if !field.exported {
                continue;
            }
            projected.insert(lower_first(field.name), self.to_foreign(&field.value)?);
        }
        for method in target.methods() {
            let name = lower_first(method.name());
            projected.insert(name, self.host_function_to_foreign(method));
        }
        Ok(projected)
    }

    /// Project the methods an interface declares; fields are not exposed
    pub fn project_interface(&self, value: &InterfaceValue) -> ProjectedObject {
        let mut projected = ProjectedObject::new();
        for method in value.methods() {
            let name = lower_first(method.name());
            projected.insert(name, self.host_function_to_foreign(method));
        }
        projected
    }
}
