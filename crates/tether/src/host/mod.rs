//! Host-side data model
//!
//! Rust has no runtime reflection, so the host's "reflective type system" is
//! made explicit here:
//!
//! - [`HostValue`]: the runtime shape of any host value
//! - [`HostType`] / [`Signature`]: declared parameter and result types
//! - [`Record`] / [`RecordType`]: a record's fields and both method sets
//! - [`HostFunction`]: a callable with a known signature
//! - typed traits ([`IntoHost`], [`FromHost`], [`HostParams`], ...) that turn
//!   ordinary Rust values and closures into the above

mod coercion;
mod function;
mod record;
mod typed;
mod types;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_sdk::ForeignValue;

pub use coercion::convert;
pub(crate) use coercion::coerce;
pub use function::{HostBody, HostError, HostFunction, HostOutcome};
pub use record::{
    FieldValue, InterfaceValue, Owned, Record, RecordRef, RecordType, RecordValue, Shared,
};
pub use typed::{Bytes, FromHost, HostKind, HostParams, HostResults, HostReturn, IntoHost, Rest};
pub(crate) use typed::{single_results, single_return};
pub use types::{HostType, Signature};

/// A host value as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    /// Absent value (`nil`)
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Byte sequence (crosses the boundary as a string)
    Bytes(Vec<u8>),
    /// Ordered sequence
    Seq(Vec<HostValue>),
    /// Keyed mapping in insertion order
    Map(Vec<(HostValue, HostValue)>),
    /// Record held by value (unaddressable)
    Record(RecordValue),
    /// Shared reference
    Pointer(Pointer),
    /// Callable
    Func(HostFunction),
    /// Value held behind an interface
    Interface(InterfaceValue),
    /// Native foreign handle, passed through unchanged
    Foreign(ForeignValue),
    /// Host value of a kind the bridge cannot convert (channels and the like)
    Opaque(OpaqueValue),
}

impl HostValue {
    /// Wrap a record by value
    pub fn record<T: Record>(value: T) -> Self {
        HostValue::Record(RecordValue::new(value))
    }

    /// Wrap any other value behind a shared pointer
    pub fn pointer(value: HostValue) -> Self {
        HostValue::Pointer(Pointer::Value(Rc::new(RefCell::new(value))))
    }

    /// Build a string-keyed mapping
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, HostValue)>) -> Self {
        HostValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (HostValue::Str(k.into()), v))
                .collect(),
        )
    }

    /// Check for `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil | HostValue::Pointer(Pointer::Nil))
    }

    /// Kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Nil => "nil",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Uint(_) => "uint",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::Bytes(_) => "bytes",
            HostValue::Seq(_) => "sequence",
            HostValue::Map(_) => "map",
            HostValue::Record(_) => "record",
            HostValue::Pointer(_) => "pointer",
            HostValue::Func(_) => "func",
            HostValue::Interface(_) => "interface",
            HostValue::Foreign(_) => "foreign",
            HostValue::Opaque(_) => "opaque",
        }
    }

    /// Look up a string key in a mapping
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        match self {
            HostValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, HostValue::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Element of a sequence
    pub fn index(&self, i: usize) -> Option<&HostValue> {
        match self {
            HostValue::Seq(items) => items.get(i),
            _ => None,
        }
    }

    /// Extract a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Target of a host pointer.
#[derive(Clone, Default)]
pub enum Pointer {
    /// Null pointer
    #[default]
    Nil,
    /// Shared record; projections observe and mutate the referent
    Record(RecordRef),
    /// Shared non-record value; converted by dereferencing
    Value(Rc<RefCell<HostValue>>),
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pointer::Nil, Pointer::Nil) => true,
            (Pointer::Record(a), Pointer::Record(b)) => a.ptr_eq(b),
            (Pointer::Value(a), Pointer::Value(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Nil => write!(f, "Pointer::Nil"),
            Pointer::Record(r) => write!(f, "Pointer::Record({})", r.type_name()),
            Pointer::Value(v) => match v.try_borrow() {
                Ok(inner) => write!(f, "Pointer::Value({:?})", inner),
                Err(_) => write!(f, "Pointer::Value(<borrowed>)"),
            },
        }
    }
}

/// A host value with no conversion strategy.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    value: Rc<dyn Any>,
}

impl OpaqueValue {
    /// Wrap an arbitrary value
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Rc::new(value),
        }
    }

    /// Rust type name of the wrapped value
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_lookup() {
        let m = HostValue::map([("x", HostValue::Float(1.0)), ("y", HostValue::Nil)]);
        assert_eq!(m.get("x"), Some(&HostValue::Float(1.0)));
        assert_eq!(m.get("z"), None);
        assert_eq!(HostValue::Int(1).get("x"), None);
    }

    #[test]
    fn test_pointer_identity() {
        let p = HostValue::pointer(HostValue::Int(1));
        let q = p.clone();
        assert_eq!(p, q);
        assert_ne!(p, HostValue::pointer(HostValue::Int(1)));
    }

    #[test]
    fn test_opaque() {
        let o = OpaqueValue::new(std::sync::mpsc::channel::<i32>().0);
        assert!(o.type_name().contains("Sender"));
        assert!(o.downcast_ref::<std::sync::mpsc::Sender<i32>>().is_some());
        assert_eq!(HostValue::Opaque(o).kind_name(), "opaque");
    }
}
