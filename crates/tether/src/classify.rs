//! Value Classifier - picks a conversion strategy per value
//!
//! Host values are classified in this order: nil, exact scalar kinds, byte
//! sequences, native foreign handles, then the structural kinds (sequence,
//! mapping, record, pointer, function, interface). Anything left has no
//! strategy and converts to `null`.

use tether_sdk::{ForeignType, ForeignValue, Realm};

use crate::host::{HostValue, Pointer};

/// Conversion strategy for a host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStrategy {
    /// `nil` and null pointers become `undefined`
    Undefined,
    /// Bool, integer, float or string
    Scalar,
    /// Byte sequence rendered as a string
    Bytes,
    /// Foreign handle passed through unchanged
    Passthrough,
    /// Element-wise into an array
    Sequence,
    /// Key/value-wise into a plain object
    Mapping,
    /// Record (by value or behind a pointer) through the struct projector
    Struct,
    /// Pointer to a non-record: convert the referent
    Deref,
    /// Host function wrapped as a foreign function
    Function,
    /// Interface through the interface projector
    Interface,
    /// No strategy; converts to `null`
    Unsupported,
}

/// Conversion strategy for a foreign value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignStrategy {
    /// `undefined` and `null` become host `nil`
    Nil,
    /// Boolean primitive
    Boolean,
    /// Number, always a float
    Number,
    /// String or symbol, as its string form
    String,
    /// Array, element-wise
    Array,
    /// Plain object, through the realm's JSON facility
    Structural,
    /// Function, passed through as an opaque handle
    Callable,
}

/// Classify a host value
pub fn classify_host(value: &HostValue) -> HostStrategy {
    match value {
        HostValue::Nil => HostStrategy::Undefined,
        HostValue::Bool(_) | HostValue::Int(_) | HostValue::Uint(_) | HostValue::Float(_) | HostValue::Str(_) => {
            HostStrategy::Scalar
        }
        HostValue::Bytes(_) => HostStrategy::Bytes,
        HostValue::Foreign(_) => HostStrategy::Passthrough,
        HostValue::Seq(_) => HostStrategy::Sequence,
        HostValue::Map(_) => HostStrategy::Mapping,
        HostValue::Record(_) => HostStrategy::Struct,
        HostValue::Pointer(Pointer::Record(_)) => HostStrategy::Struct,
        HostValue::Pointer(Pointer::Value(_)) => HostStrategy::Deref,
        HostValue::Pointer(Pointer::Nil) => HostStrategy::Undefined,
        HostValue::Func(_) => HostStrategy::Function,
        HostValue::Interface(_) => HostStrategy::Interface,
        HostValue::Opaque(_) => HostStrategy::Unsupported,
    }
}

/// Classify a foreign value by its runtime tag
pub fn classify_foreign(realm: &dyn Realm, value: ForeignValue) -> ForeignStrategy {
    match realm.type_of(value) {
        ForeignType::Undefined | ForeignType::Null => ForeignStrategy::Nil,
        ForeignType::Boolean => ForeignStrategy::Boolean,
        ForeignType::Number => ForeignStrategy::Number,
        ForeignType::String | ForeignType::Symbol => ForeignStrategy::String,
        ForeignType::Object if realm.is_array(value) => ForeignStrategy::Array,
        ForeignType::Object => ForeignStrategy::Structural,
        ForeignType::Function => ForeignStrategy::Callable,
    }
}
