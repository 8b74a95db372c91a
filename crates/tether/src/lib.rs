//! Tether - bidirectional value bridge between Rust and an embedded scripting realm
//!
//! Host values (scalars, byte sequences, sequences, mappings, records,
//! functions and interface values) are exposed to foreign code as native
//! foreign values, and foreign values come back as [`HostValue`]s. Foreign
//! callables can be bound to typed host functions.
//!
//! # Architecture
//!
//! ```text
//! Bridge (bootstrap: globals, eval, JSON, registration)
//!   └─ Converter (realm + options)
//!        ├─ classify        Value Classifier
//!        ├─ convert         Host→Foreign / Foreign→Host
//!        ├─ project         Struct and Interface Projectors
//!        └─ wrap            Function Wrappers (both directions)
//! ```
//!
//! The foreign side is abstracted by [`tether_sdk::Realm`]; [`MemoryRealm`]
//! is an in-process implementation.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use tether::{Bridge, HostFunction, HostValue, MemoryRealm};
//!
//! let realm = Rc::new(MemoryRealm::new());
//! let bridge = Bridge::new(realm.clone())?;
//! bridge.make_func("add", HostFunction::typed("add", |(a, b): (i64, i64)| a + b))?;
//! let sum = bridge.call_func("add", &[HostValue::Int(2), HostValue::Int(3)])?;
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod classify;
pub mod convert;
pub mod host;
pub mod options;
pub mod project;
pub mod wrap;

pub use bridge::Bridge;
pub use classify::{classify_foreign, classify_host, ForeignStrategy, HostStrategy};
pub use convert::{to_foreign, to_host, Converter};
pub use host::{
    Bytes, FieldValue, FromHost, HostError, HostFunction, HostKind, HostOutcome, HostParams, HostResults, HostReturn,
    HostType, HostValue, InterfaceValue, IntoHost, OpaqueValue, Owned, Pointer, Record, RecordRef, RecordType,
    RecordValue, Rest, Shared, Signature,
};
pub use options::{BridgeOptions, CallErrorMode};
pub use project::{lower_first, ProjectedObject};
pub use wrap::TypedFn;

pub use tether_sdk::{BridgeError, BridgeResult, ForeignType, ForeignValue, MemoryRealm, Realm};
