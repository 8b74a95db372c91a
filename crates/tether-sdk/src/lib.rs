//! Tether SDK - foreign-environment ABI for the Tether bridge
//!
//! This crate defines what the bridge needs from an embedded scripting
//! environment, independent of any particular engine:
//!
//! - [`ForeignValue`] / [`ForeignType`]: transient handles to values owned by
//!   the environment
//! - [`Realm`]: the environment's entry points (value creation, property
//!   access, calls, eval, JSON)
//! - [`NativeCallback`]: host code exposed as a foreign function
//! - [`BridgeError`] / [`BridgeResult`]: the shared error type
//! - [`MemoryRealm`]: an in-process reference realm
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{MemoryRealm, Realm, ForeignValue};
//!
//! let realm = MemoryRealm::new();
//! let obj = realm.create_object();
//! realm.set_property(obj, "n", ForeignValue::Number(1.0))?;
//! assert_eq!(realm.json_stringify(obj)?.as_deref(), Some(r#"{"n":1}"#));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod realm;
pub mod value;

pub use error::{BridgeError, BridgeResult};
pub use memory::{Evaluator, MemoryRealm};
pub use realm::{NativeCallback, Realm};
pub use value::{number_to_string, ForeignType, ForeignValue, Handle};
