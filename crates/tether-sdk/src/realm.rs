//! Realm trait - abstract foreign-environment operations
//!
//! Defines the interface an embedded scripting environment implements so the
//! bridge can create, inspect and call its values. The bridge programs
//! against `&dyn Realm` only and never touches environment internals.
//!
//! A realm is single-threaded and reentrant: a native callback invoked from
//! [`Realm::call`] receives the same realm and may call back into it. Methods
//! therefore take `&self` and implementations use interior mutability.

use std::rc::Rc;

use crate::error::BridgeResult;
use crate::value::{number_to_string, ForeignType, ForeignValue};

/// Host code exposed as a foreign function.
///
/// Receives the realm it is invoked in, the `this` value and the argument
/// list. Returning an error makes the call throw on the foreign side.
pub type NativeCallback = Rc<dyn Fn(&dyn Realm, ForeignValue, &[ForeignValue]) -> BridgeResult<ForeignValue>>;

/// The foreign environment as seen by the bridge.
///
/// The root handles (global object and its `Array`, `Object`, `JSON` and
/// `eval` entries) are established once when the realm is created and reached
/// through [`Realm::global`].
pub trait Realm {
    // ========================================================================
    // Roots and type inspection
    // ========================================================================

    /// The global object
    fn global(&self) -> ForeignValue;

    /// Runtime type tag of a value
    fn type_of(&self, value: ForeignValue) -> ForeignType;

    /// Whether the value is an array instance
    fn is_array(&self, value: ForeignValue) -> bool;

    // ========================================================================
    // Value creation
    // ========================================================================

    /// Allocate a string
    fn create_string(&self, s: &str) -> ForeignValue;

    /// Allocate a fresh symbol with the given description
    fn create_symbol(&self, description: &str) -> ForeignValue;

    /// Allocate an array holding `items`
    fn create_array(&self, items: &[ForeignValue]) -> ForeignValue;

    /// Allocate an empty plain object
    fn create_object(&self) -> ForeignValue;

    /// Expose a native callback as a foreign function
    fn create_function(&self, name: &str, callback: NativeCallback) -> ForeignValue;

    // ========================================================================
    // Value reading
    // ========================================================================

    /// String form of a string or symbol value
    fn read_string(&self, value: ForeignValue) -> BridgeResult<String>;

    /// Array length
    fn array_len(&self, value: ForeignValue) -> BridgeResult<usize>;

    /// Array element (`undefined` past the end)
    fn array_get(&self, value: ForeignValue, index: usize) -> BridgeResult<ForeignValue>;

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read a property (`undefined` when missing)
    fn get_property(&self, target: ForeignValue, key: &str) -> BridgeResult<ForeignValue>;

    /// Write a property
    fn set_property(&self, target: ForeignValue, key: &str, value: ForeignValue) -> BridgeResult<()>;

    /// Own enumerable property keys in insertion order
    fn property_keys(&self, target: ForeignValue) -> BridgeResult<Vec<String>>;

    // ========================================================================
    // Execution
    // ========================================================================

    /// Call a function with an explicit `this`
    fn call(&self, callee: ForeignValue, this: ForeignValue, args: &[ForeignValue]) -> BridgeResult<ForeignValue>;

    /// Evaluate source text in the global scope
    fn eval(&self, source: &str) -> BridgeResult<ForeignValue>;

    // ========================================================================
    // JSON facility
    // ========================================================================

    /// `JSON.stringify`; `None` where the environment yields `undefined`
    fn json_stringify(&self, value: ForeignValue) -> BridgeResult<Option<String>>;

    /// `JSON.parse`
    fn json_parse(&self, text: &str) -> BridgeResult<ForeignValue>;

    // ========================================================================
    // Provided helpers
    // ========================================================================

    /// Whether the value is callable
    fn is_function(&self, value: ForeignValue) -> bool {
        self.type_of(value) == ForeignType::Function
    }

    /// Truthiness as used by conditionals
    fn truthy(&self, value: ForeignValue) -> bool {
        match value {
            ForeignValue::Undefined | ForeignValue::Null => false,
            ForeignValue::Boolean(b) => b,
            ForeignValue::Number(n) => n != 0.0 && !n.is_nan(),
            ForeignValue::Ref(_) => match self.type_of(value) {
                ForeignType::String => self.read_string(value).map(|s| !s.is_empty()).unwrap_or(false),
                _ => true,
            },
        }
    }

    /// Property key for a value (`String(value)`)
    fn to_property_key(&self, value: ForeignValue) -> BridgeResult<String> {
        Ok(match value {
            ForeignValue::Undefined => "undefined".to_string(),
            ForeignValue::Null => "null".to_string(),
            ForeignValue::Boolean(b) => b.to_string(),
            ForeignValue::Number(n) => number_to_string(n),
            ForeignValue::Ref(_) => match self.type_of(value) {
                ForeignType::String | ForeignType::Symbol => self.read_string(value)?,
                ForeignType::Function => "function".to_string(),
                _ if self.is_array(value) => {
                    let len = self.array_len(value)?;
                    let mut parts = Vec::with_capacity(len);
                    for i in 0..len {
                        let item = self.array_get(value, i)?;
                        parts.push(if item.is_nullish() {
                            String::new()
                        } else {
                            self.to_property_key(item)?
                        });
                    }
                    parts.join(",")
                }
                _ => "[object Object]".to_string(),
            },
        })
    }
}
