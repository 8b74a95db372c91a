//! Bridge - bootstrap and global registry
//!
//! Owns a realm and the root handles fetched from it once at startup (the
//! global object, `JSON` and `eval`). Every entry point converts through a
//! [`Converter`] built from those roots and the bridge options; nothing is
//! looked up ambiently.

use std::rc::Rc;

use tether_sdk::{BridgeError, BridgeResult, ForeignType, ForeignValue, Realm};
use tracing::debug;

use crate::convert::Converter;
use crate::host::{HostFunction, HostParams, HostResults, HostValue, Pointer};
use crate::options::BridgeOptions;
use crate::wrap::TypedFn;

/// Root handles of a realm.
#[derive(Debug, Clone, Copy)]
struct Roots {
    global: ForeignValue,
    json: ForeignValue,
    eval: ForeignValue,
}

impl Roots {
    fn capture(realm: &dyn Realm) -> BridgeResult<Self> {
        let global = realm.global();
        let json = realm.get_property(global, "JSON")?;
        if realm.type_of(json) != ForeignType::Object {
            return Err(BridgeError::Unsupported("realm has no JSON object".to_string()));
        }
        let eval = realm.get_property(global, "eval")?;
        if !realm.is_function(eval) {
            return Err(BridgeError::Unsupported("realm has no eval function".to_string()));
        }
        Ok(Self { global, json, eval })
    }
}

/// Entry point for host code: registers values in a realm and evaluates scripts.
pub struct Bridge {
    realm: Rc<dyn Realm>,
    roots: Roots,
    options: BridgeOptions,
}

impl Bridge {
    /// Create a bridge with default options
    pub fn new(realm: Rc<dyn Realm>) -> BridgeResult<Self> {
        Self::with_options(realm, BridgeOptions::default())
    }

    /// Create a bridge with explicit options
    pub fn with_options(realm: Rc<dyn Realm>, options: BridgeOptions) -> BridgeResult<Self> {
        let roots = Roots::capture(&*realm)?;
        debug!(?options, "bridge initialised");
        Ok(Self { realm, roots, options })
    }

    /// The realm this bridge drives
    pub fn realm(&self) -> &dyn Realm {
        &*self.realm
    }

    /// Bridge options
    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    /// Conversion context for this bridge's realm
    pub fn converter(&self) -> Converter<'_> {
        Converter::new(&*self.realm, self.options)
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Inject `vars` as globals, evaluate `script` and decode the result
    pub fn eval<K: AsRef<str>>(
        &self,
        script: &str,
        vars: impl IntoIterator<Item = (K, HostValue)>,
    ) -> BridgeResult<HostValue> {
        self.set_globals(vars)?;
        let conv = self.converter();
        let source = self.realm.create_string(script);
        let result = self.realm.call(self.roots.eval, ForeignValue::Undefined, &[source])?;
        conv.to_host(result)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Project a record (by value or pointer) under a global name
    pub fn bind_object(&self, name: &str, value: &HostValue) -> BridgeResult<()> {
        match value {
            HostValue::Record(_) | HostValue::Pointer(Pointer::Record(_)) => {}
            other => {
                return Err(BridgeError::Signature(format!(
                    "'{}' must be a record or a pointer to a record, got {}",
                    name,
                    other.kind_name()
                )))
            }
        }
        let conv = self.converter();
        let obj = conv.project_struct(value)?.into_foreign(&*self.realm)?;
        debug!(name, "bound object");
        self.realm.set_property(self.roots.global, name, obj)
    }

    /// Fill `slot` with a host-callable wrapper of the global function `name`
    pub fn bind_func<A, R>(&self, name: &str, slot: &mut Option<TypedFn<A, R>>) -> BridgeResult<()>
    where
        A: HostParams,
        R: HostResults,
    {
        let callee = self.realm.get_property(self.roots.global, name)?;
        if !self.realm.is_function(callee) {
            return Err(BridgeError::Signature(format!(
                "global '{}' is not a function ({})",
                name,
                self.realm.type_of(callee)
            )));
        }
        TypedFn::bind_into(&self.converter(), callee, slot)?;
        debug!(name, signature = %TypedFn::<A, R>::signature(), "bound foreign function");
        Ok(())
    }

    /// Expose a host function as a global function
    pub fn make_func(&self, name: &str, function: HostFunction) -> BridgeResult<()> {
        debug!(name, signature = %function.signature(), "registered host function");
        let f = self.converter().host_function_to_foreign(function);
        self.realm.set_property(self.roots.global, name, f)
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Set globals; entries with an empty name are skipped
    pub fn set_globals<K: AsRef<str>>(&self, vars: impl IntoIterator<Item = (K, HostValue)>) -> BridgeResult<()> {
        let conv = self.converter();
        for (name, value) in vars {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            let v = conv.to_foreign(&value)?;
            self.realm.set_property(self.roots.global, name, v)?;
        }
        Ok(())
    }

    /// Read and decode a global
    pub fn get_global(&self, name: &str) -> BridgeResult<HostValue> {
        let v = self.realm.get_property(self.roots.global, name)?;
        self.converter().to_host(v)
    }

    /// Set a global to a plain object built from `entries`
    pub fn set_global_object<K: AsRef<str>>(
        &self,
        name: &str,
        entries: impl IntoIterator<Item = (K, HostValue)>,
    ) -> BridgeResult<()> {
        if name.is_empty() {
            return Err(BridgeError::Signature("global object name expected".to_string()));
        }
        let conv = self.converter();
        let obj = self.realm.create_object();
        for (key, value) in entries {
            let key = key.as_ref();
            if key.is_empty() {
                continue;
            }
            self.realm.set_property(obj, key, conv.to_foreign(&value)?)?;
        }
        self.realm.set_property(self.roots.global, name, obj)
    }

    // ========================================================================
    // JSON
    // ========================================================================

    /// Serialise a host value with the realm's `JSON.stringify`; `None` when
    /// the value has no JSON form
    pub fn json_stringify(&self, value: &HostValue) -> BridgeResult<Option<String>> {
        let conv = self.converter();
        let stringify = self.realm.get_property(self.roots.json, "stringify")?;
        let arg = conv.to_foreign(value)?;
        let text = self.realm.call(stringify, self.roots.json, &[arg])?;
        match self.realm.type_of(text) {
            ForeignType::String => Ok(Some(self.realm.read_string(text)?)),
            _ => Ok(None),
        }
    }

    /// Parse text with the realm's `JSON.parse` and decode it
    pub fn json_parse(&self, text: &str) -> BridgeResult<HostValue> {
        let parse = self.realm.get_property(self.roots.json, "parse")?;
        let arg = self.realm.create_string(text);
        let value = self.realm.call(parse, self.roots.json, &[arg])?;
        self.converter().to_host(value)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a global function; `undefined` when the global is not a function
    pub fn call_func(&self, name: &str, args: &[HostValue]) -> BridgeResult<ForeignValue> {
        let f = self.realm.get_property(self.roots.global, name)?;
        if !self.realm.is_function(f) {
            return Ok(ForeignValue::Undefined);
        }
        let args = self.encode(args)?;
        self.realm.call(f, ForeignValue::Undefined, &args)
    }

    /// Call a method of a global object; `undefined` when the object is missing or falsy
    pub fn call_object_method(&self, object: &str, method: &str, args: &[HostValue]) -> BridgeResult<ForeignValue> {
        let obj = self.realm.get_property(self.roots.global, object)?;
        if !self.realm.truthy(obj) {
            return Ok(ForeignValue::Undefined);
        }
        let m = self.realm.get_property(obj, method)?;
        let args = self.encode(args)?;
        self.realm.call(m, obj, &args)
    }

    fn encode(&self, args: &[HostValue]) -> BridgeResult<Vec<ForeignValue>> {
        let conv = self.converter();
        args.iter().map(|a| conv.to_foreign(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_sdk::MemoryRealm;

    fn bridge() -> (Rc<MemoryRealm>, Bridge) {
        let realm = Rc::new(MemoryRealm::new());
        let bridge = Bridge::new(realm.clone()).unwrap();
        (realm, bridge)
    }

    #[test]
    fn test_globals_roundtrip() {
        let (_realm, bridge) = bridge();
        bridge
            .set_globals([("n", HostValue::Int(2)), ("", HostValue::Int(9))])
            .unwrap();
        assert_eq!(bridge.get_global("n").unwrap(), HostValue::Float(2.0));
        assert_eq!(bridge.get_global("").unwrap(), HostValue::Nil);
    }

    #[test]
    fn test_set_global_object_requires_name() {
        let (_realm, bridge) = bridge();
        let err = bridge
            .set_global_object("", Vec::<(String, HostValue)>::new())
            .unwrap_err();
        assert!(matches!(err, BridgeError::Signature(_)));
    }

    #[test]
    fn test_set_global_object_empty() {
        let (_realm, bridge) = bridge();
        bridge
            .set_global_object("cfg", Vec::<(String, HostValue)>::new())
            .unwrap();
        assert_eq!(bridge.get_global("cfg").unwrap(), HostValue::Map(vec![]));
    }

    #[test]
    fn test_json_helpers() {
        let (_realm, bridge) = bridge();
        let text = bridge
            .json_stringify(&HostValue::Seq(vec![HostValue::Int(1), HostValue::Bool(true)]))
            .unwrap();
        assert_eq!(text.as_deref(), Some("[1,true]"));
        assert_eq!(bridge.json_stringify(&HostValue::Nil).unwrap(), None);
        assert_eq!(
            bridge.json_parse("[1.5]").unwrap(),
            HostValue::Seq(vec![HostValue::Float(1.5)])
        );
    }

    #[test]
    fn test_call_func_missing_is_undefined() {
        let (_realm, bridge) = bridge();
        assert_eq!(bridge.call_func("nope", &[]).unwrap(), ForeignValue::Undefined);
        assert_eq!(
            bridge.call_object_method("nothing", "m", &[]).unwrap(),
            ForeignValue::Undefined
        );
    }

    #[test]
    fn test_bind_object_rejects_scalars() {
        let (_realm, bridge) = bridge();
        let err = bridge.bind_object("x", &HostValue::Int(1)).unwrap_err();
        assert!(matches!(err, BridgeError::Signature(_)));
    }

    #[test]
    fn test_bind_func_requires_function() {
        let (_realm, bridge) = bridge();
        bridge.set_globals([("notfn", HostValue::Int(1))]).unwrap();
        let mut slot: Option<TypedFn<(i64,), i64>> = None;
        let err = bridge.bind_func("notfn", &mut slot).unwrap_err();
        assert!(matches!(err, BridgeError::Signature(_)));
        assert!(slot.is_none());
    }
}
