//! MemoryRealm - in-process reference implementation of [`Realm`]
//!
//! A small object model with the shape the bridge expects from an embedded
//! scripting environment: strings, symbols, arrays, insertion-ordered plain
//! objects and native functions, a global object carrying `JSON`, `Array`,
//! `Object` and `eval`, and a JSON facility.
//!
//! There is no script engine inside. Source evaluation is delegated to an
//! evaluator hook installed with [`MemoryRealm::set_evaluator`]; foreign
//! functions are native callbacks created with [`Realm::create_function`].

mod heap;
mod json;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{BridgeError, BridgeResult};
use crate::realm::{NativeCallback, Realm};
use crate::value::{ForeignType, ForeignValue, Handle};

use self::heap::{Heap, HeapCell, Properties};

/// Source evaluator used by [`Realm::eval`]
pub type Evaluator = Rc<dyn Fn(&dyn Realm, &str) -> BridgeResult<ForeignValue>>;

/// Arena-backed realm for embedding and tests.
pub struct MemoryRealm {
    heap: RefCell<Heap>,
    global: ForeignValue,
    evaluator: RefCell<Option<Evaluator>>,
}

impl MemoryRealm {
    /// Create a realm with its global object and built-in roots installed
    pub fn new() -> Self {
        let mut heap = Heap::default();
        let global = heap.alloc(HeapCell::Object(Properties::default()));
        let realm = Self {
            heap: RefCell::new(heap),
            global,
            evaluator: RefCell::new(None),
        };
        realm.install_builtins();
        realm
    }

    /// Install the hook that evaluates source text
    pub fn set_evaluator(&self, evaluator: impl Fn(&dyn Realm, &str) -> BridgeResult<ForeignValue> + 'static) {
        *self.evaluator.borrow_mut() = Some(Rc::new(evaluator));
    }

    /// Number of allocated heap cells
    pub fn heap_size(&self) -> usize {
        self.heap.borrow().len()
    }

    /// Name a function was created with
    pub fn function_name(&self, value: ForeignValue) -> Option<String> {
        let handle = value.as_handle()?;
        match self.heap.borrow().get(handle).ok()? {
            HeapCell::Function { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    fn handle_of(value: ForeignValue, what: &str) -> BridgeResult<Handle> {
        value
            .as_handle()
            .ok_or_else(|| BridgeError::mismatch(what, primitive_name(value)))
    }

    fn install_builtins(&self) {
        let json = self.create_object();
        self.define(json, "stringify", |realm, _this, args| {
            let value = args.first().copied().unwrap_or_default();
            Ok(match realm.json_stringify(value)? {
                Some(text) => realm.create_string(&text),
                None => ForeignValue::Undefined,
            })
        });
        self.define(json, "parse", |realm, _this, args| {
            let text = realm.read_string(args.first().copied().unwrap_or_default())?;
            realm.json_parse(&text)
        });
        self.set_global("JSON", json);

        let array = self.create_function("Array", Rc::new(|realm, _this, args| Ok(realm.create_array(args))));
        self.define(array, "isArray", |realm, _this, args| {
            Ok(ForeignValue::Boolean(
                args.first().map(|v| realm.is_array(*v)).unwrap_or(false),
            ))
        });
        self.set_global("Array", array);

        let object = self.create_function("Object", Rc::new(|realm, _this, _args| Ok(realm.create_object())));
        self.define(object, "keys", |realm, _this, args| {
            let target = args.first().copied().unwrap_or_default();
            let keys: Vec<ForeignValue> = realm
                .property_keys(target)?
                .iter()
                .map(|k| realm.create_string(k))
                .collect();
            Ok(realm.create_array(&keys))
        });
        self.set_global("Object", object);

        let eval = self.create_function(
            "eval",
            Rc::new(|realm, _this, args| match args.first() {
                Some(source) if realm.type_of(*source) == ForeignType::String => {
                    realm.eval(&realm.read_string(*source)?)
                }
                Some(other) => Ok(*other),
                None => Ok(ForeignValue::Undefined),
            }),
        );
        self.set_global("eval", eval);
    }

    fn define(
        &self,
        target: ForeignValue,
        name: &str,
        callback: impl Fn(&dyn Realm, ForeignValue, &[ForeignValue]) -> BridgeResult<ForeignValue> + 'static,
    ) {
        let function = self.create_function(name, Rc::new(callback));
        // Built-in roots are objects or functions; both accept properties
        let _ = self.set_property(target, name, function);
    }

    fn set_global(&self, name: &str, value: ForeignValue) {
        let _ = self.set_property(self.global, name, value);
    }
}

impl Default for MemoryRealm {
    fn default() -> Self {
        Self::new()
    }
}

fn primitive_name(value: ForeignValue) -> &'static str {
    match value {
        ForeignValue::Undefined => "undefined",
        ForeignValue::Null => "null",
        ForeignValue::Boolean(_) => "boolean",
        ForeignValue::Number(_) => "number",
        ForeignValue::Ref(_) => "reference",
    }
}

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

impl Realm for MemoryRealm {
    fn global(&self) -> ForeignValue {
        self.global
    }

    fn type_of(&self, value: ForeignValue) -> ForeignType {
        match value {
            ForeignValue::Undefined => ForeignType::Undefined,
            ForeignValue::Null => ForeignType::Null,
            ForeignValue::Boolean(_) => ForeignType::Boolean,
            ForeignValue::Number(_) => ForeignType::Number,
            ForeignValue::Ref(handle) => self
                .heap
                .borrow()
                .get(handle)
                .map(HeapCell::foreign_type)
                .unwrap_or(ForeignType::Undefined),
        }
    }

    fn is_array(&self, value: ForeignValue) -> bool {
        match value {
            ForeignValue::Ref(handle) => matches!(self.heap.borrow().get(handle), Ok(HeapCell::Array(_))),
            _ => false,
        }
    }

    fn create_string(&self, s: &str) -> ForeignValue {
        self.heap.borrow_mut().alloc(HeapCell::String(Rc::from(s)))
    }

    fn create_symbol(&self, description: &str) -> ForeignValue {
        self.heap.borrow_mut().alloc(HeapCell::Symbol(description.to_string()))
    }

    fn create_array(&self, items: &[ForeignValue]) -> ForeignValue {
        self.heap.borrow_mut().alloc(HeapCell::Array(items.to_vec()))
    }

    fn create_object(&self) -> ForeignValue {
        self.heap.borrow_mut().alloc(HeapCell::Object(Properties::default()))
    }

    fn create_function(&self, name: &str, callback: NativeCallback) -> ForeignValue {
        self.heap.borrow_mut().alloc(HeapCell::Function {
            name: name.to_string(),
            callback,
            properties: Properties::default(),
        })
    }

    fn read_string(&self, value: ForeignValue) -> BridgeResult<String> {
        let handle = Self::handle_of(value, "string")?;
        match self.heap.borrow().get(handle)? {
            HeapCell::String(s) => Ok(s.to_string()),
            HeapCell::Symbol(description) => Ok(format!("Symbol({})", description)),
            other => Err(BridgeError::mismatch("string", other.foreign_type().name())),
        }
    }

    fn array_len(&self, value: ForeignValue) -> BridgeResult<usize> {
        let handle = Self::handle_of(value, "array")?;
        match self.heap.borrow().get(handle)? {
            HeapCell::Array(items) => Ok(items.len()),
            other => Err(BridgeError::mismatch("array", other.foreign_type().name())),
        }
    }

    fn array_get(&self, value: ForeignValue, index: usize) -> BridgeResult<ForeignValue> {
        let handle = Self::handle_of(value, "array")?;
        match self.heap.borrow().get(handle)? {
            HeapCell::Array(items) => Ok(items.get(index).copied().unwrap_or_default()),
            other => Err(BridgeError::mismatch("array", other.foreign_type().name())),
        }
    }

    fn get_property(&self, target: ForeignValue, key: &str) -> BridgeResult<ForeignValue> {
        let handle = match target {
            ForeignValue::Undefined | ForeignValue::Null => {
                return Err(BridgeError::Thrown(format!(
                    "Cannot read property '{}' of {}",
                    key,
                    primitive_name(target)
                )))
            }
            ForeignValue::Boolean(_) | ForeignValue::Number(_) => return Ok(ForeignValue::Undefined),
            ForeignValue::Ref(handle) => handle,
        };
        let heap = self.heap.borrow();
        Ok(match heap.get(handle)? {
            HeapCell::Object(props) | HeapCell::Function { properties: props, .. } => {
                props.get(key).unwrap_or_default()
            }
            HeapCell::Array(items) => match key {
                "length" => ForeignValue::Number(items.len() as f64),
                _ => parse_index(key)
                    .and_then(|i| items.get(i).copied())
                    .unwrap_or_default(),
            },
            HeapCell::String(s) if key == "length" => ForeignValue::Number(s.encode_utf16().count() as f64),
            HeapCell::String(_) | HeapCell::Symbol(_) => ForeignValue::Undefined,
        })
    }

    fn set_property(&self, target: ForeignValue, key: &str, value: ForeignValue) -> BridgeResult<()> {
        let handle = Self::handle_of(target, "object")?;
        let mut heap = self.heap.borrow_mut();
        match heap.get_mut(handle)? {
            HeapCell::Object(props) | HeapCell::Function { properties: props, .. } => {
                props.set(key, value);
                Ok(())
            }
            HeapCell::Array(items) => {
                let index = parse_index(key).ok_or_else(|| {
                    BridgeError::Unsupported(format!("named property '{}' on array", key))
                })?;
                if index >= items.len() {
                    items.resize(index + 1, ForeignValue::Undefined);
                }
                items[index] = value;
                Ok(())
            }
            other => Err(BridgeError::mismatch("object", other.foreign_type().name())),
        }
    }

    fn property_keys(&self, target: ForeignValue) -> BridgeResult<Vec<String>> {
        let handle = match target.as_handle() {
            Some(handle) => handle,
            None => return Ok(Vec::new()),
        };
        Ok(match self.heap.borrow().get(handle)? {
            HeapCell::Object(props) | HeapCell::Function { properties: props, .. } => props.keys(),
            HeapCell::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            HeapCell::String(_) | HeapCell::Symbol(_) => Vec::new(),
        })
    }

    fn call(&self, callee: ForeignValue, this: ForeignValue, args: &[ForeignValue]) -> BridgeResult<ForeignValue> {
        // Clone the callback out; it may re-enter the realm
        let callback = match callee {
            ForeignValue::Ref(handle) => match self.heap.borrow().get(handle)? {
                HeapCell::Function { callback, .. } => Some(callback.clone()),
                _ => None,
            },
            _ => None,
        };
        match callback {
            Some(callback) => callback(self, this, args),
            None => Err(BridgeError::NotCallable(self.type_of(callee).name().to_string())),
        }
    }

    fn eval(&self, source: &str) -> BridgeResult<ForeignValue> {
        let evaluator = self.evaluator.borrow().clone();
        tracing::trace!(len = source.len(), "memory realm eval");
        match evaluator {
            Some(evaluator) => evaluator(self, source),
            None => Err(BridgeError::Unsupported(
                "eval: no evaluator installed".to_string(),
            )),
        }
    }

    fn json_stringify(&self, value: ForeignValue) -> BridgeResult<Option<String>> {
        json::stringify(self, value)
    }

    fn json_parse(&self, text: &str) -> BridgeResult<ForeignValue> {
        json::parse(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_of() {
        let realm = MemoryRealm::new();
        assert_eq!(realm.type_of(ForeignValue::Undefined), ForeignType::Undefined);
        assert_eq!(realm.type_of(ForeignValue::Number(1.0)), ForeignType::Number);
        assert_eq!(realm.type_of(realm.create_string("a")), ForeignType::String);
        assert_eq!(realm.type_of(realm.create_symbol("a")), ForeignType::Symbol);
        let arr = realm.create_array(&[]);
        assert_eq!(realm.type_of(arr), ForeignType::Object);
        assert!(realm.is_array(arr));
        assert!(!realm.is_array(realm.create_object()));
    }

    #[test]
    fn test_symbol_string_form() {
        let realm = MemoryRealm::new();
        let sym = realm.create_symbol("id");
        assert_eq!(realm.read_string(sym).unwrap(), "Symbol(id)");
    }

    #[test]
    fn test_array_properties() {
        let realm = MemoryRealm::new();
        let arr = realm.create_array(&[ForeignValue::Number(1.0)]);
        assert_eq!(realm.get_property(arr, "length").unwrap(), ForeignValue::Number(1.0));
        realm.set_property(arr, "2", ForeignValue::Boolean(true)).unwrap();
        assert_eq!(realm.array_len(arr).unwrap(), 3);
        assert_eq!(realm.array_get(arr, 1).unwrap(), ForeignValue::Undefined);
        assert_eq!(realm.array_get(arr, 2).unwrap(), ForeignValue::Boolean(true));
    }

    #[test]
    fn test_call_reenters_realm() {
        let realm = MemoryRealm::new();
        let make = realm.create_function(
            "make",
            Rc::new(|realm, _this, args| {
                let obj = realm.create_object();
                realm.set_property(obj, "v", args[0])?;
                Ok(obj)
            }),
        );
        let obj = realm.call(make, ForeignValue::Undefined, &[ForeignValue::Number(3.0)]).unwrap();
        assert_eq!(realm.get_property(obj, "v").unwrap(), ForeignValue::Number(3.0));
        assert_eq!(realm.function_name(make).as_deref(), Some("make"));
    }

    #[test]
    fn test_call_non_function() {
        let realm = MemoryRealm::new();
        let err = realm.call(ForeignValue::Number(1.0), ForeignValue::Undefined, &[]).unwrap_err();
        assert_eq!(err, BridgeError::NotCallable("number".to_string()));
    }

    #[test]
    fn test_builtin_json_roundtrip() {
        let realm = MemoryRealm::new();
        let json = realm.get_property(realm.global(), "JSON").unwrap();
        let parse = realm.get_property(json, "parse").unwrap();
        let stringify = realm.get_property(json, "stringify").unwrap();

        let text = realm.create_string(r#"[1,"a",null]"#);
        let value = realm.call(parse, json, &[text]).unwrap();
        assert!(realm.is_array(value));
        let back = realm.call(stringify, json, &[value]).unwrap();
        assert_eq!(realm.read_string(back).unwrap(), r#"[1,"a",null]"#);
    }

    #[test]
    fn test_builtin_array_is_array() {
        let realm = MemoryRealm::new();
        let array = realm.get_property(realm.global(), "Array").unwrap();
        let is_array = realm.get_property(array, "isArray").unwrap();
        let arr = realm.create_array(&[]);
        assert_eq!(realm.call(is_array, array, &[arr]).unwrap(), ForeignValue::Boolean(true));
        assert_eq!(
            realm.call(is_array, array, &[realm.create_object()]).unwrap(),
            ForeignValue::Boolean(false)
        );
    }

    #[test]
    fn test_eval_requires_evaluator() {
        let realm = MemoryRealm::new();
        assert!(matches!(realm.eval("1"), Err(BridgeError::Unsupported(_))));

        realm.set_evaluator(|realm, source| realm.get_property(realm.global(), source.trim()));
        let answer = realm.create_string("42");
        realm.set_property(realm.global(), "answer", answer).unwrap();
        let value = realm.eval(" answer ").unwrap();
        assert_eq!(realm.read_string(value).unwrap(), "42");
    }

    #[test]
    fn test_truthy_and_property_keys() {
        let realm = MemoryRealm::new();
        assert!(!realm.truthy(realm.create_string("")));
        assert!(realm.truthy(realm.create_object()));
        assert!(!realm.truthy(ForeignValue::Number(f64::NAN)));
        assert_eq!(realm.to_property_key(ForeignValue::Number(1.0)).unwrap(), "1");
        assert_eq!(realm.to_property_key(ForeignValue::Boolean(true)).unwrap(), "true");
        let arr = realm.create_array(&[ForeignValue::Number(1.0), ForeignValue::Null]);
        assert_eq!(realm.to_property_key(arr).unwrap(), "1,");
    }
}
