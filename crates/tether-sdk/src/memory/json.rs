//! JSON facility of the reference realm
//!
//! Follows the environment's stringify rules:
//! - `undefined`, functions and symbols are dropped from objects and become
//!   `null` inside arrays; at the top level they produce no text
//! - NaN and infinities become `null`
//! - finite numbers print as `String(n)` does ([`number_to_string`])
//! - object keys keep insertion order
//! - circular structures are rejected

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Serializer, Value as Json};

use super::heap::HeapCell;
use super::MemoryRealm;
use crate::error::{BridgeError, BridgeResult};
use crate::realm::Realm;
use crate::value::{number_to_string, ForeignValue, Handle};

/// Compact output with the environment's number formatting.
struct NumberFormatter;

impl Formatter for NumberFormatter {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(number_to_string(value).as_bytes())
    }

    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        self.write_f64(writer, f64::from(value))
    }
}

pub(super) fn stringify(realm: &MemoryRealm, value: ForeignValue) -> BridgeResult<Option<String>> {
    let mut visiting = Vec::new();
    let json = match to_json(realm, value, &mut visiting)? {
        Some(json) => json,
        None => return Ok(None),
    };
    let mut out = Vec::new();
    json.serialize(&mut Serializer::with_formatter(&mut out, NumberFormatter))?;
    String::from_utf8(out)
        .map(Some)
        .map_err(|e| BridgeError::Json(e.to_string()))
}

pub(super) fn parse(realm: &MemoryRealm, text: &str) -> BridgeResult<ForeignValue> {
    let json: Json = serde_json::from_str(text)?;
    Ok(from_json(realm, &json))
}

fn number_json(n: f64) -> Json {
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

enum Composite {
    Array(Vec<ForeignValue>),
    Object(Vec<(String, ForeignValue)>),
}

fn to_json(realm: &MemoryRealm, value: ForeignValue, visiting: &mut Vec<Handle>) -> BridgeResult<Option<Json>> {
    let handle = match value {
        ForeignValue::Undefined => return Ok(None),
        ForeignValue::Null => return Ok(Some(Json::Null)),
        ForeignValue::Boolean(b) => return Ok(Some(Json::Bool(b))),
        ForeignValue::Number(n) => return Ok(Some(number_json(n))),
        ForeignValue::Ref(handle) => handle,
    };

    // Copy the composite out so nested lookups don't hold the heap borrow
    let composite = {
        let heap = realm.heap.borrow();
        match heap.get(handle)? {
            HeapCell::String(s) => return Ok(Some(Json::String(s.to_string()))),
            HeapCell::Symbol(_) | HeapCell::Function { .. } => return Ok(None),
            HeapCell::Array(items) => Composite::Array(items.clone()),
            HeapCell::Object(props) => Composite::Object(props.entries().to_vec()),
        }
    };

    if visiting.contains(&handle) {
        return Err(BridgeError::Json(
            "Converting circular structure to JSON".to_string(),
        ));
    }
    visiting.push(handle);

    let json = match composite {
        Composite::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(realm, item, visiting)?.unwrap_or(Json::Null));
            }
            Json::Array(out)
        }
        Composite::Object(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                if let Some(json) = to_json(realm, item, visiting)? {
                    out.insert(key, json);
                }
            }
            Json::Object(out)
        }
    };

    visiting.pop();
    Ok(Some(json))
}

fn from_json(realm: &MemoryRealm, json: &Json) -> ForeignValue {
    match json {
        Json::Null => ForeignValue::Null,
        Json::Bool(b) => ForeignValue::Boolean(*b),
        Json::Number(n) => ForeignValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => realm.create_string(s),
        Json::Array(items) => {
            let items: Vec<ForeignValue> = items.iter().map(|item| from_json(realm, item)).collect();
            realm.create_array(&items)
        }
        Json::Object(map) => {
            let obj = realm.create_object();
            for (key, item) in map {
                let value = from_json(realm, item);
                // A freshly created object always accepts properties
                let _ = realm.set_property(obj, key, value);
            }
            obj
        }
    }
}
