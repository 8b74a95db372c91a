//! Host→Foreign and Foreign→Host converters
//!
//! [`Converter`] is the conversion context: the realm whose values are being
//! produced or read, plus the bridge options. It carries no other state, so
//! two conversions of the same value are always independent.

use serde_json::Value as Json;
use tether_sdk::{BridgeError, BridgeResult, ForeignValue, Realm};
use tracing::trace;

use crate::classify::{classify_foreign, classify_host, ForeignStrategy, HostStrategy};
use crate::host::{HostValue, Pointer};
use crate::options::BridgeOptions;

/// Conversion context bound to one realm.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    realm: &'a dyn Realm,
    options: BridgeOptions,
}

impl<'a> Converter<'a> {
    /// Create a converter for a realm
    pub fn new(realm: &'a dyn Realm, options: BridgeOptions) -> Self {
        Self { realm, options }
    }

    /// The realm values are converted into and out of
    pub fn realm(&self) -> &'a dyn Realm {
        self.realm
    }

    /// Bridge options
    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    // ========================================================================
    // Host → Foreign
    // ========================================================================

    /// Convert a host value into a foreign value
    pub fn to_foreign(&self, value: &HostValue) -> BridgeResult<ForeignValue> {
        let realm = self.realm;
        Ok(match classify_host(value) {
            HostStrategy::Undefined => ForeignValue::Undefined,
            HostStrategy::Scalar => match value {
                HostValue::Bool(b) => ForeignValue::Boolean(*b),
                HostValue::Int(i) => ForeignValue::Number(*i as f64),
                HostValue::Uint(u) => ForeignValue::Number(*u as f64),
                HostValue::Float(f) => ForeignValue::Number(*f),
                HostValue::Str(s) => realm.create_string(s),
                _ => ForeignValue::Null,
            },
            HostStrategy::Bytes => match value {
                HostValue::Bytes(b) => realm.create_string(&String::from_utf8_lossy(b)),
                _ => ForeignValue::Null,
            },
            HostStrategy::Passthrough => match value {
                HostValue::Foreign(v) => *v,
                _ => ForeignValue::Null,
            },
            HostStrategy::Sequence => match value {
                HostValue::Seq(items) => {
                    let items = items
                        .iter()
                        .map(|item| self.to_foreign(item))
                        .collect::<BridgeResult<Vec<_>>>()?;
                    realm.create_array(&items)
                }
                _ => ForeignValue::Null,
            },
            HostStrategy::Mapping => match value {
                HostValue::Map(entries) => {
                    let obj = realm.create_object();
                    for (k, v) in entries {
                        let key = realm.to_property_key(self.to_foreign(k)?)?;
                        realm.set_property(obj, &key, self.to_foreign(v)?)?;
                    }
                    obj
                }
                _ => ForeignValue::Null,
            },
            HostStrategy::Struct => self.project_struct(value)?.into_foreign(realm)?,
            HostStrategy::Deref => match value {
                HostValue::Pointer(Pointer::Value(cell)) => {
                    let inner = cell
                        .try_borrow()
                        .map_err(|_| BridgeError::Borrowed("pointer".to_string()))?
                        .clone();
                    self.to_foreign(&inner)?
                }
                _ => ForeignValue::Null,
            },
            HostStrategy::Function => match value {
                HostValue::Func(f) => self.host_function_to_foreign(f.clone()),
                _ => ForeignValue::Null,
            },
            HostStrategy::Interface => match value {
                HostValue::Interface(iface) => self.project_interface(iface).into_foreign(realm)?,
                _ => ForeignValue::Null,
            },
            HostStrategy::Unsupported => {
                trace!(kind = value.kind_name(), "unsupported host kind converted to null");
                ForeignValue::Null
            }
        })
    }

    // ========================================================================
    // Foreign → Host
    // ========================================================================

    /// Convert a foreign value into a host value
    pub fn to_host(&self, value: ForeignValue) -> BridgeResult<HostValue> {
        let realm = self.realm;
        Ok(match classify_foreign(realm, value) {
            ForeignStrategy::Nil => HostValue::Nil,
            ForeignStrategy::Boolean => HostValue::Bool(value.as_bool().unwrap_or(false)),
            ForeignStrategy::Number => HostValue::Float(value.as_number().unwrap_or(f64::NAN)),
            ForeignStrategy::String => HostValue::Str(realm.read_string(value)?),
            ForeignStrategy::Array => {
                let len = realm.array_len(value)?;
                let mut items = Vec::with_capacity(len);
                for i in 0..len {
                    items.push(self.to_host(realm.array_get(value, i)?)?);
                }
                HostValue::Seq(items)
            }
            ForeignStrategy::Structural => self.decode_structural(value)?,
            ForeignStrategy::Callable => HostValue::Foreign(value),
        })
    }

    /// Plain object → string-keyed map, through stringify and parse
    fn decode_structural(&self, value: ForeignValue) -> BridgeResult<HostValue> {
        let text = match self.realm.json_stringify(value)? {
            Some(text) => text,
            None => return Ok(HostValue::Map(Vec::new())),
        };
        trace!(len = text.len(), "structural decode");
        match serde_json::from_str::<Json>(&text)? {
            Json::Object(map) => Ok(HostValue::Map(
                map.into_iter()
                    .map(|(k, v)| (HostValue::Str(k), json_to_host(v)))
                    .collect(),
            )),
            _ => Ok(HostValue::Map(Vec::new())),
        }
    }
}

fn json_to_host(json: Json) -> HostValue {
    match json {
        Json::Null => HostValue::Nil,
        Json::Bool(b) => HostValue::Bool(b),
        Json::Number(n) => HostValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => HostValue::Str(s),
        Json::Array(items) => HostValue::Seq(items.into_iter().map(json_to_host).collect()),
        Json::Object(map) => HostValue::Map(
            map.into_iter()
                .map(|(k, v)| (HostValue::Str(k), json_to_host(v)))
                .collect(),
        ),
    }
}

/// Convert a host value with default options
pub fn to_foreign(realm: &dyn Realm, value: &HostValue) -> BridgeResult<ForeignValue> {
    Converter::new(realm, BridgeOptions::default()).to_foreign(value)
}

/// Convert a foreign value with default options
pub fn to_host(realm: &dyn Realm, value: ForeignValue) -> BridgeResult<HostValue> {
    Converter::new(realm, BridgeOptions::default()).to_host(value)
}
