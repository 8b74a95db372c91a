//! Coercion of host values into declared host types
//!
//! Applied to every decoded argument of a wrapped host function, and by
//! [`FromHost`](super::FromHost) implementations. Rules:
//!
//! - `Nil` becomes the zero value of the declared type
//! - integers and floats interconvert; float to integer truncates, negative
//!   values never become unsigned, and an integer that does not fit the
//!   declared width is a mismatch
//! - strings and byte sequences interconvert
//! - sequences and mappings coerce element-wise
//! - a record by value and a shared record of the same type interconvert
//!   (pointer to value copies, value to pointer promotes a fresh copy)
//! - a foreign callable becomes a host function when a converter is at hand

use tether_sdk::{BridgeError, BridgeResult};

use super::types::HostType;
use super::{HostValue, Pointer};
use crate::convert::Converter;

/// Coerce without a realm; foreign callables cannot be wrapped.
pub fn convert(value: HostValue, ty: &HostType) -> BridgeResult<HostValue> {
    coerce(value, ty, None)
}

fn mismatch(ty: &HostType, value: &HostValue) -> BridgeError {
    BridgeError::mismatch(ty.to_string(), value.kind_name())
}

pub(crate) fn coerce(value: HostValue, ty: &HostType, conv: Option<&Converter<'_>>) -> BridgeResult<HostValue> {
    if matches!(value, HostValue::Nil) {
        return Ok(ty.zero_value());
    }

    match ty {
        HostType::Any => Ok(value),
        HostType::Optional(inner) => coerce(value, inner, conv),

        HostType::Bool => match value {
            HostValue::Bool(_) => Ok(value),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Int => match value {
            HostValue::Int(_) => Ok(value),
            HostValue::Uint(u) => i64::try_from(u)
                .map(HostValue::Int)
                .map_err(|_| BridgeError::mismatch("int", format!("uint {}", u))),
            HostValue::Float(f) => Ok(HostValue::Int(f as i64)),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Uint => match value {
            HostValue::Uint(_) => Ok(value),
            HostValue::Int(i) if i >= 0 => Ok(HostValue::Uint(i as u64)),
            HostValue::Float(f) if f >= 0.0 => Ok(HostValue::Uint(f as u64)),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Float => match value {
            HostValue::Float(_) => Ok(value),
            HostValue::Int(i) => Ok(HostValue::Float(i as f64)),
            HostValue::Uint(u) => Ok(HostValue::Float(u as f64)),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Str => match value {
            HostValue::Str(_) => Ok(value),
            HostValue::Bytes(b) => Ok(HostValue::Str(String::from_utf8_lossy(&b).into_owned())),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Bytes => match value {
            HostValue::Bytes(_) => Ok(value),
            HostValue::Str(s) => Ok(HostValue::Bytes(s.into_bytes())),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Seq(elem) | HostType::Rest(elem) => match value {
            HostValue::Seq(items) => items
                .into_iter()
                .map(|item| coerce(item, elem, conv))
                .collect::<BridgeResult<Vec<_>>>()
                .map(HostValue::Seq),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Map(key_ty, value_ty) => match value {
            HostValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((coerce(k, key_ty, conv)?, coerce(v, value_ty, conv)?)))
                .collect::<BridgeResult<Vec<_>>>()
                .map(HostValue::Map),
            other => Err(mismatch(ty, &other)),
        },

        HostType::Record(name) => match value {
            HostValue::Record(ref r) if r.type_name() == *name => Ok(value),
            HostValue::Pointer(Pointer::Record(ref r)) if r.type_name() == *name => {
                Ok(HostValue::Record(r.snapshot()?))
            }
            other => Err(mismatch(ty, &other)),
        },

        HostType::Pointer(name) => match value {
            HostValue::Pointer(Pointer::Record(ref r)) if r.type_name() == *name => Ok(value),
            HostValue::Pointer(Pointer::Nil) => Ok(value),
            HostValue::Record(ref r) if r.type_name() == *name => {
                Ok(HostValue::Pointer(Pointer::Record(r.promote()?)))
            }
            other => Err(mismatch(ty, &other)),
        },

        HostType::Func(sig) => match value {
            HostValue::Func(_) => Ok(value),
            HostValue::Foreign(callee) => match conv {
                Some(conv) => conv
                    .wrap_foreign_function((**sig).clone(), callee)
                    .map(HostValue::Func),
                None => Err(BridgeError::mismatch(ty.to_string(), "foreign (no realm to wrap it)")),
            },
            other => Err(mismatch(ty, &other)),
        },

        HostType::Foreign => match value {
            HostValue::Foreign(_) => Ok(value),
            other => Err(mismatch(ty, &other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_is_zero_value() {
        assert_eq!(convert(HostValue::Nil, &HostType::Int).unwrap(), HostValue::Int(0));
        assert_eq!(convert(HostValue::Nil, &HostType::Bool).unwrap(), HostValue::Bool(false));
        assert_eq!(convert(HostValue::Nil, &HostType::Any).unwrap(), HostValue::Nil);
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(convert(HostValue::Float(-2.7), &HostType::Int).unwrap(), HostValue::Int(-2));
        assert_eq!(convert(HostValue::Int(4), &HostType::Float).unwrap(), HostValue::Float(4.0));
        assert!(convert(HostValue::Float(-1.0), &HostType::Uint).is_err());
        assert!(convert(HostValue::Str("1".into()), &HostType::Int).is_err());
    }

    #[test]
    fn test_unsigned_overflowing_int_is_mismatch() {
        assert_eq!(convert(HostValue::Uint(7), &HostType::Int).unwrap(), HostValue::Int(7));
        let err = convert(HostValue::Uint(u64::MAX), &HostType::Int).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_string_bytes() {
        assert_eq!(
            convert(HostValue::Str("hi".into()), &HostType::Bytes).unwrap(),
            HostValue::Bytes(b"hi".to_vec())
        );
        assert_eq!(
            convert(HostValue::Bytes(b"hi".to_vec()), &HostType::Str).unwrap(),
            HostValue::Str("hi".into())
        );
    }

    #[test]
    fn test_nested_sequence() {
        let ty = HostType::Seq(Box::new(HostType::Int));
        let value = HostValue::Seq(vec![HostValue::Float(1.0), HostValue::Nil]);
        assert_eq!(
            convert(value, &ty).unwrap(),
            HostValue::Seq(vec![HostValue::Int(1), HostValue::Int(0)])
        );
    }

    #[test]
    fn test_foreign_callable_needs_converter() {
        let ty = HostType::Func(std::rc::Rc::new(super::super::Signature::dynamic()));
        let err = convert(HostValue::Foreign(tether_sdk::ForeignValue::Null), &ty).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
    }
}
