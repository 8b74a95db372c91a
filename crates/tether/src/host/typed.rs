//! Typed conversion traits
//!
//! Connect ordinary Rust types to [`HostValue`] and [`HostType`]:
//!
//! - [`HostKind`]: the declared type of a Rust type
//! - [`IntoHost`] / [`FromHost`]: value conversion in each direction
//! - [`HostParams`]: argument tuples of typed functions
//! - [`HostReturn`]: return values of host functions (`Result` marks the
//!   function fallible)
//! - [`HostResults`]: result tuples decoded from foreign calls

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use tether_sdk::{BridgeError, BridgeResult, ForeignValue};

use super::coercion::convert;
use super::function::{HostError, HostFunction, HostOutcome};
use super::types::{HostType, Signature};
use super::HostValue;

/// Declared host type of a Rust type.
pub trait HostKind {
    /// Type used for coercion and zero-filling
    fn host_type() -> HostType;
}

/// Conversion of a Rust value into a [`HostValue`].
pub trait IntoHost: HostKind {
    /// Convert into a host value
    fn into_host(self) -> HostValue;
}

/// Conversion of a [`HostValue`] into a Rust value.
pub trait FromHost: HostKind + Sized {
    /// Convert from a host value, coercing where the rules allow
    fn from_host(value: HostValue) -> BridgeResult<Self>;
}

/// Argument tuple of a typed function.
pub trait HostParams: Sized {
    /// Declared parameter types
    fn param_types() -> Vec<HostType>;
    /// Build the tuple from coerced arguments (missing ones read as `Nil`)
    fn from_args(args: Vec<HostValue>) -> BridgeResult<Self>;
    /// Flatten the tuple into host arguments
    fn into_args(self) -> Vec<HostValue>;
}

/// Return value of a host function.
pub trait HostReturn {
    /// Declared result types, error result excluded
    fn result_types() -> Vec<HostType>;
    /// Whether the return carries a trailing error
    fn fallible() -> bool {
        false
    }
    /// Split into the result tuple or the error result
    fn into_outcome(self) -> HostOutcome;
}

/// Result tuple decoded from a foreign call.
pub trait HostResults: Sized {
    /// Declared result types
    fn result_types() -> Vec<HostType>;
    /// Build from exactly `result_types().len()` host values
    fn from_results(values: Vec<HostValue>) -> BridgeResult<Self>;
}

fn unexpected(expected: &str, value: &HostValue) -> BridgeError {
    BridgeError::mismatch(expected, value.kind_name())
}

// ============================================================================
// Single-value returns
// ============================================================================

/// `HostReturn` items for a type that is a single result
macro_rules! single_return {
    () => {
        fn result_types() -> Vec<$crate::host::HostType> {
            vec![<Self as $crate::host::HostKind>::host_type()]
        }
        fn into_outcome(self) -> $crate::host::HostOutcome {
            Ok(vec![$crate::host::IntoHost::into_host(self)])
        }
    };
}

/// `HostResults` items for a type that is a single result
macro_rules! single_results {
    () => {
        fn result_types() -> Vec<$crate::host::HostType> {
            vec![<Self as $crate::host::HostKind>::host_type()]
        }
        fn from_results(values: Vec<$crate::host::HostValue>) -> tether_sdk::BridgeResult<Self> {
            <Self as $crate::host::FromHost>::from_host(values.into_iter().next().unwrap_or_default())
        }
    };
}

pub(crate) use single_results;
pub(crate) use single_return;

macro_rules! single_value {
    ($($ty:ty),* $(,)?) => {$(
        impl HostReturn for $ty {
            single_return!();
        }
        impl HostResults for $ty {
            single_results!();
        }
    )*};
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! int_kind {
    ($($ty:ty),*) => {$(
        impl HostKind for $ty {
            fn host_type() -> HostType {
                HostType::Int
            }
        }
        impl IntoHost for $ty {
            fn into_host(self) -> HostValue {
                HostValue::Int(self as i64)
            }
        }
        impl FromHost for $ty {
            fn from_host(value: HostValue) -> BridgeResult<Self> {
                match convert(value, &HostType::Int)? {
                    HostValue::Int(i) => <$ty>::try_from(i)
                        .map_err(|_| BridgeError::mismatch(stringify!($ty), format!("int {}", i))),
                    other => Err(unexpected("int", &other)),
                }
            }
        }
    )*};
}

macro_rules! uint_kind {
    ($($ty:ty),*) => {$(
        impl HostKind for $ty {
            fn host_type() -> HostType {
                HostType::Uint
            }
        }
        impl IntoHost for $ty {
            fn into_host(self) -> HostValue {
                HostValue::Uint(self as u64)
            }
        }
        impl FromHost for $ty {
            fn from_host(value: HostValue) -> BridgeResult<Self> {
                match convert(value, &HostType::Uint)? {
                    HostValue::Uint(u) => <$ty>::try_from(u)
                        .map_err(|_| BridgeError::mismatch(stringify!($ty), format!("uint {}", u))),
                    other => Err(unexpected("uint", &other)),
                }
            }
        }
    )*};
}

macro_rules! float_kind {
    ($($ty:ty),*) => {$(
        impl HostKind for $ty {
            fn host_type() -> HostType {
                HostType::Float
            }
        }
        impl IntoHost for $ty {
            fn into_host(self) -> HostValue {
                HostValue::Float(self as f64)
            }
        }
        impl FromHost for $ty {
            fn from_host(value: HostValue) -> BridgeResult<Self> {
                match convert(value, &HostType::Float)? {
                    HostValue::Float(f) => Ok(f as $ty),
                    other => Err(unexpected("float", &other)),
                }
            }
        }
    )*};
}

int_kind!(i8, i16, i32, i64, isize);
uint_kind!(u8, u16, u32, u64, usize);
float_kind!(f32, f64);

impl HostKind for bool {
    fn host_type() -> HostType {
        HostType::Bool
    }
}

impl IntoHost for bool {
    fn into_host(self) -> HostValue {
        HostValue::Bool(self)
    }
}

impl FromHost for bool {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &HostType::Bool)? {
            HostValue::Bool(b) => Ok(b),
            other => Err(unexpected("bool", &other)),
        }
    }
}

impl HostKind for String {
    fn host_type() -> HostType {
        HostType::Str
    }
}

impl IntoHost for String {
    fn into_host(self) -> HostValue {
        HostValue::Str(self)
    }
}

impl FromHost for String {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &HostType::Str)? {
            HostValue::Str(s) => Ok(s),
            other => Err(unexpected("string", &other)),
        }
    }
}

impl HostKind for &str {
    fn host_type() -> HostType {
        HostType::Str
    }
}

impl IntoHost for &str {
    fn into_host(self) -> HostValue {
        HostValue::Str(self.to_string())
    }
}

/// Byte sequence; crosses the boundary as a string, not an array of numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Bytes(bytes.to_vec())
    }
}

impl HostKind for Bytes {
    fn host_type() -> HostType {
        HostType::Bytes
    }
}

impl IntoHost for Bytes {
    fn into_host(self) -> HostValue {
        HostValue::Bytes(self.0)
    }
}

impl FromHost for Bytes {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &HostType::Bytes)? {
            HostValue::Bytes(b) => Ok(Bytes(b)),
            other => Err(unexpected("bytes", &other)),
        }
    }
}

// ============================================================================
// Passthrough kinds
// ============================================================================

impl HostKind for HostValue {
    fn host_type() -> HostType {
        HostType::Any
    }
}

impl IntoHost for HostValue {
    fn into_host(self) -> HostValue {
        self
    }
}

impl FromHost for HostValue {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Ok(value)
    }
}

impl HostKind for ForeignValue {
    fn host_type() -> HostType {
        HostType::Foreign
    }
}

impl IntoHost for ForeignValue {
    fn into_host(self) -> HostValue {
        HostValue::Foreign(self)
    }
}

impl FromHost for ForeignValue {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &HostType::Foreign)? {
            HostValue::Foreign(v) => Ok(v),
            other => Err(unexpected("foreign", &other)),
        }
    }
}

impl HostKind for HostFunction {
    fn host_type() -> HostType {
        HostType::Func(Rc::new(Signature::dynamic()))
    }
}

impl IntoHost for HostFunction {
    fn into_host(self) -> HostValue {
        HostValue::Func(self)
    }
}

impl FromHost for HostFunction {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Func(f) => Ok(f),
            HostValue::Nil => Ok(HostFunction::nil(Signature::dynamic())),
            other => Err(unexpected("func", &other)),
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: HostKind> HostKind for Vec<T> {
    fn host_type() -> HostType {
        HostType::Seq(Box::new(T::host_type()))
    }
}

impl<T: IntoHost> IntoHost for Vec<T> {
    fn into_host(self) -> HostValue {
        HostValue::Seq(self.into_iter().map(IntoHost::into_host).collect())
    }
}

impl<T: FromHost> FromHost for Vec<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Nil => Ok(Vec::new()),
            HostValue::Seq(items) => items.into_iter().map(T::from_host).collect(),
            other => Err(unexpected("sequence", &other)),
        }
    }
}

impl<T: HostKind> HostKind for Option<T> {
    fn host_type() -> HostType {
        HostType::Optional(Box::new(T::host_type()))
    }
}

impl<T: IntoHost> IntoHost for Option<T> {
    fn into_host(self) -> HostValue {
        match self {
            Some(v) => v.into_host(),
            None => HostValue::Nil,
        }
    }
}

impl<T: FromHost> FromHost for Option<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        if value.is_nil() {
            Ok(None)
        } else {
            T::from_host(value).map(Some)
        }
    }
}

fn map_entries<K: FromHost, V: FromHost>(value: HostValue) -> BridgeResult<Vec<(K, V)>> {
    match value {
        HostValue::Nil => Ok(Vec::new()),
        HostValue::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| Ok((K::from_host(k)?, V::from_host(v)?)))
            .collect(),
        other => Err(unexpected("map", &other)),
    }
}

impl<K: HostKind, V: HostKind> HostKind for HashMap<K, V> {
    fn host_type() -> HostType {
        HostType::Map(Box::new(K::host_type()), Box::new(V::host_type()))
    }
}

impl<K: IntoHost, V: IntoHost> IntoHost for HashMap<K, V> {
    fn into_host(self) -> HostValue {
        HostValue::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_host(), v.into_host()))
                .collect(),
        )
    }
}

impl<K: FromHost + Eq + Hash, V: FromHost> FromHost for HashMap<K, V> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<K: HostKind, V: HostKind> HostKind for BTreeMap<K, V> {
    fn host_type() -> HostType {
        HostType::Map(Box::new(K::host_type()), Box::new(V::host_type()))
    }
}

impl<K: IntoHost, V: IntoHost> IntoHost for BTreeMap<K, V> {
    fn into_host(self) -> HostValue {
        HostValue::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_host(), v.into_host()))
                .collect(),
        )
    }
}

impl<K: FromHost + Ord, V: FromHost> FromHost for BTreeMap<K, V> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

/// Variadic tail: collects all remaining arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rest<T>(pub Vec<T>);

impl<T: HostKind> HostKind for Rest<T> {
    fn host_type() -> HostType {
        HostType::Rest(Box::new(T::host_type()))
    }
}

impl<T: IntoHost> IntoHost for Rest<T> {
    fn into_host(self) -> HostValue {
        HostValue::Seq(self.0.into_iter().map(IntoHost::into_host).collect())
    }
}

impl<T: FromHost> FromHost for Rest<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        Vec::<T>::from_host(value).map(Rest)
    }
}

// ============================================================================
// Returns and result tuples
// ============================================================================

single_value!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, Bytes,
    HostValue, ForeignValue, HostFunction,
);

impl<T: IntoHost> HostReturn for Vec<T> {
    single_return!();
}

impl<T: FromHost> HostResults for Vec<T> {
    single_results!();
}

impl<T: IntoHost> HostReturn for Option<T> {
    single_return!();
}

impl<T: FromHost> HostResults for Option<T> {
    single_results!();
}

impl<K: IntoHost, V: IntoHost> HostReturn for HashMap<K, V> {
    single_return!();
}

impl<K: FromHost + Eq + Hash, V: FromHost> HostResults for HashMap<K, V> {
    single_results!();
}

impl<K: IntoHost, V: IntoHost> HostReturn for BTreeMap<K, V> {
    single_return!();
}

impl<K: FromHost + Ord, V: FromHost> HostResults for BTreeMap<K, V> {
    single_results!();
}

impl HostReturn for () {
    fn result_types() -> Vec<HostType> {
        Vec::new()
    }

    fn into_outcome(self) -> HostOutcome {
        Ok(Vec::new())
    }
}

impl HostResults for () {
    fn result_types() -> Vec<HostType> {
        Vec::new()
    }

    fn from_results(_values: Vec<HostValue>) -> BridgeResult<Self> {
        Ok(())
    }
}

impl<R: HostReturn, E: fmt::Display> HostReturn for Result<R, E> {
    fn result_types() -> Vec<HostType> {
        R::result_types()
    }

    fn fallible() -> bool {
        true
    }

    fn into_outcome(self) -> HostOutcome {
        match self {
            Ok(r) => r.into_outcome(),
            Err(e) => Err(HostError::new(e.to_string())),
        }
    }
}

macro_rules! tuple_results {
    ($($name:ident),+) => {
        impl<$($name: IntoHost),+> HostReturn for ($($name,)+) {
            fn result_types() -> Vec<HostType> {
                vec![$($name::host_type()),+]
            }

            #[allow(non_snake_case)]
            fn into_outcome(self) -> HostOutcome {
                let ($($name,)+) = self;
                Ok(vec![$($name.into_host()),+])
            }
        }

        impl<$($name: FromHost),+> HostResults for ($($name,)+) {
            fn result_types() -> Vec<HostType> {
                vec![$($name::host_type()),+]
            }

            #[allow(non_snake_case)]
            fn from_results(values: Vec<HostValue>) -> BridgeResult<Self> {
                let mut values = values.into_iter();
                $(let $name = $name::from_host(values.next().unwrap_or_default())?;)+
                Ok(($($name,)+))
            }
        }
    };
}

tuple_results!(A, B);
tuple_results!(A, B, C);
tuple_results!(A, B, C, D);

// ============================================================================
// Argument tuples
// ============================================================================

macro_rules! tuple_params {
    ($($name:ident),*) => {
        impl<$($name: IntoHost + FromHost),*> HostParams for ($($name,)*) {
            fn param_types() -> Vec<HostType> {
                vec![$($name::host_type()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn from_args(args: Vec<HostValue>) -> BridgeResult<Self> {
                let mut args = args.into_iter();
                $(let $name = $name::from_host(args.next().unwrap_or_default())?;)*
                Ok(($($name,)*))
            }

            #[allow(non_snake_case, clippy::unused_unit)]
            fn into_args(self) -> Vec<HostValue> {
                let ($($name,)*) = self;
                vec![$($name.into_host()),*]
            }
        }
    };
}

tuple_params!();
tuple_params!(A);
tuple_params!(A, B);
tuple_params!(A, B, C);
tuple_params!(A, B, C, D);
tuple_params!(A, B, C, D, E);
tuple_params!(A, B, C, D, E, F);
