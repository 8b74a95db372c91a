//! Function Wrappers
//!
//! Two adapters across the call boundary:
//!
//! - host-callable exposed to foreign code: [`Converter::wrap_host_function`]
//!   decodes and coerces untyped foreign arguments, calls the host function and
//!   encodes its results
//! - foreign-callable exposed to host code: [`Converter::wrap_foreign_function`]
//!   and its typed form [`TypedFn`]
//!
//! Argument handling for host functions: missing trailing arguments take the
//! zero value of their declared type, extra arguments are ignored, and a
//! variadic tail collects the rest. A failed coercion aborts that call only.
//! A host function's own error result is swallowed (the call yields
//! `undefined`) unless the options select [`CallErrorMode::Throw`].

use std::marker::PhantomData;
use std::rc::Rc;

use tether_sdk::{BridgeError, BridgeResult, ForeignValue, NativeCallback, Realm};
use tracing::{debug, trace};

use crate::convert::Converter;
use crate::host::{
    coerce, FromHost, HostError, HostFunction, HostKind, HostParams, HostResults, HostReturn, HostType, HostValue,
    IntoHost, Signature,
};
use crate::options::{BridgeOptions, CallErrorMode};

impl<'a> Converter<'a> {
    // ========================================================================
    // Host function → foreign callable
    // ========================================================================

    /// Adapt a host function into a foreign-invocable entry point
    pub fn wrap_host_function(&self, function: HostFunction) -> NativeCallback {
        let options = self.options();
        Rc::new(move |realm: &dyn Realm, _this: ForeignValue, args: &[ForeignValue]| {
            invoke_host(realm, options, &function, args)
        })
    }

    /// Expose a host function as a foreign function value
    pub fn host_function_to_foreign(&self, function: HostFunction) -> ForeignValue {
        let name = function.name().to_string();
        self.realm().create_function(&name, self.wrap_host_function(function))
    }

    /// Encode a host result tuple: none → `undefined`, one → the value, several → an array
    pub fn results_to_foreign(&self, results: &[HostValue]) -> BridgeResult<ForeignValue> {
        match results {
            [] => Ok(ForeignValue::Undefined),
            [single] => self.to_foreign(single),
            many => {
                let items = many
                    .iter()
                    .map(|v| self.to_foreign(v))
                    .collect::<BridgeResult<Vec<_>>>()?;
                Ok(self.realm().create_array(&items))
            }
        }
    }

    // ========================================================================
    // Foreign callable → host function
    // ========================================================================

    /// Adapt a foreign callable into a host function with the given signature
    pub fn wrap_foreign_function(&self, signature: Signature, callee: ForeignValue) -> BridgeResult<HostFunction> {
        if !self.realm().is_function(callee) {
            return Err(BridgeError::Signature(format!(
                "cannot bind {} as {}",
                self.realm().type_of(callee),
                signature
            )));
        }

        let options = self.options();
        let sig = signature.clone();
        Ok(HostFunction::new("foreign", signature, move |realm, args| {
            let conv = Converter::new(realm, options);
            let foreign_args = conv.encode_args(&sig, args)?;
            let ret = match realm.call(callee, ForeignValue::Undefined, &foreign_args) {
                Ok(ret) => ret,
                Err(BridgeError::Thrown(message)) if sig.fallible => return Ok(Err(HostError::new(message))),
                Err(e) => return Err(e),
            };
            conv.decode_results(&sig.results, ret).map(Ok)
        }))
    }

    /// Host arguments → foreign argument list, spreading a variadic tail
    fn encode_args(&self, sig: &Signature, args: Vec<HostValue>) -> BridgeResult<Vec<ForeignValue>> {
        let spread_from = sig.is_variadic().then(|| sig.fixed_params());
        let mut out = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            match arg {
                HostValue::Seq(items) if spread_from == Some(i) => {
                    for item in &items {
                        out.push(self.to_foreign(item)?);
                    }
                }
                other => out.push(self.to_foreign(&other)?),
            }
        }
        Ok(out)
    }

    /// Shape a foreign return value into the declared host results.
    ///
    /// One result takes the whole value; several require an array holding at
    /// least that many elements.
    pub fn decode_results(&self, results: &[HostType], ret: ForeignValue) -> BridgeResult<Vec<HostValue>> {
        match results {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![coerce(self.to_host(ret)?, single, Some(self))?]),
            many => {
                let realm = self.realm();
                if !realm.is_array(ret) {
                    return Err(BridgeError::ConversionShape {
                        expected: many.len(),
                        got: realm.type_of(ret).to_string(),
                    });
                }
                let len = realm.array_len(ret)?;
                if len < many.len() {
                    return Err(BridgeError::ConversionShape {
                        expected: many.len(),
                        got: format!("array of length {}", len),
                    });
                }
                many.iter()
                    .enumerate()
                    .map(|(j, ty)| coerce(self.to_host(realm.array_get(ret, j)?)?, ty, Some(self)))
                    .collect()
            }
        }
    }
}

fn invoke_host(
    realm: &dyn Realm,
    options: BridgeOptions,
    function: &HostFunction,
    args: &[ForeignValue],
) -> BridgeResult<ForeignValue> {
    let conv = Converter::new(realm, options);
    let sig = function.signature();
    let fixed = sig.fixed_params();

    let mut host_args = Vec::with_capacity(sig.params.len());
    for (i, ty) in sig.params[..fixed].iter().enumerate() {
        let value = match args.get(i) {
            Some(arg) => conv.to_host(*arg),
            None => Ok(HostValue::Nil),
        };
        let value = value
            .and_then(|v| coerce(v, ty, Some(&conv)))
            .map_err(|e| e.in_argument(i, function.name()))?;
        host_args.push(value);
    }

    match sig.params.last() {
        Some(HostType::Rest(elem)) => {
            let mut rest = Vec::with_capacity(args.len().saturating_sub(fixed));
            for (i, arg) in args.iter().enumerate().skip(fixed) {
                let value = conv
                    .to_host(*arg)
                    .and_then(|v| coerce(v, elem, Some(&conv)))
                    .map_err(|e| e.in_argument(i, function.name()))?;
                rest.push(value);
            }
            host_args.push(HostValue::Seq(rest));
        }
        _ if args.len() > fixed => {
            trace!(function = function.name(), extra = args.len() - fixed, "extra arguments ignored");
        }
        _ => {}
    }

    match function.call(realm, host_args)? {
        Ok(results) => conv.results_to_foreign(&results),
        Err(error) => match options.call_errors {
            CallErrorMode::Swallow => {
                debug!(function = function.name(), error = %error, "host call error swallowed");
                Ok(ForeignValue::Undefined)
            }
            CallErrorMode::Throw => Err(BridgeError::HostCall {
                function: function.name().to_string(),
                message: error.to_string(),
            }),
        },
    }
}

// ============================================================================
// TypedFn
// ============================================================================

/// Host function with a statically known signature `fn(A) -> R`.
///
/// Usually bound to a foreign callable, so host code can call foreign code
/// with native types:
///
/// ```ignore
/// let mut double: Option<TypedFn<(i64,), (i64, i64)>> = None;
/// TypedFn::bind_into(&conv, callee, &mut double)?;
/// let (x, y) = double.unwrap().call(realm, (5,))?;
/// ```
pub struct TypedFn<A, R> {
    inner: HostFunction,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A: HostParams, R: HostResults> TypedFn<A, R> {
    /// Signature of `fn(A) -> R`
    pub fn signature() -> Signature {
        Signature::new(A::param_types(), R::result_types())
    }

    /// Wrap a foreign callable
    pub fn bind(conv: &Converter<'_>, callee: ForeignValue) -> BridgeResult<Self> {
        conv.wrap_foreign_function(Self::signature(), callee)
            .map(Self::from_function)
    }

    /// Wrap a foreign callable into a host function slot
    pub fn bind_into(conv: &Converter<'_>, callee: ForeignValue, slot: &mut Option<Self>) -> BridgeResult<()> {
        *slot = Some(Self::bind(conv, callee)?);
        Ok(())
    }

    /// View an existing host function through this signature
    pub fn from_function(inner: HostFunction) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Call with typed arguments
    pub fn call(&self, realm: &dyn Realm, args: A) -> BridgeResult<R> {
        match self.inner.call(realm, args.into_args())? {
            Ok(values) => R::from_results(values),
            Err(error) => Err(BridgeError::HostCall {
                function: self.inner.name().to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Underlying untyped function
    pub fn function(&self) -> &HostFunction {
        &self.inner
    }
}

impl<A, R> Clone for TypedFn<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, R> std::fmt::Debug for TypedFn<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypedFn({:?})", self.inner)
    }
}

impl<A: HostParams, R: HostResults> HostKind for TypedFn<A, R> {
    fn host_type() -> HostType {
        HostType::Func(Rc::new(Self::signature()))
    }
}

impl<A: HostParams, R: HostResults> IntoHost for TypedFn<A, R> {
    fn into_host(self) -> HostValue {
        HostValue::Func(self.inner)
    }
}

impl<A: HostParams, R: HostResults> FromHost for TypedFn<A, R> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Func(f) => Ok(Self::from_function(f)),
            HostValue::Nil => Ok(Self::from_function(HostFunction::nil(Self::signature()))),
            other => Err(BridgeError::mismatch(Self::signature().to_string(), other.kind_name())),
        }
    }
}

impl<A: HostParams, R: HostResults> HostReturn for TypedFn<A, R> {
    crate::host::single_return!();
}

impl<A: HostParams, R: HostResults> HostResults for TypedFn<A, R> {
    crate::host::single_results!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Owned, Record, RecordType, Rest, Shared};
    use tether_sdk::MemoryRealm;

    #[derive(Clone, Default)]
    struct Tally {
        count: i64,
    }

    impl Record for Tally {
        const NAME: &'static str = "Tally";

        fn record_type() -> RecordType<Self> {
            RecordType::new().field("Count", |t: &Tally| t.count)
        }
    }

    fn converter(realm: &MemoryRealm) -> Converter<'_> {
        Converter::new(realm, BridgeOptions::default())
    }

    #[test]
    fn test_missing_args_are_zero_filled() {
        let realm = MemoryRealm::new();
        let add = HostFunction::typed("add", |(a, b): (i64, i64)| a + b);
        let f = converter(&realm).host_function_to_foreign(add);
        let out = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Number(4.0)]).unwrap();
        assert_eq!(out, ForeignValue::Number(4.0));
    }

    #[test]
    fn test_missing_record_args_take_default() {
        let realm = MemoryRealm::new();
        let take = HostFunction::typed("take", |(n, t): (i64, Owned<Tally>)| n + t.0.count);
        let f = converter(&realm).host_function_to_foreign(take);
        let out = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Number(1.0)]).unwrap();
        assert_eq!(out, ForeignValue::Number(1.0));

        let peek = HostFunction::typed("peek", |(t,): (Shared<Tally>,)| t.borrow().count);
        let f = converter(&realm).host_function_to_foreign(peek);
        assert_eq!(realm.call(f, ForeignValue::Undefined, &[]).unwrap(), ForeignValue::Number(0.0));
    }

    #[test]
    fn test_missing_callback_fails_only_when_called() {
        let realm = MemoryRealm::new();
        let maybe = HostFunction::typed_in_realm(
            "maybe",
            |realm: &dyn Realm, (run, cb): (bool, TypedFn<(), i64>)| -> BridgeResult<i64> {
                if run {
                    cb.call(realm, ())
                } else {
                    Ok(-1)
                }
            },
        );
        let f = Converter::new(&realm, BridgeOptions::throwing()).host_function_to_foreign(maybe);
        let out = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Boolean(false)]).unwrap();
        assert_eq!(out, ForeignValue::Number(-1.0));

        let err = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Boolean(true)]).unwrap_err();
        assert!(matches!(err, BridgeError::HostCall { ref function, .. } if function == "maybe"));
    }

    #[test]
    fn test_extra_args_are_ignored() {
        let realm = MemoryRealm::new();
        let neg = HostFunction::typed("neg", |(a,): (f64,)| -a);
        let f = converter(&realm).host_function_to_foreign(neg);
        let args = [ForeignValue::Number(1.0), ForeignValue::Number(9.0)];
        assert_eq!(realm.call(f, ForeignValue::Undefined, &args).unwrap(), ForeignValue::Number(-1.0));
    }

    #[test]
    fn test_variadic_collects_rest() {
        let realm = MemoryRealm::new();
        let sum = HostFunction::typed("sum", |(base, Rest(xs)): (i64, Rest<i64>)| base + xs.iter().sum::<i64>());
        let f = converter(&realm).host_function_to_foreign(sum);
        let args = [1.0, 2.0, 3.0].map(ForeignValue::Number);
        assert_eq!(realm.call(f, ForeignValue::Undefined, &args).unwrap(), ForeignValue::Number(6.0));
    }

    #[test]
    fn test_multiple_results_become_array() {
        let realm = MemoryRealm::new();
        let pair = HostFunction::typed("pair", |(x,): (i64,)| (x, x + 1));
        let f = converter(&realm).host_function_to_foreign(pair);
        let out = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Number(1.0)]).unwrap();
        assert!(realm.is_array(out));
        assert_eq!(realm.array_get(out, 1).unwrap(), ForeignValue::Number(2.0));
    }

    #[test]
    fn test_error_result_is_swallowed() {
        let realm = MemoryRealm::new();
        let fail = HostFunction::typed("fail", |(): ()| -> Result<i64, String> { Err("nope".into()) });
        let f = converter(&realm).host_function_to_foreign(fail);
        assert_eq!(realm.call(f, ForeignValue::Undefined, &[]).unwrap(), ForeignValue::Undefined);
    }

    #[test]
    fn test_error_result_throws_when_configured() {
        let realm = MemoryRealm::new();
        let fail = HostFunction::typed("fail", |(): ()| -> Result<i64, String> { Err("nope".into()) });
        let f = Converter::new(&realm, BridgeOptions::throwing()).host_function_to_foreign(fail);
        let err = realm.call(f, ForeignValue::Undefined, &[]).unwrap_err();
        assert_eq!(
            err,
            BridgeError::HostCall {
                function: "fail".into(),
                message: "nope".into()
            }
        );
    }

    #[test]
    fn test_bad_argument_aborts_call() {
        let realm = MemoryRealm::new();
        let flag = HostFunction::typed("flag", |(b,): (bool,)| !b);
        let f = converter(&realm).host_function_to_foreign(flag);
        let err = realm.call(f, ForeignValue::Undefined, &[ForeignValue::Number(1.0)]).unwrap_err();
        assert!(matches!(err, BridgeError::Argument { index: 0, .. }));
    }

    #[test]
    fn test_bind_non_function() {
        let realm = MemoryRealm::new();
        let err = TypedFn::<(i64,), i64>::bind(&converter(&realm), ForeignValue::Number(1.0)).unwrap_err();
        assert!(matches!(err, BridgeError::Signature(_)));
    }

    #[test]
    fn test_short_array_is_shape_error() {
        let realm = MemoryRealm::new();
        let callee = realm.create_function(
            "one",
            Rc::new(|realm, _this, args| Ok(realm.create_array(&args[..1]))),
        );
        let f = TypedFn::<(i64,), (i64, i64)>::bind(&converter(&realm), callee).unwrap();
        let err = f.call(&realm, (5,)).unwrap_err();
        assert!(matches!(err, BridgeError::ConversionShape { expected: 2, .. }));
    }

    #[test]
    fn test_non_array_is_shape_error() {
        let realm = MemoryRealm::new();
        let callee = realm.create_function(
            "scalar",
            Rc::new(|_realm, _this, args| Ok(args[0])),
        );
        let f = TypedFn::<(i64,), (i64, i64)>::bind(&converter(&realm), callee).unwrap();
        let err = f.call(&realm, (5,)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::ConversionShape {
                expected: 2,
                got: "number".into()
            }
        );
    }

    #[test]
    fn test_single_result_takes_whole_value() {
        let realm = MemoryRealm::new();
        let callee = realm.create_function(
            "list",
            Rc::new(|realm, _this, args| Ok(realm.create_array(args))),
        );
        let f = TypedFn::<(i64, i64), Vec<f64>>::bind(&converter(&realm), callee).unwrap();
        assert_eq!(f.call(&realm, (1, 2)).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_foreign_callback_argument() {
        let realm = MemoryRealm::new();
        let apply = HostFunction::typed_in_realm(
            "apply",
            |realm: &dyn Realm, (f, x): (TypedFn<(i64,), i64>, i64)| f.call(realm, (x,)),
        );
        let apply = converter(&realm).host_function_to_foreign(apply);
        let inc = realm.create_function(
            "inc",
            Rc::new(|_realm, _this, args| Ok(ForeignValue::Number(args[0].as_number().unwrap_or(0.0) + 1.0))),
        );
        let out = realm
            .call(apply, ForeignValue::Undefined, &[inc, ForeignValue::Number(41.0)])
            .unwrap();
        assert_eq!(out, ForeignValue::Number(42.0));
    }
}
