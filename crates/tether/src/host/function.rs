//! HostFunction - a host callable with a declared signature

use std::fmt;
use std::rc::Rc;

use tether_sdk::{BridgeError, BridgeResult, Realm};

use super::typed::{HostParams, HostReturn};
use super::types::Signature;
use super::HostValue;

/// Error result returned by a fallible host function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    /// Create an error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a host call: the result tuple, or the trailing error result.
pub type HostOutcome = Result<Vec<HostValue>, HostError>;

/// Type-erased body of a host function.
///
/// Arguments arrive already coerced to the declared parameter types. The
/// outer `BridgeResult` reports bridge failures (bad arguments, borrowed
/// records); the inner [`HostOutcome`] is the function's own result.
pub type HostBody = Rc<dyn Fn(&dyn Realm, Vec<HostValue>) -> BridgeResult<HostOutcome>>;

/// A callable host value.
#[derive(Clone)]
pub struct HostFunction {
    name: Rc<str>,
    signature: Rc<Signature>,
    body: HostBody,
}

impl HostFunction {
    /// Create a function from an untyped body
    pub fn new(
        name: &str,
        signature: Signature,
        body: impl Fn(&dyn Realm, Vec<HostValue>) -> BridgeResult<HostOutcome> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            signature: Rc::new(signature),
            body: Rc::new(body),
        }
    }

    /// Create a function from a typed closure; the signature is derived from
    /// the argument tuple and return type
    pub fn typed<A, R>(name: &str, f: impl Fn(A) -> R + 'static) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        Self::new(name, signature_of::<A, R>(), move |_realm, args| {
            let args = A::from_args(args)?;
            Ok(f(args).into_outcome())
        })
    }

    /// Like [`HostFunction::typed`], with access to the realm the call runs in
    pub fn typed_in_realm<A, R>(name: &str, f: impl Fn(&dyn Realm, A) -> R + 'static) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        Self::new(name, signature_of::<A, R>(), move |realm, args| {
            let args = A::from_args(args)?;
            Ok(f(realm, args).into_outcome())
        })
    }

    /// Zero value of a function type: fills a missing argument and fails
    /// with [`BridgeError::NotCallable`] only when actually called
    pub fn nil(signature: Signature) -> Self {
        Self::new("nil", signature, |_realm, _args| {
            Err(BridgeError::NotCallable("nil function".to_string()))
        })
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn signature_rc(&self) -> Rc<Signature> {
        Rc::clone(&self.signature)
    }

    /// Invoke with arguments already matching the signature
    pub fn call(&self, realm: &dyn Realm, args: Vec<HostValue>) -> BridgeResult<HostOutcome> {
        (self.body)(realm, args)
    }

    /// Whether both handles refer to the same function body
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

/// Signature derived from a typed argument tuple and return type
pub(crate) fn signature_of<A: HostParams, R: HostReturn>() -> Signature {
    Signature {
        params: A::param_types(),
        results: R::result_types(),
        fallible: R::fallible(),
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction({} {})", self.name, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;
    use tether_sdk::MemoryRealm;

    #[test]
    fn test_typed_signature() {
        let add = HostFunction::typed("add", |(a, b): (i64, i64)| a + b);
        assert_eq!(add.signature().params, vec![HostType::Int, HostType::Int]);
        assert_eq!(add.signature().results, vec![HostType::Int]);
        assert!(!add.signature().fallible);

        let realm = MemoryRealm::new();
        let out = add.call(&realm, vec![HostValue::Int(2), HostValue::Int(3)]).unwrap();
        assert_eq!(out, Ok(vec![HostValue::Int(5)]));
    }

    #[test]
    fn test_fallible_outcome() {
        let parse = HostFunction::typed("parse", |(s,): (String,)| s.parse::<i64>());
        assert!(parse.signature().fallible);
        assert_eq!(parse.signature().results, vec![HostType::Int]);

        let realm = MemoryRealm::new();
        let out = parse.call(&realm, vec![HostValue::Str("x".into())]).unwrap();
        assert!(out.is_err());
    }

    #[test]
    fn test_nil_function_fails_only_when_called() {
        let f = HostFunction::nil(Signature::dynamic());
        assert_eq!(f.name(), "nil");
        let realm = MemoryRealm::new();
        let err = f.call(&realm, vec![]).unwrap_err();
        assert_eq!(err, BridgeError::NotCallable("nil function".into()));
    }

    #[test]
    fn test_identity() {
        let f = HostFunction::typed("f", |(): ()| ());
        let g = f.clone();
        assert_eq!(f, g);
        assert_ne!(f, HostFunction::typed("f", |(): ()| ()));
    }
}
