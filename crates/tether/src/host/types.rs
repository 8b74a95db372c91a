//! Declared host types and function signatures
//!
//! These stand in for the reflected parameter and result types of a host
//! function. They are derived from Rust types through [`HostKind`](super::HostKind)
//! and drive argument coercion and zero-filling.

use std::fmt;
use std::rc::Rc;

use super::HostValue;

/// Declared type of a parameter, result or field.
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    /// Accepts any value unchanged
    Any,
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    Uint,
    /// Floating point
    Float,
    /// UTF-8 string
    Str,
    /// Byte sequence
    Bytes,
    /// Ordered sequence of an element type
    Seq(Box<HostType>),
    /// Keyed mapping
    Map(Box<HostType>, Box<HostType>),
    /// Value that may be absent
    Optional(Box<HostType>),
    /// Record of the named type, by value
    Record(&'static str),
    /// Shared pointer to a record of the named type
    Pointer(&'static str),
    /// Function with a known signature
    Func(Rc<Signature>),
    /// Untouched foreign handle
    Foreign,
    /// Variadic tail collecting remaining arguments
    Rest(Box<HostType>),
}

impl HostType {
    /// Zero value used to fill a missing argument of this type.
    ///
    /// Records, pointers and functions have no untyped zero and read as
    /// `Nil`; their typed handles build one from it (`Owned` and `Shared`
    /// take `T::default()`, functions become [`HostFunction::nil`](super::HostFunction::nil)).
    pub fn zero_value(&self) -> HostValue {
        match self {
            HostType::Bool => HostValue::Bool(false),
            HostType::Int => HostValue::Int(0),
            HostType::Uint => HostValue::Uint(0),
            HostType::Float => HostValue::Float(0.0),
            HostType::Str => HostValue::Str(String::new()),
            HostType::Bytes => HostValue::Bytes(Vec::new()),
            HostType::Seq(_) | HostType::Rest(_) => HostValue::Seq(Vec::new()),
            HostType::Map(..) => HostValue::Map(Vec::new()),
            HostType::Foreign => HostValue::Foreign(tether_sdk::ForeignValue::Undefined),
            HostType::Any
            | HostType::Optional(_)
            | HostType::Record(_)
            | HostType::Pointer(_)
            | HostType::Func(_) => HostValue::Nil,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Any => write!(f, "any"),
            HostType::Bool => write!(f, "bool"),
            HostType::Int => write!(f, "int"),
            HostType::Uint => write!(f, "uint"),
            HostType::Float => write!(f, "float"),
            HostType::Str => write!(f, "string"),
            HostType::Bytes => write!(f, "bytes"),
            HostType::Seq(elem) => write!(f, "[]{}", elem),
            HostType::Map(k, v) => write!(f, "map[{}]{}", k, v),
            HostType::Optional(inner) => write!(f, "?{}", inner),
            HostType::Record(name) => write!(f, "{}", name),
            HostType::Pointer(name) => write!(f, "*{}", name),
            HostType::Func(sig) => write!(f, "{}", sig),
            HostType::Foreign => write!(f, "foreign"),
            HostType::Rest(elem) => write!(f, "...{}", elem),
        }
    }
}

/// Parameter and result types of a host function.
///
/// `fallible` marks a function whose last declared result is an error; the
/// error is not counted in `results`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    /// Declared parameter types; a trailing [`HostType::Rest`] makes it variadic
    pub params: Vec<HostType>,
    /// Declared result types, error result excluded
    pub results: Vec<HostType>,
    /// Whether the function returns a trailing error
    pub fallible: bool,
}

impl Signature {
    /// Build a signature
    pub fn new(params: Vec<HostType>, results: Vec<HostType>) -> Self {
        Self {
            params,
            results,
            fallible: false,
        }
    }

    /// Signature accepting any arguments and producing one untyped result
    pub fn dynamic() -> Self {
        Self::new(vec![HostType::Rest(Box::new(HostType::Any))], vec![HostType::Any])
    }

    /// Mark the signature as returning a trailing error
    pub fn with_error(mut self) -> Self {
        self.fallible = true;
        self
    }

    /// Whether the last parameter collects remaining arguments
    pub fn is_variadic(&self) -> bool {
        matches!(self.params.last(), Some(HostType::Rest(_)))
    }

    /// Number of fixed (non-variadic) parameters
    pub fn fixed_params(&self) -> usize {
        if self.is_variadic() {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")?;
        let mut results: Vec<String> = self.results.iter().map(|r| r.to_string()).collect();
        if self.fallible {
            results.push("error".to_string());
        }
        match results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", results[0]),
            _ => write!(f, " ({})", results.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(HostType::Int.zero_value(), HostValue::Int(0));
        assert_eq!(HostType::Str.zero_value(), HostValue::Str(String::new()));
        assert_eq!(HostType::Optional(Box::new(HostType::Int)).zero_value(), HostValue::Nil);
        assert_eq!(HostType::Record("Point").zero_value(), HostValue::Nil);
    }

    #[test]
    fn test_variadic() {
        let sig = Signature::new(
            vec![HostType::Str, HostType::Rest(Box::new(HostType::Int))],
            vec![],
        );
        assert!(sig.is_variadic());
        assert_eq!(sig.fixed_params(), 1);
        assert!(!Signature::new(vec![HostType::Int], vec![]).is_variadic());
    }

    #[test]
    fn test_display() {
        let sig = Signature::new(vec![HostType::Int], vec![HostType::Int, HostType::Int]);
        assert_eq!(sig.to_string(), "func(int) (int, int)");
        let sig = Signature::new(vec![HostType::Seq(Box::new(HostType::Str))], vec![HostType::Float]).with_error();
        assert_eq!(sig.to_string(), "func([]string) (float, error)");
    }
}
