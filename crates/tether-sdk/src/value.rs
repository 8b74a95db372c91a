//! ForeignValue - transient handle to a value owned by a realm
//!
//! Primitives (undefined, null, booleans, numbers) travel inline. Everything
//! else (strings, symbols, arrays, objects, functions) lives on the realm's
//! heap and is referenced through a [`Handle`]. A handle is only meaningful
//! to the realm that produced it.

use std::fmt;

/// Index of a heap cell inside a realm.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// Create a handle from a raw heap index
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Raw heap index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// A value as seen by the foreign environment.
///
/// Numbers are always IEEE 754 doubles; there is no integer representation on
/// the foreign side.
#[derive(Clone, Copy, PartialEq, Default)]
pub enum ForeignValue {
    /// `undefined`: absent value
    #[default]
    Undefined,
    /// `null`: explicit empty value
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// Heap value (string, symbol, array, object or function)
    Ref(Handle),
}

impl ForeignValue {
    /// The `undefined` value
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// The `null` value
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Check for `undefined`
    #[inline]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check for `undefined` or `null`
    #[inline]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Extract a boolean primitive
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract a number primitive
    #[inline]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract the heap handle
    #[inline]
    pub const fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Ref(h) => Some(*h),
            _ => None,
        }
    }
}

impl From<bool> for ForeignValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for ForeignValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "ForeignValue::Undefined"),
            Self::Null => write!(f, "ForeignValue::Null"),
            Self::Boolean(b) => write!(f, "ForeignValue::Boolean({})", b),
            Self::Number(n) => write!(f, "ForeignValue::Number({})", n),
            Self::Ref(h) => write!(f, "ForeignValue::Ref({})", h.index()),
        }
    }
}

/// Runtime type tag of a foreign value (the `typeof` of the environment).
///
/// Arrays report [`ForeignType::Object`]; use `Realm::is_array` to tell them
/// apart from plain objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignType {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean,
    /// Number primitive
    Number,
    /// String
    String,
    /// Symbol
    Symbol,
    /// Object (including arrays)
    Object,
    /// Callable
    Function,
}

impl ForeignType {
    /// Name as reported by `typeof` (with `null` spelled out)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Object => "object",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format a number the way the foreign environment's `String(n)` does.
///
/// Shortest round-trip digits; plain notation for decimal exponents in
/// `-6..21`, exponent notation (`1e+21`, `1.5e-7`) outside it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }
    if n.is_infinite() {
        return "Infinity".to_string();
    }

    // `{:e}` yields the shortest digits, e.g. "1.2345e-7"
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat(-point as usize), digits)
    } else {
        let sign = if point > 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        let dot = if rest.is_empty() { "" } else { "." };
        format!("{}{}{}e{}{}", first, dot, rest, sign, (point - 1).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives() {
        assert!(ForeignValue::undefined().is_undefined());
        assert!(ForeignValue::null().is_nullish());
        assert!(!ForeignValue::Boolean(false).is_nullish());
        assert_eq!(ForeignValue::from(true).as_bool(), Some(true));
        assert_eq!(ForeignValue::from(2.5).as_number(), Some(2.5));
        assert_eq!(ForeignValue::Null.as_number(), None);
    }

    #[test]
    fn test_handle_roundtrip() {
        let v = ForeignValue::Ref(Handle::from_index(7));
        assert_eq!(v.as_handle().map(Handle::index), Some(7));
        assert_eq!(format!("{:?}", v), "ForeignValue::Ref(7)");
    }

    #[test]
    fn test_default_is_undefined() {
        assert_eq!(ForeignValue::default(), ForeignValue::Undefined);
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(9007199254740993.0), "9007199254740992");
    }

    #[test]
    fn test_number_to_string_notation_bounds() {
        assert_eq!(number_to_string(1e20), "100000000000000000000");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e300), "1.5e+300");
        assert_eq!(number_to_string(-123.456), "-123.456");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(1.25e-7), "1.25e-7");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ForeignType::Function.name(), "function");
        assert_eq!(ForeignType::Null.to_string(), "null");
    }
}
