//! Error types shared by the realm ABI and the bridge

/// Result type for bridge and realm operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while converting, projecting or calling across the bridge.
///
/// Unsupported host kinds are not an error: they convert to `null`. A host
/// function's own error result is not an error either unless the bridge runs
/// in throwing mode, in which case it surfaces as [`BridgeError::HostCall`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// A value handed to a binding or wrapping operation has the wrong shape
    #[error("Signature error: {0}")]
    Signature(String),

    /// A foreign return value cannot fill the declared host results
    #[error("Conversion shape error: expected {expected} results, got {got}")]
    ConversionShape {
        /// Declared number of host results
        expected: usize,
        /// What the foreign side produced
        got: String,
    },

    /// A value cannot be coerced into the declared host type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Declared type
        expected: String,
        /// Actual value kind
        got: String,
    },

    /// Coercion of a single call argument failed
    #[error("Argument {index} of '{function}': {source}")]
    Argument {
        /// Zero-based argument position
        index: usize,
        /// Function being called
        function: String,
        /// Underlying failure
        #[source]
        source: Box<BridgeError>,
    },

    /// A host function returned an error result (throwing mode only)
    #[error("Host call '{function}' failed: {message}")]
    HostCall {
        /// Function being called
        function: String,
        /// Rendered error value
        message: String,
    },

    /// A value was called but is not a function
    #[error("Value is not callable: {0}")]
    NotCallable(String),

    /// A record is already mutably borrowed by an outer method call
    #[error("Record '{0}' is already borrowed")]
    Borrowed(String),

    /// JSON facility failure
    #[error("JSON error: {0}")]
    Json(String),

    /// A handle does not belong to this realm
    #[error("Invalid handle: {0}")]
    InvalidHandle(u32),

    /// The realm does not support the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid bridge configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Error raised by foreign code
    #[error("Uncaught exception: {0}")]
    Thrown(String),
}

impl BridgeError {
    /// Build a type mismatch error
    pub fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Attach argument position and function name to a coercion failure
    pub fn in_argument(self, index: usize, function: &str) -> Self {
        BridgeError::Argument {
            index,
            function: function.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Json(e.to_string())
    }
}

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::Thrown(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::Thrown(s.to_string())
    }
}
