use core::fmt;

/// A leaf value as it appears in the input, before it is coerced to a field type.
///
/// `u64` and `i64` are kept apart so that the full range of both fits
/// without going through a wider integer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// A negative integer, or one the parser chose to report as signed.
    I64(i64),
    /// A non-negative integer.
    U64(u64),
    /// A number with a fractional part or an exponent.
    F64(f64),
    /// A string, escapes already decoded.
    Str(String),
}

impl ScalarValue {
    /// Short name of the scalar's kind, for error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::I64(_) | ScalarValue::U64(_) => "integer",
            ScalarValue::F64(_) => "number",
            ScalarValue::Str(_) => "string",
        }
    }

    /// Returns `true` for [`ScalarValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::I64(n) => write!(f, "{n}"),
            ScalarValue::U64(n) => write!(f, "{n}"),
            ScalarValue::F64(n) => write!(f, "{n}"),
            ScalarValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::I64(value)
    }
}

impl From<u64> for ScalarValue {
    fn from(value: u64) -> Self {
        ScalarValue::U64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::F64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Str(value.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Str(value)
    }
}

/// Why a raw scalar could not be turned into a value of the declared type.
///
/// This carries no field information: the caller that knows which field was
/// being filled wraps it into a richer error.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The scalar has the wrong kind (e.g. a string for a `u32`).
    Mismatch {
        /// What the declared type accepts.
        expected: &'static str,
    },
    /// The scalar has the right kind but does not fit (e.g. `300` for a `u8`).
    OutOfRange {
        /// The declared type.
        expected: &'static str,
    },
    /// A string that names no variant of a unit-only enum.
    UnknownVariant {
        /// The enum type.
        type_name: &'static str,
        /// The name found in the input.
        variant: String,
    },
    /// A composite type (struct or list) was handed a scalar.
    NotScalar {
        /// The declared type.
        expected: &'static str,
    },
    /// A custom codec rejected the value.
    Codec {
        /// Name of the codec type.
        codec: &'static str,
        /// The codec's own message.
        message: String,
    },
    /// The metadata for the declared type could not be built.
    Configuration(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Mismatch { expected } => write!(f, "expected {expected}"),
            DecodeError::OutOfRange { expected } => write!(f, "out of range for {expected}"),
            DecodeError::UnknownVariant { type_name, variant } => {
                write!(f, "`{variant}` is not a variant of {type_name}")
            }
            DecodeError::NotScalar { expected } => {
                write!(f, "{expected} cannot be built from a scalar")
            }
            DecodeError::Codec { codec, message } => write!(f, "{codec}: {message}"),
            DecodeError::Configuration(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for DecodeError {}
