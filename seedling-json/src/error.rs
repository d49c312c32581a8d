//! Error types for the JSON front end.

use core::fmt::{self, Display};

use seedling_format::Span;

use crate::scanner::{ScanError, ScanErrorKind};

/// The input is not well-formed JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonError {
    /// The specific kind of error
    pub kind: JsonErrorKind,
    /// Source span where the error occurred
    pub span: Span,
}

impl JsonError {
    /// Create a new error at `span`
    pub const fn new(kind: JsonErrorKind, span: Span) -> Self {
        JsonError { kind, span }
    }
}

impl Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bytes {})", self.kind, self.span)
    }
}

impl std::error::Error for JsonError {}

impl From<ScanError> for JsonError {
    fn from(err: ScanError) -> Self {
        JsonError::new(JsonErrorKind::Scan(err.kind), err.span)
    }
}

/// Specific error kinds for JSON parsing
#[derive(Debug, Clone, PartialEq)]
pub enum JsonErrorKind {
    /// The scanner could not read a token
    Scan(ScanErrorKind),
    /// A token that cannot appear here
    UnexpectedToken {
        /// What was found
        got: &'static str,
        /// What was expected instead
        expected: &'static str,
    },
    /// Input ended before the document was complete
    UnexpectedEof {
        /// What was expected before the end
        expected: &'static str,
    },
    /// A `,` directly before `}` or `]`
    TrailingComma,
    /// Something other than whitespace after the document
    TrailingCharacters,
}

impl Display for JsonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonErrorKind::Scan(kind) => match kind {
                ScanErrorKind::UnexpectedChar(ch) => write!(f, "unexpected character {ch:?}"),
                ScanErrorKind::UnexpectedEof(context) => {
                    write!(f, "unexpected end of input {context}")
                }
                ScanErrorKind::InvalidEscape(ch) => write!(f, "invalid escape `\\{ch}`"),
                ScanErrorKind::InvalidNumber => f.write_str("invalid number"),
                ScanErrorKind::InvalidUtf8 => f.write_str("invalid UTF-8"),
            },
            JsonErrorKind::UnexpectedToken { got, expected } => {
                write!(f, "unexpected {got}, expected {expected}")
            }
            JsonErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            JsonErrorKind::TrailingComma => f.write_str("trailing comma"),
            JsonErrorKind::TrailingCharacters => {
                f.write_str("trailing characters after the JSON value")
            }
        }
    }
}
