use core::fmt;

use seedling_core::{ArgumentError, ConfigurationError, ScalarValue};

use crate::{CompositeKind, Path, Span};

/// What the input held where a value was expected.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    /// A leaf value.
    Scalar(ScalarValue),
    /// An object.
    Object,
    /// An array.
    Array,
}

impl From<CompositeKind> for Found {
    fn from(kind: CompositeKind) -> Self {
        match kind {
            CompositeKind::Object => Found::Object,
            CompositeKind::Array => Found::Array,
        }
    }
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Scalar(value) => write!(f, "{} {value}", value.kind_name()),
            Found::Object => f.write_str("an object"),
            Found::Array => f.write_str("an array"),
        }
    }
}

/// An input value could not be turned into the declared type of its field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    /// Qualified field, e.g. `Person.age`.
    pub field: String,
    /// Declared type of the field.
    pub declared: &'static str,
    /// What the input held.
    pub found: Found,
    /// Why it did not fit.
    pub reason: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert {} into {} for `{}`: {}",
            self.found, self.declared, self.field, self.reason
        )
    }
}

/// Why events could not be turned into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedError {
    /// An input key fills no field of the type.
    UnknownField {
        /// The type being built.
        type_name: &'static str,
        /// The key found in the input.
        field: String,
        /// Keys the type accepts.
        expected: Vec<&'static str>,
        /// The accepted key closest to `field`, if any is close.
        suggestion: Option<&'static str>,
    },
    /// A value did not fit its field.
    Conversion(ConversionError),
    /// A field without a default was absent.
    MissingField {
        /// The type being built.
        type_name: &'static str,
        /// Input key of the field.
        field: &'static str,
    },
    /// The target type's metadata is invalid.
    Configuration(ConfigurationError),
    /// An event that cannot appear here.
    UnexpectedEvent {
        /// What could have appeared.
        expected: &'static str,
        /// What did.
        got: String,
    },
    /// The input ended before the root value was complete.
    UnexpectedEof,
    /// Objects and arrays are nested deeper than allowed.
    DepthLimitExceeded {
        /// The configured limit.
        max: usize,
    },
    /// A value was delivered to a seed that was already closed.
    NotOpen {
        /// Type of the seed.
        type_name: &'static str,
    },
    /// A seed was asked for its value before it was closed.
    NotClosed {
        /// Type of the seed.
        type_name: &'static str,
    },
    /// A seed whose construction already failed was asked for its value again.
    Poisoned {
        /// Type of the seed.
        type_name: &'static str,
    },
    /// A constructor rejected its arguments.
    Construct(ArgumentError),
}

impl SeedError {
    /// An [`SeedError::UnknownField`], with a suggestion if one of the
    /// accepted keys is close to `field`.
    pub fn unknown_field(type_name: &'static str, field: &str, expected: Vec<&'static str>) -> Self {
        let suggestion = expected
            .iter()
            .map(|candidate| (*candidate, strsim::jaro_winkler(field, candidate)))
            .filter(|(_, score)| *score >= 0.6)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate);
        SeedError::UnknownField {
            type_name,
            field: field.to_owned(),
            expected,
            suggestion,
        }
    }

    /// An [`SeedError::UnexpectedEvent`].
    pub fn unexpected(expected: &'static str, got: impl Into<String>) -> Self {
        SeedError::UnexpectedEvent {
            expected,
            got: got.into(),
        }
    }
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::UnknownField {
                type_name,
                field,
                expected,
                suggestion,
            } => {
                write!(f, "unknown field `{field}` for {type_name}")?;
                if let Some(suggestion) = suggestion {
                    write!(f, ", did you mean `{suggestion}`?")?;
                }
                if expected.is_empty() {
                    f.write_str(" (it has no fields)")
                } else {
                    write!(f, " (expected one of: {})", expected.join(", "))
                }
            }
            SeedError::Conversion(err) => write!(f, "{err}"),
            SeedError::MissingField { type_name, field } => {
                write!(f, "missing field `{field}` in type `{type_name}`")
            }
            SeedError::Configuration(err) => write!(f, "invalid type configuration: {err}"),
            SeedError::UnexpectedEvent { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            SeedError::UnexpectedEof => f.write_str("unexpected end of input"),
            SeedError::DepthLimitExceeded { max } => {
                write!(f, "nesting is deeper than the limit of {max}")
            }
            SeedError::NotOpen { type_name } => {
                write!(f, "{type_name} is already closed and takes no more values")
            }
            SeedError::NotClosed { type_name } => {
                write!(f, "{type_name} was asked for its value before it was complete")
            }
            SeedError::Poisoned { type_name } => {
                write!(f, "{type_name} already failed to construct")
            }
            SeedError::Construct(err) => write!(f, "constructor failed: {err}"),
        }
    }
}

impl std::error::Error for SeedError {}

impl From<ConfigurationError> for SeedError {
    fn from(err: ConfigurationError) -> Self {
        SeedError::Configuration(err)
    }
}

impl From<ArgumentError> for SeedError {
    fn from(err: ArgumentError) -> Self {
        SeedError::Construct(err)
    }
}

/// A [`SeedError`] together with where in the document it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedError {
    /// What went wrong.
    pub error: SeedError,
    /// The value being filled.
    pub path: Path,
    /// The input event that triggered the error, if known.
    pub span: Option<Span>,
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.error, self.path)?;
        if let Some(span) = self.span {
            write!(f, " (bytes {span})")?;
        }
        Ok(())
    }
}

impl std::error::Error for LocatedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Error produced by the format deserializer.
#[derive(Debug)]
pub enum DeserializeError<E> {
    /// The parser failed; passed through unchanged.
    Parser(E),
    /// The events did not describe a valid value of the target type.
    Seed(LocatedError),
}

impl<E> DeserializeError<E> {
    /// The seed error, unless the parser failed.
    pub fn seed_error(&self) -> Option<&SeedError> {
        match self {
            DeserializeError::Seed(located) => Some(&located.error),
            DeserializeError::Parser(_) => None,
        }
    }

    /// Where the seed error happened, unless the parser failed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DeserializeError::Seed(located) => Some(&located.path),
            DeserializeError::Parser(_) => None,
        }
    }

    /// The parser error, if the parser failed.
    pub fn parser_error(&self) -> Option<&E> {
        match self {
            DeserializeError::Parser(err) => Some(err),
            DeserializeError::Seed(_) => None,
        }
    }

    /// Convert the parser error type.
    pub fn map_parser<F>(self, f: impl FnOnce(E) -> F) -> DeserializeError<F> {
        match self {
            DeserializeError::Parser(err) => DeserializeError::Parser(f(err)),
            DeserializeError::Seed(located) => DeserializeError::Seed(located),
        }
    }
}

impl<E: fmt::Display> fmt::Display for DeserializeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeserializeError::Parser(err) => write!(f, "{err}"),
            DeserializeError::Seed(located) => write!(f, "{located}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DeserializeError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_field_suggests_close_keys() {
        let err = SeedError::unknown_field("Person", "nmae", vec!["name", "age"]);
        assert_eq!(
            err.to_string(),
            "unknown field `nmae` for Person, did you mean `name`? (expected one of: name, age)"
        );

        let err = SeedError::unknown_field("Person", "zzz", vec!["name", "age"]);
        assert!(matches!(
            err,
            SeedError::UnknownField {
                suggestion: None,
                ..
            }
        ));
    }

    #[test]
    fn located_errors_show_path_and_span() {
        let located = LocatedError {
            error: SeedError::MissingField {
                type_name: "Company",
                field: "name",
            },
            path: Path::from_iter([crate::PathStep::Field("company".into())]),
            span: Some(Span::new(10, 1)),
        };
        insta::assert_snapshot!(located, @"missing field `name` in type `Company` at $.company (bytes 10..11)");
    }
}
