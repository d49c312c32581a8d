#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! JSON front end for seedling.
//!
//! [`JsonParser`] turns a document into parse events for the
//! [`seedling_format`] dispatcher; [`JsonSerializer`] writes values back out.

/// Debug-level logging macro that forwards to `tracing::debug!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use debug;
#[allow(unused_imports)]
pub(crate) use trace;

mod error;
mod parser;
pub mod scanner;
mod serializer;

pub use error::{JsonError, JsonErrorKind};
pub use parser::JsonParser;
pub use serializer::{
    JsonSerializeError, JsonSerializer, SerializeOptions, to_string, to_string_pretty,
    to_string_with_options, to_vec,
};

pub use seedling_format::{DeserializeError, DeserializeOptions, UnknownFields};

use seedling_core::Describe;

/// Deserialize a `T` from a JSON string, rejecting unknown keys.
pub fn from_str<T: Describe>(input: &str) -> Result<T, DeserializeError<JsonError>> {
    from_slice(input.as_bytes())
}

/// Deserialize a `T` from a JSON string with explicit options.
pub fn from_str_with_options<T: Describe>(
    input: &str,
    options: DeserializeOptions,
) -> Result<T, DeserializeError<JsonError>> {
    from_slice_with_options(input.as_bytes(), options)
}

/// Deserialize a `T` from JSON bytes, rejecting unknown keys.
pub fn from_slice<T: Describe>(input: &[u8]) -> Result<T, DeserializeError<JsonError>> {
    from_slice_with_options(input, DeserializeOptions::default())
}

/// Deserialize a `T` from JSON bytes with explicit options.
pub fn from_slice_with_options<T: Describe>(
    input: &[u8],
    options: DeserializeOptions,
) -> Result<T, DeserializeError<JsonError>> {
    debug!(len = input.len(), target = core::any::type_name::<T>(), "from_slice");
    seedling_format::deserialize_with_options(JsonParser::new(input), options)
}
