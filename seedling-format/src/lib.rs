#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Format-agnostic deserialization for seedling.
//!
//! A format crate turns its input into a flat stream of [`ParseEvent`]s by
//! implementing [`FormatParser`]. The [`Dispatcher`] routes those events to
//! seeds that accumulate the parts of each object and array and build the
//! value once its composite ends, guided only by the cached
//! [`TypeMetadata`](seedling_core::TypeMetadata) of the target type.
//!
//! The opposite direction walks a value through the same metadata and
//! drives a [`FormatSerializer`].

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

mod deserializer;
mod dispatcher;
mod error;
mod event;
mod options;
mod parser;
mod path;
pub mod seed;
mod serializer;

pub use deserializer::{FormatDeserializer, deserialize, deserialize_events, deserialize_with_options};
pub use dispatcher::Dispatcher;
pub use error::{ConversionError, DeserializeError, Found, LocatedError, SeedError};
pub use event::{EventKind, ParseEvent, Pos, Span};
pub use options::{DeserializeOptions, UnknownFields};
pub use parser::{EventReplay, EventSink, FormatParser};
pub use path::{Path, PathStep};
pub use seed::{CollectionSeed, CompositeKind, ObjectSeed, Seed, SeedState, Slot, lift, open_child};
pub use serializer::{FormatSerializer, SerializeError, serialize_erased, serialize_root};
