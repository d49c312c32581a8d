#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Type descriptors and construction metadata for seedling.
//!
//! A type opts into seedling by implementing [`Describe`], usually through
//! `#[derive(Describe)]`. The [`Shape`] it returns is turned into an immutable
//! [`TypeMetadata`] exactly once per type and cached for the rest of the
//! process; deserializers only ever look at the cached metadata.

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

mod codec;
mod impls;
mod metadata;
mod scalar;
mod shape;

pub use codec::{CodecError, CodecRef, CodecRegistry, ErasedCodec, ScalarCodec, ValueCodec};
pub use metadata::{
    ConfigurationError, FieldDescriptor, MetadataKind, StructMetadata, TypeMetadata, metadata_for,
};
pub use scalar::{DecodeError, ScalarValue};
pub use shape::{
    ArgumentError, Arguments, Convert, Def, Describe, Erased, FieldShape, Inspect, ListDef, OptionDef,
    ScalarDef, Shape, StructDef, TypeRef,
};
