#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Build Rust values from JSON with per-type construction metadata.
//!
//! Derive [`Describe`] on a struct and read it with [`json::from_str`]:
//!
//! ```
//! use seedling::Describe;
//!
//! #[derive(Describe, Debug, PartialEq)]
//! struct Language {
//!     name: String,
//!     #[seedling(default = 20)]
//!     age: u32,
//! }
//!
//! let language: Language = seedling::json::from_str(r#"{"name": "Kotlin"}"#).unwrap();
//! assert_eq!(language, Language { name: "Kotlin".into(), age: 20 });
//! ```
//!
//! Field attributes:
//!
//! | attribute | effect |
//! |---|---|
//! | `#[seedling(rename = "alias")]` | read and write the field under `alias` |
//! | `#[seedling(skip)]` | never read from input; needs a default |
//! | `#[seedling(default)]` | use `Default::default()` when absent |
//! | `#[seedling(default = expr)]` | use `expr` when absent |
//! | `#[seedling(codec = Codec)]` | convert raw scalars with a [`ValueCodec`] built for this field |
//! | `#[seedling(shared_codec = Codec)]` | use the codec registered with [`CodecRegistry::register_singleton`] |
//! | `#[seedling(deserialize_as = Concrete)]` | read the field as `Concrete` and box it into the declared `Box<dyn Trait>`; such fields cannot be serialized |
//!
//! Unit-only enums derive a scalar description matched by variant name
//! (`#[seedling(rename = "..")]` on variants).

pub use seedling_core::*;

pub use seedling_macros::Describe;

pub use seedling_format::{
    ConversionError, DeserializeError, DeserializeOptions, EventKind, FormatParser,
    FormatSerializer, Found, LocatedError, ParseEvent, Path, PathStep, SeedError, SerializeError,
    Span, UnknownFields, deserialize, deserialize_events, deserialize_with_options,
    serialize_root,
};

/// The format-agnostic engine: events, seeds and the dispatcher.
pub use seedling_format as format;

/// JSON parser and writer.
#[cfg(feature = "json")]
pub use seedling_json as json;
