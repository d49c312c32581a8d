//! Scalar codecs: turning raw input scalars into typed field values and back.

use core::any::{Any, TypeId};
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::scalar::{DecodeError, ScalarValue};
use crate::shape::{Erased, TypeRef};
use crate::MetadataKind;

/// A user-supplied conversion between one Rust type and raw scalars.
///
/// A codec owns both directions: whatever `to_raw` writes, `from_raw` must
/// accept. Attach it to a field with `#[seedling(codec = MyCodec)]` (a fresh
/// instance per field, built with `Default`) or register one instance
/// process-wide with [`CodecRegistry::register_singleton`] and refer to it
/// with `#[seedling(shared_codec = MyCodec)]`.
pub trait ValueCodec: Send + Sync + 'static {
    /// The field type this codec produces.
    type Value: Any;

    /// Encode a value as a raw scalar.
    fn to_raw(&self, value: &Self::Value) -> Result<ScalarValue, CodecError>;

    /// Decode a raw scalar.
    fn from_raw(&self, raw: &ScalarValue) -> Result<Self::Value, CodecError>;
}

/// A codec refused a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError(pub String);

impl CodecError {
    /// Wrap any message.
    pub fn new(message: impl Into<String>) -> Self {
        CodecError(message.into())
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CodecError {}

/// Object-safe view of a [`ValueCodec`].
pub trait ErasedCodec: Send + Sync {
    /// Name of the codec type, for error messages.
    fn codec_name(&self) -> &'static str;

    /// Decode a raw scalar into a boxed `Value`.
    fn decode(&self, raw: &ScalarValue) -> Result<Erased, DecodeError>;

    /// Encode a value; `None` if `value` is not the codec's `Value` type.
    fn encode(&self, value: &dyn Any) -> Option<Result<ScalarValue, CodecError>>;
}

impl<C: ValueCodec> ErasedCodec for C {
    fn codec_name(&self) -> &'static str {
        short_name(core::any::type_name::<C>())
    }

    fn decode(&self, raw: &ScalarValue) -> Result<Erased, DecodeError> {
        match self.from_raw(raw) {
            Ok(value) => Ok(Box::new(value)),
            Err(err) => Err(DecodeError::Codec {
                codec: self.codec_name(),
                message: err.0,
            }),
        }
    }

    fn encode(&self, value: &dyn Any) -> Option<Result<ScalarValue, CodecError>> {
        value
            .downcast_ref::<C::Value>()
            .map(|value| self.to_raw(value))
    }
}

pub(crate) fn short_name(path: &'static str) -> &'static str {
    // generic arguments may contain `::` too; only strip the leading path
    let head = path.split('<').next().unwrap_or(path);
    match head.rfind("::") {
        Some(pos) => &path[pos + 2..],
        None => path,
    }
}

/// A field's reference to its codec type, recorded by the derive.
///
/// `construct` is `None` for codecs declared with `shared_codec`: those must
/// have been registered as singletons before the owning type's metadata is
/// first built.
#[derive(Clone, Copy)]
pub struct CodecRef {
    type_id: fn() -> TypeId,
    name: fn() -> &'static str,
    construct: Option<fn() -> Arc<dyn ErasedCodec>>,
}

fn construct_default<C: ValueCodec + Default>() -> Arc<dyn ErasedCodec> {
    Arc::new(C::default())
}

impl CodecRef {
    /// A codec that is constructed with `Default` unless a singleton is registered.
    pub fn of<C: ValueCodec + Default>() -> Self {
        CodecRef {
            type_id: TypeId::of::<C>,
            name: core::any::type_name::<C>,
            construct: Some(construct_default::<C>),
        }
    }

    /// A codec that only exists as a registered singleton.
    pub fn shared<C: ValueCodec>() -> Self {
        CodecRef {
            type_id: TypeId::of::<C>,
            name: core::any::type_name::<C>,
            construct: None,
        }
    }

    /// Identity of the codec type.
    pub fn id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Fully qualified name of the codec type.
    pub fn name(&self) -> &'static str {
        (self.name)()
    }
}

impl fmt::Debug for CodecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CodecRef").field(&self.name()).finish()
    }
}

type Singletons = RwLock<HashMap<TypeId, Arc<dyn ErasedCodec>>>;

fn singletons() -> &'static Singletons {
    static SINGLETONS: OnceLock<Singletons> = OnceLock::new();
    SINGLETONS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Process-wide table of codec singletons.
///
/// Metadata resolves a field's codec once, when the owning type's metadata is
/// built, so a singleton has to be registered before that happens to be
/// picked up.
pub struct CodecRegistry;

impl CodecRegistry {
    /// Register `codec` as the one shared instance of `C`.
    ///
    /// Returns the previously registered instance, if any.
    pub fn register_singleton<C: ValueCodec>(codec: C) -> Option<Arc<dyn ErasedCodec>> {
        debug!(codec = core::any::type_name::<C>(), "registering codec singleton");
        let codec: Arc<dyn ErasedCodec> = Arc::new(codec);
        singletons().write().insert(TypeId::of::<C>(), codec)
    }

    /// The registered singleton of `C`, if any.
    pub fn singleton<C: ValueCodec>() -> Option<Arc<dyn ErasedCodec>> {
        singletons().read().get(&TypeId::of::<C>()).cloned()
    }

    /// Resolve a field's codec: the registered singleton if there is one,
    /// otherwise a freshly constructed instance.
    ///
    /// `None` if the codec is singleton-only and nothing is registered.
    pub fn resolve(codec: &CodecRef) -> Option<Arc<dyn ErasedCodec>> {
        if let Some(shared) = singletons().read().get(&codec.id()) {
            return Some(Arc::clone(shared));
        }
        codec.construct.map(|construct| construct())
    }
}

/// How a field's raw scalars are turned into values.
#[derive(Clone)]
pub enum ScalarCodec {
    /// The declared type's own decoding (see [`crate::Describe`]).
    Default(TypeRef),
    /// A codec attached to the field.
    Custom(Arc<dyn ErasedCodec>),
}

impl ScalarCodec {
    /// Decode `raw` into a value of the field's type.
    pub fn decode(&self, raw: &ScalarValue) -> Result<Erased, DecodeError> {
        match self {
            ScalarCodec::Default(ty) => decode_default(*ty, raw),
            ScalarCodec::Custom(codec) => codec.decode(raw),
        }
    }

    /// Encode a value of the field's type.
    pub fn encode(&self, value: &dyn Any) -> Result<ScalarValue, DecodeError> {
        match self {
            ScalarCodec::Default(ty) => encode_default(*ty, value),
            ScalarCodec::Custom(codec) => match codec.encode(value) {
                Some(Ok(raw)) => Ok(raw),
                Some(Err(err)) => Err(DecodeError::Codec {
                    codec: codec.codec_name(),
                    message: err.0,
                }),
                None => Err(DecodeError::Mismatch {
                    expected: codec.codec_name(),
                }),
            },
        }
    }

    /// Whether a codec is attached to the field.
    pub fn is_custom(&self) -> bool {
        matches!(self, ScalarCodec::Custom(_))
    }
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarCodec::Default(ty) => f.debug_tuple("Default").field(ty).finish(),
            ScalarCodec::Custom(codec) => f.debug_tuple("Custom").field(&codec.codec_name()).finish(),
        }
    }
}

fn decode_default(ty: TypeRef, raw: &ScalarValue) -> Result<Erased, DecodeError> {
    let meta = ty
        .metadata()
        .map_err(|err| DecodeError::Configuration(err.to_string()))?;
    match &meta.kind {
        MetadataKind::Scalar(def) => (def.decode)(raw),
        MetadataKind::Optional(def) => {
            if raw.is_null() {
                Ok((def.none)())
            } else {
                let inner = decode_default(def.inner, raw)?;
                (def.some)(inner).map_err(|err| DecodeError::Configuration(err.to_string()))
            }
        }
        MetadataKind::Struct(_) | MetadataKind::Sequence(_) => Err(DecodeError::NotScalar {
            expected: meta.type_name,
        }),
    }
}

fn encode_default(ty: TypeRef, value: &dyn Any) -> Result<ScalarValue, DecodeError> {
    let meta = ty
        .metadata()
        .map_err(|err| DecodeError::Configuration(err.to_string()))?;
    match &meta.kind {
        MetadataKind::Scalar(def) => (def.encode)(value).ok_or(DecodeError::Mismatch {
            expected: meta.type_name,
        }),
        MetadataKind::Optional(def) => match (def.inspect)(value) {
            Some(None) => Ok(ScalarValue::Null),
            Some(Some(inner)) => encode_default(def.inner, inner),
            None => Err(DecodeError::Mismatch {
                expected: meta.type_name,
            }),
        },
        MetadataKind::Struct(_) | MetadataKind::Sequence(_) => Err(DecodeError::NotScalar {
            expected: meta.type_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Upper;

    impl ValueCodec for Upper {
        type Value = String;

        fn to_raw(&self, value: &String) -> Result<ScalarValue, CodecError> {
            Ok(ScalarValue::Str(value.to_lowercase()))
        }

        fn from_raw(&self, raw: &ScalarValue) -> Result<String, CodecError> {
            raw.as_str()
                .map(str::to_uppercase)
                .ok_or_else(|| CodecError::new("expected a string"))
        }
    }

    struct Registered;

    impl ValueCodec for Registered {
        type Value = u8;

        fn to_raw(&self, value: &u8) -> Result<ScalarValue, CodecError> {
            Ok(ScalarValue::U64(u64::from(*value)))
        }

        fn from_raw(&self, _raw: &ScalarValue) -> Result<u8, CodecError> {
            Ok(42)
        }
    }

    #[test]
    fn custom_codec_round_trips() {
        seedling_testhelpers::setup();

        let codec = ScalarCodec::Custom(Arc::new(Upper));
        assert!(codec.is_custom());

        let value = codec.decode(&ScalarValue::from("shout")).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("SHOUT"));
        assert_eq!(codec.encode(&*value), Ok(ScalarValue::from("shout")));

        let err = codec.decode(&ScalarValue::Bool(true)).unwrap_err();
        assert_eq!(err.to_string(), "Upper: expected a string");
    }

    #[test]
    fn default_codec_unwraps_options() {
        seedling_testhelpers::setup();

        let codec = ScalarCodec::Default(TypeRef::of::<Option<u32>>());
        let none = codec.decode(&ScalarValue::Null).unwrap();
        assert_eq!(none.downcast_ref::<Option<u32>>(), Some(&None));

        let some = codec.decode(&ScalarValue::U64(3)).unwrap();
        assert_eq!(some.downcast_ref::<Option<u32>>(), Some(&Some(3)));
        assert_eq!(codec.encode(&*some), Ok(ScalarValue::U64(3)));
        assert_eq!(codec.encode(&*none), Ok(ScalarValue::Null));
    }

    #[test]
    fn default_codec_rejects_composites() {
        seedling_testhelpers::setup();

        let codec = ScalarCodec::Default(TypeRef::of::<Vec<u8>>());
        assert_eq!(
            codec.decode(&ScalarValue::U64(1)).unwrap_err(),
            DecodeError::NotScalar { expected: "Vec" }
        );
    }

    #[test]
    fn singleton_is_preferred_over_construction() {
        seedling_testhelpers::setup();

        assert!(CodecRegistry::resolve(&CodecRef::shared::<Registered>()).is_none());

        CodecRegistry::register_singleton(Registered);
        let a = CodecRegistry::resolve(&CodecRef::shared::<Registered>()).unwrap();
        let b = CodecRegistry::resolve(&CodecRef::shared::<Registered>()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let x = CodecRegistry::resolve(&CodecRef::of::<Upper>()).unwrap();
        let y = CodecRegistry::resolve(&CodecRef::of::<Upper>()).unwrap();
        assert!(!Arc::ptr_eq(&x, &y));
    }

    #[test]
    fn codec_names_drop_module_paths() {
        assert_eq!(short_name("a::b::Codec"), "Codec");
        assert_eq!(short_name("Codec"), "Codec");
        assert_eq!(short_name("a::Wrap<b::C>"), "Wrap<b::C>");
    }
}
