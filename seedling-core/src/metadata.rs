//! Per-type construction metadata and the process-wide cache that owns it.

use core::any::{Any, TypeId};
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::codec::{CodecRegistry, ScalarCodec};
use crate::shape::{
    ArgumentError, Arguments, Convert, Def, Describe, Erased, Inspect, ListDef, OptionDef, ScalarDef,
    StructDef, TypeRef,
};

/// Immutable construction metadata of one type.
///
/// Built once per type by [`metadata_for`] and shared through an [`Arc`]
/// for the rest of the process.
#[derive(Debug)]
pub struct TypeMetadata {
    /// Short name of the type.
    pub type_name: &'static str,
    /// Identity of the type.
    pub type_id: TypeId,
    /// What kind of value the type is and how to build it.
    pub kind: MetadataKind,
}

impl TypeMetadata {
    /// The struct metadata, if the type is a struct.
    pub fn as_struct(&self) -> Option<&Arc<StructMetadata>> {
        match &self.kind {
            MetadataKind::Struct(meta) => Some(meta),
            _ => None,
        }
    }
}

/// How values of a type are built.
#[derive(Clone)]
pub enum MetadataKind {
    /// From one scalar, with the type's default codec.
    Scalar(ScalarDef),
    /// From named fields.
    Struct(Arc<StructMetadata>),
    /// From an ordered run of elements.
    Sequence(ListDef),
    /// From nothing (`null`) or one inner value.
    Optional(OptionDef),
}

impl fmt::Debug for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKind::Scalar(_) => f.write_str("Scalar"),
            MetadataKind::Struct(meta) => f.debug_tuple("Struct").field(meta).finish(),
            MetadataKind::Sequence(def) => f.debug_tuple("Sequence").field(&def.element).finish(),
            MetadataKind::Optional(def) => f.debug_tuple("Optional").field(&def.inner).finish(),
        }
    }
}

/// Constructor parameters of a struct, and the input keys that reach them.
pub struct StructMetadata {
    type_name: &'static str,
    params: Vec<FieldDescriptor>,
    name_index: HashMap<&'static str, usize>,
    construct: fn(&mut Arguments) -> Result<Erased, ArgumentError>,
    inspect: Inspect,
}

impl StructMetadata {
    /// Short name of the struct.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The parameter an input key fills. Excluded fields are never found.
    pub fn lookup(&self, key: &str) -> Option<&FieldDescriptor> {
        self.name_index.get(key).map(|&index| &self.params[index])
    }

    /// Parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&FieldDescriptor> {
        self.params.get(index)
    }

    /// All parameters, in declaration order.
    pub fn params(&self) -> &[FieldDescriptor] {
        &self.params
    }

    /// Accepted input keys, in declaration order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.params
            .iter()
            .filter(|param| !param.excluded)
            .map(|param| param.key)
            .collect()
    }

    /// Invoke the constructor.
    pub fn construct(&self, args: &mut Arguments) -> Result<Erased, ArgumentError> {
        (self.construct)(args)
    }

    /// Borrow the field values of an instance, in declaration order.
    pub fn inspect<'a>(&self, value: &'a dyn Any) -> Option<Vec<&'a dyn Any>> {
        (self.inspect)(value)
    }
}

impl fmt::Debug for StructMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructMetadata")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One constructor parameter.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Position in the constructor.
    pub index: usize,
    /// Declared field name.
    pub name: &'static str,
    /// Input key (the alias if the field is renamed).
    pub key: &'static str,
    /// Type read from input; differs from the declared type when the field
    /// converts (see [`FieldDescriptor::convert`]).
    pub ty: TypeRef,
    /// Never read from input.
    pub excluded: bool,
    /// How raw scalars become values of `ty`.
    pub codec: ScalarCodec,
    default: Option<fn() -> Erased>,
    convert: Option<Convert>,
}

impl FieldDescriptor {
    /// Whether the field may be absent from the input.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// A fresh default value, if the field has one.
    pub fn default_value(&self) -> Option<Erased> {
        self.default.map(|default| default())
    }

    /// Whether values read as `ty` still have to be converted to the declared type.
    pub fn converts(&self) -> bool {
        self.convert.is_some()
    }

    /// Turn a value read from input into a value of the declared type.
    pub fn convert(&self, value: Erased) -> Result<Erased, ArgumentError> {
        match self.convert {
            Some(convert) => convert(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("key", &self.key)
            .field("ty", &self.ty)
            .field("excluded", &self.excluded)
            .field("codec", &self.codec)
            .field("has_default", &self.has_default())
            .field("converts", &self.converts())
            .finish()
    }
}

/// A type's descriptor is inconsistent.
///
/// Reported when the metadata is first built and cached like the metadata
/// itself, so every later lookup sees the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A skipped field has no way to get a value.
    ExcludedWithoutDefault {
        /// Owning type.
        type_name: &'static str,
        /// Declared field name.
        field: &'static str,
    },
    /// Two fields are read from the same input key.
    DuplicateKey {
        /// Owning type.
        type_name: &'static str,
        /// The shared key.
        key: &'static str,
    },
    /// A shared codec was never registered.
    UnresolvedCodec {
        /// Owning type.
        type_name: &'static str,
        /// Declared field name.
        field: &'static str,
        /// The codec type.
        codec: &'static str,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ExcludedWithoutDefault { type_name, field } => write!(
                f,
                "{type_name}.{field} is skipped but has no default and is not optional"
            ),
            ConfigurationError::DuplicateKey { type_name, key } => {
                write!(f, "{type_name} reads more than one field from key `{key}`")
            }
            ConfigurationError::UnresolvedCodec {
                type_name,
                field,
                codec,
            } => write!(
                f,
                "{type_name}.{field} uses shared codec {codec}, which is not registered"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

type Built = Result<Arc<TypeMetadata>, ConfigurationError>;

fn cache() -> &'static RwLock<HashMap<TypeId, Built>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Built>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Metadata of `T`, built on first use and cached for the rest of the process.
///
/// Every call for the same type returns the same [`Arc`].
pub fn metadata_for<T: Describe>() -> Result<Arc<TypeMetadata>, ConfigurationError> {
    TypeRef::of::<T>().metadata()
}

impl TypeRef {
    /// Metadata of the referenced type; see [`metadata_for`].
    pub fn metadata(&self) -> Result<Arc<TypeMetadata>, ConfigurationError> {
        let type_id = self.id();
        if let Some(built) = cache().read().get(&type_id) {
            return built.clone();
        }

        // Built without holding the lock: racing builders produce equal
        // metadata and the first insert wins.
        let built = build(*self).map(Arc::new);
        cache().write().entry(type_id).or_insert(built).clone()
    }
}

fn build(ty: TypeRef) -> Result<TypeMetadata, ConfigurationError> {
    let shape = ty.shape();
    debug!(type_name = shape.type_name, "building metadata");
    let kind = match shape.def {
        Def::Scalar(def) => MetadataKind::Scalar(def),
        Def::List(def) => MetadataKind::Sequence(def),
        Def::Option(def) => MetadataKind::Optional(def),
        Def::Struct(def) => MetadataKind::Struct(Arc::new(build_struct(shape.type_name, def)?)),
    };
    Ok(TypeMetadata {
        type_name: shape.type_name,
        type_id: ty.id(),
        kind,
    })
}

fn build_struct(
    type_name: &'static str,
    def: StructDef,
) -> Result<StructMetadata, ConfigurationError> {
    let mut params = Vec::with_capacity(def.fields.len());
    let mut name_index = HashMap::with_capacity(def.fields.len());

    for (index, field) in def.fields.into_iter().enumerate() {
        let key = field.rename.unwrap_or(field.name);

        let default = match field.default {
            Some(default) => Some(default),
            // the implicit `None` is only right for the declared type
            None if field.convert.is_none() => implicit_default(field.ty),
            None => None,
        };
        if field.skip && default.is_none() {
            return Err(ConfigurationError::ExcludedWithoutDefault {
                type_name,
                field: field.name,
            });
        }

        let codec = match field.codec {
            Some(codec) => {
                let resolved = CodecRegistry::resolve(&codec).ok_or(
                    ConfigurationError::UnresolvedCodec {
                        type_name,
                        field: field.name,
                        codec: codec.name(),
                    },
                )?;
                ScalarCodec::Custom(resolved)
            }
            None => ScalarCodec::Default(field.ty),
        };

        if !field.skip && name_index.insert(key, index).is_some() {
            return Err(ConfigurationError::DuplicateKey { type_name, key });
        }

        trace!(type_name, field = field.name, key, skip = field.skip, "field");
        params.push(FieldDescriptor {
            index,
            name: field.name,
            key,
            ty: field.ty,
            excluded: field.skip,
            codec,
            default,
            convert: field.convert,
        });
    }

    Ok(StructMetadata {
        type_name,
        params,
        name_index,
        construct: def.construct,
        inspect: def.inspect,
    })
}

/// Optional fields default to empty.
fn implicit_default(ty: TypeRef) -> Option<fn() -> Erased> {
    if !ty.is_optional() {
        return None;
    }
    match ty.shape().def {
        Def::Option(def) => Some(def.none),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{FieldShape, Shape};
    use crate::{CodecError, CodecRef, ScalarValue, ValueCodec};

    #[derive(Debug, PartialEq)]
    struct Person {
        name: String,
        age: u32,
        first_name: String,
        internal_id: u64,
        nickname: Option<String>,
    }

    fn default_age() -> Erased {
        Box::new(20u32)
    }

    fn default_id() -> Erased {
        Box::new(0u64)
    }

    impl Describe for Person {
        fn shape() -> Shape {
            fn construct(args: &mut Arguments) -> Result<Erased, ArgumentError> {
                let value = Person {
                    name: args.take(0)?,
                    age: args.take(1)?,
                    first_name: args.take(2)?,
                    internal_id: args.take(3)?,
                    nickname: args.take(4)?,
                };
                Ok(Box::new(value))
            }
            fn inspect(value: &dyn Any) -> Option<Vec<&dyn Any>> {
                let p = value.downcast_ref::<Person>()?;
                Some(vec![
                    &p.name as &dyn Any,
                    &p.age as &dyn Any,
                    &p.first_name as &dyn Any,
                    &p.internal_id as &dyn Any,
                    &p.nickname as &dyn Any,
                ])
            }
            Shape::structure(
                "Person",
                vec![
                    FieldShape::new("name", TypeRef::of::<String>()),
                    FieldShape::new("age", TypeRef::of::<u32>()).default_with(default_age),
                    FieldShape::new("first_name", TypeRef::of::<String>()).rename("alias"),
                    FieldShape::new("internal_id", TypeRef::of::<u64>())
                        .skip()
                        .default_with(default_id),
                    FieldShape::new("nickname", TypeRef::of::<Option<String>>()),
                ],
                construct,
                inspect,
            )
        }
    }

    fn no_construct(args: &mut Arguments) -> Result<Erased, ArgumentError> {
        args.take::<u8>(0).map(|v| Box::new(v) as Erased)
    }

    fn no_inspect(_: &dyn Any) -> Option<Vec<&dyn Any>> {
        None
    }

    struct SkipsRequired;

    impl Describe for SkipsRequired {
        fn shape() -> Shape {
            Shape::structure(
                "SkipsRequired",
                vec![FieldShape::new("secret", TypeRef::of::<u8>()).skip()],
                no_construct,
                no_inspect,
            )
        }
    }

    struct SharedKey;

    impl Describe for SharedKey {
        fn shape() -> Shape {
            Shape::structure(
                "SharedKey",
                vec![
                    FieldShape::new("a", TypeRef::of::<u8>()).rename("k"),
                    FieldShape::new("k", TypeRef::of::<u8>()),
                ],
                no_construct,
                no_inspect,
            )
        }
    }

    struct Unregistered;

    impl ValueCodec for Unregistered {
        type Value = u8;

        fn to_raw(&self, value: &u8) -> Result<ScalarValue, CodecError> {
            Ok(ScalarValue::U64(u64::from(*value)))
        }

        fn from_raw(&self, _: &ScalarValue) -> Result<u8, CodecError> {
            Err(CodecError::new("never"))
        }
    }

    struct NeedsShared;

    impl Describe for NeedsShared {
        fn shape() -> Shape {
            Shape::structure(
                "NeedsShared",
                vec![
                    FieldShape::new("v", TypeRef::of::<u8>())
                        .codec(CodecRef::shared::<Unregistered>()),
                ],
                no_construct,
                no_inspect,
            )
        }
    }

    #[test]
    fn keys_follow_rename_and_skip() {
        seedling_testhelpers::setup();

        let meta = metadata_for::<Person>().unwrap();
        let person = meta.as_struct().unwrap();

        assert_eq!(person.keys(), vec!["name", "age", "alias", "nickname"]);
        assert_eq!(person.lookup("alias").map(|p| p.name), Some("first_name"));
        assert!(person.lookup("first_name").is_none());
        assert!(person.lookup("internal_id").is_none());

        let internal = person.param(3).unwrap();
        assert!(internal.excluded);
        assert!(internal.has_default());
    }

    #[test]
    fn defaults_are_explicit_or_optional() {
        seedling_testhelpers::setup();

        let meta = metadata_for::<Person>().unwrap();
        let person = meta.as_struct().unwrap();

        let age = person.lookup("age").unwrap().default_value().unwrap();
        assert_eq!(age.downcast_ref::<u32>(), Some(&20));

        let nickname = person.lookup("nickname").unwrap();
        assert!(nickname.has_default());
        let value = nickname.default_value().unwrap();
        assert_eq!(value.downcast_ref::<Option<String>>(), Some(&None));

        assert!(!person.lookup("name").unwrap().has_default());
    }

    #[test]
    fn metadata_is_built_once() {
        seedling_testhelpers::setup();

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(metadata_for::<Person>))
            .collect();
        let all: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        for meta in &all {
            assert!(Arc::ptr_eq(meta, &all[0]));
        }
        assert!(Arc::ptr_eq(&metadata_for::<Person>().unwrap(), &all[0]));
    }

    #[test]
    fn skipped_field_needs_default() {
        seedling_testhelpers::setup();

        let err = metadata_for::<SkipsRequired>().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ExcludedWithoutDefault {
                type_name: "SkipsRequired",
                field: "secret"
            }
        );
        // cached: the same error comes back
        assert_eq!(metadata_for::<SkipsRequired>().unwrap_err(), err);
    }

    #[test]
    fn keys_must_be_unique() {
        seedling_testhelpers::setup();

        assert_eq!(
            metadata_for::<SharedKey>().unwrap_err().to_string(),
            "SharedKey reads more than one field from key `k`"
        );
    }

    #[test]
    fn shared_codec_must_be_registered() {
        seedling_testhelpers::setup();

        let err = metadata_for::<NeedsShared>().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnresolvedCodec {
                type_name: "NeedsShared",
                field: "v",
                ..
            }
        ));
    }

    #[test]
    fn non_struct_kinds() {
        seedling_testhelpers::setup();

        let meta = metadata_for::<Vec<Option<bool>>>().unwrap();
        let MetadataKind::Sequence(def) = &meta.kind else {
            panic!("expected a sequence, got {:?}", meta.kind);
        };
        assert!(def.element.is_optional());
        assert!(matches!(
            metadata_for::<bool>().unwrap().kind,
            MetadataKind::Scalar(_)
        ));
    }
}
