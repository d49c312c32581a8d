use core::any::{Any, TypeId};
use core::fmt;
use core::marker::PhantomData;

use crate::codec::CodecRef;
use crate::scalar::{DecodeError, ScalarValue};

/// A fully constructed value whose concrete type is only known through its [`TypeRef`].
pub type Erased = Box<dyn Any>;

/// Turns a value of a field's concrete type into a value of the declared type.
pub type Convert = fn(Erased) -> Result<Erased, ArgumentError>;

/// Borrowed views of a value's children, in declaration (or element) order.
pub type Inspect = for<'a> fn(&'a dyn Any) -> Option<Vec<&'a dyn Any>>;

/// Types that can describe how they are built from named parts.
///
/// Implemented by `#[derive(Describe)]` for structs with named fields and
/// unit-only enums, and by hand for the std types seedling ships with.
pub trait Describe: Any + Sized {
    /// Whether a missing value of this type means "empty" rather than "missing".
    ///
    /// Only `Option<T>` sets this.
    const OPTIONAL: bool = false;

    /// Produce this type's descriptor.
    ///
    /// Should be cheap and pure: the metadata cache may call it more than
    /// once when threads race to build the same type.
    fn shape() -> Shape;
}

/// A lazy handle to a described type.
///
/// Field shapes refer to their types through a `TypeRef` instead of their
/// metadata, so describing a type never requires describing its fields'
/// types first.
#[derive(Clone, Copy)]
pub struct TypeRef {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    shape: fn() -> Shape,
    optional: bool,
}

impl TypeRef {
    /// Handle for `T`.
    pub fn of<T: Describe>() -> Self {
        TypeRef {
            type_id: TypeId::of::<T>,
            type_name: core::any::type_name::<T>,
            shape: T::shape,
            optional: T::OPTIONAL,
        }
    }

    /// Handle for a type that only a field codec knows how to read.
    ///
    /// Used by the derive for fields carrying a codec, whose types need not
    /// implement [`Describe`]. The default codec of such a type rejects
    /// every scalar. It is cached apart from `T`'s own metadata.
    pub fn opaque<T: Any>() -> Self {
        TypeRef {
            type_id: TypeId::of::<Opaque<T>>,
            type_name: core::any::type_name::<T>,
            shape: opaque_shape::<T>,
            optional: false,
        }
    }

    /// Identity of the referenced type, the metadata cache key.
    pub fn id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Fully qualified Rust name of the referenced type.
    pub fn name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Whether the type is `Option`-like (see [`Describe::OPTIONAL`]).
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Build a fresh descriptor. Prefer [`TypeRef::metadata`], which is cached.
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

/// Cache key of [`TypeRef::opaque`].
#[allow(dead_code)]
struct Opaque<T>(PhantomData<T>);

fn opaque_shape<T: Any>() -> Shape {
    fn decode(_: &ScalarValue) -> Result<Erased, DecodeError> {
        Err(DecodeError::Mismatch {
            expected: "a value read by its codec",
        })
    }

    Shape::scalar(
        crate::codec::short_name(core::any::type_name::<T>()),
        ScalarDef {
            decode,
            encode: |_| None,
        },
    )
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name()).finish()
    }
}

/// The raw description of a type, as produced by [`Describe::shape`].
pub struct Shape {
    /// Short, human-facing name of the type (used in error messages).
    pub type_name: &'static str,
    /// How values of the type are built.
    pub def: Def,
}

impl Shape {
    /// A type built directly from one scalar.
    pub const fn scalar(type_name: &'static str, def: ScalarDef) -> Self {
        Shape {
            type_name,
            def: Def::Scalar(def),
        }
    }

    /// A type built from named fields through a positional constructor.
    pub fn structure(
        type_name: &'static str,
        fields: Vec<FieldShape>,
        construct: fn(&mut Arguments) -> Result<Erased, ArgumentError>,
        inspect: Inspect,
    ) -> Self {
        Shape {
            type_name,
            def: Def::Struct(StructDef {
                fields,
                construct,
                inspect,
            }),
        }
    }
}

/// The construction contract of a described type.
pub enum Def {
    /// Built from a single scalar by the type's default codec.
    Scalar(ScalarDef),
    /// Built from named fields.
    Struct(StructDef),
    /// An ordered sequence of elements of one type.
    List(ListDef),
    /// Either empty or one value of the inner type.
    Option(OptionDef),
}

/// Default codec of a scalar type.
#[derive(Clone, Copy)]
pub struct ScalarDef {
    /// Turn a raw scalar into a boxed value of the type.
    pub decode: fn(&ScalarValue) -> Result<Erased, DecodeError>,
    /// Turn a value of the type back into a raw scalar; `None` if `value` is another type.
    pub encode: fn(&dyn Any) -> Option<ScalarValue>,
}

/// Construction contract of a struct.
pub struct StructDef {
    /// Constructor parameters, in declaration order.
    pub fields: Vec<FieldShape>,
    /// Build the value from a complete argument set.
    pub construct: fn(&mut Arguments) -> Result<Erased, ArgumentError>,
    /// Borrow the field values of an existing instance, in declaration order.
    pub inspect: Inspect,
}

/// Construction contract of a sequence type.
#[derive(Clone, Copy)]
pub struct ListDef {
    /// Element type.
    pub element: TypeRef,
    /// Assemble the sequence from its elements, in order.
    pub collect: fn(Vec<Erased>) -> Result<Erased, ArgumentError>,
    /// Borrow the elements of an existing sequence.
    pub inspect: Inspect,
}

/// Construction contract of an optional type.
#[derive(Clone, Copy)]
pub struct OptionDef {
    /// The wrapped type.
    pub inner: TypeRef,
    /// Wrap an inner value.
    pub some: fn(Erased) -> Result<Erased, ArgumentError>,
    /// The empty value.
    pub none: fn() -> Erased,
    /// Borrow the inner value of an existing instance; the outer `None` means
    /// `value` is not of this type.
    pub inspect: for<'a> fn(&'a dyn Any) -> Option<Option<&'a dyn Any>>,
}

/// One constructor parameter, as declared.
#[derive(Clone)]
pub struct FieldShape {
    /// Declared field name.
    pub name: &'static str,
    /// Type read from input: the declared type, or the concrete type of a
    /// field with [`FieldShape::convert`].
    pub ty: TypeRef,
    /// Input key to use instead of `name`.
    pub rename: Option<&'static str>,
    /// Never read from input; always defaulted.
    pub skip: bool,
    /// Produces the value used when the input does not supply one.
    pub default: Option<fn() -> Erased>,
    /// Custom codec for this field.
    pub codec: Option<CodecRef>,
    /// Turns values read as `ty` into the declared type.
    pub convert: Option<Convert>,
}

impl FieldShape {
    /// A plain field: required, read under its own name, default codec.
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        FieldShape {
            name,
            ty,
            rename: None,
            skip: false,
            default: None,
            codec: None,
            convert: None,
        }
    }

    /// Read the field from `alias` instead of its declared name.
    pub fn rename(mut self, alias: &'static str) -> Self {
        self.rename = Some(alias);
        self
    }

    /// Never read the field from input.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Use `default` when the input does not supply the field.
    pub fn default_with(mut self, default: fn() -> Erased) -> Self {
        self.default = Some(default);
        self
    }

    /// Route the field's raw scalars through a custom codec.
    pub fn codec(mut self, codec: CodecRef) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Turn values read as `ty` into the declared type with `convert`, e.g.
    /// a struct into a `Box<dyn Trait>`. `ty` is then the concrete type.
    pub fn convert(mut self, convert: Convert) -> Self {
        self.convert = Some(convert);
        self
    }
}

/// Positional argument set handed to a struct constructor.
///
/// Every slot is filled before the constructor runs; the constructor only
/// takes values out.
pub struct Arguments {
    type_name: &'static str,
    values: Vec<Option<Erased>>,
}

impl Arguments {
    /// An empty argument set for a constructor with `len` parameters.
    pub fn new(type_name: &'static str, len: usize) -> Self {
        Arguments {
            type_name,
            values: (0..len).map(|_| None).collect(),
        }
    }

    /// Fill parameter `index`, replacing any earlier value.
    pub fn set(&mut self, index: usize, value: Erased) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = Some(value);
        }
    }

    /// Whether parameter `index` has a value.
    pub fn is_set(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// Move parameter `index` out as a `T`.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, ArgumentError> {
        let type_name = self.type_name;
        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ArgumentError::Missing { type_name, index })?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ArgumentError::TypeMismatch {
                type_name,
                index,
                expected: core::any::type_name::<T>(),
            })
    }
}

/// A constructor was handed an argument set that does not fit its signature.
///
/// Seeds only build argument sets from the same metadata the constructor
/// was described with, so this indicates a hand-written [`Describe`] impl
/// whose shape and constructor disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// No value for parameter `index`.
    Missing {
        /// Type being constructed.
        type_name: &'static str,
        /// Parameter position.
        index: usize,
    },
    /// The value for parameter `index` has another type.
    TypeMismatch {
        /// Type being constructed.
        type_name: &'static str,
        /// Parameter position.
        index: usize,
        /// Type the constructor asked for.
        expected: &'static str,
    },
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::Missing { type_name, index } => {
                write!(f, "no argument #{index} for {type_name}")
            }
            ArgumentError::TypeMismatch {
                type_name,
                index,
                expected,
            } => write!(
                f,
                "argument #{index} for {type_name} is not a {expected}"
            ),
        }
    }
}

impl std::error::Error for ArgumentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_handles_are_cached_apart() {
        seedling_testhelpers::setup();

        let plain = TypeRef::of::<u32>();
        let opaque = TypeRef::opaque::<u32>();
        assert_ne!(plain, opaque);
        assert_eq!(opaque.metadata().unwrap().type_name, "u32");

        let raw = ScalarValue::U64(1);
        assert!(crate::ScalarCodec::Default(opaque).decode(&raw).is_err());
        assert!(crate::ScalarCodec::Default(plain).decode(&raw).is_ok());
    }

    #[test]
    fn take_moves_values_out_once() {
        seedling_testhelpers::setup();

        let mut args = Arguments::new("Pair", 2);
        args.set(0, Box::new(7u32));
        args.set(1, Box::new(String::from("seven")));
        assert!(args.is_set(0));

        assert_eq!(args.take::<u32>(0), Ok(7));
        assert!(!args.is_set(0));
        assert_eq!(
            args.take::<u32>(0),
            Err(ArgumentError::Missing {
                type_name: "Pair",
                index: 0
            })
        );
    }

    #[test]
    fn take_reports_type_mismatch() {
        seedling_testhelpers::setup();

        let mut args = Arguments::new("Pair", 1);
        args.set(0, Box::new(7u32));
        let err = args.take::<String>(0).unwrap_err();
        assert!(matches!(err, ArgumentError::TypeMismatch { index: 0, .. }));
    }

    #[test]
    fn set_out_of_bounds_is_ignored() {
        seedling_testhelpers::setup();

        let mut args = Arguments::new("Unit", 0);
        args.set(3, Box::new(1u8));
        assert!(!args.is_set(3));
    }
}
