//! Descriptors for the std types seedling understands out of the box.

use core::any::Any;

use crate::scalar::{DecodeError, ScalarValue};
use crate::shape::{
    ArgumentError, Def, Describe, Erased, ListDef, OptionDef, ScalarDef, Shape, TypeRef,
};

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Describe for $ty {
            fn shape() -> Shape {
                fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
                    let out_of_range = || DecodeError::OutOfRange { expected: stringify!($ty) };
                    let value: $ty = match raw {
                        ScalarValue::U64(n) => <$ty>::try_from(*n).map_err(|_| out_of_range())?,
                        ScalarValue::I64(n) => <$ty>::try_from(*n).map_err(|_| out_of_range())?,
                        _ => return Err(DecodeError::Mismatch { expected: "an unsigned integer" }),
                    };
                    Ok(Box::new(value))
                }
                fn encode(value: &dyn Any) -> Option<ScalarValue> {
                    value.downcast_ref::<$ty>().map(|n| ScalarValue::U64(*n as u64))
                }
                Shape::scalar(stringify!($ty), ScalarDef { decode, encode })
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Describe for $ty {
            fn shape() -> Shape {
                fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
                    let out_of_range = || DecodeError::OutOfRange { expected: stringify!($ty) };
                    let value: $ty = match raw {
                        ScalarValue::U64(n) => <$ty>::try_from(*n).map_err(|_| out_of_range())?,
                        ScalarValue::I64(n) => <$ty>::try_from(*n).map_err(|_| out_of_range())?,
                        _ => return Err(DecodeError::Mismatch { expected: "an integer" }),
                    };
                    Ok(Box::new(value))
                }
                fn encode(value: &dyn Any) -> Option<ScalarValue> {
                    value.downcast_ref::<$ty>().map(|n| ScalarValue::I64(*n as i64))
                }
                Shape::scalar(stringify!($ty), ScalarDef { decode, encode })
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl Describe for $ty {
            fn shape() -> Shape {
                fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
                    let (value, finite) = match raw {
                        ScalarValue::F64(n) => (*n as $ty, n.is_finite()),
                        ScalarValue::I64(n) => (*n as $ty, true),
                        ScalarValue::U64(n) => (*n as $ty, true),
                        _ => return Err(DecodeError::Mismatch { expected: "a number" }),
                    };
                    // narrowing may overflow to infinity
                    if finite && !value.is_finite() {
                        return Err(DecodeError::OutOfRange { expected: stringify!($ty) });
                    }
                    Ok(Box::new(value))
                }
                fn encode(value: &dyn Any) -> Option<ScalarValue> {
                    value.downcast_ref::<$ty>().map(|n| ScalarValue::F64(*n as f64))
                }
                Shape::scalar(stringify!($ty), ScalarDef { decode, encode })
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8, i16, i32, i64, isize);
impl_float!(f32, f64);

impl Describe for bool {
    fn shape() -> Shape {
        fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
            match raw {
                ScalarValue::Bool(b) => Ok(Box::new(*b)),
                _ => Err(DecodeError::Mismatch {
                    expected: "a boolean",
                }),
            }
        }
        fn encode(value: &dyn Any) -> Option<ScalarValue> {
            value.downcast_ref::<bool>().map(|b| ScalarValue::Bool(*b))
        }
        Shape::scalar("bool", ScalarDef { decode, encode })
    }
}

impl Describe for char {
    fn shape() -> Shape {
        fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
            let s = raw.as_str().ok_or(DecodeError::Mismatch {
                expected: "a single-character string",
            })?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Box::new(c)),
                _ => Err(DecodeError::OutOfRange { expected: "char" }),
            }
        }
        fn encode(value: &dyn Any) -> Option<ScalarValue> {
            value
                .downcast_ref::<char>()
                .map(|c| ScalarValue::Str(c.to_string()))
        }
        Shape::scalar("char", ScalarDef { decode, encode })
    }
}

impl Describe for String {
    fn shape() -> Shape {
        fn decode(raw: &ScalarValue) -> Result<Erased, DecodeError> {
            match raw {
                ScalarValue::Str(s) => Ok(Box::new(s.clone())),
                _ => Err(DecodeError::Mismatch {
                    expected: "a string",
                }),
            }
        }
        fn encode(value: &dyn Any) -> Option<ScalarValue> {
            value
                .downcast_ref::<String>()
                .map(|s| ScalarValue::Str(s.clone()))
        }
        Shape::scalar("String", ScalarDef { decode, encode })
    }
}

fn collect_vec<T: Describe>(elements: Vec<Erased>) -> Result<Erased, ArgumentError> {
    let mut out: Vec<T> = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let element = element
            .downcast::<T>()
            .map_err(|_| ArgumentError::TypeMismatch {
                type_name: "Vec",
                index,
                expected: core::any::type_name::<T>(),
            })?;
        out.push(*element);
    }
    Ok(Box::new(out))
}

fn inspect_vec<T: Describe>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    let items = value.downcast_ref::<Vec<T>>()?;
    Some(items.iter().map(|item| item as &dyn Any).collect())
}

impl<T: Describe> Describe for Vec<T> {
    fn shape() -> Shape {
        Shape {
            type_name: "Vec",
            def: Def::List(ListDef {
                element: TypeRef::of::<T>(),
                collect: collect_vec::<T>,
                inspect: inspect_vec::<T>,
            }),
        }
    }
}

fn some_option<T: Describe>(inner: Erased) -> Result<Erased, ArgumentError> {
    let inner = inner
        .downcast::<T>()
        .map_err(|_| ArgumentError::TypeMismatch {
            type_name: "Option",
            index: 0,
            expected: core::any::type_name::<T>(),
        })?;
    let value: Option<T> = Some(*inner);
    Ok(Box::new(value))
}

fn none_option<T: Describe>() -> Erased {
    let value: Option<T> = None;
    Box::new(value)
}

fn inspect_option<T: Describe>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    let value = value.downcast_ref::<Option<T>>()?;
    Some(value.as_ref().map(|inner| inner as &dyn Any))
}

impl<T: Describe> Describe for Option<T> {
    const OPTIONAL: bool = true;

    fn shape() -> Shape {
        Shape {
            type_name: "Option",
            def: Def::Option(OptionDef {
                inner: TypeRef::of::<T>(),
                some: some_option::<T>,
                none: none_option::<T>,
                inspect: inspect_option::<T>,
            }),
        }
    }
}
