use core::any::Any;
use core::fmt::{self, Debug};

use seedling_core::{ConfigurationError, Describe, MetadataKind, ScalarCodec, ScalarValue, TypeRef};

use crate::seed::declared_name;

/// Low-level output interface implemented by each format backend.
///
/// The shared walk decides what is an object, an array or a scalar; the
/// backend only decides how each looks on the wire.
pub trait FormatSerializer {
    /// Backend-specific error type.
    type Error: Debug;

    /// Begin an object.
    fn begin_object(&mut self) -> Result<(), Self::Error>;
    /// Emit the key of the next object member.
    fn field_key(&mut self, key: &str) -> Result<(), Self::Error>;
    /// End an object.
    fn end_object(&mut self) -> Result<(), Self::Error>;

    /// Begin an array.
    fn begin_array(&mut self) -> Result<(), Self::Error>;
    /// End an array.
    fn end_array(&mut self) -> Result<(), Self::Error>;

    /// Emit a scalar.
    fn scalar(&mut self, value: &ScalarValue) -> Result<(), Self::Error>;
}

/// Why a value could not be serialized.
#[derive(Debug)]
pub enum SerializeError<E: Debug> {
    /// The backend failed.
    Backend(E),
    /// The value's type has invalid metadata.
    Configuration(ConfigurationError),
    /// A scalar could not be encoded.
    Encode {
        /// Qualified field, or the type name for roots and elements.
        field: String,
        /// What went wrong.
        message: String,
    },
    /// The value does not match the metadata it was walked with.
    Inconsistent(&'static str),
}

impl<E: Debug + fmt::Display> fmt::Display for SerializeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::Backend(err) => write!(f, "{err}"),
            SerializeError::Configuration(err) => write!(f, "invalid type configuration: {err}"),
            SerializeError::Encode { field, message } => {
                write!(f, "cannot encode `{field}`: {message}")
            }
            SerializeError::Inconsistent(type_name) => {
                write!(f, "value does not match the description of {type_name}")
            }
        }
    }
}

impl<E: Debug + fmt::Display> std::error::Error for SerializeError<E> {}

impl<E: Debug> From<ConfigurationError> for SerializeError<E> {
    fn from(err: ConfigurationError) -> Self {
        SerializeError::Configuration(err)
    }
}

/// Serialize `value` through `serializer`.
///
/// Fields come out in declaration order under their input keys; excluded
/// fields are left out, and `None` is written as null.
pub fn serialize_root<T: Describe, S: FormatSerializer>(
    value: &T,
    serializer: &mut S,
) -> Result<(), SerializeError<S::Error>> {
    serialize_erased(TypeRef::of::<T>(), value, serializer)
}

/// Serialize a value of the type behind `ty`.
pub fn serialize_erased<S: FormatSerializer>(
    ty: TypeRef,
    value: &dyn Any,
    serializer: &mut S,
) -> Result<(), SerializeError<S::Error>> {
    let meta = ty.metadata()?;
    match &meta.kind {
        MetadataKind::Scalar(_) => {
            encode(&ScalarCodec::Default(ty), value, meta.type_name, serializer)
        }
        MetadataKind::Optional(def) => match (def.inspect)(value) {
            Some(Some(inner)) => serialize_erased(def.inner, inner, serializer),
            Some(None) => serializer
                .scalar(&ScalarValue::Null)
                .map_err(SerializeError::Backend),
            None => Err(SerializeError::Inconsistent(meta.type_name)),
        },
        MetadataKind::Sequence(def) => {
            let elements =
                (def.inspect)(value).ok_or(SerializeError::Inconsistent(meta.type_name))?;
            serializer.begin_array().map_err(SerializeError::Backend)?;
            for element in elements {
                serialize_erased(def.element, element, serializer)?;
            }
            serializer.end_array().map_err(SerializeError::Backend)
        }
        MetadataKind::Struct(structure) => {
            let fields = structure
                .inspect(value)
                .ok_or(SerializeError::Inconsistent(meta.type_name))?;
            if fields.len() != structure.params().len() {
                return Err(SerializeError::Inconsistent(meta.type_name));
            }
            serializer.begin_object().map_err(SerializeError::Backend)?;
            for (param, field) in structure.params().iter().zip(fields) {
                if param.excluded {
                    continue;
                }
                trace!(type_name = meta.type_name, field = param.name, "serialize field");
                serializer
                    .field_key(param.key)
                    .map_err(SerializeError::Backend)?;
                if param.converts() {
                    return Err(SerializeError::Encode {
                        field: format!("{}.{}", meta.type_name, param.key),
                        message: format!(
                            "the field was read as {} and cannot be written back",
                            declared_name(param.ty)
                        ),
                    });
                }
                if param.codec.is_custom() {
                    let label = format!("{}.{}", meta.type_name, param.key);
                    encode(&param.codec, field, &label, serializer)?;
                } else {
                    serialize_erased(param.ty, field, serializer)?;
                }
            }
            serializer.end_object().map_err(SerializeError::Backend)
        }
    }
}

fn encode<S: FormatSerializer>(
    codec: &ScalarCodec,
    value: &dyn Any,
    label: &str,
    serializer: &mut S,
) -> Result<(), SerializeError<S::Error>> {
    let raw = codec.encode(value).map_err(|err| SerializeError::Encode {
        field: label.to_owned(),
        message: err.to_string(),
    })?;
    serializer.scalar(&raw).map_err(SerializeError::Backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Company, Language};

    /// Writes a compact, JSON-looking trace of the calls it receives.
    #[derive(Default)]
    struct Trace {
        out: String,
        needs_comma: bool,
    }

    impl Trace {
        fn separate(&mut self) {
            if self.needs_comma {
                self.out.push(',');
            }
        }
    }

    impl FormatSerializer for Trace {
        type Error = core::convert::Infallible;

        fn begin_object(&mut self) -> Result<(), Self::Error> {
            self.separate();
            self.out.push('{');
            self.needs_comma = false;
            Ok(())
        }

        fn field_key(&mut self, key: &str) -> Result<(), Self::Error> {
            self.separate();
            self.out.push_str(key);
            self.out.push(':');
            self.needs_comma = false;
            Ok(())
        }

        fn end_object(&mut self) -> Result<(), Self::Error> {
            self.out.push('}');
            self.needs_comma = true;
            Ok(())
        }

        fn begin_array(&mut self) -> Result<(), Self::Error> {
            self.separate();
            self.out.push('[');
            self.needs_comma = false;
            Ok(())
        }

        fn end_array(&mut self) -> Result<(), Self::Error> {
            self.out.push(']');
            self.needs_comma = true;
            Ok(())
        }

        fn scalar(&mut self, value: &ScalarValue) -> Result<(), Self::Error> {
            self.separate();
            self.out.push_str(&value.to_string());
            self.needs_comma = true;
            Ok(())
        }
    }

    #[test]
    fn walks_fields_in_declaration_order() {
        seedling_testhelpers::setup();

        let language = Language {
            name: "Kotlin".into(),
            age: 12,
            tags: vec!["jvm".into(), "android".into()],
            company: Some(Company {
                name: "JetBrains".into(),
            }),
        };
        let mut trace = Trace::default();
        serialize_root(&language, &mut trace).unwrap();
        insta::assert_snapshot!(trace.out, @r#"{name:"Kotlin",age:12,tags:["jvm","android"],company:{name:"JetBrains"}}"#);
    }

    #[test]
    fn none_is_null() {
        seedling_testhelpers::setup();

        let language = Language {
            name: "Kotlin".into(),
            age: 12,
            tags: Vec::new(),
            company: None,
        };
        let mut trace = Trace::default();
        serialize_root(&language, &mut trace).unwrap();
        insta::assert_snapshot!(trace.out, @r#"{name:"Kotlin",age:12,tags:[],company:null}"#);
    }

    #[test]
    fn mismatched_values_are_inconsistent() {
        seedling_testhelpers::setup();

        let mut trace = Trace::default();
        let err = serialize_erased(TypeRef::of::<Company>(), &5u8, &mut trace).unwrap_err();
        assert!(matches!(err, SerializeError::Inconsistent("Company")));
    }
}
