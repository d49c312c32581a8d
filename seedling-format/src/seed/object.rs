use core::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use seedling_core::{Arguments, Erased, FieldDescriptor, ScalarValue, StructMetadata};

use super::{CompositeKind, Seed, SeedState, Slot, State, declared_name, lift, open_child};
use crate::{ConversionError, Found, SeedError, UnknownFields};

/// Builds one struct from its keyed fields.
pub struct ObjectSeed {
    meta: Arc<StructMetadata>,
    policy: UnknownFields,
    scalar_args: HashMap<usize, Erased>,
    composite_args: HashMap<usize, Box<dyn Seed>>,
    state: State,
}

impl ObjectSeed {
    /// An open seed for the struct described by `meta`.
    pub fn new(meta: Arc<StructMetadata>, policy: UnknownFields) -> Self {
        trace!(type_name = meta.type_name(), "open object seed");
        ObjectSeed {
            meta,
            policy,
            scalar_args: HashMap::new(),
            composite_args: HashMap::new(),
            state: State::Open,
        }
    }

    fn field(
        &self,
        key: Option<&str>,
        got: impl FnOnce() -> String,
    ) -> Result<Option<(Arc<StructMetadata>, usize)>, SeedError> {
        let key = key.ok_or_else(|| SeedError::unexpected("a key", got()))?;
        if !self.accepts_key(key)? {
            return Ok(None);
        }
        match self.meta.lookup(key) {
            Some(param) => Ok(Some((Arc::clone(&self.meta), param.index))),
            None => Ok(None),
        }
    }
}

fn qualified(meta: &StructMetadata, param: &FieldDescriptor) -> String {
    format!("{}.{}", meta.type_name(), param.key)
}

impl Seed for ObjectSeed {
    fn type_name(&self) -> &'static str {
        self.meta.type_name()
    }

    fn state(&self) -> SeedState {
        self.state.public()
    }

    fn kind(&self) -> CompositeKind {
        CompositeKind::Object
    }

    fn accepts_key(&self, key: &str) -> Result<bool, SeedError> {
        if self.meta.lookup(key).is_some() {
            return Ok(true);
        }
        match self.policy {
            UnknownFields::Deny => Err(SeedError::unknown_field(
                self.meta.type_name(),
                key,
                self.meta.keys(),
            )),
            UnknownFields::Ignore => {
                trace!(type_name = self.meta.type_name(), key, "ignoring unknown key");
                Ok(false)
            }
        }
    }

    fn set_scalar(&mut self, key: Option<&str>, raw: ScalarValue) -> Result<(), SeedError> {
        self.state.ensure_open(self.meta.type_name())?;
        let Some((meta, index)) = self.field(key, || raw.to_string())? else {
            return Ok(());
        };
        let param = &meta.params()[index];

        let value = match param.codec.decode(&raw) {
            Ok(value) => value,
            Err(reason) => {
                return Err(SeedError::Conversion(ConversionError {
                    field: qualified(&meta, param),
                    declared: declared_name(param.ty),
                    found: Found::Scalar(raw),
                    reason: reason.to_string(),
                }));
            }
        };
        trace!(type_name = meta.type_name(), field = param.name, "scalar set");
        self.composite_args.remove(&index);
        self.scalar_args.insert(index, value);
        Ok(())
    }

    fn begin_composite(
        &mut self,
        key: Option<&str>,
        kind: CompositeKind,
    ) -> Result<Option<(Slot, Box<dyn Seed>)>, SeedError> {
        self.state.ensure_open(self.meta.type_name())?;
        let got = match kind {
            CompositeKind::Object => "object start",
            CompositeKind::Array => "array start",
        };
        let Some((meta, index)) = self.field(key, || got.to_owned())? else {
            return Ok(None);
        };
        let param = &meta.params()[index];

        if let seedling_core::ScalarCodec::Custom(codec) = &param.codec {
            return Err(SeedError::Conversion(ConversionError {
                field: qualified(&meta, param),
                declared: declared_name(param.ty),
                found: Found::from(kind),
                reason: format!("{} only accepts scalars", codec.codec_name()),
            }));
        }

        let child = open_child(param.ty, kind, self.policy, &qualified(&meta, param))?;
        Ok(Some((Slot::Field(index), child)))
    }

    fn attach(&mut self, slot: Slot, child: Box<dyn Seed>) -> Result<(), SeedError> {
        self.state.ensure_open(self.meta.type_name())?;
        let Slot::Field(index) = slot else {
            return Err(SeedError::unexpected("a field slot", "an element slot"));
        };
        self.scalar_args.remove(&index);
        self.composite_args.insert(index, child);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SeedError> {
        trace!(type_name = self.meta.type_name(), "close object seed");
        self.state.close(self.meta.type_name())
    }

    fn spawn(&mut self) -> Result<&dyn Any, SeedError> {
        let ObjectSeed {
            meta,
            scalar_args,
            composite_args,
            state,
            ..
        } = self;
        state.spawn(meta.type_name(), || {
            construct(meta, scalar_args, composite_args)
        })
    }

    fn into_value(self: Box<Self>) -> Result<Erased, SeedError> {
        let ObjectSeed {
            meta,
            mut scalar_args,
            mut composite_args,
            state,
            ..
        } = *self;
        state.into_value(meta.type_name(), || {
            construct(&meta, &mut scalar_args, &mut composite_args)
        })
    }
}

/// Merge spawned children and scalars into one argument set, fill the rest
/// from defaults, and run the constructor.
fn construct(
    meta: &StructMetadata,
    scalar_args: &mut HashMap<usize, Erased>,
    composite_args: &mut HashMap<usize, Box<dyn Seed>>,
) -> Result<Erased, SeedError> {
    let mut args = Arguments::new(meta.type_name(), meta.params().len());

    for (index, child) in composite_args.drain() {
        let param = &meta.params()[index];
        let value = lift(param.ty, child.into_value()?)?;
        args.set(index, param.convert(value)?);
    }
    for (index, value) in scalar_args.drain() {
        args.set(index, meta.params()[index].convert(value)?);
    }

    for param in meta.params() {
        if args.is_set(param.index) {
            continue;
        }
        match param.default_value() {
            Some(value) => {
                trace!(type_name = meta.type_name(), field = param.name, "using default");
                args.set(param.index, value);
            }
            None => {
                return Err(SeedError::MissingField {
                    type_name: meta.type_name(),
                    field: param.key,
                });
            }
        }
    }

    trace!(type_name = meta.type_name(), "construct");
    Ok(meta.construct(&mut args)?)
}
