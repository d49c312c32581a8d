//! Seeds accumulate the parts of one composite value until it can be built.
//!
//! A seed is opened when its object or array starts, receives scalars and
//! closed child seeds while it is [`SeedState::Open`], and is closed when
//! its composite ends. Spawning a closed seed spawns its children, fills
//! defaults and runs the constructor, once; the value is kept for later
//! calls.

use core::any::Any;

use seedling_core::{Erased, MetadataKind, ScalarValue, TypeRef};

use crate::{ConversionError, Found, SeedError, UnknownFields};

mod collection;
mod object;

pub use collection::CollectionSeed;
pub use object::ObjectSeed;

/// Kind of composite a seed builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Built from keyed fields.
    Object,
    /// Built from positional elements.
    Array,
}

/// Where a child seed's value goes in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Constructor parameter of an object.
    Field(usize),
    /// Position in an array.
    Element(usize),
}

/// Lifecycle of a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedState {
    /// Accepting values.
    Open,
    /// Complete, not yet built.
    Closed,
    /// Built; the value is cached.
    Spawned,
    /// Building failed; the seed is unusable.
    Failed,
}

/// Accumulator for one composite value.
pub trait Seed {
    /// Short name of the type being built.
    fn type_name(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> SeedState;

    /// Whether the seed is filled from an object or an array.
    fn kind(&self) -> CompositeKind;

    /// Whether `key` names a field: `Ok(true)` if it does, `Ok(false)` if its
    /// value should be skipped, an error if unknown keys are denied.
    fn accepts_key(&self, key: &str) -> Result<bool, SeedError>;

    /// Decode and store a scalar for `key` (objects) or the next element (arrays).
    fn set_scalar(&mut self, key: Option<&str>, raw: ScalarValue) -> Result<(), SeedError>;

    /// Open a child seed for a nested composite under `key` (objects) or at the
    /// next position (arrays). `None` if the key's value is to be skipped.
    fn begin_composite(
        &mut self,
        key: Option<&str>,
        kind: CompositeKind,
    ) -> Result<Option<(Slot, Box<dyn Seed>)>, SeedError>;

    /// Store a closed child seed under the slot it was opened for.
    fn attach(&mut self, slot: Slot, child: Box<dyn Seed>) -> Result<(), SeedError>;

    /// Mark the seed complete.
    fn close(&mut self) -> Result<(), SeedError>;

    /// Build the value (first call) and borrow it.
    fn spawn(&mut self) -> Result<&dyn Any, SeedError>;

    /// Build the value if needed and move it out.
    fn into_value(self: Box<Self>) -> Result<Erased, SeedError>;
}

/// Internal lifecycle, with the built value.
pub(crate) enum State {
    Open,
    Closed,
    Spawned(Erased),
    Failed,
}

impl State {
    pub(crate) fn public(&self) -> SeedState {
        match self {
            State::Open => SeedState::Open,
            State::Closed => SeedState::Closed,
            State::Spawned(_) => SeedState::Spawned,
            State::Failed => SeedState::Failed,
        }
    }

    pub(crate) fn ensure_open(&self, type_name: &'static str) -> Result<(), SeedError> {
        match self {
            State::Open => Ok(()),
            _ => Err(SeedError::NotOpen { type_name }),
        }
    }

    pub(crate) fn close(&mut self, type_name: &'static str) -> Result<(), SeedError> {
        self.ensure_open(type_name)?;
        *self = State::Closed;
        Ok(())
    }

    /// Run `build` on the first call after closing, then hand out the cached value.
    pub(crate) fn spawn(
        &mut self,
        type_name: &'static str,
        build: impl FnOnce() -> Result<Erased, SeedError>,
    ) -> Result<&dyn Any, SeedError> {
        if let State::Closed = self {
            match build() {
                Ok(value) => *self = State::Spawned(value),
                Err(err) => {
                    *self = State::Failed;
                    return Err(err);
                }
            }
        }
        match self {
            State::Spawned(value) => Ok(&**value),
            State::Open => Err(SeedError::NotClosed { type_name }),
            State::Closed | State::Failed => Err(SeedError::Poisoned { type_name }),
        }
    }

    /// Like [`State::spawn`], but moves the value out.
    pub(crate) fn into_value(
        self,
        type_name: &'static str,
        build: impl FnOnce() -> Result<Erased, SeedError>,
    ) -> Result<Erased, SeedError> {
        match self {
            State::Closed => build(),
            State::Spawned(value) => Ok(value),
            State::Open => Err(SeedError::NotClosed { type_name }),
            State::Failed => Err(SeedError::Poisoned { type_name }),
        }
    }
}

/// Open the seed for a composite of `kind` whose declared type is `ty`.
///
/// `Option` layers are looked through; the value is wrapped again by [`lift`].
/// `label` names the field being filled, for errors.
pub fn open_child(
    ty: TypeRef,
    kind: CompositeKind,
    policy: UnknownFields,
    label: &str,
) -> Result<Box<dyn Seed>, SeedError> {
    let meta = ty.metadata()?;
    match (&meta.kind, kind) {
        (MetadataKind::Optional(def), _) => open_child(def.inner, kind, policy, label),
        (MetadataKind::Struct(structure), CompositeKind::Object) => {
            Ok(Box::new(ObjectSeed::new(structure.clone(), policy)))
        }
        (MetadataKind::Sequence(def), CompositeKind::Array) => Ok(Box::new(CollectionSeed::new(
            meta.type_name,
            *def,
            policy,
            label.to_owned(),
        ))),
        (other, _) => Err(SeedError::Conversion(ConversionError {
            field: label.to_owned(),
            declared: meta.type_name,
            found: Found::from(kind),
            reason: match other {
                MetadataKind::Struct(_) => "expected an object".to_owned(),
                MetadataKind::Sequence(_) => "expected an array".to_owned(),
                _ => "expected a scalar".to_owned(),
            },
        })),
    }
}

/// Wrap a value built for the type under `ty`'s `Option` layers back into them.
pub fn lift(ty: TypeRef, value: Erased) -> Result<Erased, SeedError> {
    let meta = ty.metadata()?;
    match &meta.kind {
        MetadataKind::Optional(def) => {
            let inner = lift(def.inner, value)?;
            Ok((def.some)(inner)?)
        }
        _ => Ok(value),
    }
}

/// Short name of a declared type, for error messages.
pub(crate) fn declared_name(ty: TypeRef) -> &'static str {
    ty.metadata()
        .map(|meta| meta.type_name)
        .unwrap_or_else(|_| ty.name())
}
