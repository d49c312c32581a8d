use core::any::Any;

use seedling_core::{Erased, ListDef, ScalarCodec, ScalarValue};

use super::{CompositeKind, Seed, SeedState, Slot, State, declared_name, lift, open_child};
use crate::{ConversionError, Found, SeedError, UnknownFields};

enum Element {
    Value(Erased),
    /// A child seed was opened for this position but has not been attached yet.
    Pending,
    Seed(Box<dyn Seed>),
}

/// Builds one sequence from its elements, in arrival order.
pub struct CollectionSeed {
    type_name: &'static str,
    def: ListDef,
    codec: ScalarCodec,
    policy: UnknownFields,
    label: String,
    elements: Vec<Element>,
    state: State,
}

impl CollectionSeed {
    /// An open seed for a sequence type described by `def`. `label` names the
    /// field the sequence fills.
    pub fn new(type_name: &'static str, def: ListDef, policy: UnknownFields, label: String) -> Self {
        trace!(type_name, label = %label, "open collection seed");
        CollectionSeed {
            type_name,
            def,
            codec: ScalarCodec::Default(def.element),
            policy,
            label,
            elements: Vec::new(),
            state: State::Open,
        }
    }

    /// Number of elements received so far.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element was received yet.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Seed for CollectionSeed {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn state(&self) -> SeedState {
        self.state.public()
    }

    fn kind(&self) -> CompositeKind {
        CompositeKind::Array
    }

    fn accepts_key(&self, key: &str) -> Result<bool, SeedError> {
        Err(SeedError::unexpected(
            "an array element",
            format!("key {key:?}"),
        ))
    }

    fn set_scalar(&mut self, key: Option<&str>, raw: ScalarValue) -> Result<(), SeedError> {
        self.state.ensure_open(self.type_name)?;
        if let Some(key) = key {
            return Err(SeedError::unexpected("an array element", format!("key {key:?}")));
        }
        let value = match self.codec.decode(&raw) {
            Ok(value) => value,
            Err(reason) => {
                return Err(SeedError::Conversion(ConversionError {
                    field: format!("{}[{}]", self.label, self.elements.len()),
                    declared: declared_name(self.def.element),
                    found: Found::Scalar(raw),
                    reason: reason.to_string(),
                }));
            }
        };
        self.elements.push(Element::Value(value));
        Ok(())
    }

    fn begin_composite(
        &mut self,
        key: Option<&str>,
        kind: CompositeKind,
    ) -> Result<Option<(Slot, Box<dyn Seed>)>, SeedError> {
        self.state.ensure_open(self.type_name)?;
        if let Some(key) = key {
            return Err(SeedError::unexpected("an array element", format!("key {key:?}")));
        }
        let index = self.elements.len();
        let label = format!("{}[{index}]", self.label);
        let child = open_child(self.def.element, kind, self.policy, &label)?;
        self.elements.push(Element::Pending);
        Ok(Some((Slot::Element(index), child)))
    }

    fn attach(&mut self, slot: Slot, child: Box<dyn Seed>) -> Result<(), SeedError> {
        self.state.ensure_open(self.type_name)?;
        let Slot::Element(index) = slot else {
            return Err(SeedError::unexpected("an element slot", "a field slot"));
        };
        match self.elements.get_mut(index) {
            Some(element) if matches!(element, Element::Pending) => {
                *element = Element::Seed(child);
                Ok(())
            }
            _ => Err(SeedError::unexpected(
                "a pending element",
                format!("element #{index}"),
            )),
        }
    }

    fn close(&mut self) -> Result<(), SeedError> {
        trace!(type_name = self.type_name, len = self.elements.len(), "close collection seed");
        self.state.close(self.type_name)
    }

    fn spawn(&mut self) -> Result<&dyn Any, SeedError> {
        let CollectionSeed {
            type_name,
            def,
            elements,
            state,
            ..
        } = self;
        state.spawn(*type_name, || collect(def, elements))
    }

    fn into_value(self: Box<Self>) -> Result<Erased, SeedError> {
        let CollectionSeed {
            type_name,
            def,
            mut elements,
            state,
            ..
        } = *self;
        state.into_value(type_name, || collect(&def, &mut elements))
    }
}

fn collect(def: &ListDef, elements: &mut Vec<Element>) -> Result<Erased, SeedError> {
    let mut values = Vec::with_capacity(elements.len());
    for element in elements.drain(..) {
        let value = match element {
            Element::Value(value) => value,
            Element::Seed(child) => lift(def.element, child.into_value()?)?,
            Element::Pending => {
                return Err(SeedError::NotClosed {
                    type_name: declared_name(def.element),
                });
            }
        };
        values.push(value);
    }
    Ok((def.collect)(values)?)
}
