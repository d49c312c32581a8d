use seedling_core::{ArgumentError, Describe, Erased, TypeRef};

use crate::{
    DeserializeError, DeserializeOptions, Dispatcher, EventReplay, FormatParser, LocatedError,
    ParseEvent, Path, SeedError,
};

/// Drives a [`FormatParser`] into a [`Dispatcher`].
pub struct FormatDeserializer<P> {
    parser: P,
    options: DeserializeOptions,
}

impl<P> FormatDeserializer<P> {
    /// A deserializer with default (strict) options.
    pub fn new(parser: P) -> Self {
        Self::with_options(parser, DeserializeOptions::default())
    }

    /// A deserializer with explicit options.
    pub fn with_options(parser: P, options: DeserializeOptions) -> Self {
        FormatDeserializer { parser, options }
    }

    /// Give the parser back.
    pub fn into_inner(self) -> P {
        self.parser
    }
}

impl<P: FormatParser> FormatDeserializer<P> {
    /// Read the whole input as one `T`.
    pub fn deserialize_root<T: Describe>(&mut self) -> Result<T, DeserializeError<P::Error>> {
        let value = self.deserialize_erased(TypeRef::of::<T>())?;
        value.downcast::<T>().map(|value| *value).map_err(|_| {
            DeserializeError::Seed(LocatedError {
                error: SeedError::Construct(ArgumentError::TypeMismatch {
                    type_name: "root",
                    index: 0,
                    expected: core::any::type_name::<T>(),
                }),
                path: Path::new(),
                span: None,
            })
        })
    }

    /// Read the whole input as one value of the type behind `ty`.
    pub fn deserialize_erased(&mut self, ty: TypeRef) -> Result<Erased, DeserializeError<P::Error>> {
        debug!(type_name = ty.name(), "deserialize");
        let mut dispatcher = Dispatcher::new(ty, self.options.clone());
        while let Some(event) = self.parser.next_event().map_err(DeserializeError::Parser)? {
            dispatcher
                .handle_event(event)
                .map_err(DeserializeError::Seed)?;
        }
        dispatcher.finish().map_err(DeserializeError::Seed)
    }
}

/// Deserialize a `T` from `parser` with default options.
pub fn deserialize<T: Describe, P: FormatParser>(parser: P) -> Result<T, DeserializeError<P::Error>> {
    FormatDeserializer::new(parser).deserialize_root()
}

/// Deserialize a `T` from `parser` with explicit options.
pub fn deserialize_with_options<T: Describe, P: FormatParser>(
    parser: P,
    options: DeserializeOptions,
) -> Result<T, DeserializeError<P::Error>> {
    FormatDeserializer::with_options(parser, options).deserialize_root()
}

/// Deserialize a `T` from events that were already produced.
pub fn deserialize_events<T: Describe>(
    events: impl IntoIterator<Item = ParseEvent>,
    options: DeserializeOptions,
) -> Result<T, LocatedError> {
    deserialize_with_options(EventReplay::new(events), options).map_err(|err| match err {
        DeserializeError::Seed(located) => located,
        DeserializeError::Parser(never) => match never {},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Company, Language};
    use crate::{EventKind, FormatParser, Span};

    /// Fails after a fixed number of events.
    struct Truncated {
        events: std::vec::IntoIter<ParseEvent>,
    }

    impl FormatParser for Truncated {
        type Error = &'static str;

        fn next_event(&mut self) -> Result<Option<ParseEvent>, Self::Error> {
            self.events.next().map(Some).ok_or("input truncated")
        }
    }

    #[test]
    fn replayed_events_build_the_root() -> eyre::Result<()> {
        seedling_testhelpers::setup();

        let events = vec![
            EventKind::ObjectStart.into(),
            ParseEvent::key("name"),
            ParseEvent::scalar("Acme"),
            EventKind::ObjectEnd.into(),
        ];
        let company: Company = deserialize_events(events, DeserializeOptions::new())?;
        assert_eq!(company.name, "Acme");
        Ok(())
    }

    #[test]
    fn parser_errors_pass_through() {
        seedling_testhelpers::setup();

        let parser = Truncated {
            events: vec![EventKind::ObjectStart.into()].into_iter(),
        };
        let err = deserialize::<Language, _>(parser).unwrap_err();
        assert_eq!(err.parser_error(), Some(&"input truncated"));
        assert!(err.seed_error().is_none());
    }

    #[test]
    fn empty_input_is_eof() {
        seedling_testhelpers::setup();

        let err = deserialize_events::<Company>(Vec::new(), DeserializeOptions::new()).unwrap_err();
        assert_eq!(err.error, SeedError::UnexpectedEof);
        assert!(err.path.is_root());
    }

    #[test]
    fn spans_locate_the_failing_event() {
        seedling_testhelpers::setup();

        let events = vec![
            ParseEvent::new(EventKind::ObjectStart, Span::new(0, 1)),
            ParseEvent::new(EventKind::Key("nmae".into()), Span::new(1, 6)),
        ];
        let err = deserialize_events::<Company>(events, DeserializeOptions::new()).unwrap_err();
        insta::assert_snapshot!(err, @"unknown field `nmae` for Company, did you mean `name`? (expected one of: name) at $.nmae (bytes 1..7)");
    }
}
