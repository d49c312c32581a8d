use core::convert::Infallible;

use crate::ParseEvent;

/// Pull-style parser for a specific wire format.
pub trait FormatParser {
    /// Parser-specific error type.
    type Error;

    /// Read the next event; `Ok(None)` at end of input.
    fn next_event(&mut self) -> Result<Option<ParseEvent>, Self::Error>;
}

impl<P: FormatParser + ?Sized> FormatParser for &mut P {
    type Error = P::Error;

    fn next_event(&mut self) -> Result<Option<ParseEvent>, Self::Error> {
        (**self).next_event()
    }
}

/// Push-style consumer of parse events.
///
/// [`crate::Dispatcher`] implements this so that parsers which drive their
/// own loop (callbacks, incremental input) can feed it directly.
pub trait EventSink {
    /// Consumer-specific error type.
    type Error;

    /// Handle one event.
    fn event(&mut self, event: ParseEvent) -> Result<(), Self::Error>;
}

/// A [`FormatParser`] over events that were already produced.
///
/// Useful for tests and for formats whose parsers build the whole event list
/// up front.
pub struct EventReplay<I> {
    events: I,
}

impl<I: Iterator<Item = ParseEvent>> EventReplay<I> {
    /// Replay `events` in order.
    pub fn new(events: impl IntoIterator<IntoIter = I>) -> Self {
        EventReplay {
            events: events.into_iter(),
        }
    }
}

impl<I: Iterator<Item = ParseEvent>> FormatParser for EventReplay<I> {
    type Error = Infallible;

    fn next_event(&mut self) -> Result<Option<ParseEvent>, Self::Error> {
        Ok(self.events.next())
    }
}
