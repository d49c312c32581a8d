use core::fmt;

use seedling_core::ScalarValue;

/// Position in the input (byte index)
pub type Pos = usize;

/// A span in the input, with a start position and length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    start: Pos,
    len: usize,
}

impl Span {
    /// Creates a new span with the given start position and length
    pub const fn new(start: Pos, len: usize) -> Self {
        Span { start, len }
    }

    /// Start position of the span
    pub const fn start(&self) -> Pos {
        self.start
    }

    /// Length of the span
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if this span has zero length
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// End position (start + length)
    pub const fn end(&self) -> Pos {
        self.start + self.len
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// What a parser saw.
#[derive(Clone, PartialEq)]
pub enum EventKind {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// An object key; always followed by the key's value.
    Key(String),
    /// A leaf value.
    Scalar(ScalarValue),
}

impl EventKind {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            EventKind::ObjectStart => "object start".to_owned(),
            EventKind::ObjectEnd => "object end".to_owned(),
            EventKind::ArrayStart => "array start".to_owned(),
            EventKind::ArrayEnd => "array end".to_owned(),
            EventKind::Key(key) => format!("key {key:?}"),
            EventKind::Scalar(value) => format!("{} {value}", value.kind_name()),
        }
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::ObjectStart => f.write_str("ObjectStart"),
            EventKind::ObjectEnd => f.write_str("ObjectEnd"),
            EventKind::ArrayStart => f.write_str("ArrayStart"),
            EventKind::ArrayEnd => f.write_str("ArrayEnd"),
            EventKind::Key(key) => f.debug_tuple("Key").field(key).finish(),
            EventKind::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

/// Event emitted by a format parser, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseEvent {
    /// What was seen.
    pub kind: EventKind,
    /// Where it was seen.
    pub span: Span,
}

impl ParseEvent {
    /// An event at `span`.
    pub const fn new(kind: EventKind, span: Span) -> Self {
        ParseEvent { kind, span }
    }

    /// `Key(name)` with an empty span.
    pub fn key(name: impl Into<String>) -> Self {
        EventKind::Key(name.into()).into()
    }

    /// `Scalar(value)` with an empty span.
    pub fn scalar(value: impl Into<ScalarValue>) -> Self {
        EventKind::Scalar(value.into()).into()
    }
}

impl From<EventKind> for ParseEvent {
    fn from(kind: EventKind) -> Self {
        ParseEvent {
            kind,
            span: Span::default(),
        }
    }
}
