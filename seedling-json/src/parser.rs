use seedling_core::ScalarValue;
use seedling_format::{EventKind, FormatParser, ParseEvent, Span};

use crate::error::{JsonError, JsonErrorKind};
use crate::scanner::{self, ParsedNumber, Scanner, SpannedToken, Token};

/// Pull parser turning a JSON document into [`ParseEvent`]s.
///
/// Grammar is checked here (commas, colons, nesting, trailing input); what
/// the events mean is left to the dispatcher.
pub struct JsonParser<'de> {
    input: &'de [u8],
    scanner: Scanner,
    stack: Vec<ContextState>,
    /// Whether the root value has fully completed.
    root_complete: bool,
    /// Whether the end of input was reported.
    done: bool,
}

#[derive(Debug, Clone, Copy)]
enum ContextState {
    Object(ObjectState),
    Array(ArrayState),
}

#[derive(Debug, Clone, Copy)]
enum ObjectState {
    KeyOrEnd,
    /// After a comma: `}` would be a trailing comma.
    Key,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy)]
enum ArrayState {
    ValueOrEnd,
    /// After a comma: `]` would be a trailing comma.
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextAction {
    ObjectKey { after_comma: bool },
    ObjectValue,
    ObjectComma,
    ArrayValue { after_comma: bool },
    ArrayComma,
    RootValue,
    RootFinished,
}

impl<'de> JsonParser<'de> {
    /// A parser over a complete document.
    pub fn new(input: &'de [u8]) -> Self {
        JsonParser {
            input,
            scanner: Scanner::new(),
            stack: Vec::new(),
            root_complete: false,
            done: false,
        }
    }

    fn consume_token(&mut self) -> Result<SpannedToken, JsonError> {
        Ok(self.scanner.next_token(self.input)?)
    }

    fn unexpected(&self, token: &SpannedToken, expected: &'static str) -> JsonError {
        let kind = match token.token {
            Token::Eof => JsonErrorKind::UnexpectedEof { expected },
            _ => JsonErrorKind::UnexpectedToken {
                got: token.token.describe(),
                expected,
            },
        };
        JsonError::new(kind, token.span)
    }

    fn expect_colon(&mut self) -> Result<(), JsonError> {
        let token = self.consume_token()?;
        if token.token != Token::Colon {
            return Err(self.unexpected(&token, "':'"));
        }
        Ok(())
    }

    fn set_top(&mut self, state: ContextState) {
        if let Some(top) = self.stack.last_mut() {
            *top = state;
        }
    }

    fn finish_value_in_parent(&mut self) {
        match self.stack.last_mut() {
            Some(ContextState::Object(state)) => *state = ObjectState::CommaOrEnd,
            Some(ContextState::Array(state)) => *state = ArrayState::CommaOrEnd,
            None => self.root_complete = true,
        }
    }

    fn close(&mut self, kind: EventKind, span: Span) -> ParseEvent {
        self.stack.pop();
        self.finish_value_in_parent();
        ParseEvent::new(kind, span)
    }

    fn string(&self, start: usize, end: usize, has_escapes: bool) -> Result<String, JsonError> {
        Ok(scanner::decode_string(self.input, start, end, has_escapes)?)
    }

    fn parse_value(&mut self, token: SpannedToken) -> Result<ParseEvent, JsonError> {
        let span = token.span;
        let scalar = match token.token {
            Token::ObjectStart => {
                self.stack.push(ContextState::Object(ObjectState::KeyOrEnd));
                return Ok(ParseEvent::new(EventKind::ObjectStart, span));
            }
            Token::ArrayStart => {
                self.stack.push(ContextState::Array(ArrayState::ValueOrEnd));
                return Ok(ParseEvent::new(EventKind::ArrayStart, span));
            }
            Token::String {
                start,
                end,
                has_escapes,
            } => ScalarValue::Str(self.string(start, end, has_escapes)?),
            Token::Number { start, end, hint } => {
                match scanner::parse_number(self.input, start, end, hint)? {
                    ParsedNumber::U64(n) => ScalarValue::U64(n),
                    ParsedNumber::I64(n) => ScalarValue::I64(n),
                    ParsedNumber::F64(n) => ScalarValue::F64(n),
                }
            }
            Token::True => ScalarValue::Bool(true),
            Token::False => ScalarValue::Bool(false),
            Token::Null => ScalarValue::Null,
            Token::ObjectEnd | Token::ArrayEnd | Token::Comma | Token::Colon | Token::Eof => {
                return Err(self.unexpected(&token, "a value"));
            }
        };
        self.finish_value_in_parent();
        Ok(ParseEvent::new(EventKind::Scalar(scalar), span))
    }

    fn determine_action(&self) -> NextAction {
        match self.stack.last() {
            Some(ContextState::Object(state)) => match state {
                ObjectState::KeyOrEnd => NextAction::ObjectKey { after_comma: false },
                ObjectState::Key => NextAction::ObjectKey { after_comma: true },
                ObjectState::Value => NextAction::ObjectValue,
                ObjectState::CommaOrEnd => NextAction::ObjectComma,
            },
            Some(ContextState::Array(state)) => match state {
                ArrayState::ValueOrEnd => NextAction::ArrayValue { after_comma: false },
                ArrayState::Value => NextAction::ArrayValue { after_comma: true },
                ArrayState::CommaOrEnd => NextAction::ArrayComma,
            },
            None if self.root_complete => NextAction::RootFinished,
            None => NextAction::RootValue,
        }
    }

    fn produce_event(&mut self) -> Result<Option<ParseEvent>, JsonError> {
        loop {
            match self.determine_action() {
                NextAction::ObjectKey { after_comma } => {
                    let token = self.consume_token()?;
                    let span = token.span;
                    return match token.token {
                        Token::ObjectEnd if after_comma => {
                            Err(JsonError::new(JsonErrorKind::TrailingComma, span))
                        }
                        Token::ObjectEnd => Ok(Some(self.close(EventKind::ObjectEnd, span))),
                        Token::String {
                            start,
                            end,
                            has_escapes,
                        } => {
                            let name = self.string(start, end, has_escapes)?;
                            self.expect_colon()?;
                            self.set_top(ContextState::Object(ObjectState::Value));
                            Ok(Some(ParseEvent::new(EventKind::Key(name), span)))
                        }
                        _ if after_comma => Err(self.unexpected(&token, "a key")),
                        _ => Err(self.unexpected(&token, "a key or '}'")),
                    };
                }
                NextAction::ObjectValue | NextAction::RootValue => {
                    let token = self.consume_token()?;
                    return self.parse_value(token).map(Some);
                }
                NextAction::ObjectComma => {
                    let token = self.consume_token()?;
                    match token.token {
                        Token::Comma => self.set_top(ContextState::Object(ObjectState::Key)),
                        Token::ObjectEnd => {
                            return Ok(Some(self.close(EventKind::ObjectEnd, token.span)));
                        }
                        _ => return Err(self.unexpected(&token, "',' or '}'")),
                    }
                }
                NextAction::ArrayValue { after_comma } => {
                    let token = self.consume_token()?;
                    return match token.token {
                        Token::ArrayEnd if after_comma => {
                            Err(JsonError::new(JsonErrorKind::TrailingComma, token.span))
                        }
                        Token::ArrayEnd => Ok(Some(self.close(EventKind::ArrayEnd, token.span))),
                        _ => self.parse_value(token).map(Some),
                    };
                }
                NextAction::ArrayComma => {
                    let token = self.consume_token()?;
                    match token.token {
                        Token::Comma => self.set_top(ContextState::Array(ArrayState::Value)),
                        Token::ArrayEnd => {
                            return Ok(Some(self.close(EventKind::ArrayEnd, token.span)));
                        }
                        _ => return Err(self.unexpected(&token, "',' or ']'")),
                    }
                }
                NextAction::RootFinished => {
                    let token = self.consume_token()?;
                    if token.token != Token::Eof {
                        return Err(JsonError::new(JsonErrorKind::TrailingCharacters, token.span));
                    }
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }
}

impl FormatParser for JsonParser<'_> {
    type Error = JsonError;

    fn next_event(&mut self) -> Result<Option<ParseEvent>, Self::Error> {
        if self.done {
            return Ok(None);
        }
        let event = self.produce_event()?;
        if let Some(event) = &event {
            trace!(kind = ?event.kind, span = %event.span, "json event");
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Result<Vec<EventKind>, JsonError> {
        let mut parser = JsonParser::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(event) = parser.next_event()? {
            out.push(event.kind);
        }
        Ok(out)
    }

    #[test]
    fn emits_events_in_document_order() {
        seedling_testhelpers::setup();

        let kinds = events(r#"{"name": "Kotlin", "tags": ["a", 1, -2, 1.5, null], "ok": true}"#)
            .unwrap();
        assert_eq!(
            kinds,
            vec![
                EventKind::ObjectStart,
                EventKind::Key("name".into()),
                EventKind::Scalar("Kotlin".into()),
                EventKind::Key("tags".into()),
                EventKind::ArrayStart,
                EventKind::Scalar("a".into()),
                EventKind::Scalar(ScalarValue::U64(1)),
                EventKind::Scalar(ScalarValue::I64(-2)),
                EventKind::Scalar(ScalarValue::F64(1.5)),
                EventKind::Scalar(ScalarValue::Null),
                EventKind::ArrayEnd,
                EventKind::Key("ok".into()),
                EventKind::Scalar(ScalarValue::Bool(true)),
                EventKind::ObjectEnd,
            ]
        );
    }

    #[test]
    fn spans_cover_tokens() {
        seedling_testhelpers::setup();

        let mut parser = JsonParser::new(br#"{"a": "bc"}"#);
        let mut spans = Vec::new();
        while let Some(event) = parser.next_event().unwrap() {
            spans.push(event.span);
        }
        assert_eq!(
            spans,
            vec![
                Span::new(0, 1),
                Span::new(1, 3),
                Span::new(6, 4),
                Span::new(10, 1)
            ]
        );
    }

    #[test]
    fn grammar_errors() {
        seedling_testhelpers::setup();

        let kind = |input: &str| events(input).unwrap_err().kind;
        assert_eq!(kind("[1, 2,]"), JsonErrorKind::TrailingComma);
        assert_eq!(kind(r#"{"a": 1,}"#), JsonErrorKind::TrailingComma);
        assert_eq!(kind("{} {}"), JsonErrorKind::TrailingCharacters);
        assert_eq!(
            kind(r#"{"a" 1}"#),
            JsonErrorKind::UnexpectedToken {
                got: "a number",
                expected: "':'"
            }
        );
        assert_eq!(
            kind("[1"),
            JsonErrorKind::UnexpectedEof {
                expected: "',' or ']'"
            }
        );
        assert_eq!(
            kind(""),
            JsonErrorKind::UnexpectedEof {
                expected: "a value"
            }
        );
    }

    #[test]
    fn error_messages() {
        seedling_testhelpers::setup();

        let err = events(r#"{"a": tru}"#).unwrap_err();
        insta::assert_snapshot!(err, @"unexpected character '}' (bytes 9..10)");

        let err = events("[1,]").unwrap_err();
        insta::assert_snapshot!(err, @"trailing comma (bytes 3..4)");
    }

    #[test]
    fn nothing_after_the_end() {
        seedling_testhelpers::setup();

        let mut parser = JsonParser::new(b"7");
        assert!(parser.next_event().unwrap().is_some());
        assert!(parser.next_event().unwrap().is_none());
        assert!(parser.next_event().unwrap().is_none());
    }
}
