//! Low-level JSON scanner that finds token boundaries in a complete buffer.
//!
//! Strings and numbers come back as indices into the buffer. Strings are
//! decoded by [`decode_string`] and numbers by [`parse_number`] once the
//! parser knows it needs them.

use core::str;

use seedling_format::Span;

/// Token kinds; strings and numbers are indices into the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// A string literal; indices exclude the quotes
    String {
        /// Start of the content
        start: usize,
        /// End of the content
        end: usize,
        /// Whether the content contains escape sequences
        has_escapes: bool,
    },
    /// A number literal
    Number {
        /// Start of the number
        start: usize,
        /// End of the number
        end: usize,
        /// What the number looks like
        hint: NumberHint,
    },
    /// End of input
    Eof,
}

impl Token {
    /// Short description for error messages.
    pub const fn describe(&self) -> &'static str {
        match self {
            Token::ObjectStart => "'{'",
            Token::ObjectEnd => "'}'",
            Token::ArrayStart => "'['",
            Token::ArrayEnd => "']'",
            Token::Colon => "':'",
            Token::Comma => "','",
            Token::Null => "null",
            Token::True => "true",
            Token::False => "false",
            Token::String { .. } => "a string",
            Token::Number { .. } => "a number",
            Token::Eof => "end of input",
        }
    }
}

/// Hint about number format to guide parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberHint {
    /// No sign, fraction or exponent
    Unsigned,
    /// Leading `-`, no fraction or exponent
    Signed,
    /// Has a fraction or an exponent
    Float,
}

/// Token with its location
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token
    pub token: Token,
    /// Source span
    pub span: Span,
}

/// Scanner error
#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    /// The error kind
    pub kind: ScanErrorKind,
    /// Source span
    pub span: Span,
}

/// Types of scanner errors
#[derive(Debug, Clone, PartialEq)]
pub enum ScanErrorKind {
    /// A character that cannot start or continue a token
    UnexpectedChar(char),
    /// Input ended inside a token
    UnexpectedEof(&'static str),
    /// A backslash followed by something that is not an escape
    InvalidEscape(char),
    /// Malformed number literal
    InvalidNumber,
    /// Invalid UTF-8, or an unpaired surrogate escape
    InvalidUtf8,
}

/// Result type for scanner operations
pub type ScanResult = Result<SpannedToken, ScanError>;

/// JSON scanner over one complete buffer.
#[derive(Debug, Default)]
pub struct Scanner {
    pos: usize,
}

impl Scanner {
    /// Create a scanner starting at position 0
    pub const fn new() -> Self {
        Scanner { pos: 0 }
    }

    /// Current position in the buffer
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Scan the next token from the buffer.
    pub fn next_token(&mut self, buf: &[u8]) -> ScanResult {
        self.skip_whitespace(buf);

        let start = self.pos;
        let Some(&byte) = buf.get(start) else {
            return Ok(SpannedToken {
                token: Token::Eof,
                span: Span::new(start, 0),
            });
        };

        let punct = match byte {
            b'{' => Some(Token::ObjectStart),
            b'}' => Some(Token::ObjectEnd),
            b'[' => Some(Token::ArrayStart),
            b']' => Some(Token::ArrayEnd),
            b':' => Some(Token::Colon),
            b',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(SpannedToken {
                token,
                span: Span::new(start, 1),
            });
        }

        match byte {
            b'"' => self.scan_string(buf, start),
            b'-' | b'0'..=b'9' => self.scan_number(buf, start),
            b't' => self.scan_literal(buf, start, b"true", Token::True),
            b'f' => self.scan_literal(buf, start, b"false", Token::False),
            b'n' => self.scan_literal(buf, start, b"null", Token::Null),
            _ => Err(ScanError {
                kind: ScanErrorKind::UnexpectedChar(char_at(buf, start)),
                span: Span::new(start, 1),
            }),
        }
    }

    fn skip_whitespace(&mut self, buf: &[u8]) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = buf.get(self.pos) {
            self.pos += 1;
        }
    }

    /// Find the closing quote, noting whether escapes need decoding.
    fn scan_string(&mut self, buf: &[u8], start: usize) -> ScanResult {
        const STEP_SIZE: usize = 16;
        type Window = u128;
        type Chunk = [u8; STEP_SIZE];

        self.pos += 1;
        let content_start = self.pos;
        let mut has_escapes = false;

        loop {
            // skip whole chunks without quotes or backslashes
            while let Some(Ok(chunk)) = buf
                .get(self.pos..)
                .and_then(|rest| rest.get(..STEP_SIZE))
                .map(Chunk::try_from)
            {
                let window = Window::from_ne_bytes(chunk);
                if contains_byte(window, b'"') || contains_byte(window, b'\\') {
                    break;
                }
                self.pos += STEP_SIZE;
            }

            match buf.get(self.pos) {
                Some(b'"') => {
                    let content_end = self.pos;
                    self.pos += 1;
                    return Ok(SpannedToken {
                        token: Token::String {
                            start: content_start,
                            end: content_end,
                            has_escapes,
                        },
                        span: Span::new(start, self.pos - start),
                    });
                }
                Some(b'\\') => {
                    has_escapes = true;
                    // the escaped byte never closes the string
                    self.pos += 2;
                }
                Some(_) => self.pos += 1,
                None => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnexpectedEof("in string"),
                        span: Span::new(start, buf.len() - start),
                    });
                }
            }
        }
    }

    fn scan_number(&mut self, buf: &[u8], start: usize) -> ScanResult {
        let mut hint = NumberHint::Unsigned;
        let mut pos = start;
        let invalid = |end: usize| ScanError {
            kind: ScanErrorKind::InvalidNumber,
            span: Span::new(start, end.max(start + 1) - start),
        };

        if buf.get(pos) == Some(&b'-') {
            hint = NumberHint::Signed;
            pos += 1;
        }

        let int_start = pos;
        pos = skip_digits(buf, pos);
        let int_len = pos - int_start;
        if int_len == 0 || (int_len > 1 && buf[int_start] == b'0') {
            return Err(invalid(pos));
        }

        if buf.get(pos) == Some(&b'.') {
            hint = NumberHint::Float;
            let frac_start = pos + 1;
            pos = skip_digits(buf, frac_start);
            if pos == frac_start {
                return Err(invalid(pos));
            }
        }

        if let Some(b'e' | b'E') = buf.get(pos) {
            hint = NumberHint::Float;
            pos += 1;
            if let Some(b'+' | b'-') = buf.get(pos) {
                pos += 1;
            }
            let exp_start = pos;
            pos = skip_digits(buf, exp_start);
            if pos == exp_start {
                return Err(invalid(pos));
            }
        }

        self.pos = pos;
        Ok(SpannedToken {
            token: Token::Number {
                start,
                end: pos,
                hint,
            },
            span: Span::new(start, pos - start),
        })
    }

    /// Scan a literal keyword (true, false, null)
    fn scan_literal(
        &mut self,
        buf: &[u8],
        start: usize,
        expected: &'static [u8],
        token: Token,
    ) -> ScanResult {
        for (offset, &want) in expected.iter().enumerate() {
            match buf.get(start + offset) {
                Some(&got) if got == want => {}
                Some(_) => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnexpectedChar(char_at(buf, start + offset)),
                        span: Span::new(start + offset, 1),
                    });
                }
                None => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnexpectedEof("in literal"),
                        span: Span::new(start, buf.len() - start),
                    });
                }
            }
        }
        self.pos = start + expected.len();
        Ok(SpannedToken {
            token,
            span: Span::new(start, expected.len()),
        })
    }
}

fn skip_digits(buf: &[u8], mut pos: usize) -> usize {
    while buf.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    pos
}

/// The character starting at `pos`, for error messages.
fn char_at(buf: &[u8], pos: usize) -> char {
    let rest = buf.get(pos..).unwrap_or_default();
    let valid = match str::from_utf8(rest) {
        Ok(text) => text,
        Err(err) => str::from_utf8(&rest[..err.valid_up_to()]).unwrap_or_default(),
    };
    valid.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Check if a 128-bit window contains a specific byte (SIMD-friendly)
#[inline]
const fn contains_byte(window: u128, byte: u8) -> bool {
    let pattern = u128::from_ne_bytes([byte; 16]);
    let xor = window ^ pattern;
    let has_zero = (xor.wrapping_sub(0x01010101010101010101010101010101))
        & !xor
        & 0x80808080808080808080808080808080;
    has_zero != 0
}

/// Decode the content of a string token.
pub fn decode_string(
    buf: &[u8],
    start: usize,
    end: usize,
    has_escapes: bool,
) -> Result<String, ScanError> {
    let slice = &buf[start..end];
    let utf8_error = |offset: usize| ScanError {
        kind: ScanErrorKind::InvalidUtf8,
        span: Span::new(start + offset, 1),
    };

    if !has_escapes {
        return str::from_utf8(slice)
            .map(str::to_owned)
            .map_err(|err| utf8_error(err.valid_up_to()));
    }

    let mut result = String::with_capacity(slice.len());
    let mut i = 0;
    while i < slice.len() {
        // copy the run up to the next escape in one go
        let run_end = slice[i..]
            .iter()
            .position(|&b| b == b'\\')
            .map_or(slice.len(), |offset| i + offset);
        let run = str::from_utf8(&slice[i..run_end])
            .map_err(|err| utf8_error(i + err.valid_up_to()))?;
        result.push_str(run);
        i = run_end;
        if i == slice.len() {
            break;
        }

        let escape_at = i;
        let Some(&escaped) = slice.get(i + 1) else {
            return Err(ScanError {
                kind: ScanErrorKind::UnexpectedEof("in escape sequence"),
                span: Span::new(start + escape_at, 1),
            });
        };
        i += 2;
        let decoded = match escaped {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\x08',
            b'f' => '\x0c',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let high = hex_unit(slice, i, start)?;
                i += 4;
                let code_point = if (0xD800..=0xDBFF).contains(&high) {
                    if slice.get(i) != Some(&b'\\') || slice.get(i + 1) != Some(&b'u') {
                        return Err(utf8_error(escape_at));
                    }
                    let low = hex_unit(slice, i + 2, start)?;
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err(utf8_error(i));
                    }
                    i += 6;
                    0x10000 + ((u32::from(high) & 0x3FF) << 10) + (u32::from(low) & 0x3FF)
                } else {
                    u32::from(high)
                };
                char::from_u32(code_point).ok_or_else(|| utf8_error(escape_at))?
            }
            other => {
                return Err(ScanError {
                    kind: ScanErrorKind::InvalidEscape(other as char),
                    span: Span::new(start + escape_at, 2),
                });
            }
        };
        result.push(decoded);
    }
    Ok(result)
}

/// Four hex digits at `at`, as one UTF-16 code unit.
fn hex_unit(slice: &[u8], at: usize, start: usize) -> Result<u16, ScanError> {
    let digits = slice.get(at..at + 4).ok_or(ScanError {
        kind: ScanErrorKind::UnexpectedEof("in unicode escape"),
        span: Span::new(start + at, slice.len().saturating_sub(at)),
    })?;
    str::from_utf8(digits)
        .ok()
        .and_then(|hex| u16::from_str_radix(hex, 16).ok())
        .ok_or(ScanError {
            kind: ScanErrorKind::InvalidEscape('u'),
            span: Span::new(start + at, 4),
        })
}

/// A parsed number literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedNumber {
    /// Unsigned 64-bit integer
    U64(u64),
    /// Signed 64-bit integer
    I64(i64),
    /// 64-bit floating point
    F64(f64),
}

/// Parse the number token spanning `start..end`.
///
/// Integers that do not fit in 64 bits fall back to `f64`.
pub fn parse_number(
    buf: &[u8],
    start: usize,
    end: usize,
    hint: NumberHint,
) -> Result<ParsedNumber, ScanError> {
    let invalid = || ScanError {
        kind: ScanErrorKind::InvalidNumber,
        span: Span::new(start, end - start),
    };
    // the scanner only lets ASCII through
    let text = str::from_utf8(&buf[start..end]).map_err(|_| invalid())?;
    let float = || text.parse::<f64>().map(ParsedNumber::F64).map_err(|_| invalid());

    match hint {
        NumberHint::Float => float(),
        NumberHint::Signed => match text.parse::<i64>() {
            Ok(n) => Ok(ParsedNumber::I64(n)),
            Err(_) => float(),
        },
        NumberHint::Unsigned => match text.parse::<u64>() {
            Ok(n) => Ok(ParsedNumber::U64(n)),
            Err(_) => float(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new();
        let mut out = Vec::new();
        loop {
            let token = scanner.next_token(input.as_bytes()).unwrap().token;
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn punctuation_and_literals() {
        assert_eq!(
            tokens(r#" { "a" : [ true , null ] } "#),
            vec![
                Token::ObjectStart,
                Token::String {
                    start: 4,
                    end: 5,
                    has_escapes: false
                },
                Token::Colon,
                Token::ArrayStart,
                Token::True,
                Token::Comma,
                Token::Null,
                Token::ArrayEnd,
                Token::ObjectEnd,
            ]
        );
    }

    #[test]
    fn long_strings_cross_chunks() {
        let input = format!(r#""{}\"{}""#, "x".repeat(40), "y".repeat(20));
        let mut scanner = Scanner::new();
        let token = scanner.next_token(input.as_bytes()).unwrap();
        let Token::String {
            start,
            end,
            has_escapes,
        } = token.token
        else {
            panic!("expected a string, got {:?}", token.token);
        };
        assert!(has_escapes);
        assert_eq!(token.span, Span::new(0, input.len()));
        let decoded = decode_string(input.as_bytes(), start, end, has_escapes).unwrap();
        assert_eq!(decoded, format!("{}\"{}", "x".repeat(40), "y".repeat(20)));
    }

    #[test]
    fn escapes_decode() {
        let input = r#"a\n\té😀\/"#;
        let decoded = decode_string(input.as_bytes(), 0, input.len(), true).unwrap();
        assert_eq!(decoded, "a\n\té😀/");

        let err = decode_string(br"\q", 0, 2, true).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidEscape('q'));

        let err = decode_string(br"\ud83d", 0, 6, true).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidUtf8);
    }

    #[test]
    fn numbers() {
        let parse = |input: &str| {
            let mut scanner = Scanner::new();
            match scanner.next_token(input.as_bytes())?.token {
                Token::Number { start, end, hint } => {
                    parse_number(input.as_bytes(), start, end, hint)
                }
                other => panic!("expected a number, got {other:?}"),
            }
        };
        assert_eq!(parse("42"), Ok(ParsedNumber::U64(42)));
        assert_eq!(parse("-7"), Ok(ParsedNumber::I64(-7)));
        assert_eq!(parse("1.5e3"), Ok(ParsedNumber::F64(1500.0)));
        assert_eq!(
            parse("18446744073709551616"),
            Ok(ParsedNumber::F64(18446744073709551616.0))
        );
        for bad in ["01", "-", "1.", "1e", "-x"] {
            assert_eq!(
                parse(bad).unwrap_err().kind,
                ScanErrorKind::InvalidNumber,
                "{bad}"
            );
        }
    }

    #[test]
    fn broken_literals_and_strings() {
        let mut scanner = Scanner::new();
        let err = scanner.next_token(b"nul").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnexpectedEof("in literal"));

        let mut scanner = Scanner::new();
        let err = scanner.next_token(b"tru e").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnexpectedChar(' '));

        let mut scanner = Scanner::new();
        let err = scanner.next_token(br#""open"#).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnexpectedEof("in string"));
    }
}
