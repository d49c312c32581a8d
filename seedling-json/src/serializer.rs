use core::fmt::{self, Write as _};

use seedling_core::{Describe, ScalarValue};
use seedling_format::{FormatSerializer, SerializeError, serialize_root};

/// Options for JSON serialization.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to pretty-print with indentation (default: false)
    pub pretty: bool,

    /// Indentation string for pretty-printing (default: "  ")
    pub indent: &'static str,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ",
        }
    }
}

impl SerializeOptions {
    /// Create new default options (compact output).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty-printing with default indentation.
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Set a custom indentation string (implies pretty-printing).
    pub const fn indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self.pretty = true;
        self
    }
}

/// The serialization walk called the writer out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSerializeError {
    msg: &'static str,
}

impl fmt::Display for JsonSerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg)
    }
}

impl std::error::Error for JsonSerializeError {}

#[derive(Debug, Clone, Copy)]
enum Ctx {
    Object { first: bool },
    Array { first: bool },
}

/// JSON writer with configurable formatting options.
pub struct JsonSerializer {
    out: String,
    stack: Vec<Ctx>,
    options: SerializeOptions,
}

impl JsonSerializer {
    /// Create a new JSON serializer with default (compact) options.
    pub fn new() -> Self {
        Self::with_options(SerializeOptions::default())
    }

    /// Create a new JSON serializer with the given options.
    pub const fn with_options(options: SerializeOptions) -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            options,
        }
    }

    /// Consume the serializer and return the output.
    pub fn finish(self) -> String {
        self.out
    }

    /// Write a newline and indentation if in pretty mode.
    fn write_indent(&mut self) {
        if self.options.pretty {
            self.out.push('\n');
            for _ in 0..self.stack.len() {
                self.out.push_str(self.options.indent);
            }
        }
    }

    fn before_value(&mut self) {
        if let Some(Ctx::Array { first }) = self.stack.last_mut() {
            if !*first {
                self.out.push(',');
            }
            *first = false;
            self.write_indent();
        }
        // object values are separated by `field_key`
    }

    fn write_json_string(&mut self, s: &str) {
        self.out.push('"');
        let mut run_start = 0;
        for (index, c) in s.char_indices() {
            let escaped = match c {
                '"' => "\\\"",
                '\\' => "\\\\",
                '\n' => "\\n",
                '\r' => "\\r",
                '\t' => "\\t",
                '\u{08}' => "\\b",
                '\u{0C}' => "\\f",
                c if c.is_ascii_control() => "",
                _ => continue,
            };
            self.out.push_str(&s[run_start..index]);
            if escaped.is_empty() {
                // infallible for String
                let _ = write!(self.out, "\\u{:04x}", c as u32);
            } else {
                self.out.push_str(escaped);
            }
            run_start = index + c.len_utf8();
        }
        self.out.push_str(&s[run_start..]);
        self.out.push('"');
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatSerializer for JsonSerializer {
    type Error = JsonSerializeError;

    fn begin_object(&mut self) -> Result<(), Self::Error> {
        self.before_value();
        self.out.push('{');
        self.stack.push(Ctx::Object { first: true });
        Ok(())
    }

    fn field_key(&mut self, key: &str) -> Result<(), Self::Error> {
        match self.stack.last_mut() {
            Some(Ctx::Object { first }) => {
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                self.write_indent();
                self.write_json_string(key);
                self.out.push(':');
                if self.options.pretty {
                    self.out.push(' ');
                }
                Ok(())
            }
            _ => Err(JsonSerializeError {
                msg: "field_key called outside of an object",
            }),
        }
    }

    fn end_object(&mut self) -> Result<(), Self::Error> {
        match self.stack.pop() {
            Some(Ctx::Object { first }) => {
                if !first {
                    self.write_indent();
                }
                self.out.push('}');
                Ok(())
            }
            _ => Err(JsonSerializeError {
                msg: "end_object called without matching begin_object",
            }),
        }
    }

    fn begin_array(&mut self) -> Result<(), Self::Error> {
        self.before_value();
        self.out.push('[');
        self.stack.push(Ctx::Array { first: true });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Self::Error> {
        match self.stack.pop() {
            Some(Ctx::Array { first }) => {
                if !first {
                    self.write_indent();
                }
                self.out.push(']');
                Ok(())
            }
            _ => Err(JsonSerializeError {
                msg: "end_array called without matching begin_array",
            }),
        }
    }

    fn scalar(&mut self, value: &ScalarValue) -> Result<(), Self::Error> {
        self.before_value();
        match value {
            ScalarValue::Null => self.out.push_str("null"),
            ScalarValue::Bool(v) => self.out.push_str(if *v { "true" } else { "false" }),
            ScalarValue::I64(v) => {
                let _ = write!(self.out, "{v}");
            }
            ScalarValue::U64(v) => {
                let _ = write!(self.out, "{v}");
            }
            ScalarValue::F64(v) => {
                if v.is_finite() {
                    let _ = write!(self.out, "{v}");
                } else {
                    self.out.push_str("null");
                }
            }
            ScalarValue::Str(s) => self.write_json_string(s),
        }
        Ok(())
    }
}

/// Serialize a value to a compact JSON string.
pub fn to_string<T: Describe>(value: &T) -> Result<String, SerializeError<JsonSerializeError>> {
    to_string_with_options(value, &SerializeOptions::default())
}

/// Serialize a value to a pretty-printed JSON string.
pub fn to_string_pretty<T: Describe>(
    value: &T,
) -> Result<String, SerializeError<JsonSerializeError>> {
    to_string_with_options(value, &SerializeOptions::default().pretty())
}

/// Serialize a value to a JSON string with custom options.
pub fn to_string_with_options<T: Describe>(
    value: &T,
    options: &SerializeOptions,
) -> Result<String, SerializeError<JsonSerializeError>> {
    let mut serializer = JsonSerializer::with_options(options.clone());
    serialize_root(value, &mut serializer)?;
    Ok(serializer.finish())
}

/// Serialize a value to compact JSON bytes.
pub fn to_vec<T: Describe>(value: &T) -> Result<Vec<u8>, SerializeError<JsonSerializeError>> {
    to_string(value).map(String::into_bytes)
}
