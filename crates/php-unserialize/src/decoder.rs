//! Recursive-descent decoder for PHP's serialize format.
//!
//! The input is split into code points up front so the cursor moves one
//! character at a time, while every length prefix in the grammar is checked
//! against the byte width those characters had in the original buffer.
//!
//! # Grammar
//!
//! | Opcode | Form | Result |
//! |--------|------|--------|
//! | `N` | `N;` | [`Value::Null`] |
//! | `b` | `b:<int>;` | [`Value::Bool`], true for any positive integer |
//! | `i` | `i:<int>;` | [`Value::Int`] |
//! | `d` | `d:<int>[.<digits>][E<int>];`, `INF`, `-INF`, `NAN` | [`Value::Float`] |
//! | `s` | `s:<bytes>:"<content>";` | [`Value::Str`] |
//! | `a` | `a:<count>:{<key><value>...}` | [`Value::List`] or [`Value::Map`] |
//! | `O` | `O:<bytes>:"<class>":<count>:{<key><value>...}` | [`Value::Object`] |
//!
//! Back-references (`r`, `R`), custom serialization (`C`) and enums (`E`)
//! fail with [`ErrorKind::UnsupportedType`].
//!
//! # Tracing Support
//!
//! Enable the `tracing` feature for decode instrumentation:
//!
//! ```toml
//! php-unserialize = { version = "0.1", features = ["tracing"] }
//! ```

use std::collections::HashMap;

use bstr::ByteSlice;
use memchr::memmem;

#[cfg(feature = "tracing")]
use tracing::{debug, instrument, trace, warn};

use crate::error::{DecodeError, ErrorKind};
use crate::value::Value;

/// Maximum nesting depth to prevent stack overflow.
const MAX_DEPTH: usize = 512;

/// Decoder configuration options.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum nesting depth for arrays and objects.
    pub max_depth: usize,
    /// Reject input containing invalid UTF-8 instead of decoding it as U+FFFD.
    pub strict_utf8: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            strict_utf8: false,
        }
    }
}

/// Key of an array or object entry.
enum ArrayKey {
    Int(i64),
    Str(String),
}

impl ArrayKey {
    fn into_string(self) -> String {
        match self {
            ArrayKey::Int(i) => i.to_string(),
            ArrayKey::Str(s) => s,
        }
    }
}

/// A PHP unserialize decoder over one complete input buffer.
pub struct Decoder<'a> {
    /// Original input, used for byte-level searches and error previews.
    data: &'a [u8],
    /// Input as code points.
    chars: Vec<char>,
    /// Byte offset of each code point, plus a final entry for `data.len()`.
    offsets: Vec<usize>,
    /// Cursor into `chars`.
    pos: usize,
    /// Decoder configuration.
    config: DecoderConfig,
    /// Current nesting depth.
    depth: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder with default configuration.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, DecoderConfig::default())
    }

    /// Create a new decoder with custom configuration.
    pub fn with_config(data: &'a [u8], config: DecoderConfig) -> Self {
        let mut chars = Vec::with_capacity(data.len());
        let mut offsets = Vec::with_capacity(data.len() + 1);
        for (start, _end, ch) in data.char_indices() {
            chars.push(ch);
            offsets.push(start);
        }
        offsets.push(data.len());

        Self {
            data,
            chars,
            offsets,
            pos: 0,
            config,
            depth: 0,
        }
    }

    /// Decode the input into a single value.
    ///
    /// The whole input must be consumed; anything after the root value is an
    /// error. No partial value is ever returned.
    #[cfg_attr(feature = "tracing", instrument(skip(self), fields(data_len = self.data.len())))]
    pub fn decode(&mut self) -> Result<Value, DecodeError> {
        #[cfg(feature = "tracing")]
        debug!(data_len = self.data.len(), "Starting PHP unserialize");

        let result = self
            .check_utf8()
            .and_then(|()| self.decode_value())
            .and_then(|value| self.finish(value));

        #[cfg(feature = "tracing")]
        match &result {
            Ok(value) => debug!(value_type = value.type_name(), "Decode completed successfully"),
            Err(e) => warn!(error = %e, "Decode failed"),
        }

        result
    }

    fn check_utf8(&self) -> Result<(), DecodeError> {
        if !self.config.strict_utf8 {
            return Ok(());
        }
        match self.data.to_str() {
            Ok(_) => Ok(()),
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let position = self.offsets.partition_point(|&o| o < valid_up_to);
                Err(self.error_at(ErrorKind::InvalidUtf8, position))
            }
        }
    }

    fn finish(&self, value: Value) -> Result<Value, DecodeError> {
        let remaining = self.chars.len() - self.pos;
        if remaining > 0 {
            return Err(self.error(ErrorKind::TrailingCharacters(remaining)));
        }
        Ok(value)
    }

    /// Decode a single value at the cursor, dispatching on its opcode.
    #[cfg_attr(feature = "tracing", instrument(skip(self), level = "trace", fields(pos = self.pos, depth = self.depth)))]
    fn decode_value(&mut self) -> Result<Value, DecodeError> {
        let opcode = self
            .peek(0)
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEof))?;

        #[cfg(feature = "tracing")]
        trace!(type_marker = %opcode, pos = self.pos, "Decoding value");

        match opcode {
            'N' => self.decode_null(),
            'b' => self.decode_bool(),
            'i' => self.decode_int().map(Value::Int),
            'd' => self.decode_float(),
            's' => self.decode_string().map(Value::Str),
            'a' => self.decode_array(),
            'O' => self.decode_object(),
            'r' | 'R' | 'C' | 'E' | 'o' | 'S' => {
                #[cfg(feature = "tracing")]
                warn!(type_marker = %opcode, pos = self.pos, "Unsupported type marker");
                Err(self.error(ErrorKind::UnsupportedType(opcode)))
            }
            _ => {
                #[cfg(feature = "tracing")]
                warn!(type_marker = %opcode, pos = self.pos, "Unknown type marker");
                Err(self.error(ErrorKind::UnknownType(opcode)))
            }
        }
    }

    /// Decode `N;`
    fn decode_null(&mut self) -> Result<Value, DecodeError> {
        self.expect('N')?;
        self.expect(';')?;
        Ok(Value::Null)
    }

    /// Decode `b:<int>;`
    fn decode_bool(&mut self) -> Result<Value, DecodeError> {
        self.expect('b')?;
        self.expect(':')?;
        let n = self.pick_number(';')?;
        self.expect(';')?;
        Ok(Value::Bool(n > 0))
    }

    /// Decode `i:<int>;`
    fn decode_int(&mut self) -> Result<i64, DecodeError> {
        self.expect('i')?;
        self.expect(':')?;
        let n = self.pick_number(';')?;
        self.expect(';')?;
        Ok(n)
    }

    /// Decode `d:<int>.<digits>;` and the other forms PHP writes for floats.
    ///
    /// The parts are joined as text before parsing, so a fractional part
    /// like `05` keeps its leading zero.
    fn decode_float(&mut self) -> Result<Value, DecodeError> {
        self.expect('d')?;
        self.expect(':')?;

        let start = self.pos;
        if let Some(special) = self.special_float() {
            self.expect(';')?;
            return Ok(Value::Float(special));
        }

        let mut text = self.scan_number(|c| matches!(c, '.' | ';' | 'E' | 'e'), true)?;
        if self.peek(0) == Some('.') {
            self.advance();
            let fraction = self.scan_number(|c| matches!(c, ';' | 'E' | 'e'), false)?;
            text.push('.');
            text.push_str(&fraction);
        }
        if matches!(self.peek(0), Some('E' | 'e')) {
            self.advance();
            if self.peek(0) == Some('+') {
                self.advance();
            }
            let exponent = self.scan_number(|c| c == ';', true)?;
            text.push('e');
            text.push_str(&exponent);
        }
        self.expect(';')?;

        match text.parse::<f64>() {
            Ok(f) => Ok(Value::Float(f)),
            Err(_) => Err(self.error_at(ErrorKind::InvalidFloat(text), start)),
        }
    }

    fn special_float(&mut self) -> Option<f64> {
        for (text, value) in [
            ("INF", f64::INFINITY),
            ("-INF", f64::NEG_INFINITY),
            ("NAN", f64::NAN),
        ] {
            if text.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c)) {
                self.pos += text.len();
                return Some(value);
            }
        }
        None
    }

    /// Decode `s:<len>:"<content>";`
    fn decode_string(&mut self) -> Result<String, DecodeError> {
        self.expect('s')?;
        self.expect(':')?;
        let len = self.pick_length(':')?;
        self.expect(':')?;
        self.pick_string(len, ';')
    }

    /// Decode `a:<count>:{<key><value>...}`
    fn decode_array(&mut self) -> Result<Value, DecodeError> {
        self.expect('a')?;
        self.expect(':')?;
        let count = self.pick_length(':')?;
        self.expect(':')?;
        self.expect('{')?;
        self.enter()?;

        let mut entries = Vec::with_capacity(count.min(1024)); // Cap initial allocation
        for _ in 0..count {
            let key = self.decode_key()?;
            let value = self.decode_value()?;
            entries.push((key, value));
        }

        self.close()?;

        // Only an `i`-first array can satisfy this, and only when its keys
        // run 0..n-1 in order. Anything else keeps its keys in a map.
        let is_list = entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| matches!(key, ArrayKey::Int(n) if usize::try_from(*n) == Ok(i)));

        if is_list {
            return Ok(Value::List(entries.into_iter().map(|(_, v)| v).collect()));
        }

        #[cfg(feature = "tracing")]
        if matches!(entries.first(), Some((ArrayKey::Int(_), _))) {
            trace!(count, "Integer-keyed array is not a list, decoding as map");
        }

        Ok(Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect(),
        ))
    }

    /// Decode `O:<len>:"<class>":<count>:{<key><value>...}`
    fn decode_object(&mut self) -> Result<Value, DecodeError> {
        self.expect('O')?;
        self.expect(':')?;
        let name_len = self.pick_length(':')?;
        self.expect(':')?;
        let class_name = self.pick_string(name_len, ':')?;

        #[cfg(feature = "tracing")]
        trace!(class = %class_name, "Decoding object");

        self.decode_object_fields().map_err(|e| {
            if e.context.is_some() {
                e
            } else {
                e.with_context(format!("in object of class {}", class_name))
            }
        })
    }

    fn decode_object_fields(&mut self) -> Result<Value, DecodeError> {
        let count = self.pick_length(':')?;
        self.expect(':')?;
        self.expect('{')?;
        self.enter()?;

        let mut fields = HashMap::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.decode_key()?.into_string();
            let value = self.decode_value()?;
            fields.insert(key, value);
        }

        self.close()?;
        Ok(Value::Object(fields))
    }

    /// Decode an `i` or `s` entry key.
    fn decode_key(&mut self) -> Result<ArrayKey, DecodeError> {
        match self.peek(0) {
            Some('i') => self.decode_int().map(ArrayKey::Int),
            Some('s') => self.decode_string().map(ArrayKey::Str),
            Some(c) => Err(self.error(ErrorKind::InvalidArrayKey(c))),
            None => Err(self.error(ErrorKind::UnexpectedEof)),
        }
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            #[cfg(feature = "tracing")]
            warn!(depth = self.depth, max_depth = self.config.max_depth, "Max depth exceeded");
            return Err(self.error(ErrorKind::MaxDepthExceeded(self.config.max_depth)));
        }
        Ok(())
    }

    /// Consume the `}` closing a composite.
    fn close(&mut self) -> Result<(), DecodeError> {
        match self.advance() {
            Some('}') => {
                self.depth -= 1;
                Ok(())
            }
            Some(found) => Err(self.error_at(ErrorKind::MissingClosingBrace(found), self.pos - 1)),
            None => Err(self
                .error(ErrorKind::UnexpectedEof)
                .with_context("expected closing '}'")),
        }
    }

    // Cursor primitives

    /// Code point at `cursor + offset`, or `None` past the end.
    #[inline]
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Consume one code point.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        Some(c)
    }

    /// Consume exactly `n` code points.
    fn take_range(&mut self, n: usize) -> Result<&[char], DecodeError> {
        let start = self.pos;
        let end = start + n;
        if end > self.chars.len() {
            return Err(self.error_at(ErrorKind::UnexpectedEof, self.chars.len()));
        }
        self.pos = end;
        Ok(&self.chars[start..end])
    }

    /// Expect a specific code point, returning an error if it doesn't match.
    #[inline]
    fn expect(&mut self, expected: char) -> Result<(), DecodeError> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(found) => Err(self.error_at(ErrorKind::UnexpectedChar { expected, found }, self.pos - 1)),
            None => Err(self.error(ErrorKind::UnexpectedEof)),
        }
    }

    /// Consume an optionally `-`-signed run of ASCII digits that ends right
    /// before a code point accepted by `is_end`. The terminator is left in
    /// place.
    fn scan_number(
        &mut self,
        is_end: impl Fn(char) -> bool,
        signed: bool,
    ) -> Result<String, DecodeError> {
        let start = self.pos;
        let mut i = 0;
        let mut digits = 0;
        loop {
            match self.peek(i) {
                Some(c) if is_end(c) => break,
                Some('-') if signed && i == 0 => {}
                Some(c) if c.is_ascii_digit() => digits += 1,
                Some(c) => return Err(self.error_at(ErrorKind::NotADigit(c), start + i)),
                None => return Err(self.error_at(ErrorKind::UnexpectedEof, start + i)),
            }
            i += 1;
        }
        if digits == 0 {
            return Err(self.error_at(ErrorKind::EmptyNumber, start));
        }
        Ok(self.take_range(i)?.iter().collect())
    }

    /// Read a signed integer terminated by `end`.
    fn pick_number(&mut self, end: char) -> Result<i64, DecodeError> {
        let start = self.pos;
        let text = self.scan_number(|c| c == end, true)?;
        match text.parse() {
            Ok(n) => Ok(n),
            Err(_) => Err(self.error_at(ErrorKind::InvalidInteger(text), start)),
        }
    }

    /// Read a non-negative length or count terminated by `end`.
    fn pick_length(&mut self, end: char) -> Result<usize, DecodeError> {
        let start = self.pos;
        let n = self.pick_number(end)?;
        usize::try_from(n).map_err(|_| self.error_at(ErrorKind::InvalidLength(n), start))
    }

    /// Read `"<content>"` followed by `terminator`, where the content is
    /// exactly `len` bytes of the original input. Quotes inside that window
    /// belong to the content.
    fn pick_string(&mut self, len: usize, terminator: char) -> Result<String, DecodeError> {
        self.expect('"')?;

        let start = self.pos;
        let base = self.offsets[start];
        let mut end = start;
        while end < self.chars.len() && self.offsets[end] - base < len {
            end += 1;
        }

        let closes = self.offsets[end] - base == len
            && self.chars.get(end) == Some(&'"')
            && self.chars.get(end + 1) == Some(&terminator);
        if !closes {
            return Err(self.length_mismatch(start, len, terminator));
        }

        let content = self.take_range(end - start)?.iter().collect();
        self.expect('"')?;
        self.expect(terminator)?;
        Ok(content)
    }

    /// Describe a string whose declared length does not land on its closing
    /// quote, using the first `"` + terminator after the opening quote.
    #[cold]
    #[inline(never)]
    fn length_mismatch(&self, start: usize, declared: usize, terminator: char) -> DecodeError {
        let base = self.offsets[start];
        let needle = format!("\"{}", terminator);
        match memmem::find(&self.data[base..], needle.as_bytes()) {
            Some(found) => self.error_at(
                ErrorKind::StringLengthMismatch {
                    expected: declared,
                    found,
                },
                start,
            ),
            None => self.error_at(ErrorKind::UnterminatedString, start),
        }
    }

    #[inline]
    fn error(&self, kind: ErrorKind) -> DecodeError {
        self.error_at(kind, self.pos)
    }

    /// Build an error at a code point position with an input preview.
    #[cold]
    #[inline(never)]
    fn error_at(&self, kind: ErrorKind, position: usize) -> DecodeError {
        let offset = self.offsets[position.min(self.chars.len())];
        DecodeError::new(kind, position, offset).with_input_preview(self.data)
    }
}

/// Decode PHP serialized data from bytes.
///
/// # Example
///
/// ```rust
/// use php_unserialize::{decode, Value};
///
/// let value = decode(b"a:2:{i:0;s:1:\"a\";i:1;s:1:\"b\";}").unwrap();
/// assert_eq!(
///     value,
///     Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
/// );
/// ```
#[inline]
pub fn decode(data: &[u8]) -> Result<Value, DecodeError> {
    #[cfg(feature = "tracing")]
    trace!(data_len = data.len(), "decode called");

    Decoder::new(data).decode()
}

/// Decode PHP serialized data from bytes with custom configuration.
///
/// # Example
///
/// ```rust
/// use php_unserialize::{decode_with_config, DecoderConfig};
///
/// let config = DecoderConfig {
///     max_depth: 64,
///     strict_utf8: true,
/// };
/// let value = decode_with_config(b"i:42;", config).unwrap();
/// assert_eq!(value.as_int(), Some(42));
/// ```
#[inline]
pub fn decode_with_config(data: &[u8], config: DecoderConfig) -> Result<Value, DecodeError> {
    #[cfg(feature = "tracing")]
    trace!(data_len = data.len(), ?config, "decode_with_config called");

    Decoder::with_config(data, config).decode()
}
