//! Error types for decoding and projection.
//!
//! Decoding failures carry the cursor position at the point of failure plus
//! enough context to locate the problem in the input. Projection failures are
//! reserved for structural misuse; per-field mismatches never surface here.

use std::fmt;
use thiserror::Error;

/// Error raised by the decoder for any grammar violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// The code point position where the error occurred.
    pub position: usize,
    /// The byte offset into the original input matching `position`.
    pub offset: usize,
    /// Optional context about what was being decoded.
    pub context: Option<String>,
    /// Preview of input around the error offset for debugging.
    pub input_preview: Option<String>,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.kind, self.position)?;
        if let Some(ref ctx) = self.context {
            write!(f, " ({})", ctx)?;
        }
        if let Some(ref preview) = self.input_preview {
            write!(f, "\n{}", preview)?;
        }
        Ok(())
    }
}

/// Specific kinds of decode errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Expected a specific character but found something else.
    #[error("expected '{expected}', found '{found}'")]
    UnexpectedChar {
        /// The character that was expected.
        expected: char,
        /// The character that was found.
        found: char,
    },

    /// Opcode that is not part of PHP's serialize format.
    #[error("unknown type marker '{0}'")]
    UnknownType(char),

    /// PHP opcode this decoder does not handle (back-references, custom
    /// serialization, enums).
    #[error("unsupported type marker '{0}'")]
    UnsupportedType(char),

    /// A number contained something other than an ASCII digit.
    #[error("not a digit: '{0}'")]
    NotADigit(char),

    /// A number had no digits before its terminator.
    #[error("empty number")]
    EmptyNumber,

    /// Integer text that does not fit a signed 64-bit value.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Float text that could not be parsed.
    #[error("invalid float: {0}")]
    InvalidFloat(String),

    /// A negative length or count prefix.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// Declared byte length differs from the content actually delimited.
    #[error("string length mismatch: expected {expected}, found {found}")]
    StringLengthMismatch {
        /// The declared length in bytes.
        expected: usize,
        /// The number of bytes before the closing quote.
        found: usize,
    },

    /// No closing quote could be found for a string.
    #[error("unterminated string")]
    UnterminatedString,

    /// Invalid UTF-8 sequence (only with `strict_utf8`).
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    /// Array or object key was neither `i` nor `s`.
    #[error("invalid array key type '{0}': expected string or integer")]
    InvalidArrayKey(char),

    /// A composite was not closed after its declared item count.
    #[error("missing closing brace, found '{0}'")]
    MissingClosingBrace(char),

    /// Nesting depth exceeded.
    #[error("maximum nesting depth ({0}) exceeded")]
    MaxDepthExceeded(usize),

    /// Input continues after the root value.
    #[error("{0} trailing characters after value")]
    TrailingCharacters(usize),
}

impl DecodeError {
    /// Create a new error with the given kind and positions.
    #[inline]
    pub fn new(kind: ErrorKind, position: usize, offset: usize) -> Self {
        Self {
            kind,
            position,
            offset,
            context: None,
            input_preview: None,
        }
    }

    /// Add context to the error.
    #[inline]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add input preview around the error offset for debugging.
    ///
    /// Shows up to 20 bytes before and after the error offset.
    #[cold]
    pub fn with_input_preview(mut self, data: &[u8]) -> Self {
        let error_pos = self.offset.min(data.len());
        let start = error_pos.saturating_sub(20);
        let end = (error_pos + 20).min(data.len());

        if start < end {
            let preview = String::from_utf8_lossy(&data[start..end]);

            // Caret under the failing byte
            let relative_pos = error_pos - start;
            let mut result = String::with_capacity(preview.len() + relative_pos + 2);
            result.push_str(&preview);
            result.push('\n');
            result.push_str(&" ".repeat(relative_pos));
            result.push('^');

            self.input_preview = Some(result);
        }
        self
    }
}

/// Error raised by the projector for structural misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// The root value was not a map or object.
    #[error("root shape mismatch: expected map or object, found {found}")]
    RootShapeMismatch {
        /// Type name of the value that was supplied.
        found: &'static str,
    },

    /// Nested aggregates went deeper than the configured limit.
    #[error("maximum projection depth ({0}) exceeded")]
    MaxDepthExceeded(usize),
}

/// Error returned by [`decode_into`](crate::decode_into).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Decoding the input failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Projecting the decoded value failed.
    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// Result type alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
