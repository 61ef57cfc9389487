// ABOUTME: Error types shared by the JSON and CBOR incremental decoders.
// ABOUTME: Every variant is terminal; decoders latch the first one and return it forever.

use std::fmt;

/// The result type for feedparse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding.
///
/// The set is closed so callers can match by kind. `Clone` lets a decoder hand
/// the same latched error back on every call after the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input ended while an aggregate or literal was still open.
    Incomplete,

    /// Input ended inside a string.
    UnterminatedString,

    /// Non-whitespace after a complete top-level JSON value.
    TrailingBytes,

    /// The JSON decoder was fed after `finalize` succeeded.
    Finalized,

    /// A byte that cannot start or continue a value here.
    UnknownCharacter(u8),

    /// An object key was not followed by `:`.
    ExpectedColon(u8),

    /// An object expected a `"`-led field name.
    ExpectedFieldName(u8),

    /// After a value, expected `,` or the closing bracket.
    ExpectedDelimiter(u8),

    /// `}` or `]` where a value or field name was required.
    UnexpectedClose(u8),

    /// A number literal is malformed.
    ExpectedDigit,

    /// A `null`, `true` or `false` literal did not match.
    ExpectedLiteral(&'static str),

    /// A string contains an invalid escape sequence.
    InvalidEscape,

    /// A string contains an unescaped control character.
    ControlCharacter(u8),

    /// Invalid UTF-8 byte sequence in a string.
    InvalidUtf8,

    /// Invalid or reserved CBOR leading byte.
    InvalidCode(u8),

    /// Indefinite-length CBOR byte or text strings are not supported.
    IndefiniteString,

    /// A CBOR map key that is not a text string.
    NonTextKey(u8),

    /// A recognized construct this decoder does not implement.
    Unsupported(&'static str),

    /// A number does not fit any event width.
    ValueOutOfRange,

    /// Aggregate nesting too deep.
    MaxDepthExceeded,

    /// A string or literal exceeds the configured length limit.
    MaxStringLengthExceeded,

    /// I/O error while reading the input.
    Io(String),

    /// Error raised by a consumer.
    Custom(String),
}

impl Error {
    /// Returns the standardized error type name for test matching.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Incomplete => "incomplete",
            Error::UnterminatedString => "unterminated_string",
            Error::TrailingBytes => "trailing_bytes",
            Error::Finalized => "finalized",
            Error::UnknownCharacter(_) => "unknown_character",
            Error::ExpectedColon(_) => "expected_colon",
            Error::ExpectedFieldName(_) => "expected_field_name",
            Error::ExpectedDelimiter(_) => "expected_delimiter",
            Error::UnexpectedClose(_) => "unexpected_close",
            Error::ExpectedDigit => "expected_digit",
            Error::ExpectedLiteral(_) => "expected_literal",
            Error::InvalidEscape => "invalid_escape",
            Error::ControlCharacter(_) => "control_character",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::InvalidCode(_) => "invalid_code",
            Error::IndefiniteString => "indefinite_string",
            Error::NonTextKey(_) => "non_text_key",
            Error::Unsupported(_) => "unsupported",
            Error::ValueOutOfRange => "value_out_of_range",
            Error::MaxDepthExceeded => "max_depth_exceeded",
            Error::MaxStringLengthExceeded => "max_string_length_exceeded",
            Error::Io(_) => "io_error",
            Error::Custom(_) => "custom",
        }
    }
}

/// Printable form of a byte for error messages.
struct ByteRepr(u8);

impl fmt::Display for ByteRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "'{}'", self.0 as char)
        } else {
            write!(f, "0x{:02x}", self.0)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Incomplete => write!(f, "incomplete input"),
            Error::UnterminatedString => write!(f, "missing closing quote"),
            Error::TrailingBytes => write!(f, "trailing bytes after value"),
            Error::Finalized => write!(f, "decoder already finalized"),
            Error::UnknownCharacter(b) => write!(f, "unknown character {}", ByteRepr(*b)),
            Error::ExpectedColon(b) => write!(f, "expected ':' after object key, found {}", ByteRepr(*b)),
            Error::ExpectedFieldName(b) => {
                write!(f, "expected object field name, found {}", ByteRepr(*b))
            }
            Error::ExpectedDelimiter(b) => {
                write!(f, "expected ',' or closing bracket, found {}", ByteRepr(*b))
            }
            Error::UnexpectedClose(b) => write!(f, "unexpected {}", ByteRepr(*b)),
            Error::ExpectedDigit => write!(f, "expected a digit"),
            Error::ExpectedLiteral(lit) => write!(f, "expected {lit} value"),
            Error::InvalidEscape => write!(f, "invalid escape sequence in string"),
            Error::ControlCharacter(b) => write!(f, "control character 0x{b:02x} in string"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::InvalidCode(code) => write!(f, "invalid leading byte: 0x{code:02x}"),
            Error::IndefiniteString => {
                write!(f, "indefinite-length byte and text strings are not supported")
            }
            Error::NonTextKey(code) => write!(f, "map key must be a text string, got 0x{code:02x}"),
            Error::Unsupported(what) => write!(f, "unsupported: {what}"),
            Error::ValueOutOfRange => write!(f, "value out of range"),
            Error::MaxDepthExceeded => write!(f, "maximum nesting depth exceeded"),
            Error::MaxStringLengthExceeded => write!(f, "maximum string length exceeded"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
