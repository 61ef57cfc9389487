// ABOUTME: Incremental JSON decoder fed with arbitrary byte fragments.
// ABOUTME: Push-down automaton over an explicit frame stack that emits events to a Consumer.

use std::io;

use memchr::memchr2;

use crate::carry::Carry;
use crate::consumer::{Consumer, ElementType};
use crate::error::{Error, Result};
use crate::types::DecoderConfig;
use crate::unescape::unescape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    Null,
    True,
    False,
}

impl Literal {
    const fn text(self) -> &'static [u8] {
        match self {
            Literal::Null => b"null",
            Literal::True => b"true",
            Literal::False => b"false",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::True => "true",
            Literal::False => "false",
        }
    }
}

/// What the decoder expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// No value seen yet.
    Start,
    /// Top-level value complete; only whitespace may follow.
    End,
    /// After `{`: `}` or a key.
    ObjectFirst,
    /// After `,` in an object: a key.
    ObjectKey,
    /// Inside a key string.
    Key,
    ObjectColon,
    ObjectValue,
    /// After a member value: `,` or `}`.
    ObjectNext,
    /// After `[`: `]` or a value.
    ArrayFirst,
    ArrayValue,
    /// After an element: `,` or `]`.
    ArrayNext,
    /// `matched` bytes of the literal seen so far.
    Literal { lit: Literal, matched: usize },
    String,
    Number,
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

#[inline]
fn is_number_terminator(c: u8) -> bool {
    is_whitespace(c) || matches!(c, b',' | b']' | b'}')
}

#[inline]
fn skip_whitespace(b: &[u8]) -> usize {
    b.iter().position(|&c| !is_whitespace(c)).unwrap_or(b.len())
}

fn skip_digits(raw: &[u8], mut i: usize) -> usize {
    while matches!(raw.get(i), Some(b'0'..=b'9')) {
        i += 1;
    }
    i
}

/// Check `raw` against the JSON number grammar.
fn is_valid_number(raw: &[u8]) -> bool {
    let mut i = usize::from(raw.first() == Some(&b'-'));
    match raw.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = skip_digits(raw, i + 1),
        _ => return false,
    }
    if raw.get(i) == Some(&b'.') {
        let start = i + 1;
        i = skip_digits(raw, start);
        if i == start {
            return false;
        }
    }
    if matches!(raw.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(raw.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        i = skip_digits(raw, start);
        if i == start {
            return false;
        }
    }
    i == raw.len()
}

/// Convert a complete number literal and report it.
///
/// Integers go to `on_u64` (non-negative) or `on_i64` (negative); anything
/// with a fraction or exponent goes to `on_f64`.
fn emit_number<C: Consumer>(consumer: &mut C, raw: &[u8], is_float: bool) -> Result<()> {
    if !is_valid_number(raw) {
        return Err(Error::ExpectedDigit);
    }
    let text = std::str::from_utf8(raw)?;

    if is_float {
        let value: f64 = text.parse().map_err(|_| Error::ExpectedDigit)?;
        if !value.is_finite() {
            return Err(Error::ValueOutOfRange);
        }
        consumer.on_f64(value)
    } else if raw[0] == b'-' {
        consumer.on_i64(text.parse().map_err(|_| Error::ValueOutOfRange)?)
    } else {
        consumer.on_u64(text.parse().map_err(|_| Error::ValueOutOfRange)?)
    }
}

/// Incremental JSON decoder.
///
/// Feed fragments in stream order with [`feed`](Self::feed), then call
/// [`finalize`](Self::finalize) once the input has ended.
///
/// ```rust
/// use feedparse::{Event, JsonDecoder};
///
/// let mut dec = JsonDecoder::new(Vec::new());
/// dec.feed(b"tr").unwrap();
/// assert!(dec.consumer().is_empty());
/// dec.feed(b"ue").unwrap();
/// dec.finalize().unwrap();
/// assert_eq!(dec.into_consumer(), vec![Event::Bool(true)]);
/// ```
pub struct JsonDecoder<C> {
    consumer: C,
    config: DecoderConfig,
    state: Frame,
    /// Enclosing frames, resumed by `pop`.
    stack: Vec<Frame>,
    carry: Carry,
    /// Last byte scanned inside a string was an unescaped backslash.
    in_escape: bool,
    /// Current number literal has a fraction or exponent.
    is_float: bool,
    /// Open objects and arrays.
    depth: usize,
    offset: u64,
    failed: Option<Error>,
    finalized: bool,
}

impl<C: Consumer> JsonDecoder<C> {
    /// Create a decoder that reports to `consumer`.
    #[must_use]
    pub fn new(consumer: C) -> Self {
        Self::with_config(consumer, DecoderConfig::default())
    }

    /// Create a decoder with custom configuration.
    #[must_use]
    pub fn with_config(consumer: C, config: DecoderConfig) -> Self {
        Self {
            consumer,
            state: Frame::Start,
            stack: Vec::with_capacity(config.stack_capacity),
            carry: Carry::with_limit(config.max_string_length),
            in_escape: false,
            is_float: false,
            depth: 0,
            offset: 0,
            failed: None,
            finalized: false,
            config,
        }
    }

    /// Get the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Total bytes accepted so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// True when no value is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, Frame::Start | Frame::End)
    }

    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Consume a whole fragment.
    pub fn feed(&mut self, input: &[u8]) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let mut rest = input;
        while !rest.is_empty() {
            let (n, _) = self.feed_until(rest)?;
            rest = &rest[n..];
        }
        Ok(())
    }

    /// Consume until the fragment is exhausted or the top-level value completes.
    ///
    /// Returns the number of bytes consumed and whether a value completed.
    pub fn feed_until(&mut self, input: &[u8]) -> Result<(usize, bool)> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.finalized && !input.is_empty() {
            return Err(Error::Finalized);
        }

        let mut pos = 0;
        while pos < input.len() {
            match self.step(&input[pos..]) {
                Ok((n, done)) => {
                    pos += n;
                    self.offset += n as u64;
                    if done {
                        log::trace!("json value complete at offset {}", self.offset);
                        return Ok((pos, true));
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok((pos, false))
    }

    /// Declare end of input.
    ///
    /// Completes a trailing top-level number (numbers have no terminator) and
    /// fails with `Incomplete` or `UnterminatedString` if a value is still open.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.finalized {
            return Ok(());
        }

        let result = self.finish_number().and_then(|()| match self.state {
            Frame::Start | Frame::End => Ok(()),
            Frame::String | Frame::Key => Err(Error::UnterminatedString),
            _ => Err(Error::Incomplete),
        });
        match result {
            Ok(()) => {
                log::trace!("json decoder finalized after {} bytes", self.offset);
                self.finalized = true;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        log::debug!("json decoder failed at offset {}: {}", self.offset, err);
        self.failed = Some(err.clone());
        err
    }

    fn finish_number(&mut self) -> Result<()> {
        if self.state != Frame::Number {
            return Ok(());
        }
        emit_number(&mut self.consumer, self.carry.as_slice(), self.is_float)?;
        self.carry.clear();
        self.pop();
        Ok(())
    }

    /// Apply the carry buffer's limit to a literal that never needed carrying.
    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.config.max_string_length {
            return Err(Error::MaxStringLengthExceeded);
        }
        Ok(())
    }

    fn push(&mut self, next: Frame) {
        self.stack.push(self.state);
        self.state = next;
    }

    fn open(&mut self, next: Frame) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.depth += 1;
        self.push(next);
        Ok(())
    }

    /// Resume the enclosing frame. Returns true if the top-level value completed.
    fn pop(&mut self) -> bool {
        self.state = self.stack.pop().unwrap_or(Frame::End);
        self.state == Frame::End
    }

    fn close(&mut self, bracket: u8) -> Result<bool> {
        self.depth -= 1;
        let done = self.pop();
        if bracket == b'}' {
            self.consumer.on_object_finished()?;
        } else {
            self.consumer.on_array_finished()?;
        }
        Ok(done)
    }

    /// Run the current frame over `b`.
    fn step(&mut self, b: &[u8]) -> Result<(usize, bool)> {
        match self.state {
            Frame::Start => self.step_value(b, Frame::End),
            Frame::End => {
                let n = skip_whitespace(b);
                if n < b.len() {
                    return Err(Error::TrailingBytes);
                }
                Ok((n, false))
            }
            Frame::ObjectFirst => self.step_object_key(b, true),
            Frame::ObjectKey => self.step_object_key(b, false),
            Frame::Key | Frame::String => self.step_string(b),
            Frame::ObjectColon => {
                let n = skip_whitespace(b);
                match b.get(n) {
                    None => Ok((n, false)),
                    Some(b':') => {
                        self.state = Frame::ObjectValue;
                        Ok((n + 1, false))
                    }
                    Some(&c) => Err(Error::ExpectedColon(c)),
                }
            }
            Frame::ObjectValue => self.step_value(b, Frame::ObjectNext),
            Frame::ObjectNext => self.step_after_value(b, b'}', Frame::ObjectKey),
            Frame::ArrayFirst => {
                let n = skip_whitespace(b);
                match b.get(n) {
                    None => Ok((n, false)),
                    Some(b']') => Ok((n + 1, self.close(b']')?)),
                    Some(_) => {
                        self.state = Frame::ArrayValue;
                        Ok((n, false))
                    }
                }
            }
            Frame::ArrayValue => self.step_value(b, Frame::ArrayNext),
            Frame::ArrayNext => self.step_after_value(b, b']', Frame::ArrayValue),
            Frame::Literal { lit, matched } => self.step_literal(b, lit, matched),
            Frame::Number => self.step_number(b),
        }
    }

    /// Start a value; `ret` is the frame to resume once it completes.
    fn step_value(&mut self, b: &[u8], ret: Frame) -> Result<(usize, bool)> {
        let n = skip_whitespace(b);
        let Some(&c) = b.get(n) else {
            return Ok((n, false));
        };

        self.state = ret;
        let rest = &b[n + 1..];
        match c {
            b'{' => {
                self.open(Frame::ObjectFirst)?;
                self.consumer.on_object_start(None)?;
                Ok((n + 1, false))
            }
            b'[' => {
                self.open(Frame::ArrayFirst)?;
                self.consumer.on_array_start(None, ElementType::Any)?;
                Ok((n + 1, false))
            }
            b'n' | b't' | b'f' => {
                let lit = match c {
                    b'n' => Literal::Null,
                    b't' => Literal::True,
                    _ => Literal::False,
                };
                self.push(Frame::Literal { lit, matched: 1 });
                let (m, done) = self.step_literal(rest, lit, 1)?;
                Ok((n + 1 + m, done))
            }
            b'"' => {
                self.carry.clear();
                self.in_escape = false;
                self.push(Frame::String);
                let (m, done) = self.step_string(rest)?;
                Ok((n + 1 + m, done))
            }
            b'-' | b'0'..=b'9' => {
                self.carry.clear();
                self.is_float = false;
                self.push(Frame::Number);
                let (m, done) = self.step_number(&b[n..])?;
                Ok((n + m, done))
            }
            b'}' | b']' => Err(Error::UnexpectedClose(c)),
            _ => Err(Error::UnknownCharacter(c)),
        }
    }

    fn step_object_key(&mut self, b: &[u8], allow_close: bool) -> Result<(usize, bool)> {
        let n = skip_whitespace(b);
        match b.get(n) {
            None => Ok((n, false)),
            Some(b'}') if allow_close => Ok((n + 1, self.close(b'}')?)),
            Some(b'"') => {
                self.carry.clear();
                self.in_escape = false;
                self.state = Frame::Key;
                Ok((n + 1, false))
            }
            Some(&c @ b'}') => Err(Error::UnexpectedClose(c)),
            Some(&c) => Err(Error::ExpectedFieldName(c)),
        }
    }

    fn step_after_value(&mut self, b: &[u8], bracket: u8, next: Frame) -> Result<(usize, bool)> {
        let n = skip_whitespace(b);
        match b.get(n) {
            None => Ok((n, false)),
            Some(b',') => {
                self.state = next;
                Ok((n + 1, false))
            }
            Some(&c) if c == bracket => Ok((n + 1, self.close(c)?)),
            Some(&c) => Err(Error::ExpectedDelimiter(c)),
        }
    }

    fn step_literal(&mut self, b: &[u8], lit: Literal, matched: usize) -> Result<(usize, bool)> {
        let expected = &lit.text()[matched..];
        let n = expected.len().min(b.len());
        if b[..n] != expected[..n] {
            return Err(Error::ExpectedLiteral(lit.name()));
        }
        if n < expected.len() {
            self.state = Frame::Literal {
                lit,
                matched: matched + n,
            };
            return Ok((n, false));
        }

        let done = self.pop();
        match lit {
            Literal::Null => self.consumer.on_nil()?,
            Literal::True => self.consumer.on_bool(true)?,
            Literal::False => self.consumer.on_bool(false)?,
        }
        Ok((n, done))
    }

    /// Scan for the unescaped closing quote; the opening quote is already consumed.
    fn step_string(&mut self, b: &[u8]) -> Result<(usize, bool)> {
        let mut i = 0;
        if self.in_escape {
            if b.is_empty() {
                return Ok((0, false));
            }
            self.in_escape = false;
            i = 1;
        }

        let close = loop {
            let Some(p) = memchr2(b'"', b'\\', &b[i..]) else {
                self.carry.extend(b)?;
                return Ok((b.len(), false));
            };
            let at = i + p;
            if b[at] == b'"' {
                break at;
            }
            if at + 1 == b.len() {
                self.in_escape = true;
                self.carry.extend(b)?;
                return Ok((b.len(), false));
            }
            i = at + 2;
        };

        let is_key = self.state == Frame::Key;
        {
            let raw = if self.carry.is_empty() {
                self.check_length(close)?;
                &b[..close]
            } else {
                self.carry.extend(&b[..close])?;
                self.carry.as_slice()
            };
            let text = unescape(raw)?;
            if is_key {
                self.consumer.on_key(&text)?;
            } else {
                self.consumer.on_string(&text)?;
            }
        }
        self.carry.clear();

        let done = if is_key {
            self.state = Frame::ObjectColon;
            false
        } else {
            self.pop()
        };
        Ok((close + 1, done))
    }

    /// Scan to a terminator; the terminator itself is left for the enclosing frame.
    fn step_number(&mut self, b: &[u8]) -> Result<(usize, bool)> {
        let stop = b.iter().position(|&c| is_number_terminator(c));
        let body = &b[..stop.unwrap_or(b.len())];
        self.is_float |= body.iter().any(|&c| matches!(c, b'.' | b'e' | b'E'));

        let Some(stop) = stop else {
            self.carry.extend(b)?;
            return Ok((b.len(), false));
        };

        let raw = if self.carry.is_empty() {
            self.check_length(body.len())?;
            body
        } else {
            self.carry.extend(body)?;
            self.carry.as_slice()
        };
        emit_number(&mut self.consumer, raw, self.is_float)?;
        self.carry.clear();
        Ok((stop, self.pop()))
    }
}

impl<C: Consumer> io::Write for JsonDecoder<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C> JsonDecoder<C> {
    /// The error latched by an earlier failure, if any.
    pub(crate) fn failure(&self) -> Option<&Error> {
        self.failed.as_ref()
    }
}
