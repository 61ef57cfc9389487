// ABOUTME: Incremental CBOR decoder fed with arbitrary byte fragments.
// ABOUTME: Frame stack plus a parallel length stack; every multi-byte field goes through the carry buffer.

use std::io;

use crate::carry::Carry;
use crate::consumer::{Consumer, ElementType};
use crate::error::{Error, Result};
use crate::types::{major, minor, simple, DecoderConfig};
use crate::unescape::validate_utf8;

/// What a pending big-endian argument is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arg {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Key,
    Array,
    Map,
}

/// What the decoder expects next.
///
/// `Array`, `Map`, `Bytes` and `Text` keep their remaining count on the
/// length stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// A top-level item.
    Item,
    Array,
    /// Counted per key and per value.
    Map,
    IndefiniteArray,
    IndefiniteMap { awaiting_value: bool },
    /// `width` argument bytes follow the initial byte.
    Argument { width: usize, arg: Arg },
    Float { width: usize },
    Bytes,
    Text { key: bool },
}

#[inline]
fn be_uint(field: &[u8]) -> u64 {
    field.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

#[inline]
fn to_len(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::ValueOutOfRange)
}

/// Report an unsigned integer using the narrowest event its encoded width allows.
fn emit_unsigned<C: Consumer>(consumer: &mut C, width: usize, value: u64) -> Result<()> {
    if width <= 1 {
        if let Ok(v) = u8::try_from(value) {
            return consumer.on_u8(v);
        }
    }
    if width <= 2 {
        if let Ok(v) = u16::try_from(value) {
            return consumer.on_u16(v);
        }
    }
    if width <= 4 {
        if let Ok(v) = u32::try_from(value) {
            return consumer.on_u32(v);
        }
    }
    consumer.on_u64(value)
}

/// Report `-1 - encoded`, promoting to a wider event when the width's signed type can't hold it.
fn emit_negative<C: Consumer>(consumer: &mut C, width: usize, encoded: u64) -> Result<()> {
    if width <= 1 {
        if let Ok(v) = i8::try_from(encoded) {
            return consumer.on_i8(!v);
        }
    }
    if width <= 2 {
        if let Ok(v) = i16::try_from(encoded) {
            return consumer.on_i16(!v);
        }
    }
    if width <= 4 {
        if let Ok(v) = i32::try_from(encoded) {
            return consumer.on_i32(!v);
        }
    }
    let v = i64::try_from(encoded).map_err(|_| Error::ValueOutOfRange)?;
    consumer.on_i64(!v)
}

/// Incremental CBOR decoder.
///
/// CBOR is self-delimiting, so there is no finalize step: a top-level item
/// completes as soon as its last byte arrives, and the decoder then expects
/// the next item of a sequence. Use [`is_idle`](Self::is_idle) to check that
/// input did not end mid-item.
///
/// ```rust
/// use feedparse::{CborDecoder, ElementType, Event};
///
/// let mut dec = CborDecoder::new(Vec::new());
/// dec.feed(&[0x9f, 0x01]).unwrap();
/// dec.feed(&[0x02, 0xff]).unwrap();
/// assert!(dec.is_idle());
/// assert_eq!(
///     dec.into_consumer(),
///     vec![
///         Event::ArrayStart(None, ElementType::Any),
///         Event::U8(1),
///         Event::U8(2),
///         Event::ArrayFinished,
///     ]
/// );
/// ```
pub struct CborDecoder<C> {
    consumer: C,
    config: DecoderConfig,
    state: Frame,
    stack: Vec<Frame>,
    /// Remaining elements, pair halves or bytes of each open counted construct.
    lengths: Vec<u64>,
    carry: Carry,
    depth: usize,
    offset: u64,
    failed: Option<Error>,
}

impl<C: Consumer> CborDecoder<C> {
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
            state: Frame::Item,
            stack: Vec::with_capacity(config.stack_capacity),
            lengths: Vec::with_capacity(config.stack_capacity),
            carry: Carry::with_limit(config.max_string_length),
            depth: 0,
            offset: 0,
            failed: None,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Total bytes accepted so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// True between top-level items.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == Frame::Item && self.stack.is_empty()
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

    /// Consume until the fragment is exhausted or a top-level item completes.
    ///
    /// Returns the number of bytes consumed and whether an item completed.
    pub fn feed_until(&mut self, input: &[u8]) -> Result<(usize, bool)> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let mut pos = 0;
        while pos < input.len() {
            match self.step(&input[pos..]) {
                Ok((n, done)) => {
                    pos += n;
                    self.offset += n as u64;
                    if done {
                        log::trace!("cbor item complete at offset {}", self.offset);
                        return Ok((pos, true));
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok((pos, false))
    }

    fn fail(&mut self, err: Error) -> Error {
        log::debug!("cbor decoder failed at offset {}: {}", self.offset, err);
        self.failed = Some(err.clone());
        err
    }

    fn push(&mut self, next: Frame) {
        self.stack.push(self.state);
        self.state = next;
    }

    fn pop(&mut self) {
        self.state = self.stack.pop().unwrap_or(Frame::Item);
    }

    fn open(&mut self, next: Frame) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.depth += 1;
        self.push(next);
        Ok(())
    }

    /// True when the enclosing map expects a key.
    fn expects_key(&self) -> bool {
        match self.state {
            Frame::Map => self.lengths.last().is_some_and(|n| n % 2 == 0),
            Frame::IndefiniteMap { awaiting_value } => !awaiting_value,
            _ => false,
        }
    }

    /// Account for one finished item in the enclosing frame.
    ///
    /// Closes every counted aggregate that this completes. Returns true when
    /// a top-level item completed.
    fn complete_item(&mut self) -> Result<bool> {
        match self.state {
            Frame::Item => Ok(true),
            Frame::Array | Frame::Map => {
                if let Some(remaining) = self.lengths.last_mut() {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining > 0 {
                        return Ok(false);
                    }
                }
                self.close()
            }
            Frame::IndefiniteMap { awaiting_value } => {
                self.state = Frame::IndefiniteMap {
                    awaiting_value: !awaiting_value,
                };
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Close the aggregate in the current frame and complete it in its parent.
    fn close(&mut self) -> Result<bool> {
        let closing = self.state;
        if matches!(closing, Frame::Array | Frame::Map) {
            self.lengths.pop();
        }
        self.depth -= 1;
        self.pop();
        match closing {
            Frame::Map | Frame::IndefiniteMap { .. } => self.consumer.on_object_finished()?,
            _ => self.consumer.on_array_finished()?,
        }
        self.complete_item()
    }

    fn step(&mut self, b: &[u8]) -> Result<(usize, bool)> {
        match self.state {
            Frame::Item
            | Frame::Array
            | Frame::Map
            | Frame::IndefiniteArray
            | Frame::IndefiniteMap { .. } => self.step_head(b[0]),
            Frame::Argument { width, arg } => self.step_argument(b, width, arg),
            Frame::Float { width } => self.step_float(b, width),
            Frame::Bytes => self.step_bytes(b),
            Frame::Text { key } => self.step_text(b, key),
        }
    }

    /// Decode an initial byte.
    fn step_head(&mut self, code: u8) -> Result<(usize, bool)> {
        if code == simple::BREAK {
            return match self.state {
                Frame::IndefiniteArray | Frame::IndefiniteMap { awaiting_value: false } => {
                    Ok((1, self.close()?))
                }
                _ => Err(Error::InvalidCode(code)),
            };
        }

        let key = self.expects_key();
        let (kind, low) = (major::of(code), minor::of(code));
        if key && kind != major::TEXT {
            return Err(Error::NonTextKey(code));
        }

        let arg = match kind {
            major::UNSIGNED => Arg::Unsigned,
            major::NEGATIVE => Arg::Negative,
            major::BYTES => Arg::Bytes,
            major::TEXT if key => Arg::Key,
            major::TEXT => Arg::Text,
            major::ARRAY => Arg::Array,
            major::MAP => Arg::Map,
            major::TAG => return Err(Error::Unsupported("tag")),
            major::SIMPLE => return self.step_simple(code),
            _ => return Err(Error::InvalidCode(code)),
        };

        match low {
            0..=minor::DIRECT_MAX => Ok((1, self.apply(arg, 0, u64::from(low))?)),
            minor::INDEFINITE => match arg {
                Arg::Array => {
                    self.open(Frame::IndefiniteArray)?;
                    self.consumer.on_array_start(None, ElementType::Any)?;
                    Ok((1, false))
                }
                Arg::Map => {
                    self.open(Frame::IndefiniteMap {
                        awaiting_value: false,
                    })?;
                    self.consumer.on_object_start(None)?;
                    Ok((1, false))
                }
                Arg::Bytes | Arg::Text | Arg::Key => Err(Error::IndefiniteString),
                Arg::Unsigned | Arg::Negative => Err(Error::InvalidCode(code)),
            },
            _ => {
                let width = minor::argument_width(low).ok_or(Error::InvalidCode(code))?;
                self.carry.clear();
                self.push(Frame::Argument { width, arg });
                Ok((1, false))
            }
        }
    }

    fn step_simple(&mut self, code: u8) -> Result<(usize, bool)> {
        match code {
            simple::FALSE => self.consumer.on_bool(false)?,
            simple::TRUE => self.consumer.on_bool(true)?,
            simple::NULL | simple::UNDEFINED => self.consumer.on_nil()?,
            simple::HALF_FLOAT => return Err(Error::Unsupported("half-precision float")),
            simple::SINGLE_FLOAT | simple::DOUBLE_FLOAT => {
                let width = if code == simple::SINGLE_FLOAT { 4 } else { 8 };
                self.carry.clear();
                self.push(Frame::Float { width });
                return Ok((1, false));
            }
            _ => return Err(Error::InvalidCode(code)),
        }
        Ok((1, self.complete_item()?))
    }

    /// Act on a decoded argument. `width` is 0 when it came from the minor bits.
    fn apply(&mut self, arg: Arg, width: usize, value: u64) -> Result<bool> {
        match arg {
            Arg::Unsigned => {
                emit_unsigned(&mut self.consumer, width, value)?;
                self.complete_item()
            }
            Arg::Negative => {
                emit_negative(&mut self.consumer, width, value)?;
                self.complete_item()
            }
            Arg::Array => {
                let len = to_len(value)?;
                self.open(Frame::Array)?;
                self.lengths.push(value);
                self.consumer.on_array_start(Some(len), ElementType::Any)?;
                if value == 0 {
                    return self.close();
                }
                Ok(false)
            }
            Arg::Map => {
                let len = to_len(value)?;
                let halves = value.checked_mul(2).ok_or(Error::ValueOutOfRange)?;
                self.open(Frame::Map)?;
                self.lengths.push(halves);
                self.consumer.on_object_start(Some(len))?;
                if value == 0 {
                    return self.close();
                }
                Ok(false)
            }
            Arg::Bytes => {
                let len = to_len(value)?;
                if len > self.config.max_string_length {
                    return Err(Error::MaxStringLengthExceeded);
                }
                self.consumer.on_array_start(Some(len), ElementType::Byte)?;
                if len == 0 {
                    self.consumer.on_array_finished()?;
                    return self.complete_item();
                }
                self.lengths.push(value);
                self.push(Frame::Bytes);
                Ok(false)
            }
            Arg::Text | Arg::Key => {
                let key = arg == Arg::Key;
                let len = to_len(value)?;
                if len > self.config.max_string_length {
                    return Err(Error::MaxStringLengthExceeded);
                }
                if len == 0 {
                    if key {
                        self.consumer.on_key("")?;
                    } else {
                        self.consumer.on_string("")?;
                    }
                    return self.complete_item();
                }
                self.carry.clear();
                self.lengths.push(value);
                self.push(Frame::Text { key });
                Ok(false)
            }
        }
    }

    fn step_argument(&mut self, b: &[u8], width: usize, arg: Arg) -> Result<(usize, bool)> {
        let (n, field) = self.carry.collect(b, width)?;
        let Some(field) = field else {
            return Ok((n, false));
        };
        let value = be_uint(field);
        self.carry.clear();
        self.pop();
        Ok((n, self.apply(arg, width, value)?))
    }

    fn step_float(&mut self, b: &[u8], width: usize) -> Result<(usize, bool)> {
        let (n, field) = self.carry.collect(b, width)?;
        let Some(field) = field else {
            return Ok((n, false));
        };
        let bits = be_uint(field);
        self.carry.clear();
        self.pop();
        if width == 4 {
            self.consumer.on_f32(f32::from_bits(bits as u32))?;
        } else {
            self.consumer.on_f64(f64::from_bits(bits))?;
        }
        Ok((n, self.complete_item()?))
    }

    fn step_bytes(&mut self, b: &[u8]) -> Result<(usize, bool)> {
        let remaining = self.lengths.last().copied().unwrap_or(0);
        let take = usize::try_from(remaining).map_or(b.len(), |r| r.min(b.len()));
        for &byte in &b[..take] {
            self.consumer.on_byte(byte)?;
        }

        let left = remaining - take as u64;
        if let Some(top) = self.lengths.last_mut() {
            *top = left;
        }
        if left > 0 {
            return Ok((take, false));
        }
        self.lengths.pop();
        self.pop();
        self.consumer.on_array_finished()?;
        Ok((take, self.complete_item()?))
    }

    fn step_text(&mut self, b: &[u8], key: bool) -> Result<(usize, bool)> {
        let len = to_len(self.lengths.last().copied().unwrap_or(0))?;
        let (n, field) = self.carry.collect(b, len)?;
        let Some(field) = field else {
            return Ok((n, false));
        };
        let text = validate_utf8(field)?;
        if key {
            self.consumer.on_key(text)?;
        } else {
            self.consumer.on_string(text)?;
        }
        self.carry.clear();
        self.lengths.pop();
        self.pop();
        Ok((n, self.complete_item()?))
    }
}

impl<C: Consumer> io::Write for CborDecoder<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C> CborDecoder<C> {
    /// The error latched by an earlier failure, if any.
    pub(crate) fn failure(&self) -> Option<&Error> {
        self.failed.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Event;

    fn decode(input: &[u8]) -> Result<Vec<Event>> {
        let mut dec = CborDecoder::new(Vec::new());
        dec.feed(input)?;
        if !dec.is_idle() {
            return Err(Error::Incomplete);
        }
        Ok(dec.into_consumer())
    }

    fn bytes_start(n: usize) -> Event {
        Event::ArrayStart(Some(n), ElementType::Byte)
    }

    #[test]
    fn test_indefinite_array() {
        assert_eq!(
            decode(&[0x9f, 0x01, 0x02, 0xff]).unwrap(),
            vec![
                Event::ArrayStart(None, ElementType::Any),
                Event::U8(1),
                Event::U8(2),
                Event::ArrayFinished,
            ]
        );
    }

    #[test]
    fn test_definite_map() {
        assert_eq!(
            decode(&[0xa1, 0x61, b'a', 0x01]).unwrap(),
            vec![
                Event::ObjectStart(Some(1)),
                Event::Key("a".into()),
                Event::U8(1),
                Event::ObjectFinished,
            ]
        );
    }

    #[test]
    fn test_indefinite_map() {
        assert_eq!(
            decode(&[0xbf, 0x61, b'k', 0xf5, 0xff]).unwrap(),
            vec![
                Event::ObjectStart(None),
                Event::Key("k".into()),
                Event::Bool(true),
                Event::ObjectFinished,
            ]
        );
    }

    #[test]
    fn test_unsigned_widths() {
        assert_eq!(decode(&[0x17]).unwrap(), vec![Event::U8(23)]);
        assert_eq!(decode(&[0x18, 0xff]).unwrap(), vec![Event::U8(255)]);
        assert_eq!(decode(&[0x19, 0x01, 0x00]).unwrap(), vec![Event::U16(256)]);
        assert_eq!(
            decode(&[0x1a, 0x00, 0x01, 0x00, 0x00]).unwrap(),
            vec![Event::U32(65536)]
        );
        assert_eq!(
            decode(&[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            vec![Event::U64(u64::MAX)]
        );
    }

    #[test]
    fn test_negative_is_ones_complement() {
        assert_eq!(decode(&[0x20]).unwrap(), vec![Event::I8(-1)]);
        assert_eq!(decode(&[0x38, 0x63]).unwrap(), vec![Event::I8(-100)]);
        assert_eq!(decode(&[0x38, 0x7f]).unwrap(), vec![Event::I8(-128)]);
        assert_eq!(decode(&[0x39, 0x03, 0xe7]).unwrap(), vec![Event::I16(-1000)]);
    }

    #[test]
    fn test_negative_promotes_when_width_overflows() {
        assert_eq!(decode(&[0x38, 0xc8]).unwrap(), vec![Event::I16(-201)]);
        assert_eq!(decode(&[0x39, 0xff, 0xff]).unwrap(), vec![Event::I32(-65536)]);
        assert_eq!(
            decode(&[0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            vec![Event::I64(i64::MIN)]
        );
        assert_eq!(
            decode(&[0x3b, 0x80, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::ValueOutOfRange)
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(
            decode(&[0xfa, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            vec![Event::F32(1.5)]
        );
        assert_eq!(
            decode(&[0xfb, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18]).unwrap(),
            vec![Event::F64(std::f64::consts::PI)]
        );
        // a double whose bit pattern would also fit in 32 bits
        assert_eq!(
            decode(&[0xfb, 0, 0, 0, 0, 0, 0, 0, 0x01]).unwrap(),
            vec![Event::F64(f64::from_bits(1))]
        );
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(
            decode(&[0x84, 0xf4, 0xf5, 0xf6, 0xf7]).unwrap(),
            vec![
                Event::ArrayStart(Some(4), ElementType::Any),
                Event::Bool(false),
                Event::Bool(true),
                Event::Nil,
                Event::Nil,
                Event::ArrayFinished,
            ]
        );
    }

    #[test]
    fn test_byte_string() {
        assert_eq!(
            decode(&[0x43, 0x01, 0x02, 0x03]).unwrap(),
            vec![
                bytes_start(3),
                Event::Byte(1),
                Event::Byte(2),
                Event::Byte(3),
                Event::ArrayFinished,
            ]
        );
        assert_eq!(
            decode(&[0x40]).unwrap(),
            vec![bytes_start(0), Event::ArrayFinished]
        );
    }

    #[test]
    fn test_text_strings() {
        assert_eq!(
            decode(&[0x65, b'h', b'e', b'l', b'l', b'o']).unwrap(),
            vec![Event::String("hello".into())]
        );
        assert_eq!(decode(&[0x60]).unwrap(), vec![Event::String(String::new())]);
        assert_eq!(
            decode(&[0x78, 0x02, 0xc3, 0xa9]).unwrap(),
            vec![Event::String("\u{e9}".into())]
        );
        assert_eq!(decode(&[0x62, 0x61, 0xff]), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_empty_aggregates_close_eagerly() {
        let mut dec = CborDecoder::new(Vec::new());
        assert_eq!(dec.feed_until(&[0x81, 0x80]).unwrap(), (2, true));
        assert_eq!(
            dec.into_consumer(),
            vec![
                Event::ArrayStart(Some(1), ElementType::Any),
                Event::ArrayStart(Some(0), ElementType::Any),
                Event::ArrayFinished,
                Event::ArrayFinished,
            ]
        );
        assert_eq!(
            decode(&[0xa0]).unwrap(),
            vec![Event::ObjectStart(Some(0)), Event::ObjectFinished]
        );
    }

    #[test]
    fn test_finish_not_deferred_to_next_fragment() {
        let mut dec = CborDecoder::new(Vec::new());
        dec.feed(&[0x82, 0x01]).unwrap();
        dec.feed(&[0x02]).unwrap();
        assert_eq!(dec.consumer().last(), Some(&Event::ArrayFinished));
        assert!(dec.is_idle());
    }

    #[test]
    fn test_sequence_of_items() {
        let mut dec = CborDecoder::new(Vec::new());
        let input = [0x01, 0x61, b'x', 0xf6];
        assert_eq!(dec.feed_until(&input).unwrap(), (1, true));
        assert_eq!(dec.feed_until(&input[1..]).unwrap(), (2, true));
        assert_eq!(dec.feed_until(&input[3..]).unwrap(), (1, true));
        assert_eq!(
            dec.into_consumer(),
            vec![Event::U8(1), Event::String("x".into()), Event::Nil]
        );
    }

    #[test]
    fn test_split_fields() {
        let mut dec = CborDecoder::new(Vec::new());
        dec.feed(&[0x19, 0x01]).unwrap();
        assert!(dec.consumer().is_empty());
        dec.feed(&[0x00, 0x63, b'a']).unwrap();
        dec.feed(&[b'b']).unwrap();
        assert_eq!(dec.consumer(), &vec![Event::U16(256)]);
        dec.feed(&[b'c']).unwrap();
        assert_eq!(
            dec.into_consumer(),
            vec![Event::U16(256), Event::String("abc".into())]
        );
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_eq!(decode(&[0xc0, 0x01]), Err(Error::Unsupported("tag")));
        assert_eq!(
            decode(&[0xf9, 0x3c, 0x00]),
            Err(Error::Unsupported("half-precision float"))
        );
        assert_eq!(decode(&[0x5f, 0xff]), Err(Error::IndefiniteString));
        assert_eq!(decode(&[0x7f, 0xff]), Err(Error::IndefiniteString));
    }

    #[test]
    fn test_unsupported_stops_events() {
        let mut dec = CborDecoder::new(Vec::new());
        assert_eq!(
            dec.feed(&[0x82, 0x01, 0xc1, 0x02]),
            Err(Error::Unsupported("tag"))
        );
        assert_eq!(
            dec.consumer(),
            &vec![Event::ArrayStart(Some(2), ElementType::Any), Event::U8(1)]
        );
    }

    #[test]
    fn test_invalid_codes() {
        assert_eq!(decode(&[0x1c]), Err(Error::InvalidCode(0x1c)));
        assert_eq!(decode(&[0x1f]), Err(Error::InvalidCode(0x1f)));
        assert_eq!(decode(&[0xff]), Err(Error::InvalidCode(0xff)));
        assert_eq!(decode(&[0xe0]), Err(Error::InvalidCode(0xe0)));
        assert_eq!(decode(&[0x82, 0x01, 0xff]), Err(Error::InvalidCode(0xff)));
        assert_eq!(
            decode(&[0xbf, 0x61, b'k', 0xff]),
            Err(Error::InvalidCode(0xff))
        );
    }

    #[test]
    fn test_non_text_key() {
        assert_eq!(decode(&[0xa1, 0x01, 0x02]), Err(Error::NonTextKey(0x01)));
        assert_eq!(decode(&[0xbf, 0x41, 0x00]), Err(Error::NonTextKey(0x41)));
    }

    #[test]
    fn test_incomplete_is_not_idle() {
        assert_eq!(decode(&[0x82, 0x01]), Err(Error::Incomplete));
        assert_eq!(decode(&[0x1a, 0x00]), Err(Error::Incomplete));
    }

    #[test]
    fn test_max_depth() {
        let config = DecoderConfig {
            max_depth: 2,
            ..DecoderConfig::default()
        };
        let mut dec = CborDecoder::with_config(Vec::new(), config);
        assert_eq!(dec.feed(&[0x81, 0x81, 0x81]), Err(Error::MaxDepthExceeded));
    }

    #[test]
    fn test_declared_length_limit() {
        let config = DecoderConfig {
            max_string_length: 4,
            ..DecoderConfig::default()
        };
        let mut dec = CborDecoder::with_config(Vec::new(), config);
        assert_eq!(dec.feed(&[0x65]), Err(Error::MaxStringLengthExceeded));
    }

    struct RejectBools(usize);

    impl Consumer for RejectBools {
        fn on_object_start(&mut self, _: Option<usize>) -> Result<()> {
            Ok(())
        }
        fn on_object_finished(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_array_start(&mut self, _: Option<usize>, _: ElementType) -> Result<()> {
            Ok(())
        }
        fn on_array_finished(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_key(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn on_string(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn on_bool(&mut self, _: bool) -> Result<()> {
            Err(Error::Custom("no bools".into()))
        }
        fn on_nil(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_i64(&mut self, _: i64) -> Result<()> {
            Ok(())
        }
        fn on_u64(&mut self, _: u64) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
        fn on_f64(&mut self, _: f64) -> Result<()> {
            Ok(())
        }
        fn on_byte(&mut self, _: u8) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_consumer_error_is_latched() {
        let mut dec = CborDecoder::new(RejectBools(0));
        let err = Error::Custom("no bools".into());
        assert_eq!(dec.feed(&[0x83, 0x01, 0xf5, 0x02]), Err(err.clone()));
        assert_eq!(dec.feed(&[0x03]), Err(err.clone()));
        assert_eq!(dec.feed(&[]), Err(err.clone()));
        assert_eq!(dec.failure(), Some(&err));
        assert_eq!(dec.consumer().0, 1);
    }
}
