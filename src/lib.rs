// ABOUTME: Incremental JSON and CBOR decoders that push events into a caller-supplied consumer.
// ABOUTME: Crate root: module wiring, re-exports and whole-buffer / reader convenience entry points.

//! # feedparse
//!
//! Incremental decoders for JSON (text) and CBOR (binary) that turn a byte
//! stream into a sequence of events, without building an intermediate tree.
//!
//! Bytes may arrive in fragments of any size, split anywhere. Each decoder
//! keeps an explicit frame stack and a carry buffer for literals cut by a
//! fragment boundary, so decoding resumes exactly where it stopped.
//!
//! ## Quick Start
//!
//! ```rust
//! use feedparse::{ElementType, Event, JsonDecoder};
//!
//! let mut dec = JsonDecoder::new(Vec::new());
//! dec.feed(br#"{"a":[1,"#).unwrap();
//! dec.feed(br#"2]}"#).unwrap();
//! dec.finalize().unwrap();
//!
//! assert_eq!(
//!     dec.into_consumer(),
//!     vec![
//!         Event::ObjectStart(None),
//!         Event::Key("a".into()),
//!         Event::ArrayStart(None, ElementType::Any),
//!         Event::U64(1),
//!         Event::U64(2),
//!         Event::ArrayFinished,
//!         Event::ObjectFinished,
//!     ]
//! );
//! ```
//!
//! ## Building Values
//!
//! ```rust
//! use feedparse::{decode_cbor, decode_json, value};
//!
//! let from_json = decode_json(br#"{"a": 1}"#).unwrap();
//! let from_cbor = decode_cbor(&[0xa1, 0x61, b'a', 0x01]).unwrap();
//! assert_eq!(from_json, from_cbor);
//! assert_eq!(from_json, value!({ "a": 1 }));
//! ```
//!
//! ## Errors
//!
//! Every error is terminal. A decoder latches the first error (including one
//! returned by the consumer) and returns it from every later call.
//!
//! ## Resource Limits
//!
//! Defaults, adjustable through [`DecoderConfig`]:
//! - Maximum nesting depth: 512
//! - Maximum string length: 10 MB

mod carry;
pub mod cbor;
pub mod consumer;
pub mod error;
pub mod json;
pub mod types;
pub mod unescape;
pub mod value;

pub use cbor::CborDecoder;
pub use consumer::{Consumer, ElementType, Event};
pub use error::{Error, Result};
pub use json::JsonDecoder;
pub use types::{limits, DecoderConfig};
pub use value::{Value, ValueBuilder};

// The value! macro is exported at the crate root via #[macro_export]

use std::io::{self, Read};

/// Decode one complete JSON document held in memory.
///
/// # Example
///
/// ```rust
/// use feedparse::{parse_json, Event};
///
/// let events = parse_json(b"[true]", Vec::new()).unwrap();
/// assert_eq!(events.len(), 3);
/// assert_eq!(events[1], Event::Bool(true));
/// ```
pub fn parse_json<C: Consumer>(data: &[u8], consumer: C) -> Result<C> {
    let mut decoder = JsonDecoder::new(consumer);
    decoder.feed(data)?;
    decoder.finalize()?;
    Ok(decoder.into_consumer())
}

/// Decode one complete JSON document from a string.
pub fn parse_json_str<C: Consumer>(text: &str, consumer: C) -> Result<C> {
    parse_json(text.as_bytes(), consumer)
}

/// Decode one JSON document read to exhaustion from `reader`.
pub fn parse_json_reader<R: Read, C: Consumer>(mut reader: R, consumer: C) -> Result<C> {
    let mut decoder = JsonDecoder::new(consumer);
    if let Err(err) = io::copy(&mut reader, &mut decoder) {
        return Err(decoder.failure().cloned().unwrap_or_else(|| err.into()));
    }
    decoder.finalize()?;
    Ok(decoder.into_consumer())
}

/// Decode complete CBOR held in memory.
///
/// A concatenated sequence of items is accepted. Fails with `Incomplete` if
/// the buffer ends inside an item.
///
/// # Example
///
/// ```rust
/// use feedparse::{parse_cbor, Error, Event};
///
/// assert_eq!(parse_cbor(&[0x38, 0x63], Vec::new()).unwrap(), vec![Event::I8(-100)]);
/// assert_eq!(parse_cbor(&[0x82, 0x01], Vec::new()), Err(Error::Incomplete));
/// ```
pub fn parse_cbor<C: Consumer>(data: &[u8], consumer: C) -> Result<C> {
    let mut decoder = CborDecoder::new(consumer);
    decoder.feed(data)?;
    finish_cbor(decoder)
}

/// Decode CBOR read to exhaustion from `reader`.
pub fn parse_cbor_reader<R: Read, C: Consumer>(mut reader: R, consumer: C) -> Result<C> {
    let mut decoder = CborDecoder::new(consumer);
    if let Err(err) = io::copy(&mut reader, &mut decoder) {
        return Err(decoder.failure().cloned().unwrap_or_else(|| err.into()));
    }
    finish_cbor(decoder)
}

fn finish_cbor<C: Consumer>(decoder: CborDecoder<C>) -> Result<C> {
    if !decoder.is_idle() {
        log::debug!("cbor input ended mid-item at offset {}", decoder.position());
        return Err(Error::Incomplete);
    }
    Ok(decoder.into_consumer())
}

/// Decode a JSON document into a `Value`.
///
/// # Example
///
/// ```rust
/// use feedparse::decode_json;
///
/// let value = decode_json(br#"{"name": "test", "n": [1, 2]}"#).unwrap();
/// assert_eq!(value.get_key("name").and_then(|v| v.as_str()), Some("test"));
/// ```
pub fn decode_json(data: &[u8]) -> Result<Value> {
    parse_json(data, ValueBuilder::new())?.finish()
}

/// Decode a single CBOR item into a `Value`.
///
/// Fails with `TrailingBytes` if the buffer holds more than one item.
pub fn decode_cbor(data: &[u8]) -> Result<Value> {
    parse_cbor(data, ValueBuilder::new())?.finish()
}

/// Decode a CBOR sequence (zero or more concatenated items).
pub fn decode_cbor_sequence(data: &[u8]) -> Result<Vec<Value>> {
    parse_cbor(data, ValueBuilder::new())?.into_values()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields its data a few bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_decode_json_value() {
        let value = decode_json(br#"{"name": "test", "values": [1, -2, 3.5], "nested": {"flag": true}}"#)
            .unwrap();
        assert_eq!(
            value,
            value!({
                "name": "test",
                "values": [1, (-2), 3.5],
                "nested": { "flag": true }
            })
        );
    }

    #[test]
    fn test_decode_cbor_value() {
        // {"a": [1, h'ff'], "b": null}
        let bytes = [0xa2, 0x61, b'a', 0x82, 0x01, 0x41, 0xff, 0x61, b'b', 0xf6];
        let value = decode_cbor(&bytes).unwrap();
        assert_eq!(value.get_key("b"), Some(&Value::Null));
        assert_eq!(
            value.get_key("a").and_then(|a| a.get(1)).and_then(Value::as_bytes),
            Some(&[0xff][..])
        );
    }

    #[test]
    fn test_cbor_sequence() {
        let values = decode_cbor_sequence(&[0x01, 0x20, 0x80]).unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Int(-1), Value::Array(vec![])]);
        assert_eq!(decode_cbor(&[0x01, 0x02]), Err(Error::TrailingBytes));
        assert_eq!(decode_cbor(&[]), Err(Error::Incomplete));
    }

    #[test]
    fn test_parse_json_str_and_errors() {
        assert_eq!(parse_json_str("null", Vec::new()).unwrap(), vec![Event::Nil]);
        assert_eq!(decode_json(b""), Err(Error::Incomplete));
        assert_eq!(decode_json(b"[1,"), Err(Error::Incomplete));
    }

    #[test]
    fn test_readers() {
        let json = Trickle {
            data: br#"{"k": ["v", 10]}"#,
            step: 3,
        };
        let value = parse_json_reader(json, ValueBuilder::new()).unwrap().finish().unwrap();
        assert_eq!(value, value!({ "k": ["v", 10] }));

        let cbor = Trickle {
            data: &[0x83, 0x18, 0x64, 0x63, b'a', b'b', b'c', 0xf5],
            step: 1,
        };
        let value = parse_cbor_reader(cbor, ValueBuilder::new()).unwrap().finish().unwrap();
        assert_eq!(value, value!([100, "abc", true]));
    }

    #[test]
    fn test_reader_reports_decode_error_not_io_error() {
        let json = Trickle {
            data: b"[1, @]",
            step: 2,
        };
        assert_eq!(
            parse_json_reader(json, Vec::new()),
            Err(Error::UnknownCharacter(b'@'))
        );
    }

    #[test]
    fn test_reader_io_error() {
        assert!(matches!(parse_cbor_reader(Broken, Vec::new()), Err(Error::Io(_))));
    }
}
