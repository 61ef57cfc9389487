// ABOUTME: Converts a raw JSON string body (escapes intact, quotes stripped) to text.
// ABOUTME: Also hosts the UTF-8 validation shared with the CBOR decoder.

use std::borrow::Cow;

use memchr::memchr;

use crate::error::{Error, Result};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

/// Unescape the body of a JSON string.
///
/// Bodies without a backslash are returned borrowed.
///
/// ```rust
/// use feedparse::unescape::unescape;
///
/// assert_eq!(unescape(br"plain").unwrap(), "plain");
/// assert_eq!(unescape(br"tab\there \u00e9").unwrap(), "tab\there \u{e9}");
/// ```
pub fn unescape(raw: &[u8]) -> Result<Cow<'_, str>> {
    if let Some(&b) = raw.iter().find(|&&b| b < 0x20) {
        return Err(Error::ControlCharacter(b));
    }

    let Some(first) = memchr(b'\\', raw) else {
        return validate_utf8(raw).map(Cow::Borrowed);
    };

    let mut out = Vec::with_capacity(raw.len());
    let mut pos = 0;
    let mut next = Some(first);
    while let Some(esc) = next {
        out.extend_from_slice(&raw[pos..esc]);
        pos = decode_escape(raw, esc + 1, &mut out)?;
        next = memchr(b'\\', &raw[pos..]).map(|i| pos + i);
    }
    out.extend_from_slice(&raw[pos..]);

    String::from_utf8(out)
        .map(Cow::Owned)
        .map_err(|_| Error::InvalidUtf8)
}

/// Decode the escape whose code starts at `at`; returns the index after it.
fn decode_escape(raw: &[u8], at: usize, out: &mut Vec<u8>) -> Result<usize> {
    let code = *raw.get(at).ok_or(Error::InvalidEscape)?;
    let byte = match code {
        b'"' => b'"',
        b'\\' => b'\\',
        b'/' => b'/',
        b'b' => 0x08,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'u' => return decode_unicode(raw, at + 1, out),
        _ => return Err(Error::InvalidEscape),
    };
    out.push(byte);
    Ok(at + 1)
}

fn decode_unicode(raw: &[u8], at: usize, out: &mut Vec<u8>) -> Result<usize> {
    let high = hex4(raw, at)?;
    let mut end = at + 4;

    let scalar = match high {
        0xd800..=0xdbff => {
            if raw.get(end..end + 2) != Some(&b"\\u"[..]) {
                return Err(Error::InvalidEscape);
            }
            let low = hex4(raw, end + 2)?;
            if !(0xdc00..=0xdfff).contains(&low) {
                return Err(Error::InvalidEscape);
            }
            end += 6;
            0x10000 + ((u32::from(high) - 0xd800) << 10) + (u32::from(low) - 0xdc00)
        }
        0xdc00..=0xdfff => return Err(Error::InvalidEscape),
        _ => u32::from(high),
    };

    let ch = char::from_u32(scalar).ok_or(Error::InvalidEscape)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    Ok(end)
}

fn hex4(raw: &[u8], at: usize) -> Result<u16> {
    let digits = raw.get(at..at + 4).ok_or(Error::InvalidEscape)?;
    digits.iter().try_fold(0u16, |acc, &d| {
        let v = (d as char).to_digit(16).ok_or(Error::InvalidEscape)?;
        Ok((acc << 4) | v as u16)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_borrowed() {
        assert!(matches!(unescape(b"hello world").unwrap(), Cow::Borrowed("hello world")));
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape(br#"a\"b\\c\/d"#).unwrap(), "a\"b\\c/d");
        assert_eq!(unescape(br"\b\f\n\r\t").unwrap(), "\u{8}\u{c}\n\r\t");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(unescape(br"\u0041\u00e9").unwrap(), "A\u{e9}");
        assert_eq!(unescape(br"\ud83d\ude00").unwrap(), "\u{1f600}");
    }

    #[test]
    fn test_invalid_escapes() {
        assert_eq!(unescape(br"\x"), Err(Error::InvalidEscape));
        assert_eq!(unescape(br"\u12"), Err(Error::InvalidEscape));
        assert_eq!(unescape(br"\u12zz"), Err(Error::InvalidEscape));
        assert_eq!(unescape(br"\ud83d"), Err(Error::InvalidEscape));
        assert_eq!(unescape(br"\ude00"), Err(Error::InvalidEscape));
        assert_eq!(unescape(b"trailing\\"), Err(Error::InvalidEscape));
    }

    #[test]
    fn test_rejects_control_and_bad_utf8() {
        assert_eq!(unescape(b"a\nb"), Err(Error::ControlCharacter(b'\n')));
        assert_eq!(unescape(&[0x61, 0xff]), Err(Error::InvalidUtf8));
        assert_eq!(unescape(&[0xff, b'\\', b'n']), Err(Error::InvalidUtf8));
    }
}
