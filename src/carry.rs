// ABOUTME: Carry buffer holding a literal split across input fragments.
// ABOUTME: Supports fixed-width collection (CBOR) and open-ended accumulation (JSON).

use crate::error::{Error, Result};

/// Bytes of a partially received literal.
///
/// Empty between literals. Callers `clear` it once the literal it carried has
/// been delivered.
#[derive(Debug)]
pub(crate) struct Carry {
    buf: Vec<u8>,
    limit: usize,
}

impl Carry {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Append bytes of an unterminated literal.
    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buf.len() + bytes.len() > self.limit {
            return Err(Error::MaxStringLengthExceeded);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Gather exactly `count` bytes, taking what it can from `input`.
    ///
    /// Returns the number of input bytes consumed and, once `count` bytes are
    /// available, the complete field. The field is borrowed straight from
    /// `input` when nothing was carried over, otherwise from the buffer.
    pub(crate) fn collect<'a>(
        &'a mut self,
        input: &'a [u8],
        count: usize,
    ) -> Result<(usize, Option<&'a [u8]>)> {
        if self.buf.is_empty() && input.len() >= count {
            return Ok((count, Some(&input[..count])));
        }

        let need = count - self.buf.len();
        let take = need.min(input.len());
        self.extend(&input[..take])?;
        if take < need {
            return Ok((take, None));
        }
        Ok((take, Some(&self.buf)))
    }
}
