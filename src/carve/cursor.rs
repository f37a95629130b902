//! Fail-closed big-endian reader over a borrowed buffer.

use crate::carve::Reject;

/// Reads forward from `start`, never past the end of the buffer and never
/// more than `max_len` bytes in total. Running off the buffer is
/// [`Reject::Truncated`]; running past `max_len` or overflowing the offset
/// arithmetic is [`Reject::Oversized`].
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    start: usize,
    pos: usize,
    limit: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8], start: usize, max_len: usize) -> Self {
        Self {
            buf,
            start,
            pos: start,
            limit: start.saturating_add(max_len),
        }
    }

    /// Bytes consumed since `start`.
    pub fn consumed(&self) -> usize {
        self.pos - self.start
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Reject> {
        let end = self.pos.checked_add(n).ok_or(Reject::Oversized)?;
        if end > self.limit {
            return Err(Reject::Oversized);
        }
        if end > self.buf.len() {
            return Err(Reject::Truncated);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), Reject> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, Reject> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, Reject> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, Reject> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, Reject> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }
}
