//! Byte cursor over a section buffer.
//!
//! Every table decoder walks its section through this reader instead of
//! juggling raw offsets; a field that would overrun the remaining bytes
//! fails fast with [`Underflow`] and never reads past the buffer.

use bytes::Bytes;

/// Returned when a fixed-width field or a declared length overruns the
/// bytes left in the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("field overruns remaining section bytes")]
pub struct Underflow;

pub type CursorResult<T> = Result<T, Underflow>;

pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> CursorResult<u8> {
        let b = *self.buf.get(self.pos).ok_or(Underflow)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn u16(&mut self) -> CursorResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> CursorResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// 13-bit PID from two bytes (upper 3 bits ignored).
    pub fn pid(&mut self) -> CursorResult<u16> {
        Ok(self.u16()? & 0x1FFF)
    }

    /// 12-bit length from two bytes (upper 4 bits ignored).
    pub fn len12(&mut self) -> CursorResult<usize> {
        Ok((self.u16()? & 0x0FFF) as usize)
    }

    pub fn bytes(&mut self, n: usize) -> CursorResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(Underflow);
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn take(&mut self, n: usize) -> CursorResult<Bytes> {
        Ok(Bytes::copy_from_slice(self.bytes(n)?))
    }

    pub fn skip(&mut self, n: usize) -> CursorResult<()> {
        self.bytes(n).map(|_| ())
    }

    /// Sub-cursor over the next `n` bytes; the parent advances past them.
    pub fn slice(&mut self, n: usize) -> CursorResult<Cursor<'a>> {
        Ok(Cursor::new(self.bytes(n)?))
    }
}
