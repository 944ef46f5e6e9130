//! Fixed-layout binary codec
//!
//! Packets carry no self-describing framing: the byte layout behind each
//! opcode is an implicit contract between the panel and the device firmware.
//! Both sides must read fields back in exactly the order they were written.
//!
//! Wire rules:
//! - integers are little-endian, 8/16/32 bits, signed or unsigned
//! - `bool` is one byte, 0 = false, anything else = true
//! - text fields have a fixed size, hold UTF-8 and are zero padded; the
//!   encoded text must leave room for at least one terminator byte
//!
//! # Example
//!
//! ```
//! use nixielink_protocol::codec::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.put_bool(true);
//! writer.put_i8(-20);
//! writer.put_cstr("abc", 10).unwrap();
//!
//! let mut reader = Reader::new(writer.freeze());
//! assert!(reader.bool().unwrap());
//! assert_eq!(reader.i8().unwrap(), -20);
//! assert_eq!(reader.cstr(10).unwrap(), "abc");
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};

/// Append-only packet buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    /// Writes `text` into a zero-padded field of exactly `size` bytes
    ///
    /// Fails without writing anything when the encoded text would leave no
    /// room for the terminator.
    pub fn put_cstr(&mut self, text: &str, size: usize) -> Result<()> {
        let encoded = text.as_bytes();
        if encoded.len() >= size {
            return Err(CodecError::TextTooLong {
                len: encoded.len(),
                size,
            });
        }

        self.buf.put_slice(encoded);
        self.buf.put_bytes(0, size - encoded.len());
        Ok(())
    }

    /// Number of bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Copies the written bytes out, leaving the writer usable
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over a received packet
///
/// Cloning is cheap and yields an independent cursor over the same shared
/// buffer, so several consumers can decode one reply without disturbing each
/// other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reader {
    buf: Bytes,
    offset: usize,
}

impl Reader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf, offset: 0 }
    }

    /// Creates a reader positioned at `offset`
    pub fn at(buf: Bytes, offset: usize) -> Self {
        Self { buf, offset }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// True once every byte has been consumed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn advance(&mut self, need: usize) -> Result<&[u8]> {
        if need > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.offset,
                need,
                have: self.remaining(),
            });
        }

        let start = self.offset;
        self.offset += need;
        Ok(&self.buf[start..self.offset])
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.advance(1).map(|mut b| b.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.advance(1).map(|mut b| b.get_i8())
    }

    pub fn bool(&mut self) -> Result<bool> {
        self.u8().map(|v| v != 0)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.advance(2).map(|mut b| b.get_u16_le())
    }

    pub fn i16(&mut self) -> Result<i16> {
        self.advance(2).map(|mut b| b.get_i16_le())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.advance(4).map(|mut b| b.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.advance(4).map(|mut b| b.get_i32_le())
    }

    /// Reads a null-terminated text field of exactly `size` bytes
    ///
    /// The whole field is consumed even when the text is shorter, keeping the
    /// offsets of following fields fixed.
    pub fn cstr(&mut self, size: usize) -> Result<String> {
        let field = self.advance(size)?;
        let end = field
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::MissingTerminator { size })?;

        std::str::from_utf8(&field[..end])
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidText)
    }
}
