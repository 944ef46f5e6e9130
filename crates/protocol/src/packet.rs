use std::borrow::Cow;

use bytes::Bytes;

use crate::codec::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::opcode::{Opcode, RETRY_SENTINEL};

/// Outbound request
///
/// The opcode byte is written when the packet is created; payload fields are
/// appended afterwards through [`Packet::writer_mut`].
///
/// ```
/// use nixielink_protocol::{Opcode, Packet};
///
/// let mut packet = Packet::new(Opcode::TIME_SYNC_START, "time sync");
/// packet.writer_mut().put_bool(true);
/// assert_eq!(packet.to_bytes().as_ref(), &[4, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: Opcode,
    name: Cow<'static, str>,
    writer: Writer,
}

impl Packet {
    /// Creates a packet; `name` is the human readable action used in logs and
    /// failure notices
    pub fn new(opcode: Opcode, name: impl Into<Cow<'static, str>>) -> Self {
        let mut writer = Writer::with_capacity(16);
        writer.put_u8(opcode.get());
        Self {
            opcode,
            name: name.into(),
            writer,
        }
    }

    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn writer_mut(&mut self) -> &mut Writer {
        &mut self.writer
    }

    /// Wire bytes, opcode included
    pub fn to_bytes(&self) -> Bytes {
        self.writer.to_bytes()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    /// Always false: a packet holds at least its opcode byte
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }
}

/// Leading byte of an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The device asks for the in-flight request to be sent again
    Retry,
    /// Reply to the request with this opcode
    Reply(Opcode),
}

/// Inbound frame as received from the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    buf: Bytes,
}

impl InboundFrame {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Classifies the frame by its opcode byte
    pub fn kind(&self) -> Result<ReplyKind> {
        let opcode = Reader::new(self.buf.clone()).u8()?;
        if opcode == RETRY_SENTINEL {
            return Ok(ReplyKind::Retry);
        }
        Opcode::new(opcode).map(ReplyKind::Reply)
    }

    /// Reader positioned just past the opcode byte
    pub fn payload(&self) -> Result<Reader> {
        if self.buf.is_empty() {
            return Err(CodecError::Truncated {
                offset: 0,
                need: 1,
                have: 0,
            });
        }
        Ok(Reader::at(self.buf.clone(), 1))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
