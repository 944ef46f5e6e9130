//! # NixieLink Protocol
//!
//! Wire-level definitions shared by everything that talks to the clock.
//!
//! This crate provides:
//! - `Writer` / `Reader`: the fixed-layout little-endian packet codec
//! - `Opcode`: the command table, with `0` reserved as the retry sentinel
//! - `Packet` / `InboundFrame`: outbound requests and received replies
//! - Typed device messages (`TimeGet`, `WifiSettings`, `ScreenState`, ...)
//! - `SessionPhase`: connection health state machine
//! - `Transport`: the socket abstraction the session runs on
//!
//! ## Example
//!
//! ```
//! use nixielink_protocol::{Opcode, Packet, Reader};
//! use bytes::Bytes;
//!
//! // Build a request
//! let mut packet = Packet::new(Opcode::new(5).unwrap(), "scenario");
//! packet.writer_mut().put_bool(true);
//! packet.writer_mut().put_i8(-20);
//! packet.writer_mut().put_cstr("abc", 10).unwrap();
//!
//! assert_eq!(
//!     packet.to_bytes().as_ref(),
//!     &[5, 1, 236, b'a', b'b', b'c', 0, 0, 0, 0, 0, 0, 0]
//! );
//!
//! // Decode a reply payload
//! let mut reader = Reader::new(Bytes::from_static(&[1, 0xEC]));
//! assert!(reader.bool().unwrap());
//! assert_eq!(reader.i8().unwrap(), -20);
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod opcode;
pub mod packet;
pub mod state;
pub mod transport;

pub use codec::{Reader, Writer};
pub use error::{CodecError, PhaseError, Result};
pub use messages::{Decode, Encode, Request};
pub use opcode::{Opcode, RETRY_SENTINEL};
pub use packet::{InboundFrame, Packet, ReplyKind};
pub use state::SessionPhase;
pub use transport::{LinkEvent, Transport};
