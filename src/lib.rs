//! # NixieLink
//!
//! Control-panel plumbing for WiFi/NTP nixie-tube clocks.
//!
//! ## Components
//!
//! - `nixielink-protocol`: packet codec, opcode table, typed device messages
//!   and the session phase machine
//! - `nixielink-client`: session actor, request queue with resend, and the
//!   WebSocket and in-memory transports

pub use nixielink_client as client;
pub use nixielink_protocol as protocol;
