//! Socket construction
//!
//! A [`Connector`] builds one [`Transport`] per connection attempt. Building
//! is synchronous and only fails for problems that retrying cannot fix, such
//! as a malformed URL. Everything that can go wrong on the wire is reported by
//! the transport's `run` returning.

pub mod memory;
pub mod websocket;

pub use nixielink_protocol::transport::{LinkEvent, Transport};

/// Factory for the socket of each session generation
pub trait Connector: Send + 'static {
    type Transport: Transport;

    /// Error type for construction failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates the transport for the next connection attempt
    fn connect(&self) -> Result<Self::Transport, Self::Error>;
}
