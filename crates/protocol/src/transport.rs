//! Transport layer abstraction
//!
//! A transport carries whole binary frames between the session and the
//! device. Each WebSocket message is exactly one packet, so transports never
//! add framing of their own.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Event reported by a running transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The connection is established and frames may be written
    Opened,

    /// A binary frame arrived from the device
    Frame(Bytes),
}

/// Transport layer abstraction for one socket lifetime
///
/// # Example: Implementing a custom transport
///
/// ```no_run
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use nixielink_protocol::transport::{LinkEvent, Transport};
/// use tokio::sync::mpsc;
///
/// struct Loopback;
///
/// #[async_trait]
/// impl Transport for Loopback {
///     type Error = std::io::Error;
///
///     async fn run(
///         self,
///         incoming_tx: mpsc::Sender<LinkEvent>,
///         mut outgoing_rx: mpsc::Receiver<Bytes>,
///     ) -> Result<(), Self::Error> {
///         let _ = incoming_tx.send(LinkEvent::Opened).await;
///         while let Some(frame) = outgoing_rx.recv().await {
///             let _ = incoming_tx.send(LinkEvent::Frame(frame)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + 'static {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs one connection until it closes
    ///
    /// Implementations connect, send [`LinkEvent::Opened`] once the link is
    /// usable, forward every received binary frame as [`LinkEvent::Frame`]
    /// and write every frame taken from `outgoing_rx`. When `outgoing_rx` is
    /// closed the transport closes the connection and returns. Returning, with
    /// or without an error, means the socket is gone.
    async fn run(
        self,
        incoming_tx: mpsc::Sender<LinkEvent>,
        outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error>;
}
