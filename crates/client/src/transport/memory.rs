//! In-memory transport for tests and embedding
//!
//! Frames travel over tokio channels instead of a socket. The device end of
//! each connection is a [`MemoryPeer`], handed out by a [`MemoryListener`]
//! the way a server accepts connections.

use super::{Connector, LinkEvent, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// In-memory client transport that communicates via channels
///
/// # Example
///
/// ```
/// use nixielink_client::transport::memory::MemoryTransport;
///
/// let (transport, device) = MemoryTransport::create_pair(16);
/// ```
pub struct MemoryTransport {
    /// Channel to send frames to the device
    to_peer: mpsc::Sender<Bytes>,
    /// Channel to receive frames from the device
    from_peer: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    pub fn new(to_peer: mpsc::Sender<Bytes>, from_peer: mpsc::Receiver<Bytes>) -> Self {
        Self { to_peer, from_peer }
    }

    /// Creates a connected transport and device endpoint
    pub fn create_pair(buffer_size: usize) -> (Self, MemoryPeer) {
        let (client_to_device_tx, client_to_device_rx) = mpsc::channel(buffer_size);
        let (device_to_client_tx, device_to_client_rx) = mpsc::channel(buffer_size);

        let transport = Self::new(client_to_device_tx, device_to_client_rx);
        let peer = MemoryPeer {
            tx: device_to_client_tx,
            rx: client_to_device_rx,
        };

        (transport, peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    async fn run(
        mut self,
        incoming_tx: mpsc::Sender<LinkEvent>,
        mut outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error> {
        if incoming_tx.send(LinkEvent::Opened).await.is_err() {
            return Err(MemoryTransportError::ChannelClosed);
        }

        loop {
            tokio::select! {
                // Device to session
                frame = self.from_peer.recv() => {
                    let Some(frame) = frame else {
                        tracing::debug!("Memory peer hung up");
                        return Ok(());
                    };
                    if incoming_tx.send(LinkEvent::Frame(frame)).await.is_err() {
                        return Err(MemoryTransportError::ChannelClosed);
                    }
                }

                // Session to device
                frame = outgoing_rx.recv() => {
                    let Some(frame) = frame else {
                        return Ok(());
                    };
                    if self.to_peer.send(frame).await.is_err() {
                        return Err(MemoryTransportError::ChannelClosed);
                    }
                }
            }
        }
    }
}

/// Device end of a [`MemoryTransport`]
pub struct MemoryPeer {
    tx: mpsc::Sender<Bytes>,
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryPeer {
    /// Next frame written by the session; `None` once the socket is closed
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    pub async fn send(&self, frame: impl Into<Bytes>) -> Result<(), MemoryTransportError> {
        self.tx
            .send(frame.into())
            .await
            .map_err(|_| MemoryTransportError::ChannelClosed)
    }
}

/// Hands a fresh [`MemoryTransport`] to the session for each connection
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accept_tx: mpsc::Sender<MemoryPeer>,
    buffer_size: usize,
}

impl MemoryConnector {
    /// Creates a connector and the listener that accepts its connections
    pub fn new(buffer_size: usize) -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::channel(buffer_size);
        let connector = Self {
            accept_tx,
            buffer_size,
        };
        (connector, MemoryListener { accept_rx })
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;
    type Error = MemoryTransportError;

    fn connect(&self) -> Result<Self::Transport, Self::Error> {
        let (transport, peer) = MemoryTransport::create_pair(self.buffer_size);
        self.accept_tx.try_send(peer).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MemoryTransportError::Backlog,
            mpsc::error::TrySendError::Closed(_) => MemoryTransportError::ListenerClosed,
        })?;
        Ok(transport)
    }
}

/// Device side of a [`MemoryConnector`]
pub struct MemoryListener {
    accept_rx: mpsc::Receiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next connection; `None` once every connector is gone
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }
}

impl std::fmt::Debug for MemoryPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPeer").finish_non_exhaustive()
    }
}

/// Memory transport errors
#[derive(Debug, thiserror::Error)]
pub enum MemoryTransportError {
    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("No listener accepts connections")]
    ListenerClosed,

    #[error("Too many connections waiting to be accepted")]
    Backlog,
}
