use super::{Connector, LinkEvent, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
};

/// WebSocket client that connects to the clock and bridges frame channels
pub struct WebSocketClient {
    url: String,
}

impl WebSocketClient {
    /// Creates a new WebSocket client for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketClient {
    type Error = WebSocketClientError;

    async fn run(
        self,
        incoming_tx: mpsc::Sender<LinkEvent>,
        mut outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error> {
        tracing::info!(url = %self.url, "Connecting to clock");

        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WebSocketClientError::ConnectionError(e.to_string()))?;

        tracing::info!(url = %self.url, "WebSocket connection established");

        if incoming_tx.send(LinkEvent::Opened).await.is_err() {
            return Err(WebSocketClientError::ChannelError(
                "session stopped listening".into(),
            ));
        }

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            if let Err(e) = incoming_tx.send(LinkEvent::Frame(Bytes::from(data))).await {
                                tracing::error!(error = %e, "Failed to forward frame to session");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Clock closed connection");
                            break;
                        }
                        Some(Ok(Message::Text(text))) => {
                            tracing::debug!(len = text.len(), "Ignoring text message");
                        }
                        Some(Ok(_)) => {
                            // Ping/pong are answered by tungstenite
                        }
                        Some(Err(e)) => {
                            return Err(WebSocketClientError::WebSocketError(e.to_string()));
                        }
                        None => {
                            tracing::info!("Connection closed");
                            break;
                        }
                    }
                }

                frame = outgoing_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(e) = ws_sender.send(Message::Binary(frame.to_vec())).await {
                                return Err(WebSocketClientError::WebSocketError(e.to_string()));
                            }
                        }
                        None => {
                            tracing::debug!("Session released the socket, closing");
                            let _ = ws_sender.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Builds a [`WebSocketClient`] per connection attempt
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connector for WebSocketConnector {
    type Transport = WebSocketClient;
    type Error = WebSocketClientError;

    fn connect(&self) -> Result<Self::Transport, Self::Error> {
        self.url
            .as_str()
            .into_client_request()
            .map_err(|e| WebSocketClientError::InvalidUrl(format!("{}: {}", self.url, e)))?;

        Ok(WebSocketClient::new(self.url.clone()))
    }
}

/// WebSocket client errors
#[derive(Debug, thiserror::Error)]
pub enum WebSocketClientError {
    #[error("Invalid socket URL {0}")]
    InvalidUrl(String),

    #[error("Failed to connect: {0}")]
    ConnectionError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}
