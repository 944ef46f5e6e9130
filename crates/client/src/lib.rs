//! # NixieLink Client
//!
//! Session engine for talking to a nixie clock over one WebSocket.
//!
//! A [`Session`] owns the socket and the request queue. Callers hold a
//! [`SessionHandle`] and await replies; the UI layer plugs in through
//! [`SessionHooks`].
//!
//! ## Example
//!
//! ```no_run
//! use nixielink_client::{NoopHooks, Session, SessionConfig};
//! use nixielink_client::transport::websocket::WebSocketConnector;
//! use nixielink_protocol::messages::TimeGet;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SessionConfig::with_url("ws://192.168.4.1/");
//!     let connector = WebSocketConnector::new(config.url.clone());
//!     let (handle, _task) = Session::spawn(config, connector, NoopHooks);
//!
//!     if let Some(Ok(time)) = handle.request(&TimeGet, None).await {
//!         println!("clock reads {:?}", time.current);
//!     }
//!
//!     handle.shutdown().await;
//! }
//! ```

pub mod config;
pub mod hooks;
pub mod ipc;
pub mod load_counter;
pub mod session;
pub mod transport;

pub use config::{ConfigError, SessionConfig};
pub use hooks::{NoopHooks, Overlay, SessionHooks};
pub use ipc::{IpcAction, IpcEngine, Link, LinkError, LinkState, QueueSlot};
pub use load_counter::LoadCounter;
pub use session::{Session, SessionHandle};
pub use transport::Connector;
