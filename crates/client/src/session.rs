//! Session actor
//!
//! A [`Session`] owns the socket, the request queue and the phase. It runs as
//! a single task; every other part of the program talks to it through a
//! cloneable [`SessionHandle`].
//!
//! ```text
//!   SessionHandle ──Command──→ ┌─────────┐ ──Bytes──→ socket task ──→ Transport
//!                              │ Session │
//!   SessionHooks ←──callbacks─ └─────────┘ ←─SocketEvent── socket task ←──┘
//! ```
//!
//! Socket events carry the generation of the socket that produced them, so a
//! late event from a replaced socket is never mistaken for the current one.

use std::future;

use bytes::Bytes;
use nixielink_protocol::{Decode, LinkEvent, Packet, Reader, Request, SessionPhase, Transport};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::hooks::{Overlay, SessionHooks};
use crate::ipc::{IpcAction, IpcEngine, Link, LinkError, LinkState, Waiter};
use crate::load_counter::LoadCounter;
use crate::transport::Connector;

enum Command {
    Transmit {
        packet: Packet,
        counter: Option<LoadCounter>,
        reply: Waiter,
    },
    Restart,
    Unload,
    Shutdown,
}

#[derive(Debug)]
enum SocketEvent {
    Link(LinkEvent),
    Closed,
}

#[derive(Debug)]
struct TaggedEvent {
    generation: u64,
    event: SocketEvent,
}

/// Session-side view of one socket generation
struct Socket {
    generation: u64,
    outgoing_tx: Option<mpsc::Sender<Bytes>>,
    close_tx: Option<oneshot::Sender<()>>,
    open: bool,
}

impl Socket {
    fn is_closing(&self) -> bool {
        self.outgoing_tx.is_none()
    }

    /// Releases the socket; its `Closed` event still follows
    ///
    /// An open transport sees its outgoing channel end and shuts down on its
    /// own terms. One that never opened is aborted.
    fn close(&mut self) {
        let was_open = self.open;
        self.outgoing_tx = None;
        self.open = false;
        if !was_open {
            self.abort();
        }
    }

    /// Drops the transport without letting it finish
    fn abort(&mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
    }
}

struct SocketLink<'a>(Option<&'a Socket>);

impl Link for SocketLink<'_> {
    fn state(&self) -> LinkState {
        match self.0 {
            None => LinkState::Absent,
            Some(socket) if socket.open && !socket.is_closing() => LinkState::Open,
            Some(_) => LinkState::Pending,
        }
    }

    fn send(&mut self, frame: Bytes) -> Result<(), LinkError> {
        let socket = self.0.ok_or(LinkError::NoSocket)?;
        if !socket.open {
            return Err(LinkError::NotOpen);
        }
        let outgoing_tx = socket.outgoing_tx.as_ref().ok_or(LinkError::NotOpen)?;

        outgoing_tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::Full,
            mpsc::error::TrySendError::Closed(_) => LinkError::Closed,
        })
    }
}

/// Cloneable front end of a running [`Session`]
#[derive(Clone)]
pub struct SessionHandle {
    commands_tx: mpsc::Sender<Command>,
    phase_rx: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    /// Sends `packet` and waits for the matching reply
    ///
    /// Returns a reader positioned just past the reply opcode, or `None` when
    /// the exchange failed for good (session torn down, retries exhausted
    /// while restoring, or the session is gone). When the reply arrives,
    /// `counter` is incremented before the caller is woken.
    pub async fn transmit(&self, packet: Packet, counter: Option<&LoadCounter>) -> Option<Reader> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = Command::Transmit {
            packet,
            counter: counter.cloned(),
            reply: reply_tx,
        };

        if self.commands_tx.send(command).await.is_err() {
            tracing::warn!("Session is not running, request dropped");
            return None;
        }

        reply_rx.await.ok().flatten()
    }

    /// Typed [`SessionHandle::transmit`]
    ///
    /// `None` means the exchange failed; `Some(Err(_))` means the request
    /// could not be encoded or the reply did not decode.
    pub async fn request<R: Request>(
        &self,
        request: &R,
        counter: Option<&LoadCounter>,
    ) -> Option<nixielink_protocol::Result<R::Response>> {
        let packet = match request.to_packet() {
            Ok(packet) => packet,
            Err(e) => return Some(Err(e)),
        };

        let mut reader = self.transmit(packet, counter).await?;
        Some(R::Response::decode(&mut reader))
    }

    /// Tears the session down and reconnects after the restart backoff
    pub async fn restart(&self) {
        self.command(Command::Restart).await;
    }

    /// Tears the session down without reconnecting
    pub async fn unload(&self) {
        self.command(Command::Unload).await;
    }

    /// Stops the session task
    pub async fn shutdown(&self) {
        self.command(Command::Shutdown).await;
    }

    /// Watches the session phase
    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands_tx.is_closed()
    }

    async fn command(&self, command: Command) {
        if self.commands_tx.send(command).await.is_err() {
            tracing::debug!("Session already stopped");
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("phase", &*self.phase_rx.borrow())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Connection lifecycle and request queue of one clock
pub struct Session<C: Connector, H: SessionHooks> {
    config: SessionConfig,
    connector: C,
    hooks: H,
    engine: IpcEngine,

    phase: SessionPhase,
    phase_tx: watch::Sender<SessionPhase>,
    loaded: bool,

    socket: Option<Socket>,
    generation: u64,

    commands_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<TaggedEvent>,
    events_rx: mpsc::Receiver<TaggedEvent>,

    /// Deadline for the socket to open, or to finish closing
    connect_at: Option<Instant>,
    restart_at: Option<Instant>,
}

impl<C: Connector, H: SessionHooks> Session<C, H> {
    pub fn new(config: SessionConfig, connector: C, hooks: H) -> (Self, SessionHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(config.channel_capacity);
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity);
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Init);

        let session = Self {
            engine: IpcEngine::from_config(&config),
            config,
            connector,
            hooks,
            phase: SessionPhase::Init,
            phase_tx,
            loaded: false,
            socket: None,
            generation: 0,
            commands_rx,
            events_tx,
            events_rx,
            connect_at: None,
            restart_at: None,
        };

        let handle = SessionHandle {
            commands_tx,
            phase_rx,
        };

        (session, handle)
    }

    /// Creates a session and runs it on a new task
    pub fn spawn(config: SessionConfig, connector: C, hooks: H) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(config, connector, hooks);
        (handle, tokio::spawn(session.run()))
    }

    /// Runs the session until shut down or every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(url = %self.config.url, "Session started");

        self.unload();
        self.connect();

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }

                Some(tagged) = self.events_rx.recv() => {
                    self.handle_event(tagged);
                }

                _ = sleep_until_opt(self.engine.resend_deadline()) => {
                    self.on_resend_timeout();
                }

                _ = sleep_until_opt(self.connect_at) => {
                    self.on_connect_timeout();
                }

                _ = sleep_until_opt(self.restart_at) => {
                    self.restart_at = None;
                    self.connect();
                }
            }
        }

        self.teardown();
        tracing::info!("Session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Transmit {
                packet,
                counter,
                reply,
            } => {
                self.engine.enqueue(packet, reply, counter);
                let action = self
                    .engine
                    .next(&mut SocketLink(self.socket.as_ref()), self.phase);
                self.apply(action);
            }
            Command::Restart => {
                tracing::info!("Restart requested");
                self.restart();
            }
            Command::Unload => {
                tracing::info!("Unload requested");
                self.unload();
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, tagged: TaggedEvent) {
        let TaggedEvent { generation, event } = tagged;

        let Some(closing) = self
            .socket
            .as_ref()
            .filter(|s| s.generation == generation)
            .map(Socket::is_closing)
        else {
            tracing::debug!(generation, ?event, "Ignoring event from a replaced socket");
            return;
        };

        match event {
            SocketEvent::Closed => self.on_close(),
            SocketEvent::Link(_) if closing => {
                tracing::debug!(generation, "Ignoring event from a closing socket");
            }
            SocketEvent::Link(LinkEvent::Opened) => self.on_open(),
            SocketEvent::Link(LinkEvent::Frame(frame)) => self.on_message(frame),
        }
    }

    fn on_open(&mut self) {
        self.connect_at = None;
        if let Some(socket) = self.socket.as_mut() {
            socket.open = true;
        }

        tracing::info!(generation = self.generation, phase = %self.phase, "Socket opened");

        match self.phase {
            SessionPhase::Init => {
                self.loaded = true;
                self.hooks.on_loaded();
                self.drive_queue();
            }
            SessionPhase::Normal => {
                tracing::error!("Socket opened while the session was already established");
            }
            SessionPhase::Restoring => self.drive_queue(),
        }
    }

    fn on_close(&mut self) {
        self.connect_at = None;
        tracing::info!(generation = self.generation, phase = %self.phase, "Socket closed");

        match self.phase {
            SessionPhase::Init | SessionPhase::Restoring => self.restart(),
            SessionPhase::Normal => {
                self.set_phase(SessionPhase::Restoring);
                self.engine.suspend();
                self.connect();
            }
        }
    }

    fn on_message(&mut self, frame: Bytes) {
        if !self.phase.is_normal() {
            self.set_phase(SessionPhase::Normal);
        }

        let action = self
            .engine
            .receive(frame, &mut SocketLink(self.socket.as_ref()), self.phase);
        self.apply(action);

        if !self.hooks.is_ui_visible() && self.hooks.is_ui_ready() {
            tracing::debug!("Bootstrap data complete, revealing UI");
            self.hooks.reveal_ui();
        }
    }

    fn on_resend_timeout(&mut self) {
        let action = self
            .engine
            .resend(&mut SocketLink(self.socket.as_ref()), self.phase);
        self.apply(action);
    }

    fn on_connect_timeout(&mut self) {
        self.connect_at = None;

        if let Some(socket) = self.socket.as_mut().filter(|s| !s.open) {
            if socket.is_closing() {
                tracing::warn!(
                    generation = socket.generation,
                    "Socket did not close in time, aborting"
                );
            } else {
                tracing::warn!(
                    generation = socket.generation,
                    timeout = ?self.config.connect_timeout,
                    "Socket did not open in time, closing"
                );
            }
            socket.abort();
        }
    }

    fn drive_queue(&mut self) {
        let action = self
            .engine
            .next(&mut SocketLink(self.socket.as_ref()), self.phase);
        self.apply(action);
    }

    fn apply(&mut self, mut action: Option<IpcAction>) {
        while let Some(next) = action.take() {
            action = match next {
                IpcAction::Restart => {
                    self.restart();
                    None
                }
                IpcAction::Reconnect => {
                    if let Some(socket) = self.socket.as_mut() {
                        socket.close();
                        self.connect_at = Some(Instant::now() + self.config.connect_timeout);
                    }
                    None
                }
                IpcAction::Failed { name, .. } => {
                    self.hooks.notify_failure(&name);
                    self.engine
                        .next(&mut SocketLink(self.socket.as_ref()), self.phase)
                }
            };
        }
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if let Err(e) = self.phase.transition_to(next) {
            tracing::error!(error = %e, "Rejected phase change");
            return;
        }
        tracing::debug!(phase = %self.phase, "Phase changed");
        self.phase_tx.send_replace(self.phase);
    }

    fn connect(&mut self) {
        if let Some(mut stale) = self.socket.take() {
            stale.close();
        }

        let transport = match self.connector.connect() {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create socket");
                self.connect_at = None;
                self.engine.reset();
                self.hooks.show_overlay(Overlay::Error(e.to_string()));
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let (outgoing_tx, outgoing_rx) = mpsc::channel(self.config.channel_capacity);
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(drive_socket(
            transport,
            generation,
            self.events_tx.clone(),
            outgoing_rx,
            close_rx,
            self.config.channel_capacity,
        ));

        self.socket = Some(Socket {
            generation,
            outgoing_tx: Some(outgoing_tx),
            close_tx: Some(close_tx),
            open: false,
        });
        self.connect_at = Some(Instant::now() + self.config.connect_timeout);

        tracing::debug!(generation, phase = %self.phase, "Connecting");
    }

    /// Tears down now and reconnects after the backoff
    fn restart(&mut self) {
        self.unload();
        self.restart_at = Some(Instant::now() + self.config.restart_backoff);
        tracing::warn!(backoff = ?self.config.restart_backoff, "Session restart scheduled");
    }

    fn unload(&mut self) {
        self.teardown();
        self.hooks.show_overlay(Overlay::Connecting);
    }

    fn teardown(&mut self) {
        self.restart_at = None;

        if self.loaded {
            self.loaded = false;
            self.hooks.on_unloaded();
        }

        self.set_phase(SessionPhase::Init);

        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.connect_at = None;

        self.engine.reset();
    }
}

/// Runs one transport and tags what it reports with its generation
///
/// The transport normally ends by itself once `outgoing_rx` closes. A value
/// on `close_rx` drops it on the spot.
async fn drive_socket<T: Transport>(
    transport: T,
    generation: u64,
    events_tx: mpsc::Sender<TaggedEvent>,
    outgoing_rx: mpsc::Receiver<Bytes>,
    close_rx: oneshot::Receiver<()>,
    capacity: usize,
) {
    let (link_tx, mut link_rx) = mpsc::channel(capacity);
    let run = transport.run(link_tx, outgoing_rx);
    tokio::pin!(run);

    let mut close_rx = Some(close_rx);
    let mut drain = true;
    loop {
        tokio::select! {
            biased;

            Some(event) = link_rx.recv() => {
                let tagged = TaggedEvent { generation, event: SocketEvent::Link(event) };
                if events_tx.send(tagged).await.is_err() {
                    return;
                }
            }

            result = &mut run => {
                if let Err(e) = result {
                    tracing::warn!(generation, error = %e, "Socket failed");
                }
                break;
            }

            signal = abort_signal(&mut close_rx) => {
                match signal {
                    Ok(()) => {
                        tracing::debug!(generation, "Socket aborted");
                        drain = false;
                        break;
                    }
                    // Sender gone without a signal: keep running to the end
                    Err(_) => close_rx = None,
                }
            }
        }
    }

    if drain {
        while let Ok(event) = link_rx.try_recv() {
            let tagged = TaggedEvent { generation, event: SocketEvent::Link(event) };
            if events_tx.send(tagged).await.is_err() {
                return;
            }
        }
    }

    let _ = events_tx
        .send(TaggedEvent {
            generation,
            event: SocketEvent::Closed,
        })
        .await;
}

async fn abort_signal(
    close_rx: &mut Option<oneshot::Receiver<()>>,
) -> Result<(), oneshot::error::RecvError> {
    match close_rx {
        Some(close_rx) => close_rx.await,
        None => future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
