//! Request queue and resend engine
//!
//! The engine keeps one slot per distinct opcode. Slots are served strictly in
//! creation order and only the head slot is ever on the wire. A second request
//! for an opcode that already has a slot joins that slot instead of producing
//! another exchange.
//!
//! The engine never touches the socket or the UI directly. It writes through a
//! [`Link`] and reports anything the session has to act on as an
//! [`IpcAction`].

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use nixielink_protocol::{InboundFrame, Opcode, Packet, Reader, ReplyKind, SessionPhase};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::load_counter::LoadCounter;

/// Resolves one `transmit` caller
pub type Waiter = oneshot::Sender<Option<Reader>>;

/// Socket availability as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket at all; the session is torn down
    Absent,
    /// Socket exists but cannot carry frames yet (connecting or closing)
    Pending,
    Open,
}

/// Socket write errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("No socket")]
    NoSocket,

    #[error("Socket is not open")]
    NotOpen,

    #[error("Socket write buffer full")]
    Full,

    #[error("Socket channel closed")]
    Closed,
}

/// Write side of the socket, as used by the engine
pub trait Link {
    fn state(&self) -> LinkState;

    fn send(&mut self, frame: Bytes) -> Result<(), LinkError>;
}

/// Follow-up the session must perform on behalf of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcAction {
    /// A socket write failed: tear the session down and start over
    Restart,

    /// The head slot exhausted its attempts on a healthy-looking link: drop
    /// the socket and reconnect, keeping the queue
    Reconnect,

    /// The head slot exhausted its attempts while restoring and was failed
    Failed { opcode: Opcode, name: String },
}

/// One logical exchange, shared by every caller of the same opcode
#[derive(Debug)]
pub struct QueueSlot {
    packet: Packet,
    waiters: Vec<Waiter>,
    counters: Vec<LoadCounter>,
    attempts: u32,
}

impl QueueSlot {
    fn new(packet: Packet) -> Self {
        Self {
            packet,
            waiters: Vec::new(),
            counters: Vec::new(),
            attempts: 0,
        }
    }

    fn attach(&mut self, waiter: Waiter, counter: Option<LoadCounter>) {
        self.waiters.push(waiter);
        self.counters.extend(counter);
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    /// Hands every waiter its own cursor over the reply, then bumps the
    /// attached readiness counters
    ///
    /// Consumes the slot, so a slot completes at most once.
    pub fn succeed(self, reader: Reader) {
        for waiter in self.waiters {
            // A dropped receiver only means the caller stopped waiting
            let _ = waiter.send(Some(reader.clone()));
        }
        for counter in &self.counters {
            counter.increment();
        }
    }

    /// Resolves every waiter with `None`
    pub fn fail(self) {
        for waiter in self.waiters {
            let _ = waiter.send(None);
        }
    }
}

/// Ordered, opcode-keyed request queue with timeout-driven resend
#[derive(Debug)]
pub struct IpcEngine {
    order: VecDeque<Opcode>,
    slots: HashMap<Opcode, QueueSlot>,
    resend_at: Option<Instant>,
    resend_interval: Duration,
    max_retries: u32,
}

impl IpcEngine {
    pub fn new(resend_interval: Duration, max_retries: u32) -> Self {
        Self {
            order: VecDeque::new(),
            slots: HashMap::new(),
            resend_at: None,
            resend_interval,
            max_retries,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.resend_interval, config.max_retries)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// When the in-flight request is due for another write
    pub fn resend_deadline(&self) -> Option<Instant> {
        self.resend_at
    }

    pub fn head(&self) -> Option<&QueueSlot> {
        self.order.front().and_then(|opcode| self.slots.get(opcode))
    }

    fn head_mut(&mut self) -> Option<&mut QueueSlot> {
        let opcode = self.order.front()?;
        self.slots.get_mut(opcode)
    }

    fn pop_head(&mut self) -> Option<QueueSlot> {
        let opcode = self.order.pop_front()?;
        self.slots.remove(&opcode)
    }

    /// Opcode of the request currently awaiting a reply
    pub fn in_flight(&self) -> Option<Opcode> {
        self.head()
            .filter(|slot| slot.attempts > 0)
            .map(|slot| slot.packet.opcode())
    }

    /// Queues `packet`, or joins the existing slot for its opcode
    ///
    /// Joining replaces the stored packet, so a retransmission carries the
    /// latest payload. Call [`IpcEngine::next`] afterwards to start sending.
    pub fn enqueue(&mut self, packet: Packet, waiter: Waiter, counter: Option<LoadCounter>) {
        let opcode = packet.opcode();

        if let Some(slot) = self.slots.get_mut(&opcode) {
            tracing::debug!(
                opcode = %opcode,
                name = packet.name(),
                waiters = slot.waiters.len() + 1,
                "Coalescing request into queued slot"
            );
            slot.packet = packet;
            slot.attach(waiter, counter);
            return;
        }

        tracing::debug!(opcode = %opcode, name = packet.name(), queued = self.order.len() + 1, "Queueing request");
        let mut slot = QueueSlot::new(packet);
        slot.attach(waiter, counter);
        self.slots.insert(opcode, slot);
        self.order.push_back(opcode);
    }

    /// Starts the head request unless one is already on the wire
    pub fn next(&mut self, link: &mut impl Link, phase: SessionPhase) -> Option<IpcAction> {
        let head = self.head()?;
        if head.attempts > 0 {
            return None;
        }

        match link.state() {
            LinkState::Absent => {
                self.reset();
                None
            }
            LinkState::Pending => None,
            LinkState::Open => self.resend(link, phase),
        }
    }

    /// Writes the head request again, or escalates once attempts run out
    pub fn resend(&mut self, link: &mut impl Link, phase: SessionPhase) -> Option<IpcAction> {
        self.resend_at = None;

        let max_retries = self.max_retries;
        let exhausted = self.head()?.attempts > max_retries;

        if exhausted {
            if !phase.is_restoring() {
                let slot = self.head_mut()?;
                tracing::warn!(
                    opcode = %slot.packet.opcode(),
                    name = slot.packet.name(),
                    "No reply after {} attempts, reconnecting",
                    slot.attempts
                );
                slot.attempts = 0;
                return Some(IpcAction::Reconnect);
            }

            let slot = self.pop_head()?;
            let opcode = slot.packet.opcode();
            let name = slot.packet.name().to_string();
            tracing::error!(opcode = %opcode, name = %name, "Request failed while restoring");
            slot.fail();
            return Some(IpcAction::Failed { opcode, name });
        }

        let interval = self.resend_interval;
        let slot = self.head_mut()?;
        slot.attempts += 1;

        tracing::debug!(
            opcode = %slot.packet.opcode(),
            name = slot.packet.name(),
            attempt = slot.attempts,
            "Transmitting"
        );

        if let Err(e) = link.send(slot.packet.to_bytes()) {
            tracing::error!(error = %e, "Socket write failed");
            return Some(IpcAction::Restart);
        }

        self.resend_at = Some(Instant::now() + interval);
        None
    }

    /// Dispatches one inbound frame to the request in flight
    pub fn receive(
        &mut self,
        frame: Bytes,
        link: &mut impl Link,
        phase: SessionPhase,
    ) -> Option<IpcAction> {
        let Some(expected) = self.in_flight() else {
            tracing::debug!(len = frame.len(), "Discarding frame with no request in flight");
            return None;
        };

        let frame = InboundFrame::new(frame);
        let kind = match frame.kind() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed frame");
                return None;
            }
        };

        match kind {
            ReplyKind::Retry => {
                tracing::warn!(opcode = %expected, "Device asked for a resend");
                self.resend(link, phase)
            }
            ReplyKind::Reply(opcode) if opcode != expected => {
                tracing::error!(
                    received = %opcode,
                    transmitted = %expected,
                    "Reply does not match the request in flight"
                );
                None
            }
            ReplyKind::Reply(opcode) => {
                let payload = match frame.payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding malformed frame");
                        return None;
                    }
                };
                let slot = self.pop_head()?;
                self.resend_at = None;

                tracing::debug!(
                    opcode = %opcode,
                    name = slot.packet.name(),
                    waiters = slot.waiters.len(),
                    "Request completed"
                );
                slot.succeed(payload);
                self.next(link, phase)
            }
        }
    }

    /// Parks the head request while the socket is being restored
    ///
    /// The resend deadline is cancelled and the attempt count cleared, so the
    /// request is written again as soon as the new socket opens.
    pub fn suspend(&mut self) {
        self.resend_at = None;
        if let Some(slot) = self.head_mut() {
            slot.attempts = 0;
        }
    }

    /// Fails every queued request
    pub fn reset(&mut self) {
        self.resend_at = None;

        let mut failed = 0;
        while let Some(slot) = self.pop_head() {
            slot.fail();
            failed += 1;
        }
        debug_assert!(self.slots.is_empty());

        if failed > 0 {
            tracing::info!(failed, "Request queue reset");
        }
    }
}
