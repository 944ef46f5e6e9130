use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use nixielink::client::transport::memory::{MemoryConnector, MemoryListener, MemoryPeer};
use nixielink::client::transport::{Connector, LinkEvent, Transport};
use nixielink::client::{LoadCounter, Overlay, Session, SessionConfig, SessionHandle, SessionHooks};
use nixielink::protocol::messages::{DateTime, TimeGet};
use nixielink::protocol::{Opcode, Packet, SessionPhase};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
enum HookEvent {
    Loaded,
    Unloaded,
    Revealed,
    Overlay(Overlay),
    Failure(String),
}

#[derive(Clone, Default)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<HookEvent>>>,
    visible: Arc<AtomicBool>,
    ready: Option<LoadCounter>,
}

impl RecordingHooks {
    fn hidden_until(counter: LoadCounter) -> Self {
        Self {
            ready: Some(counter),
            ..Self::default()
        }
    }

    fn record(&self, event: HookEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, event: &HookEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl SessionHooks for RecordingHooks {
    fn on_loaded(&mut self) {
        self.record(HookEvent::Loaded);
    }

    fn on_unloaded(&mut self) {
        self.record(HookEvent::Unloaded);
    }

    fn is_ui_visible(&self) -> bool {
        self.ready.is_none() || self.visible.load(Ordering::SeqCst)
    }

    fn is_ui_ready(&self) -> bool {
        self.ready.as_ref().map_or(false, LoadCounter::is_ready)
    }

    fn reveal_ui(&mut self) {
        self.visible.store(true, Ordering::SeqCst);
        self.record(HookEvent::Revealed);
    }

    fn show_overlay(&mut self, overlay: Overlay) {
        self.record(HookEvent::Overlay(overlay));
    }

    fn notify_failure(&mut self, name: &str) {
        self.record(HookEvent::Failure(name.to_string()));
    }
}

fn config() -> SessionConfig {
    SessionConfig::with_url("ws://clock.test/")
}

fn start_with(hooks: RecordingHooks) -> (SessionHandle, MemoryListener) {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let (connector, listener) = MemoryConnector::new(16);
    let (handle, _task) = Session::spawn(config(), connector, hooks);
    (handle, listener)
}

fn start() -> (SessionHandle, MemoryListener, RecordingHooks) {
    let hooks = RecordingHooks::default();
    let (handle, listener) = start_with(hooks.clone());
    (handle, listener, hooks)
}

fn time_get() -> Packet {
    Packet::new(Opcode::TIME_GET, "date/time request")
}

async fn accept(listener: &mut MemoryListener) -> MemoryPeer {
    timeout(Duration::from_secs(10), listener.accept())
        .await
        .expect("no connection")
        .expect("connector dropped")
}

async fn expect_frame(device: &mut MemoryPeer) -> Bytes {
    timeout(Duration::from_secs(10), device.recv())
        .await
        .expect("no frame")
        .expect("socket closed")
}

/// Answers one request so the session reaches `Normal`
async fn establish(handle: &SessionHandle, device: &mut MemoryPeer) {
    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        assert_eq!(expect_frame(device).await.as_ref(), &[2]);
        device.send(vec![2u8]).await.unwrap();
    });
    assert!(reply.is_some());
    assert_eq!(*handle.phase().borrow(), SessionPhase::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_first_open_loads_and_reply_resolves() {
    let (handle, mut listener, hooks) = start();
    let mut device = accept(&mut listener).await;

    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        assert_eq!(expect_frame(&mut device).await.as_ref(), &[2]);
        device.send(vec![2u8, 0x11, 0x22]).await.unwrap();
    });

    let mut reader = reply.unwrap();
    assert_eq!(reader.position(), 1);
    assert_eq!(reader.u16().unwrap(), 0x2211);

    assert_eq!(*handle.phase().borrow(), SessionPhase::Normal);
    assert_eq!(
        hooks.events(),
        vec![HookEvent::Overlay(Overlay::Connecting), HookEvent::Loaded]
    );
}

#[tokio::test(start_paused = true)]
async fn test_typed_request() {
    let (handle, mut listener, _hooks) = start();
    let mut device = accept(&mut listener).await;

    let (reply, _) = tokio::join!(handle.request(&TimeGet, None), async {
        assert_eq!(expect_frame(&mut device).await.as_ref(), &[2]);
        device
            .send(vec![2u8, 24, 10, 16, 12, 30, 5, 0, 0, 0, 0, 0, 0, 1])
            .await
            .unwrap();
    });

    let time = reply.unwrap().unwrap();
    assert_eq!(
        time.current,
        DateTime {
            year: 24,
            month: 10,
            day: 16,
            hour: 12,
            minute: 30,
            second: 5
        }
    );
    assert_eq!(time.current.full_year(), 2024);
    assert_eq!(time.last_sync, None);
    assert!(time.sync_available);
}

#[tokio::test(start_paused = true)]
async fn test_coalesced_requests_share_one_exchange() {
    let (handle, mut listener, _hooks) = start();
    let mut device = accept(&mut listener).await;
    let counter = LoadCounter::new(2);

    let (first, second, _) = tokio::join!(
        handle.transmit(Packet::new(Opcode::TIME_SETTINGS_GET, "settings"), Some(&counter)),
        handle.transmit(Packet::new(Opcode::TIME_SETTINGS_GET, "settings"), Some(&counter)),
        async {
            assert_eq!(expect_frame(&mut device).await.as_ref(), &[5]);
            sleep(Duration::from_millis(50)).await;
            device.send(vec![5u8, 1]).await.unwrap();
        }
    );

    assert_eq!(first.unwrap().u8().unwrap(), 1);
    assert_eq!(second.unwrap().u8().unwrap(), 1);
    assert_eq!(counter.count(), 2);

    // No second write for the joined caller
    assert!(timeout(Duration::from_secs(5), device.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_distinct_opcodes_answered_in_order() {
    let (handle, mut listener, _hooks) = start();
    let mut device = accept(&mut listener).await;

    let (time, wifi, _) = tokio::join!(
        handle.transmit(time_get(), None),
        handle.transmit(Packet::new(Opcode::WIFI_SETTINGS_GET, "wifi"), None),
        async {
            assert_eq!(expect_frame(&mut device).await.as_ref(), &[2]);

            // A reply for the queued request does not complete anything
            device.send(vec![8u8, 0xEE]).await.unwrap();
            device.send(vec![2u8, 0x01]).await.unwrap();

            assert_eq!(expect_frame(&mut device).await.as_ref(), &[8]);
            device.send(vec![8u8, 0x02]).await.unwrap();
        }
    );

    assert_eq!(time.unwrap().u8().unwrap(), 0x01);
    assert_eq!(wifi.unwrap().u8().unwrap(), 0x02);
}

#[tokio::test(start_paused = true)]
async fn test_retry_sentinel_resends_without_waiting() {
    let (handle, mut listener, _hooks) = start();
    let mut device = accept(&mut listener).await;

    let (reply, elapsed) = tokio::join!(handle.transmit(time_get(), None), async {
        assert_eq!(expect_frame(&mut device).await.as_ref(), &[2]);
        let asked = Instant::now();
        device.send(vec![0u8]).await.unwrap();

        assert_eq!(expect_frame(&mut device).await.as_ref(), &[2]);
        let elapsed = asked.elapsed();
        device.send(vec![2u8]).await.unwrap();
        elapsed
    });

    assert!(reply.is_some());
    assert!(elapsed < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_written_eleven_times() {
    let (handle, mut listener, hooks) = start();
    let mut device = accept(&mut listener).await;

    let (reply, writes) = tokio::join!(
        handle.transmit(Packet::new(Opcode::SCREEN_STATE_GET, "display"), None),
        async {
            let mut writes = 0;
            while let Some(frame) = device.recv().await {
                assert_eq!(frame.as_ref(), &[10]);
                writes += 1;
            }
            writes
        }
    );

    assert_eq!(writes, 11);

    // Never reached `Normal`, so the dropped socket restarts the session
    assert!(reply.is_none());
    assert_eq!(hooks.count(&HookEvent::Unloaded), 1);
    assert!(hooks.events().iter().all(|e| !matches!(e, HookEvent::Failure(_))));

    let _device = accept(&mut listener).await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(hooks.count(&HookEvent::Loaded), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_in_normal_reconnects_and_redelivers() {
    let (handle, mut listener, hooks) = start();
    let mut first = accept(&mut listener).await;
    establish(&handle, &mut first).await;
    let mut phase = handle.phase();

    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        let mut writes = 0;
        while first.recv().await.is_some() {
            writes += 1;
        }
        assert_eq!(writes, 11);

        let mut second = accept(&mut listener).await;
        assert_eq!(*phase.borrow_and_update(), SessionPhase::Restoring);
        assert_eq!(expect_frame(&mut second).await.as_ref(), &[2]);
        second.send(vec![2u8, 7]).await.unwrap();
    });

    assert_eq!(reply.unwrap().u8().unwrap(), 7);
    assert_eq!(*handle.phase().borrow(), SessionPhase::Normal);
    assert_eq!(hooks.count(&HookEvent::Loaded), 1);
    assert_eq!(hooks.count(&HookEvent::Unloaded), 0);
}

#[tokio::test(start_paused = true)]
async fn test_socket_loss_in_normal_restores_queue() {
    let (handle, mut listener, hooks) = start();
    let mut first = accept(&mut listener).await;
    establish(&handle, &mut first).await;

    let (reply, _) = tokio::join!(
        handle.transmit(Packet::new(Opcode::WIFI_INFO_GET, "wifi info"), None),
        async {
            assert_eq!(expect_frame(&mut first).await.as_ref(), &[26]);
            drop(first);

            let mut second = accept(&mut listener).await;
            assert_eq!(expect_frame(&mut second).await.as_ref(), &[26]);
            second.send(vec![26u8, 2]).await.unwrap();
        }
    );

    assert_eq!(reply.unwrap().u8().unwrap(), 2);
    assert_eq!(*handle.phase().borrow(), SessionPhase::Normal);
    assert_eq!(hooks.count(&HookEvent::Loaded), 1);
    assert_eq!(hooks.count(&HookEvent::Unloaded), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_while_restoring_notifies_failure() {
    let (handle, mut listener, hooks) = start();
    let mut first = accept(&mut listener).await;
    establish(&handle, &mut first).await;
    drop(first);

    let mut second = accept(&mut listener).await;
    assert_eq!(*handle.phase().borrow(), SessionPhase::Restoring);

    let (reply, writes) = tokio::join!(handle.transmit(time_get(), None), async {
        let mut writes = 0;
        while let Ok(Some(_)) = timeout(Duration::from_secs(2), second.recv()).await {
            writes += 1;
        }
        writes
    });

    assert!(reply.is_none());
    assert_eq!(writes, 11);
    assert_eq!(hooks.count(&HookEvent::Failure("date/time request".into())), 1);

    // The socket survives; only the request was given up
    assert_eq!(*handle.phase().borrow(), SessionPhase::Restoring);
    assert_eq!(hooks.count(&HookEvent::Unloaded), 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_before_any_message_restarts() {
    let (handle, mut listener, hooks) = start();
    let first = accept(&mut listener).await;

    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        sleep(Duration::from_millis(10)).await;
        drop(first);
    });
    assert!(reply.is_none());

    let started = Instant::now();
    let _second = accept(&mut listener).await;
    assert!(started.elapsed() >= Duration::from_millis(490));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        hooks.events(),
        vec![
            HookEvent::Overlay(Overlay::Connecting),
            HookEvent::Loaded,
            HookEvent::Unloaded,
            HookEvent::Overlay(Overlay::Connecting),
            HookEvent::Loaded,
        ]
    );
    assert_eq!(*handle.phase().borrow(), SessionPhase::Init);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_restoring_restarts() {
    let (handle, mut listener, hooks) = start();
    let mut first = accept(&mut listener).await;
    establish(&handle, &mut first).await;
    drop(first);

    // Restored socket dies before the clock says anything
    let second = accept(&mut listener).await;
    assert_eq!(*handle.phase().borrow(), SessionPhase::Restoring);
    sleep(Duration::from_millis(10)).await;
    drop(second);

    let started = Instant::now();
    let _third = accept(&mut listener).await;
    assert!(started.elapsed() >= Duration::from_millis(490));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(*handle.phase().borrow(), SessionPhase::Init);
    assert_eq!(hooks.count(&HookEvent::Unloaded), 1);
    assert_eq!(
        hooks.events(),
        vec![
            HookEvent::Overlay(Overlay::Connecting),
            HookEvent::Loaded,
            HookEvent::Unloaded,
            HookEvent::Overlay(Overlay::Connecting),
            HookEvent::Loaded,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ui_revealed_once_bootstrap_complete() {
    let counter = LoadCounter::new(2);
    let hooks = RecordingHooks::hidden_until(counter.clone());
    let (handle, mut listener) = start_with(hooks.clone());
    let mut device = accept(&mut listener).await;

    let (first, _) = tokio::join!(handle.transmit(time_get(), Some(&counter)), async {
        expect_frame(&mut device).await;
        device.send(vec![2u8]).await.unwrap();
    });
    assert!(first.is_some());
    assert_eq!(hooks.count(&HookEvent::Revealed), 0);

    let (second, _) = tokio::join!(
        handle.transmit(Packet::new(Opcode::SCREEN_STATE_GET, "display"), Some(&counter)),
        async {
            expect_frame(&mut device).await;
            device.send(vec![10u8]).await.unwrap();
        }
    );
    assert!(second.is_some());
    assert_eq!(hooks.count(&HookEvent::Revealed), 1);

    // Already visible
    let (third, _) = tokio::join!(handle.transmit(time_get(), None), async {
        expect_frame(&mut device).await;
        device.send(vec![2u8]).await.unwrap();
    });
    assert!(third.is_some());
    assert_eq!(hooks.count(&HookEvent::Revealed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unload_fails_queue_and_restart_reconnects() {
    let (handle, mut listener, hooks) = start();
    let mut first = accept(&mut listener).await;

    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        expect_frame(&mut first).await;
        handle.unload().await;
    });
    assert!(reply.is_none());
    assert_eq!(first.recv().await, None);
    assert_eq!(hooks.count(&HookEvent::Unloaded), 1);

    // Torn down: nothing to send on
    assert!(handle.transmit(time_get(), None).await.is_none());
    assert!(timeout(Duration::from_secs(5), listener.accept()).await.is_err());

    handle.restart().await;
    let mut second = accept(&mut listener).await;
    let (reply, _) = tokio::join!(handle.transmit(time_get(), None), async {
        expect_frame(&mut second).await;
        second.send(vec![2u8]).await.unwrap();
    });
    assert!(reply.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_connector_failure_is_fatal() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let (connector, listener) = MemoryConnector::new(4);
    drop(listener);

    let hooks = RecordingHooks::default();
    let (handle, _task) = Session::spawn(config(), connector, hooks.clone());

    assert!(handle.transmit(time_get(), None).await.is_none());
    sleep(Duration::from_secs(10)).await;

    let events = hooks.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], HookEvent::Overlay(Overlay::Connecting));
    assert!(matches!(&events[1], HookEvent::Overlay(Overlay::Error(_))));
    assert_eq!(*handle.phase().borrow(), SessionPhase::Init);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_session() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let (connector, mut listener) = MemoryConnector::new(4);
    let (handle, task) = Session::spawn(config(), connector, RecordingHooks::default());
    let mut device = accept(&mut listener).await;

    handle.shutdown().await;
    task.await.unwrap();

    assert!(!handle.is_running());
    assert_eq!(device.recv().await, None);
    assert!(handle.transmit(time_get(), None).await.is_none());
}

/// Transport whose connection never opens
struct Stalled;

#[async_trait]
impl Transport for Stalled {
    type Error = std::io::Error;

    async fn run(
        self,
        _incoming_tx: mpsc::Sender<LinkEvent>,
        _outgoing_rx: mpsc::Receiver<Bytes>,
    ) -> Result<(), Self::Error> {
        std::future::pending().await
    }
}

struct StalledConnector {
    attempts: Arc<AtomicUsize>,
}

impl Connector for StalledConnector {
    type Transport = Stalled;
    type Error = std::io::Error;

    fn connect(&self) -> Result<Self::Transport, Self::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Stalled)
    }
}

#[tokio::test(start_paused = true)]
async fn test_half_open_socket_times_out() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let attempts = Arc::new(AtomicUsize::new(0));
    let connector = StalledConnector {
        attempts: attempts.clone(),
    };
    let hooks = RecordingHooks::default();
    let (handle, _task) = Session::spawn(config(), connector, hooks.clone());

    // Queued while connecting, failed by the restart
    assert!(handle.transmit(time_get(), None).await.is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    // 2 s connect timeout plus 500 ms backoff
    sleep(Duration::from_millis(600)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(hooks.count(&HookEvent::Loaded), 0);
}
