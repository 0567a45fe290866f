//! Session controller integration tests
//!
//! Drives the full controller event loop against a scripted display client
//! under paused tokio time, covering the reconnect budget, stale-timer
//! cancellation on manual reconnect, and display-size acquisition.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use testroom_client::client::{
    ClientEvent, DisplayClientFactory, RemoteDisplayClient,
};
use testroom_client::config::{ReconnectConfig, SessionConfig};
use testroom_client::display::{DisplayConfig, ScaledViewport};
use testroom_client::input::{InputConfig, InputEvent, InputPump, KeySample, PointerSample};
use testroom_client::session::{
    ControllerCommand, SessionController, SessionError, SessionState,
};
use testroom_client::surface::{
    SurfaceSink, MSG_CONNECTION_LOST, MSG_DISPLAY_SIZE_FAILED, MSG_RECONNECTING,
};

// "MTIzNDUtYWJj" decodes to "12345-abc"
const ENCODED_ID: &str = "MTIzNDUtYWJj";

struct FakeDisplayClient {
    connects: AtomicU32,
    disconnects: AtomicU32,
    pointer_sends: AtomicU32,
    key_sends: AtomicU32,
    last_pointer: Mutex<(i32, i32)>,
    native: Mutex<(u32, u32)>,
}

impl FakeDisplayClient {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            connects: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
            pointer_sends: AtomicU32::new(0),
            key_sends: AtomicU32::new(0),
            last_pointer: Mutex::new((0, 0)),
            native: Mutex::new((0, 0)),
        })
    }

    fn set_native(&self, width: u32, height: u32) {
        *self.native.lock() = (width, height);
    }
}

#[async_trait]
impl RemoteDisplayClient for FakeDisplayClient {
    async fn connect(&self, _connect_string: &str) -> Result<(), SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_pointer(&self, sample: &PointerSample) -> Result<(), SessionError> {
        self.pointer_sends.fetch_add(1, Ordering::SeqCst);
        *self.last_pointer.lock() = (sample.x, sample.y);
        Ok(())
    }

    async fn send_key(&self, _sample: &KeySample) -> Result<(), SessionError> {
        self.key_sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn native_size(&self) -> (u32, u32) {
        *self.native.lock()
    }
}

/// Hands out pre-built client/receiver pairs; the test keeps the senders.
struct ScriptedFactory {
    queue: Mutex<VecDeque<(Arc<FakeDisplayClient>, mpsc::Receiver<ClientEvent>)>>,
}

impl ScriptedFactory {
    fn new() -> (
        Arc<Self>,
        Vec<(Arc<FakeDisplayClient>, mpsc::Sender<ClientEvent>)>,
    ) {
        Self::with_clients(1)
    }

    fn with_clients(
        count: usize,
    ) -> (
        Arc<Self>,
        Vec<(Arc<FakeDisplayClient>, mpsc::Sender<ClientEvent>)>,
    ) {
        let mut queue = VecDeque::new();
        let mut handles = Vec::new();
        for _ in 0..count {
            let client = FakeDisplayClient::new();
            let (tx, rx) = mpsc::channel(16);
            queue.push_back((Arc::clone(&client), rx));
            handles.push((client, tx));
        }
        (
            Arc::new(Self {
                queue: Mutex::new(queue),
            }),
            handles,
        )
    }
}

impl DisplayClientFactory for ScriptedFactory {
    fn create(
        &self,
        _server_base_url: &Url,
    ) -> Result<(Arc<dyn RemoteDisplayClient>, mpsc::Receiver<ClientEvent>), SessionError> {
        let (client, rx) = self
            .queue
            .lock()
            .pop_front()
            .ok_or_else(|| SessionError::ConnectFailure("factory exhausted".into()))?;
        Ok((client as Arc<dyn RemoteDisplayClient>, rx))
    }
}

#[derive(Default)]
struct RecordingSurface {
    errors: Mutex<Vec<String>>,
    viewports: Mutex<Vec<ScaledViewport>>,
    resets: AtomicU32,
}

impl SurfaceSink for RecordingSurface {
    fn hide_loading(&self) {}

    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn clear_error(&self) {}

    fn reset_to_loading(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_viewport(&self, viewport: &ScaledViewport) {
        self.viewports.lock().push(*viewport);
    }
}

fn session_config() -> SessionConfig {
    SessionConfig {
        server_base_url: Url::parse("https://proctor.example.com/").unwrap(),
        auth_token: "tok-123".to_string(),
        encoded_identifier: ENCODED_ID.to_string(),
        duration_minutes: 60,
        instructions: None,
    }
}

fn build_controller(
    factory: Arc<ScriptedFactory>,
    surface: Arc<RecordingSurface>,
) -> SessionController {
    SessionController::new(
        session_config(),
        ReconnectConfig::default(),
        DisplayConfig::default(),
        factory,
        surface,
    )
}

/// Let the controller loop drain pending events and due timers. Paused
/// time auto-advances only while every task is idle, so this also fires
/// any armed deadline within `ms`.
async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_streak_yields_three_attempts_then_terminal_error() {
    let (factory, mut handles) = ScriptedFactory::new();
    let (client, events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();
    assert_eq!(client.connects.load(Ordering::SeqCst), 1);

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        let result = controller.run(commands_rx).await;
        (result, controller)
    });

    // connecting → disconnected ×4: three delayed reconnects, then terminal
    for _ in 0..4 {
        events_tx.send(ClientEvent::StateChange(5)).await.unwrap();
        settle(3100).await;
    }

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    let (result, controller) = task.await.unwrap();

    // initial connect + exactly three reconnect attempts
    assert_eq!(client.connects.load(Ordering::SeqCst), 4);
    assert_eq!(controller.state(), SessionState::Error);
    assert!(matches!(
        result,
        Err(SessionError::DisconnectExhausted { attempts: 3 })
    ));

    let errors = surface.errors.lock();
    assert_eq!(
        errors.iter().filter(|m| *m == MSG_RECONNECTING).count(),
        3
    );
    assert_eq!(errors.last().unwrap(), MSG_CONNECTION_LOST);
}

#[tokio::test(start_paused = true)]
async fn successful_connect_resets_the_streak() {
    let (factory, mut handles) = ScriptedFactory::new();
    let (client, events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        controller.run(commands_rx).await.unwrap();
        controller
    });

    // Two disconnect/reconnect rounds, then a successful connect
    for _ in 0..2 {
        events_tx.send(ClientEvent::StateChange(5)).await.unwrap();
        settle(3100).await;
    }
    events_tx.send(ClientEvent::StateChange(3)).await.unwrap();
    settle(10).await;

    // The streak is reset: three more disconnects all schedule reconnects
    for _ in 0..3 {
        events_tx.send(ClientEvent::StateChange(5)).await.unwrap();
        settle(3100).await;
    }

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    let controller = task.await.unwrap();

    assert_eq!(client.connects.load(Ordering::SeqCst), 6);
    assert_ne!(controller.state(), SessionState::Error);
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_discards_client_and_pending_timer() {
    let (factory, mut handles) = ScriptedFactory::with_clients(2);
    let (first_client, events_tx) = handles.remove(0);
    let (second_client, _second_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        controller.run(commands_rx).await.unwrap();
        controller
    });

    // Disconnect arms a 3 s reconnect deadline...
    events_tx.send(ClientEvent::StateChange(5)).await.unwrap();
    settle(10).await;

    // ...but a manual reconnect lands first and must cancel it
    commands_tx.send(ControllerCommand::Reconnect).await.unwrap();
    settle(10).await;
    settle(5000).await; // stale deadline would fire in this window

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    let controller = task.await.unwrap();

    // First client: initial connect only, then discarded
    assert_eq!(first_client.connects.load(Ordering::SeqCst), 1);
    assert_eq!(first_client.disconnects.load(Ordering::SeqCst), 1);
    // Second client: the manual reconnect, and nothing from the stale timer
    assert_eq!(second_client.connects.load(Ordering::SeqCst), 1);
    assert_eq!(surface.resets.load(Ordering::SeqCst), 1);
    assert_eq!(controller.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn flush_with_dimensions_applies_fit_scale() {
    let (factory, mut handles) = ScriptedFactory::new();
    let (client, events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();
    client.set_native(1920, 1080);

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        controller.run(commands_rx).await.unwrap();
        controller
    });

    events_tx.send(ClientEvent::StateChange(3)).await.unwrap();
    events_tx
        .send(ClientEvent::Flush {
            width: 1920,
            height: 1080,
        })
        .await
        .unwrap();
    settle(10).await;

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    task.await.unwrap();

    // Default container is 1280x720: 1920x1080 fits at exactly 2/3
    let viewports = surface.viewports.lock();
    let vp = viewports.first().expect("viewport applied");
    assert!((vp.scale - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!((vp.width, vp.height), (1280, 720));
}

#[tokio::test(start_paused = true)]
async fn size_poll_budget_exhaustion_surfaces_terminal_message() {
    let (factory, mut handles) = ScriptedFactory::new();
    // native size stays (0, 0): the display never becomes ready
    let (_client, events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move { controller.run(commands_rx).await });

    events_tx.send(ClientEvent::StateChange(3)).await.unwrap();
    // 20 polls at 500 ms
    settle(11_000).await;

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    let result = task.await.unwrap();

    assert!(surface.viewports.lock().is_empty());
    assert_eq!(
        surface.errors.lock().last().unwrap(),
        MSG_DISPLAY_SIZE_FAILED
    );
    assert!(matches!(
        result,
        Err(SessionError::DisplayNotReady { retries: 20 })
    ));
}

#[tokio::test(start_paused = true)]
async fn resize_recomputes_viewport_when_connected() {
    let (factory, mut handles) = ScriptedFactory::new();
    let (client, events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();
    client.set_native(1600, 900);

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        controller.run(commands_rx).await.unwrap();
        controller
    });

    events_tx.send(ClientEvent::StateChange(3)).await.unwrap();
    settle(600).await; // first size poll picks up the native size

    commands_tx
        .send(ControllerCommand::Resize {
            width: 3840,
            height: 2160,
        })
        .await
        .unwrap();
    settle(10).await;

    commands_tx.send(ControllerCommand::Shutdown).await.unwrap();
    task.await.unwrap();

    let viewports = surface.viewports.lock();
    assert!(viewports.len() >= 2);
    // Large container: never upscale past native resolution
    let last = viewports.last().unwrap();
    assert_eq!(last.scale, 1.0);
    assert_eq!((last.width, last.height), (1600, 900));
}

#[tokio::test(start_paused = true)]
async fn input_pump_flushes_through_the_client_handle() {
    let (factory, mut handles) = ScriptedFactory::new();
    let (client, _events_tx) = handles.remove(0);
    let surface = Arc::new(RecordingSurface::default());

    let mut controller = build_controller(factory, Arc::clone(&surface));
    controller.initialize().await.unwrap();

    let handle = controller.client_handle().expect("client constructed");
    let (input_tx, input_rx) = mpsc::channel(16);
    let pump = tokio::spawn(async move {
        InputPump::new(InputConfig::default()).run(handle, input_rx).await
    });

    let now = std::time::Instant::now();
    for (x, y) in [(10, 10), (20, 20), (30, 30)] {
        input_tx
            .send(InputEvent::Pointer(PointerSample {
                x,
                y,
                button_mask: 0,
                timestamp: now,
            }))
            .await
            .unwrap();
    }
    for pressed in [true, false] {
        input_tx
            .send(InputEvent::Key(KeySample {
                keysym: 0x61,
                pressed,
                timestamp: now,
            }))
            .await
            .unwrap();
    }

    // Past both flush windows
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(input_tx);
    pump.await.unwrap();

    // Pointer captures coalesce to the last state, keys replay one by one
    assert_eq!(client.pointer_sends.load(Ordering::SeqCst), 1);
    assert_eq!(*client.last_pointer.lock(), (30, 30));
    assert_eq!(client.key_sends.load(Ordering::SeqCst), 2);
}
