//! Session Controller
//!
//! Owns one remote-display connection bound to a presentation surface:
//! identifier extraction, connect, the reconnect budget, viewport scaling,
//! and teardown. All mutation happens on the controller's event loop;
//! timers are deadlines the loop selects over, so there is structurally at
//! most one outstanding reconnect timer per session.
//!
//! # State machine
//!
//! ```text
//! Idle ──initialize──> Connecting ──┬──> Connected ──> Disconnected
//!                                   └──> Error                │
//!          ┌───────────────────────────────────────────────────┤
//!          │ attempts < max: delay, reconnect ──> Connecting    │
//!          │ attempts = max: ──> Error (terminal)               │
//!          └────────────────────────────────────────────────────┘
//! ```
//!
//! `Error` is terminal pending a manual reconnect command, which discards
//! the client/tunnel pair and any pending reconnect deadline, resets the
//! surface to its loading placeholder, and re-runs initialization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, error, info, warn};

use crate::client::{ClientEvent, ClientState, DisplayClientFactory, RemoteDisplayClient};
use crate::config::{ReconnectConfig, SessionConfig};
use crate::display::{scaled_viewport, DisplayConfig};
use crate::session::error::SessionError;
use crate::session::identifier::extract_id;
use crate::surface::{
    SurfaceSink, MSG_CONNECTION_LOST, MSG_CONNECT_FAILED, MSG_DISPLAY_SIZE_FAILED,
    MSG_INVALID_IDENTIFIER, MSG_RECONNECTING,
};

/// Characters percent-encoded inside the connect-string token value
const TOKEN_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, no connect attempted
    Idle,
    /// Connect request issued, outcome pending
    Connecting,
    /// Display updates flowing
    Connected,
    /// Connection dropped, reconnect pending or budget exhausted
    Disconnected,
    /// Terminal until a manual reconnect
    Error,
}

/// Commands accepted by the running controller
#[derive(Debug, Clone)]
pub enum ControllerCommand {
    /// Discard the live client and rebuild the session from scratch
    Reconnect,
    /// Container dimensions changed; recompute the viewport
    Resize {
        /// New container width in pixels
        width: u32,
        /// New container height in pixels
        height: u32,
    },
    /// Disconnect and stop the event loop
    Shutdown,
}

enum Wake {
    Command(Option<ControllerCommand>),
    Client(Option<ClientEvent>),
    ReconnectDue,
    SizePollDue,
}

/// Manages the lifecycle of one remote-display connection.
pub struct SessionController {
    session: SessionConfig,
    reconnect: ReconnectConfig,
    display: DisplayConfig,
    factory: Arc<dyn DisplayClientFactory>,
    surface: Arc<dyn SurfaceSink>,

    state: SessionState,
    connection_id: Option<String>,
    client: Option<Arc<dyn RemoteDisplayClient>>,
    events: Option<mpsc::Receiver<ClientEvent>>,

    reconnect_attempts: u32,
    reconnect_at: Option<TokioInstant>,

    size_polls: u32,
    size_poll_at: Option<TokioInstant>,

    connect_started: Option<Instant>,
    terminal_error: Option<SessionError>,
}

impl SessionController {
    /// Create a controller. No connection is attempted until
    /// [`initialize`](Self::initialize).
    pub fn new(
        session: SessionConfig,
        reconnect: ReconnectConfig,
        display: DisplayConfig,
        factory: Arc<dyn DisplayClientFactory>,
        surface: Arc<dyn SurfaceSink>,
    ) -> Self {
        Self {
            session,
            reconnect,
            display,
            factory,
            surface,
            state: SessionState::Idle,
            connection_id: None,
            client: None,
            events: None,
            reconnect_attempts: 0,
            reconnect_at: None,
            size_polls: 0,
            size_poll_at: None,
            connect_started: None,
            terminal_error: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reconnect attempts in the current disconnect streak
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Handle to the live display client, if one is constructed.
    ///
    /// Hosting integrations wire input capture through this: construct an
    /// [`InputPump`](crate::input::InputPump) against the handle and feed
    /// it captured samples. A manual reconnect replaces the client, so the
    /// handle should be re-fetched afterwards.
    pub fn client_handle(&self) -> Option<Arc<dyn RemoteDisplayClient>> {
        self.client.clone()
    }

    /// Decode the identifier, build the tunnel/client pair, and issue the
    /// connect request.
    ///
    /// On [`SessionError::InvalidIdentifier`] no connect is attempted; the
    /// error is surfaced and the controller lands in the terminal `Error`
    /// state. Connect failures are surfaced the same way. Both are also
    /// returned so the caller can decide whether to keep the loop alive
    /// for a manual reconnect.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        let connection_id = match extract_id(&self.session.encoded_identifier) {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to decode connection identifier: {}", e);
                self.surface.show_error(MSG_INVALID_IDENTIFIER);
                self.state = SessionState::Error;
                return Err(e);
            }
        };
        debug!("Connection identifier: {}", connection_id);
        self.connection_id = Some(connection_id);

        let (client, events) = match self.factory.create(&self.session.server_base_url) {
            Ok(pair) => pair,
            Err(e) => {
                error!("Client construction failed: {}", e);
                self.surface.show_error(MSG_CONNECT_FAILED);
                self.state = SessionState::Error;
                return Err(e);
            }
        };
        self.client = Some(client);
        self.events = Some(events);

        self.connect().await
    }

    /// Run the controller until shutdown.
    ///
    /// `commands` carries manual reconnect, resize, and shutdown requests;
    /// closing it is equivalent to [`ControllerCommand::Shutdown`].
    ///
    /// A clean shutdown returns `Ok`. If the session ended in a terminal
    /// failure that no manual reconnect recovered, that failure is
    /// returned: [`SessionError::DisconnectExhausted`] after an unbroken
    /// disconnect streak, [`SessionError::DisplayNotReady`] when the
    /// display never reported a usable size.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<ControllerCommand>,
    ) -> Result<(), SessionError> {
        loop {
            let mut events = self.events.take();

            let far = TokioInstant::now() + Duration::from_secs(3600);
            let reconnect_sleep = tokio::time::sleep_until(self.reconnect_at.unwrap_or(far));
            let size_sleep = tokio::time::sleep_until(self.size_poll_at.unwrap_or(far));
            tokio::pin!(reconnect_sleep, size_sleep);

            let event_fut = async {
                match events.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            };

            let wake = tokio::select! {
                command = commands.recv() => Wake::Command(command),
                event = event_fut => Wake::Client(event),
                _ = &mut reconnect_sleep, if self.reconnect_at.is_some() => Wake::ReconnectDue,
                _ = &mut size_sleep, if self.size_poll_at.is_some() => Wake::SizePollDue,
            };
            self.events = events;

            match wake {
                Wake::Command(None) | Wake::Command(Some(ControllerCommand::Shutdown)) => {
                    self.teardown().await;
                    return match self.terminal_error.take() {
                        Some(e) => Err(e),
                        None => Ok(()),
                    };
                }
                Wake::Command(Some(ControllerCommand::Reconnect)) => {
                    self.manual_reconnect().await;
                }
                Wake::Command(Some(ControllerCommand::Resize { width, height })) => {
                    self.display.container_width = width;
                    self.display.container_height = height;
                    if self.state == SessionState::Connected {
                        if let Some(native) =
                            self.client.as_ref().map(|c| c.native_size())
                        {
                            self.apply_scale(native);
                        }
                    }
                }
                Wake::Client(Some(event)) => self.handle_client_event(event).await,
                Wake::Client(None) => {
                    // Client dropped its event channel; treat as a disconnect
                    self.events = None;
                    if matches!(
                        self.state,
                        SessionState::Connecting | SessionState::Connected
                    ) {
                        self.handle_disconnected().await;
                    }
                }
                Wake::ReconnectDue => {
                    self.reconnect_at = None;
                    self.attempt_reconnect().await;
                }
                Wake::SizePollDue => {
                    self.size_poll_at = None;
                    self.poll_display_size();
                }
            }
        }
    }

    /// Process one asynchronous client event.
    ///
    /// Exposed at crate level so deterministic tests can drive the FSM
    /// without the event loop.
    pub async fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::StateChange(raw) => match ClientState::from_raw(raw) {
                Some(ClientState::Connected) => self.handle_connected(),
                Some(ClientState::Disconnected) => self.handle_disconnected().await,
                Some(state) => debug!("Client state: {}", state),
                None => debug!("Unknown client state: {}", raw),
            },
            ClientEvent::Error(message) => {
                error!("Display client error: {}", message);
                self.surface.show_error(MSG_CONNECT_FAILED);
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Error;
                }
            }
            ClientEvent::Flush { width, height } => {
                if self.state == SessionState::Connected && width > 0 && height > 0 {
                    self.apply_scale((width, height));
                }
            }
        }
    }

    fn handle_connected(&mut self) {
        if let Some(started) = self.connect_started.take() {
            info!("Connected in {}ms", started.elapsed().as_millis());
        } else {
            info!("Connected");
        }

        self.surface.hide_loading();
        self.surface.clear_error();
        self.reconnect_attempts = 0;
        self.reconnect_at = None;
        self.terminal_error = None;
        self.state = SessionState::Connected;

        // The display reports zero size until the first frame; poll on a
        // bounded budget. A flush event with positive dimensions short-cuts
        // the wait.
        self.size_polls = 0;
        self.size_poll_at =
            Some(TokioInstant::now() + Duration::from_millis(self.display.size_retry_interval_ms));
    }

    async fn handle_disconnected(&mut self) {
        self.size_poll_at = None;

        if self.state == SessionState::Error {
            debug!("Disconnect in terminal error state ignored");
            return;
        }

        if self.reconnect_attempts < self.reconnect.max_attempts {
            self.reconnect_attempts += 1;
            warn!(
                "Disconnected. Attempting reconnect ({}/{})...",
                self.reconnect_attempts, self.reconnect.max_attempts
            );
            self.surface.show_error(MSG_RECONNECTING);
            self.state = SessionState::Disconnected;
            // Overwriting any armed deadline keeps a single outstanding timer
            self.reconnect_at =
                Some(TokioInstant::now() + Duration::from_millis(self.reconnect.delay_ms));
        } else {
            warn!(
                "Disconnected with reconnect budget exhausted ({} attempts)",
                self.reconnect_attempts
            );
            self.surface.show_error(MSG_CONNECTION_LOST);
            self.reconnect_at = None;
            self.terminal_error = Some(SessionError::DisconnectExhausted {
                attempts: self.reconnect_attempts,
            });
            self.state = SessionState::Error;
        }
    }

    async fn attempt_reconnect(&mut self) {
        info!(
            "Reconnect attempt {}/{}",
            self.reconnect_attempts, self.reconnect.max_attempts
        );
        if let Err(e) = self.connect().await {
            debug!("Reconnect attempt failed: {}", e);
        }
    }

    /// Issue a connect request on the current client.
    async fn connect(&mut self) -> Result<(), SessionError> {
        let Some(client) = self.client.clone() else {
            return Err(SessionError::ConnectFailure("no client constructed".into()));
        };
        let connect_string = self.connect_string()?;

        self.state = SessionState::Connecting;
        self.connect_started = Some(Instant::now());

        match client.connect(&connect_string).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Connection failed: {}", e);
                self.surface.show_error(MSG_CONNECT_FAILED);
                self.state = SessionState::Error;
                Err(e)
            }
        }
    }

    /// Discard the live client and rebuild the session.
    async fn manual_reconnect(&mut self) {
        info!("Manual reconnect requested");

        // A stale timer here would race the fresh client into a duplicate
        // connection.
        self.reconnect_at = None;
        self.size_poll_at = None;
        self.reconnect_attempts = 0;
        self.terminal_error = None;

        if let Some(client) = self.client.take() {
            client.disconnect().await;
        }
        self.events = None;

        self.surface.reset_to_loading();

        match self.factory.create(&self.session.server_base_url) {
            Ok((client, events)) => {
                self.client = Some(client);
                self.events = Some(events);
                let _ = self.connect().await;
            }
            Err(e) => {
                error!("Client reconstruction failed: {}", e);
                self.surface.show_error(MSG_CONNECT_FAILED);
                self.state = SessionState::Error;
            }
        }
    }

    async fn teardown(&mut self) {
        info!("Session teardown");
        self.reconnect_at = None;
        self.size_poll_at = None;
        if let Some(client) = self.client.take() {
            client.disconnect().await;
        }
        self.events = None;
    }

    fn poll_display_size(&mut self) {
        let native = self
            .client
            .as_ref()
            .map(|c| c.native_size())
            .unwrap_or((0, 0));

        if self.apply_scale(native) {
            return;
        }

        self.size_polls += 1;
        if self.size_polls >= self.display.size_retry_max {
            warn!(
                "Display size not ready after {} polls, giving up",
                self.size_polls
            );
            self.surface.show_error(MSG_DISPLAY_SIZE_FAILED);
            self.terminal_error = Some(SessionError::DisplayNotReady {
                retries: self.size_polls,
            });
        } else {
            debug!(
                "Display size not ready (native {}x{}), retry {}/{}",
                native.0, native.1, self.size_polls, self.display.size_retry_max
            );
            self.size_poll_at = Some(
                TokioInstant::now() + Duration::from_millis(self.display.size_retry_interval_ms),
            );
        }
    }

    /// Apply the fit-to-container scale. Returns false while either
    /// dimension is not yet positive.
    fn apply_scale(&mut self, native: (u32, u32)) -> bool {
        let container = (self.display.container_width, self.display.container_height);
        match scaled_viewport(native, container) {
            Some(viewport) => {
                self.surface.apply_viewport(&viewport);
                self.size_poll_at = None;
                // A late size report recovers a size-poll failure
                if matches!(
                    self.terminal_error,
                    Some(SessionError::DisplayNotReady { .. })
                ) {
                    self.terminal_error = None;
                }
                true
            }
            None => false,
        }
    }

    /// Build the connect request string from the extracted identifier and
    /// the auth token.
    fn connect_string(&self) -> Result<String, SessionError> {
        let id = self
            .connection_id
            .as_ref()
            .ok_or_else(|| SessionError::ConnectFailure("identifier not extracted".into()))?;
        let token = utf8_percent_encode(&self.session.auth_token, TOKEN_ENCODE);
        Ok(format!(
            "GUAC_ID={id}&GUAC_TYPE=c&GUAC_DATA_SOURCE=postgresql&token={token}"
        ))
    }
}
