//! Display Client Seam
//!
//! The remote-display protocol is implemented by an external library; this
//! crate configures and calls it. [`RemoteDisplayClient`] is that boundary:
//! the session controller talks only to the trait, and the tunnel-backed
//! [`GuacClient`] is one implementation of it. Tests substitute their own.
//!
//! # Architecture
//!
//! ```text
//! SessionController
//!       │  connect / disconnect / send_*
//!       ▼
//! RemoteDisplayClient (trait)          ClientEvent channel
//!       │                                     ▲
//!       ▼                                     │ state / error / flush
//! GuacClient ──────> HttpTunnel ──────> read pump
//! ```

pub mod guac;
pub mod state;
pub mod tunnel;

use async_trait::async_trait;

use crate::input::{KeySample, PointerSample};
use crate::session::error::SessionError;

pub use guac::GuacClient;
pub use state::{ClientEvent, ClientState};
pub use tunnel::HttpTunnel;

/// The external display-client boundary.
///
/// Lifecycle outcomes arrive asynchronously on the [`ClientEvent`] channel
/// handed out at construction; methods here cover only the calls the
/// session controller issues.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteDisplayClient: Send + Sync {
    /// Issue a connect request with the prepared connect string.
    ///
    /// Synchronous construction/argument failures return
    /// [`SessionError::ConnectFailure`]; asynchronous protocol failures
    /// arrive later as [`ClientEvent::Error`].
    async fn connect(&self, connect_string: &str) -> Result<(), SessionError>;

    /// Disconnect and release the tunnel. Idempotent.
    async fn disconnect(&self);

    /// Send one coalesced pointer state.
    async fn send_pointer(&self, sample: &PointerSample) -> Result<(), SessionError>;

    /// Send one key transition.
    async fn send_key(&self, sample: &KeySample) -> Result<(), SessionError>;

    /// Native (unscaled) display dimensions; (0, 0) before the first frame.
    fn native_size(&self) -> (u32, u32);
}

/// Constructs tunnel/client pairs.
///
/// The controller builds one pair at initialization and a fresh pair on
/// each manual reconnect, discarding the previous client and its event
/// channel.
pub trait DisplayClientFactory: Send + Sync {
    /// Build a client against the gateway plus its event receiver.
    fn create(
        &self,
        server_base_url: &url::Url,
    ) -> Result<
        (
            std::sync::Arc<dyn RemoteDisplayClient>,
            tokio::sync::mpsc::Receiver<ClientEvent>,
        ),
        SessionError,
    >;
}

/// Factory producing tunnel-backed [`GuacClient`] instances
#[derive(Debug, Default)]
pub struct GuacClientFactory;

impl DisplayClientFactory for GuacClientFactory {
    fn create(
        &self,
        server_base_url: &url::Url,
    ) -> Result<
        (
            std::sync::Arc<dyn RemoteDisplayClient>,
            tokio::sync::mpsc::Receiver<ClientEvent>,
        ),
        SessionError,
    > {
        let (client, events) = GuacClient::new(server_base_url)?;
        Ok((client, events))
    }
}
