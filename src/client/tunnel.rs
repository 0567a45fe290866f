//! HTTP tunnel transport
//!
//! Thin transport against the `{server}/guacamole/tunnel` endpoint. The
//! tunnel carries the remote-display protocol as opaque instruction frames;
//! this module implements only the handshake and the read/write plumbing
//! the client needs, not the protocol itself.
//!
//! Reads and writes are independent HTTP requests. The only state they
//! share is the tunnel identifier, so [`HttpTunnel`] is cheaply cloneable
//! and a write never waits on a pending long poll; the read sequence
//! counter lives in the pump-owned [`TunnelReader`].
//!
//! The endpoint contract:
//!
//! - `POST {base}/guacamole/tunnel?connect` with the connect string as body
//!   returns the tunnel identifier.
//! - `GET {base}/guacamole/tunnel?read:{id}:{seq}` long-polls the next
//!   batch of instruction frames (empty body on tunnel close).
//! - `POST {base}/guacamole/tunnel?write:{id}` submits outbound frames.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};
use url::Url;

use crate::session::error::SessionError;

/// HTTP tunnel to the remote-display gateway.
///
/// Clones share the tunnel identifier. A fresh `connect` replaces it, so
/// the same tunnel value can back repeated connect attempts against the
/// same gateway.
#[derive(Clone)]
pub struct HttpTunnel {
    http: reqwest::Client,
    endpoint: Url,
    tunnel_id: Arc<parking_lot::Mutex<Option<String>>>,
}

impl HttpTunnel {
    /// Create a tunnel against `{server_base_url}/guacamole/tunnel`.
    pub fn new(server_base_url: &Url) -> Result<Self, SessionError> {
        let endpoint = server_base_url
            .join("guacamole/tunnel")
            .map_err(|e| SessionError::ConnectFailure(format!("invalid server URL: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            tunnel_id: Arc::new(parking_lot::Mutex::new(None)),
        })
    }

    /// Open the tunnel with the given connect string.
    ///
    /// Construction/argument errors from the gateway (non-2xx responses)
    /// surface as [`SessionError::ConnectFailure`].
    pub async fn connect(&self, connect_string: &str) -> Result<(), SessionError> {
        let mut url = self.endpoint.clone();
        url.set_query(Some("connect"));

        let response = self
            .http
            .post(url)
            .body(connect_string.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::ConnectFailure(format!(
                "tunnel connect rejected: HTTP {}",
                response.status()
            )));
        }

        let tunnel_id = response.text().await?.trim().to_string();
        if tunnel_id.is_empty() {
            return Err(SessionError::ConnectFailure(
                "tunnel connect returned no identifier".into(),
            ));
        }

        debug!("Tunnel open: id={}", tunnel_id);
        *self.tunnel_id.lock() = Some(tunnel_id);
        Ok(())
    }

    /// Read half for the pump. Sequence numbering starts at zero, matching
    /// a fresh connect.
    pub fn reader(&self) -> TunnelReader {
        TunnelReader {
            tunnel: self.clone(),
            seq: 0,
        }
    }

    /// Write outbound instruction frames.
    pub async fn write(&self, payload: &str) -> Result<(), SessionError> {
        let tunnel_id = self.current_id()?;

        let mut url = self.endpoint.clone();
        url.set_query(Some(&format!("write:{}", tunnel_id)));

        let response = self.http.post(url).body(payload.to_string()).send().await?;
        if !response.status().is_success() {
            return Err(SessionError::ProtocolError(format!(
                "tunnel write failed: HTTP {}",
                response.status()
            )));
        }

        trace!("Tunnel write: {} bytes", payload.len());
        Ok(())
    }

    /// Drop the tunnel identifier, invalidating further reads/writes.
    pub fn close(&self) {
        *self.tunnel_id.lock() = None;
    }

    /// Whether a tunnel identifier is currently held
    pub fn is_open(&self) -> bool {
        self.tunnel_id.lock().is_some()
    }

    fn current_id(&self) -> Result<String, SessionError> {
        self.tunnel_id
            .lock()
            .clone()
            .ok_or_else(|| SessionError::ProtocolError("tunnel not connected".into()))
    }
}

/// Sequenced read half of the tunnel, owned by the read pump.
pub struct TunnelReader {
    tunnel: HttpTunnel,
    seq: u64,
}

impl TunnelReader {
    /// Read the next batch of instruction frames.
    ///
    /// Returns `None` when the tunnel has closed (empty response body).
    pub async fn next(&mut self) -> Result<Option<Bytes>, SessionError> {
        let tunnel_id = self.tunnel.current_id()?;

        let mut url = self.tunnel.endpoint.clone();
        url.set_query(Some(&format!("read:{}:{}", tunnel_id, self.seq)));
        self.seq += 1;

        let response = self.tunnel.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SessionError::ProtocolError(format!(
                "tunnel read failed: HTTP {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            debug!("Tunnel closed by server");
            return Ok(None);
        }

        trace!("Tunnel read: {} bytes", body.len());
        Ok(Some(body))
    }
}
