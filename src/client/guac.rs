//! Tunnel-backed display client
//!
//! [`GuacClient`] implements [`RemoteDisplayClient`] over the HTTP tunnel.
//! Protocol internals stay opaque: the read pump forwards lifecycle signals
//! to the controller and tracks only the `size`/`sync` instructions needed
//! for viewport scaling. Everything else passes through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use crate::client::state::{ClientEvent, ClientState};
use crate::client::tunnel::HttpTunnel;
use crate::client::RemoteDisplayClient;
use crate::input::{KeySample, PointerSample};
use crate::session::error::SessionError;

/// Encode one instruction frame: `len.value,...;` with element lengths in
/// characters.
pub(crate) fn format_instruction(opcode: &str, args: &[&str]) -> String {
    let mut out = String::new();
    for (i, element) in std::iter::once(opcode).chain(args.iter().copied()).enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&element.chars().count().to_string());
        out.push('.');
        out.push_str(element);
    }
    out.push(';');
    out
}

/// Decode instruction frames from a tunnel read.
///
/// Malformed trailing data is dropped with a warning rather than aborting
/// the read pump; the gateway occasionally truncates the final frame of a
/// long-poll response.
pub(crate) fn parse_instructions(payload: &str) -> Vec<(String, Vec<String>)> {
    let mut instructions = Vec::new();
    let chars: Vec<char> = payload.chars().collect();
    let mut pos = 0;
    let mut elements: Vec<String> = Vec::new();

    while pos < chars.len() {
        // length prefix
        let start = pos;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
        if start == pos || pos >= chars.len() || chars[pos] != '.' {
            warn!("Dropping malformed instruction data at offset {}", start);
            break;
        }
        let len: usize = chars[start..pos].iter().collect::<String>().parse().unwrap_or(0);
        pos += 1; // '.'

        if pos + len > chars.len() {
            warn!("Dropping truncated instruction element at offset {}", pos);
            break;
        }
        elements.push(chars[pos..pos + len].iter().collect());
        pos += len;

        match chars.get(pos) {
            Some(',') => pos += 1,
            Some(';') => {
                pos += 1;
                let mut iter = elements.drain(..);
                if let Some(opcode) = iter.next() {
                    let args: Vec<String> = iter.collect();
                    instructions.push((opcode, args));
                }
            }
            _ => {
                warn!("Dropping unterminated instruction at offset {}", pos);
                break;
            }
        }
    }

    instructions
}

/// Display client backed by [`HttpTunnel`].
///
/// One instance per tunnel/client pair; the controller constructs a fresh
/// pair on manual reconnect and reuses the same instance across the
/// automatic reconnect budget. The read pump owns the sequenced read half
/// of the tunnel, so outbound input frames go straight out while a long
/// poll is parked.
pub struct GuacClient {
    tunnel: HttpTunnel,
    events_tx: mpsc::Sender<ClientEvent>,
    native_size: Arc<parking_lot::Mutex<(u32, u32)>>,
    read_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl GuacClient {
    /// Construct a tunnel/client pair against the gateway.
    ///
    /// Returns the client plus the event receiver the session controller
    /// consumes. Channel capacity bounds how far the read pump can run
    /// ahead of the controller.
    pub fn new(
        server_base_url: &Url,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ClientEvent>), SessionError> {
        let tunnel = HttpTunnel::new(server_base_url)?;
        let (events_tx, events_rx) = mpsc::channel(64);

        let client = Arc::new(Self {
            tunnel,
            events_tx,
            native_size: Arc::new(parking_lot::Mutex::new((0, 0))),
            read_task: parking_lot::Mutex::new(None),
        });

        Ok((client, events_rx))
    }

    fn spawn_read_pump(&self) {
        let mut reader = self.tunnel.reader();
        let events = self.events_tx.clone();
        let native_size = Arc::clone(&self.native_size);

        let handle = tokio::spawn(async move {
            loop {
                match reader.next().await {
                    Ok(Some(payload)) => {
                        let text = String::from_utf8_lossy(&payload);
                        for (opcode, args) in parse_instructions(&text) {
                            match opcode.as_str() {
                                // `size` on the default layer reports native dimensions
                                "size" if args.len() >= 3 && args[0] == "0" => {
                                    let w = args[1].parse().unwrap_or(0);
                                    let h = args[2].parse().unwrap_or(0);
                                    *native_size.lock() = (w, h);
                                    debug!("Remote display size: {}x{}", w, h);
                                }
                                // `sync` marks a completed frame
                                "sync" => {
                                    let (w, h) = *native_size.lock();
                                    if events
                                        .send(ClientEvent::Flush { width: w, height: h })
                                        .await
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                                other => trace!("Instruction passthrough: {}", other),
                            }
                        }
                    }
                    Ok(None) => {
                        let _ = events
                            .send(ClientEvent::StateChange(ClientState::Disconnected.as_raw()))
                            .await;
                        return;
                    }
                    Err(e) => {
                        let _ = events.send(ClientEvent::Error(e.to_string())).await;
                        let _ = events
                            .send(ClientEvent::StateChange(ClientState::Disconnected.as_raw()))
                            .await;
                        return;
                    }
                }
            }
        });

        if let Some(stale) = self.read_task.lock().replace(handle) {
            stale.abort();
        }
    }

    async fn emit_state(&self, state: ClientState) {
        let _ = self
            .events_tx
            .send(ClientEvent::StateChange(state.as_raw()))
            .await;
    }
}

#[async_trait]
impl RemoteDisplayClient for GuacClient {
    async fn connect(&self, connect_string: &str) -> Result<(), SessionError> {
        self.emit_state(ClientState::Connecting).await;

        self.tunnel.connect(connect_string).await?;
        self.spawn_read_pump();
        self.emit_state(ClientState::Connected).await;
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(task) = self.read_task.lock().take() {
            task.abort();
        }

        if self.tunnel.is_open() {
            // Best-effort notification; the server reaps dead tunnels anyway
            if let Err(e) = self
                .tunnel
                .write(&format_instruction("disconnect", &[]))
                .await
            {
                debug!("Disconnect notification failed: {}", e);
            }
            self.tunnel.close();
        }
    }

    async fn send_pointer(&self, sample: &PointerSample) -> Result<(), SessionError> {
        let x = sample.x.to_string();
        let y = sample.y.to_string();
        let mask = sample.button_mask.to_string();
        let frame = format_instruction("mouse", &[&x, &y, &mask]);
        self.tunnel.write(&frame).await
    }

    async fn send_key(&self, sample: &KeySample) -> Result<(), SessionError> {
        let keysym = sample.keysym.to_string();
        let pressed = if sample.pressed { "1" } else { "0" };
        let frame = format_instruction("key", &[&keysym, pressed]);
        self.tunnel.write(&frame).await
    }

    fn native_size(&self) -> (u32, u32) {
        *self.native_size.lock()
    }
}
