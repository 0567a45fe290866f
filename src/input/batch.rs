//! Batching queue and flush pump
//!
//! The queue core is synchronous and fully deterministic; the pump wraps it
//! with the two flush timers and the outbound client calls.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, warn};

use crate::client::RemoteDisplayClient;
use crate::input::{InputEvent, KeySample, PointerSample};

/// Flush timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Pointer coalescing window in milliseconds
    #[serde(default = "default_pointer_flush_ms")]
    pub pointer_flush_ms: u64,

    /// Keyboard replay window in milliseconds
    #[serde(default = "default_key_flush_ms")]
    pub key_flush_ms: u64,
}

fn default_pointer_flush_ms() -> u64 {
    30
}
fn default_key_flush_ms() -> u64 {
    10
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pointer_flush_ms: default_pointer_flush_ms(),
            key_flush_ms: default_key_flush_ms(),
        }
    }
}

/// Ordered queues for captured input, one flush discipline per kind.
#[derive(Debug, Default)]
pub struct InputBatcher {
    pointers: Vec<PointerSample>,
    keys: Vec<KeySample>,
}

impl InputBatcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one captured event
    pub fn push(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pointer(sample) => self.pointers.push(sample),
            InputEvent::Key(sample) => self.keys.push(sample),
        }
    }

    /// Pointer samples currently queued
    pub fn pending_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Key samples currently queued
    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }

    /// Drain the pointer queue, returning only the most recent state.
    ///
    /// Superseded samples are discarded; that is the point of coalescing.
    pub fn flush_pointer(&mut self) -> Option<PointerSample> {
        let latest = self.pointers.last().copied();
        self.pointers.clear();
        latest
    }

    /// Drain the key queue in capture order. No coalescing.
    pub fn flush_keys(&mut self) -> Vec<KeySample> {
        std::mem::take(&mut self.keys)
    }
}

/// Drives an [`InputBatcher`] against the display client.
///
/// One timer per queue, armed when the first event of that kind arrives
/// and cleared by the flush, matching the capture-side behavior the
/// batching replaces.
pub struct InputPump {
    config: InputConfig,
}

impl InputPump {
    /// Create a pump with the given flush windows
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }

    /// Consume captured events until the channel closes, flushing batches
    /// to `client`. A final flush runs on shutdown so captured input is
    /// never silently dropped.
    pub async fn run(
        &self,
        client: Arc<dyn RemoteDisplayClient>,
        mut events: mpsc::Receiver<InputEvent>,
    ) {
        let mut batcher = InputBatcher::new();
        let pointer_window = Duration::from_millis(self.config.pointer_flush_ms);
        let key_window = Duration::from_millis(self.config.key_flush_ms);

        let mut pointer_deadline: Option<TokioInstant> = None;
        let mut key_deadline: Option<TokioInstant> = None;

        loop {
            let far = TokioInstant::now() + Duration::from_secs(3600);
            let pointer_sleep = tokio::time::sleep_until(pointer_deadline.unwrap_or(far));
            let key_sleep = tokio::time::sleep_until(key_deadline.unwrap_or(far));
            tokio::pin!(pointer_sleep, key_sleep);

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        match event {
                            InputEvent::Pointer(_) if pointer_deadline.is_none() => {
                                pointer_deadline = Some(TokioInstant::now() + pointer_window);
                            }
                            InputEvent::Key(_) if key_deadline.is_none() => {
                                key_deadline = Some(TokioInstant::now() + key_window);
                            }
                            _ => {}
                        }
                        batcher.push(event);
                    }
                    None => {
                        Self::flush_pointer(&client, &mut batcher).await;
                        Self::flush_keys(&client, &mut batcher).await;
                        return;
                    }
                },
                _ = &mut pointer_sleep, if pointer_deadline.is_some() => {
                    pointer_deadline = None;
                    Self::flush_pointer(&client, &mut batcher).await;
                }
                _ = &mut key_sleep, if key_deadline.is_some() => {
                    key_deadline = None;
                    Self::flush_keys(&client, &mut batcher).await;
                }
            }
        }
    }

    async fn flush_pointer(client: &Arc<dyn RemoteDisplayClient>, batcher: &mut InputBatcher) {
        let discarded = batcher.pending_pointers().saturating_sub(1);
        if let Some(sample) = batcher.flush_pointer() {
            match client.send_pointer(&sample).await {
                Ok(()) => debug!(
                    "Pointer state sent, latency: {}ms, coalesced: {}",
                    sample.timestamp.elapsed().as_millis(),
                    discarded
                ),
                Err(e) => warn!("Pointer send failed: {}", e),
            }
        }
    }

    async fn flush_keys(client: &Arc<dyn RemoteDisplayClient>, batcher: &mut InputBatcher) {
        for sample in batcher.flush_keys() {
            match client.send_key(&sample).await {
                Ok(()) => debug!(
                    "Key event sent, latency: {}ms",
                    sample.timestamp.elapsed().as_millis()
                ),
                Err(e) => warn!("Key send failed: {}", e),
            }
        }
    }
}
