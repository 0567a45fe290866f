//! Input Event Batching
//!
//! Pointer and keyboard events are captured at a much higher rate than the
//! tunnel should carry. Samples are queued with their capture timestamps
//! and flushed in batches on short timers:
//!
//! - **Pointer**: coalesced; only the most recent state in a batch is sent,
//!   superseded samples are discarded.
//! - **Keyboard**: replayed in capture order, never coalesced, because
//!   down/up ordering is semantically significant.
//!
//! [`InputBatcher`] is the pure queue/flush core; [`InputPump`] drives it
//! against a [`RemoteDisplayClient`](crate::client::RemoteDisplayClient)
//! with the flush timers. The headless binary carries no capture device;
//! a hosting integration constructs the pump against
//! [`SessionController::client_handle`](crate::session::SessionController::client_handle)
//! and feeds it captured samples.

pub mod batch;

use std::time::Instant;

pub use batch::{InputBatcher, InputConfig, InputPump};

/// One pointer state capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    /// X coordinate in display space
    pub x: i32,
    /// Y coordinate in display space
    pub y: i32,
    /// Pressed-button bitmask (bit 0 = left, 1 = middle, 2 = right)
    pub button_mask: u8,
    /// Capture timestamp
    pub timestamp: Instant,
}

/// One key transition capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySample {
    /// X11 keysym of the key
    pub keysym: u32,
    /// true = key down, false = key up
    pub pressed: bool,
    /// Capture timestamp
    pub timestamp: Instant,
}

/// Tagged union of capturable input events
#[derive(Debug, Clone, Copy)]
pub enum InputEvent {
    /// Pointer movement or button change
    Pointer(PointerSample),
    /// Key down/up
    Key(KeySample),
}
