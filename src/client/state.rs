//! Display client states and events
//!
//! The remote display library reports connection lifecycle changes as an
//! integer enumeration. [`ClientState`] gives those integers names; the raw
//! value is preserved for states the controller treats as informational.

use std::fmt;

/// Connection states reported by the display client library.
///
/// The numbering matches the wire library's state callback values; the
/// controller only acts on `Connected` (3) and `Disconnected` (5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// No connection attempted yet
    Idle,
    /// Connection request in flight
    Connecting,
    /// Tunnel open, waiting for the first server instruction
    Waiting,
    /// Fully connected, display updates flowing
    Connected,
    /// Disconnect requested, not yet acknowledged
    Disconnecting,
    /// Connection closed (by either side)
    Disconnected,
}

impl ClientState {
    /// Decode a raw state integer from the client library.
    ///
    /// Returns `None` for values outside the known enumeration; callers
    /// log those and carry on.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Idle),
            1 => Some(Self::Connecting),
            2 => Some(Self::Waiting),
            3 => Some(Self::Connected),
            4 => Some(Self::Disconnecting),
            5 => Some(Self::Disconnected),
            _ => None,
        }
    }

    /// Raw integer value as reported by the client library
    pub fn as_raw(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Waiting => 2,
            Self::Connected => 3,
            Self::Disconnecting => 4,
            Self::Disconnected => 5,
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Waiting => "waiting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{} ({})", name, self.as_raw())
    }
}

/// Events delivered from the display client to the session controller.
///
/// Delivery order follows the order the underlying transport produced the
/// events; the controller never reorders them.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Lifecycle state change (raw value kept for unknown states)
    StateChange(u8),

    /// Asynchronous protocol error reported by the client
    Error(String),

    /// The remote display completed a frame. Carries the native (unscaled)
    /// dimensions known at flush time; zero until the first `size` arrives.
    Flush {
        /// Native display width in pixels
        width: u32,
        /// Native display height in pixels
        height: u32,
    },
}
