//! # testroom-client
//!
//! Client-side session controller for the remote testroom display used by
//! a proctored-testing platform. The remote-display protocol itself lives
//! in an external library surface; this crate configures and drives it:
//!
//! # Architecture
//!
//! ```text
//! testroom-client
//!   ├─> Session Controller (connect / reconnect budget / teardown)
//!   ├─> Display Client seam (tunnel/client pair, event channel)
//!   ├─> Input Batcher (pointer coalescing, ordered key replay)
//!   ├─> Viewport Scaling (fit-to-container, never upscale)
//!   ├─> Countdown Timer (MM:SS, one-shot submit/redirect)
//!   └─> Dashboard Lookup (dependent drop-down data)
//! ```
//!
//! # Data Flow
//!
//! **Display path:** gateway tunnel → client read pump → `ClientEvent`
//! channel → Session Controller → `SurfaceSink`
//!
//! **Input path:** captured samples → `InputBatcher` → coalesced/ordered
//! batches → client → tunnel → gateway

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Dashboard sub-test lookup client
pub mod api;

/// Display client seam: tunnel transport and the client trait
pub mod client;

/// Configuration loading and validation
pub mod config;

/// Viewport scaling against native display dimensions
pub mod display;

/// Input event batching
pub mod input;

/// Session lifecycle: controller, identifier, error taxonomy
pub mod session;

/// Presentation surface seam
pub mod surface;

/// Session countdown timer
pub mod timer;

/// Utility functions
pub mod utils;
