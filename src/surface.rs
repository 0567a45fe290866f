//! Presentation Surface Seam
//!
//! The session controller mutates user-visible page state: the loading
//! spinner, the error banner, the display surface, the applied viewport.
//! [`SurfaceSink`] makes that boundary explicit so the controller owns no
//! page globals and tests can record exactly what was presented.

use tracing::{info, warn};

use crate::display::ScaledViewport;

/// Default user-facing message for connect failures
pub const MSG_CONNECT_FAILED: &str = "Failed to connect to the test environment.";
/// Transient message shown while an automatic reconnect is pending
pub const MSG_RECONNECTING: &str = "Reconnecting...";
/// Terminal message once the reconnect budget is exhausted
pub const MSG_CONNECTION_LOST: &str = "Connection lost. Please refresh or contact support.";
/// Shown when the identifier embedded in the page cannot be decoded
pub const MSG_INVALID_IDENTIFIER: &str = "Invalid connection ID.";
/// Shown when the display never reports a usable size
pub const MSG_DISPLAY_SIZE_FAILED: &str = "Failed to initialize display size.";

/// Receiver for user-visible session presentation changes.
///
/// Implementations must be cheap and non-blocking; they are called from
/// the controller's event loop.
pub trait SurfaceSink: Send + Sync {
    /// Hide the loading indicator (connection established)
    fn hide_loading(&self);

    /// Show `message` in the error banner and hide the display surface
    fn show_error(&self, message: &str);

    /// Clear the error banner
    fn clear_error(&self);

    /// Reset the surface to its initial loading placeholder
    fn reset_to_loading(&self);

    /// Apply a computed viewport to the rendered surface
    fn apply_viewport(&self, viewport: &ScaledViewport);
}

/// Surface sink that logs presentation changes.
///
/// Used by the binary; a hosting integration supplies its own sink bound
/// to real UI elements.
#[derive(Debug, Default)]
pub struct TracingSurface;

impl SurfaceSink for TracingSurface {
    fn hide_loading(&self) {
        info!("surface: loading hidden");
    }

    fn show_error(&self, message: &str) {
        warn!("surface: error shown: {}", message);
    }

    fn clear_error(&self) {
        info!("surface: error cleared");
    }

    fn reset_to_loading(&self) {
        info!("surface: reset to loading placeholder");
    }

    fn apply_viewport(&self, viewport: &ScaledViewport) {
        info!(
            "surface: viewport {}x{} (scale {:.4})",
            viewport.width, viewport.height, viewport.scale
        );
    }
}
