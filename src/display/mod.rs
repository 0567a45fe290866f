//! Viewport Scaling
//!
//! The remote display reports its native (unscaled) pixel dimensions; the
//! container the session is bound to has its own visible dimensions. The
//! rendered surface is scaled down to fit the container and never scaled
//! past native resolution.
//!
//! The remote display reports zero size before the first frame arrives, so
//! scaling is retried on a bounded budget (20 polls at 500 ms by default)
//! before a terminal failure is surfaced.

pub mod scale;

use serde::{Deserialize, Serialize};

pub use scale::{compute_scale, scaled_viewport, ScaledViewport};

/// Display sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Container width in pixels
    #[serde(default = "default_container_width")]
    pub container_width: u32,

    /// Container height in pixels
    #[serde(default = "default_container_height")]
    pub container_height: u32,

    /// Size polls before giving up on a not-yet-ready display
    #[serde(default = "default_size_retry_max")]
    pub size_retry_max: u32,

    /// Interval between size polls in milliseconds
    #[serde(default = "default_size_retry_interval_ms")]
    pub size_retry_interval_ms: u64,
}

fn default_container_width() -> u32 {
    1280
}
fn default_container_height() -> u32 {
    720
}
fn default_size_retry_max() -> u32 {
    20
}
fn default_size_retry_interval_ms() -> u64 {
    500
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            container_width: default_container_width(),
            container_height: default_container_height(),
            size_retry_max: default_size_retry_max(),
            size_retry_interval_ms: default_size_retry_interval_ms(),
        }
    }
}
