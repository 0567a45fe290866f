//! Scale computation
//!
//! `scale = min(container_w / native_w, container_h / native_h, 1)`.
//! Container-relative, with the never-upscale clamp: a small remote display
//! stays at native size inside a large container.

use tracing::debug;

/// A computed presentation box for the rendered surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledViewport {
    /// Applied scale factor, in (0, 1]
    pub scale: f64,
    /// Presented width: `native_width * scale`, rounded
    pub width: u32,
    /// Presented height: `native_height * scale`, rounded
    pub height: u32,
}

/// Compute the fit-to-container scale factor.
///
/// Returns `None` while any dimension is not yet positive; the remote
/// display reports zero size before its first frame.
pub fn compute_scale(native: (u32, u32), container: (u32, u32)) -> Option<f64> {
    let (native_w, native_h) = native;
    let (container_w, container_h) = container;
    if native_w == 0 || native_h == 0 || container_w == 0 || container_h == 0 {
        return None;
    }

    let fit_w = container_w as f64 / native_w as f64;
    let fit_h = container_h as f64 / native_h as f64;
    Some(fit_w.min(fit_h).min(1.0))
}

/// Compute the presented box for the rendered surface.
pub fn scaled_viewport(native: (u32, u32), container: (u32, u32)) -> Option<ScaledViewport> {
    let scale = compute_scale(native, container)?;
    let viewport = ScaledViewport {
        scale,
        width: (native.0 as f64 * scale).round() as u32,
        height: (native.1 as f64 * scale).round() as u32,
    };

    debug!(
        "Scaled display: {}x{} into {}x{} at scale {:.4}",
        native.0, native.1, container.0, container.1, viewport.scale
    );
    Some(viewport)
}
