//! Display Session Lifecycle
//!
//! One session controller per page load, constructed explicitly. The
//! controller decodes the embedded connection identifier, drives the
//! connect/reconnect state machine against the display client seam, and
//! reports everything user-visible through the surface sink.
//!
//! ```text
//! SessionController
//!   ├─> identifier::extract_id   (base64 token prefix → connection id)
//!   ├─> DisplayClientFactory     (tunnel/client pair construction)
//!   ├─> ClientEvent loop         (state changes, errors, flushes)
//!   ├─> reconnect budget         (3 attempts, 3 s apart, single timer)
//!   └─> SurfaceSink              (loading / error / viewport)
//! ```

pub mod controller;
pub mod error;
pub mod identifier;

pub use controller::{ControllerCommand, SessionController, SessionState};
pub use error::{classify_error, ErrorCategory, Result, SessionError};
pub use identifier::extract_id;
