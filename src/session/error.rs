//! Session Error Types
//!
//! Error taxonomy for the display session lifecycle. All of these are
//! handled locally: logged, then surfaced to the user through the
//! [`SurfaceSink`](crate::surface::SurfaceSink). Nothing propagates beyond
//! the session.

use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session lifecycle error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// The encoded connection identifier could not be decoded, or its
    /// decoded form has no leading digits. Fatal: no connect is attempted.
    #[error("Invalid connection identifier: {0}")]
    InvalidIdentifier(String),

    /// Synchronous connect failure (construction or argument error)
    #[error("Connection failed: {0}")]
    ConnectFailure(String),

    /// Asynchronous error reported through the client's error callback
    #[error("Display protocol error: {0}")]
    ProtocolError(String),

    /// Reconnect budget exhausted after an unbroken disconnect streak
    #[error("Connection lost after {attempts} reconnect attempts")]
    DisconnectExhausted {
        /// Reconnect attempts made before giving up
        attempts: u32,
    },

    /// The remote display never reported a positive size within the
    /// bounded retry budget
    #[error("Display size not ready after {retries} retries")]
    DisplayNotReady {
        /// Size polls performed before giving up
        retries: u32,
    },

    /// HTTP transport error from the tunnel endpoint
    #[error("Tunnel transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classification for user-facing message selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identifier decode/parse failures
    Identifier,
    /// Connect-time failures (synchronous or transport)
    Connect,
    /// Asynchronous protocol errors
    Protocol,
    /// Reconnect budget exhausted
    Exhausted,
    /// Display sizing failures
    Display,
}

/// Classify an error for user-facing message selection
pub fn classify_error(error: &SessionError) -> ErrorCategory {
    match error {
        SessionError::InvalidIdentifier(_) => ErrorCategory::Identifier,
        SessionError::ConnectFailure(_) | SessionError::Http(_) | SessionError::Io(_) => {
            ErrorCategory::Connect
        }
        SessionError::ProtocolError(_) => ErrorCategory::Protocol,
        SessionError::DisconnectExhausted { .. } => ErrorCategory::Exhausted,
        SessionError::DisplayNotReady { .. } => ErrorCategory::Display,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let error = SessionError::InvalidIdentifier("bad b64".to_string());
        assert_eq!(classify_error(&error), ErrorCategory::Identifier);

        let error = SessionError::ConnectFailure("tunnel refused".to_string());
        assert_eq!(classify_error(&error), ErrorCategory::Connect);

        let error = SessionError::ProtocolError("stream aborted".to_string());
        assert_eq!(classify_error(&error), ErrorCategory::Protocol);

        let error = SessionError::DisconnectExhausted { attempts: 3 };
        assert_eq!(classify_error(&error), ErrorCategory::Exhausted);

        let error = SessionError::DisplayNotReady { retries: 20 };
        assert_eq!(classify_error(&error), ErrorCategory::Display);
    }
}
