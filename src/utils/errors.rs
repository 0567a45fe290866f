//! User-Friendly Error Formatting
//!
//! Maps the session error taxonomy to messages with troubleshooting hints
//! for the person running the client.

use std::fmt::Write;

use crate::session::error::{classify_error, ErrorCategory, SessionError};

/// Format a session error for user consumption
pub fn format_user_error(error: &SessionError) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    match classify_error(error) {
        ErrorCategory::Identifier => {
            writeln!(&mut output, "Invalid Connection Identifier").ok();
            writeln!(&mut output).ok();
            writeln!(
                &mut output,
                "The identifier embedded in the page could not be decoded."
            )
            .ok();
            writeln!(&mut output).ok();
            writeln!(&mut output, "Common Causes:").ok();
            writeln!(&mut output, "  1. Expired or truncated session link").ok();
            writeln!(&mut output, "     → Reload the test page to get a fresh one").ok();
            writeln!(&mut output, "  2. Identifier edited in transit").ok();
            writeln!(&mut output, "     → Check any proxy rewriting query strings").ok();
        }
        ErrorCategory::Connect => {
            writeln!(&mut output, "Connection Error").ok();
            writeln!(&mut output).ok();
            writeln!(&mut output, "Could not reach the test environment gateway.").ok();
            writeln!(&mut output).ok();
            writeln!(&mut output, "Common Causes:").ok();
            writeln!(&mut output, "  1. Gateway not reachable").ok();
            writeln!(
                &mut output,
                "     → Check the server base URL in config.toml"
            )
            .ok();
            writeln!(&mut output, "  2. Auth token expired").ok();
            writeln!(&mut output, "     → Restart the session from the dashboard").ok();
        }
        ErrorCategory::Protocol => {
            writeln!(&mut output, "Display Protocol Error").ok();
            writeln!(&mut output).ok();
            writeln!(
                &mut output,
                "The remote display reported an error mid-session."
            )
            .ok();
            writeln!(&mut output, "  → A reconnect usually recovers this").ok();
        }
        ErrorCategory::Exhausted => {
            writeln!(&mut output, "Connection Lost").ok();
            writeln!(&mut output).ok();
            writeln!(
                &mut output,
                "Automatic reconnects were exhausted without recovering."
            )
            .ok();
            writeln!(&mut output, "  → Refresh the page or contact support").ok();
        }
        ErrorCategory::Display => {
            writeln!(&mut output, "Display Initialization Error").ok();
            writeln!(&mut output).ok();
            writeln!(
                &mut output,
                "The remote display never reported a usable size."
            )
            .ok();
            writeln!(&mut output, "  → The test machine may still be booting").ok();
        }
    }

    writeln!(&mut output).ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output, "  {}", error).ok();
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "Run with --verbose for detailed logs: testroom-client -vvv"
    )
    .ok();

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_identifier_error() {
        let error = SessionError::InvalidIdentifier("no leading digits".to_string());
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Invalid Connection Identifier"));
        assert!(formatted.contains("no leading digits"));
    }

    #[test]
    fn test_format_exhausted_error() {
        let error = SessionError::DisconnectExhausted { attempts: 3 };
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Connection Lost"));
        assert!(formatted.contains("3"));
    }
}
