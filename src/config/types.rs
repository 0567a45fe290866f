//! Configuration type definitions

use serde::{Deserialize, Serialize};
use url::Url;

/// Session connection parameters.
///
/// These mirror the data contract the hosting page embeds: auth token,
/// server base URL, base64-encoded identifier, optional duration and
/// instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the remote-display gateway
    pub server_base_url: Url,

    /// Opaque auth token issued by the server
    pub auth_token: String,

    /// Base64-encoded connection identifier (leading digits of the decoded
    /// form name the connection)
    pub encoded_identifier: String,

    /// Session duration in minutes
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,

    /// Instructions text shown to the test taker
    #[serde(default)]
    pub instructions: Option<String>,
}

pub(crate) fn default_duration_minutes() -> u64 {
    60
}

/// Automatic reconnect policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect attempts allowed per unbroken disconnect streak
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each reconnect attempt in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    3000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// What happens when the countdown reaches zero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Terminal action: "submit" posts the end-session form, "redirect"
    /// navigates to `redirect_url`
    #[serde(default = "default_expiry")]
    pub on_expiry: String,

    /// Form submitted when `on_expiry = "submit"`
    #[serde(default = "default_form_name")]
    pub form_name: String,

    /// Target of `on_expiry = "redirect"`
    #[serde(default)]
    pub redirect_url: Option<String>,
}

fn default_expiry() -> String {
    "submit".to_string()
}
fn default_form_name() -> String {
    "end-session-form".to_string()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            on_expiry: default_expiry(),
            form_name: default_form_name(),
            redirect_url: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_level")]
    pub level: String,

    /// Optional log directory (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}
