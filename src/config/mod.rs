//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod types;

pub use types::{LoggingConfig, ReconnectConfig, SessionConfig, TimerConfig};

use crate::display::DisplayConfig;
use crate::input::batch::InputConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session connection parameters
    pub session: SessionConfig,
    /// Automatic reconnect policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Display sizing configuration
    #[serde(default)]
    pub display: DisplayConfig,
    /// Input batching configuration
    #[serde(default)]
    pub input: InputConfig,
    /// Countdown expiry configuration
    #[serde(default)]
    pub timer: TimerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.session.auth_token.is_empty() {
            anyhow::bail!("auth_token must not be empty");
        }
        if self.session.encoded_identifier.is_empty() {
            anyhow::bail!("encoded_identifier must not be empty");
        }
        if self.session.duration_minutes == 0 {
            anyhow::bail!("duration_minutes must be positive");
        }

        if self.reconnect.max_attempts == 0 {
            anyhow::bail!("reconnect max_attempts must be positive");
        }

        if self.display.size_retry_max == 0 {
            anyhow::bail!("display size_retry_max must be positive");
        }

        match self.timer.on_expiry.as_str() {
            "submit" => {}
            "redirect" => {
                if self.timer.redirect_url.is_none() {
                    anyhow::bail!("timer on_expiry = \"redirect\" requires redirect_url");
                }
            }
            other => anyhow::bail!("Invalid timer expiry action: {}", other),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        server: Option<Url>,
        token: Option<String>,
        identifier: Option<String>,
    ) -> Self {
        if let Some(server) = server {
            self.session.server_base_url = server;
        }
        if let Some(token) = token {
            self.session.auth_token = token;
        }
        if let Some(identifier) = identifier {
            self.session.encoded_identifier = identifier;
        }

        self
    }
}
