//! Session Countdown Timer
//!
//! Fixed-duration countdown that ticks once per second, renders `MM:SS`,
//! and fires exactly one terminal action on expiry: submitting the
//! end-session form or navigating to a configured URL. No pause/resume; a
//! restart begins again from the original duration.
//!
//! The tick core is synchronous and clock-free so tests can step it
//! deterministically; [`CountdownTimer::run`] wraps it with the 1 Hz
//! interval and the expiry sink.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::TimerConfig;

/// Terminal action fired when the countdown reaches zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryAction {
    /// Submit the named form (the server interprets this as "end session")
    SubmitForm(String),
    /// Navigate to the given URL
    Redirect(String),
}

impl ExpiryAction {
    /// Build the action from validated timer configuration.
    ///
    /// Falls back to form submission when a redirect is configured without
    /// a URL; [`Config::validate`](crate::config::Config::validate) rejects
    /// that combination up front.
    pub fn from_config(config: &TimerConfig) -> Self {
        match (config.on_expiry.as_str(), &config.redirect_url) {
            ("redirect", Some(url)) => Self::Redirect(url.clone()),
            _ => Self::SubmitForm(config.form_name.clone()),
        }
    }
}

/// Receiver for the countdown's terminal action
pub trait ExpirySink: Send + Sync {
    /// Submit the named form
    fn submit_form(&self, form_name: &str);
    /// Navigate to the URL
    fn redirect(&self, url: &str);
}

/// One tick's outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Rendered remaining time, `MM:SS`
    pub display: String,
    /// True exactly once, on the tick that reaches zero
    pub expired: bool,
}

/// Fixed-duration countdown state.
pub struct CountdownTimer {
    remaining_secs: u64,
    action: ExpiryAction,
    fired: bool,
}

impl CountdownTimer {
    /// Create a countdown of `minutes` minutes
    pub fn new(minutes: u64, action: ExpiryAction) -> Self {
        Self {
            remaining_secs: minutes * 60,
            action,
            fired: false,
        }
    }

    /// Remaining whole seconds
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Render the remaining time as `MM:SS`
    pub fn render(&self) -> String {
        let minutes = self.remaining_secs / 60;
        let seconds = self.remaining_secs % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }

    /// Advance one second.
    ///
    /// Returns the rendered remaining time; `expired` is set on the first
    /// tick at zero and never again (subsequent ticks keep reporting
    /// `00:00`, not expired).
    pub fn tick(&mut self) -> Tick {
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
        }

        let expired = self.remaining_secs == 0 && !self.fired;
        if expired {
            self.fired = true;
        }

        Tick {
            display: self.render(),
            expired,
        }
    }

    /// Run the countdown at 1 Hz until expiry.
    ///
    /// Publishes each rendered value on `display_tx` and fires the
    /// terminal action exactly once on `sink` before returning.
    pub async fn run(mut self, display_tx: watch::Sender<String>, sink: &dyn ExpirySink) {
        info!(
            "Countdown started: {} ({} s)",
            self.render(),
            self.remaining_secs
        );
        let _ = display_tx.send(self.render());

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        interval.tick().await; // first tick completes immediately

        loop {
            interval.tick().await;
            let tick = self.tick();
            debug!("Countdown: {}", tick.display);
            let _ = display_tx.send(tick.display.clone());

            if tick.expired {
                info!("Countdown expired, firing terminal action");
                match &self.action {
                    ExpiryAction::SubmitForm(form) => sink.submit_form(form),
                    ExpiryAction::Redirect(url) => sink.redirect(url),
                }
                return;
            }
        }
    }
}
