//! Email relay webhook client.
//!
//! Posts each reminder as JSON to a relay endpoint that turns it into email.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::{NotificationError, Reminder};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the relay.
#[derive(Debug, Serialize)]
pub struct ReminderEmail<'a> {
    pub to: Vec<&'a str>,
    pub subject: String,
    pub body: String,
    pub reminder: &'a Reminder,
}

/// Client for the email relay webhook.
#[derive(Debug)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a client posting to `url`.
    ///
    /// Installs the `ring` crypto provider, since the workspace builds
    /// `reqwest` without one (no-op if already installed).
    pub fn new(url: &str) -> Result<Self, NotificationError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotificationError::Config(format!(
                "webhook URL must be http(s): {url}"
            )));
        }

        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Config(e.to_string()))?;

        debug!(url, "Webhook notifier initialized");

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// Build the relay payload for a reminder.
    pub fn build_message(reminder: &Reminder) -> ReminderEmail<'_> {
        let label = if reminder.name.is_empty() {
            reminder.code.as_str()
        } else {
            reminder.name.as_str()
        };
        ReminderEmail {
            to: reminder.recipients(),
            subject: format!("Access \"{label}\" opens at {}", reminder.opens_at),
            body: format!(
                "Access code {} becomes valid at {}.",
                reminder.code, reminder.opens_at
            ),
            reminder,
        }
    }

    /// Post a reminder to the relay.
    pub async fn send(&self, reminder: &Reminder) -> Result<(), NotificationError> {
        let message = Self::build_message(reminder);
        let response = self
            .http
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(access_id = %reminder.access_id, "Reminder posted to relay");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Notification relay returned error");
            Err(NotificationError::Api {
                status: status_code,
                body,
            })
        }
    }
}
