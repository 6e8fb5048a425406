//! Reminder delivery.
//!
//! Provides:
//! - [`ReminderSink`], the seam the reminder dispatcher delivers through
//! - [`Notifier`], the configured sink: log-only, or an email relay webhook
//!   when the `webhook-notifications` Cargo feature is enabled
//!
//! Delivery is best effort. Callers log a [`NotificationError`] and move on.

#[cfg(feature = "webhook-notifications")]
pub mod webhook;

use std::future::Future;

use serde::Serialize;
use tracing::info;
use visitgate_core::config::NotificationConfig;

#[cfg(feature = "webhook-notifications")]
pub use webhook::WebhookNotifier;

/// Errors that can occur while delivering a reminder.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The notifier could not be set up.
    #[error("Notifier configuration error: {0}")]
    Config(String),

    /// HTTP request to the relay failed.
    #[error("Notification request error: {0}")]
    Request(String),

    /// The relay returned a non-success status code.
    #[error("Notification relay error (status {status}): {body}")]
    Api {
        /// HTTP status code returned by the relay.
        status: u16,
        /// Response body from the relay.
        body: String,
    },
}

/// A window-start reminder for one access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub access_id: String,
    pub company_id: String,
    pub code: String,
    pub name: String,
    /// Civil `YYYY-MM-DD HH:MM:SS` the window opens at.
    pub opens_at: String,
    pub host_email: Option<String>,
    pub invited_emails: Vec<String>,
}

impl Reminder {
    /// Everyone who should hear about this window.
    pub fn recipients(&self) -> Vec<&str> {
        self.host_email
            .iter()
            .chain(self.invited_emails.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Delivers reminders to an external notification service.
pub trait ReminderSink: Send + Sync {
    fn send_reminder(
        &self,
        reminder: &Reminder,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// The configured reminder sink.
#[derive(Debug)]
pub enum Notifier {
    /// Write reminders to the log only.
    Log,
    #[cfg(feature = "webhook-notifications")]
    Webhook(WebhookNotifier),
}

impl Notifier {
    /// Pick the sink from configuration.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        match config.webhook_url.as_deref() {
            None => Ok(Self::Log),
            #[cfg(feature = "webhook-notifications")]
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url)?)),
            #[cfg(not(feature = "webhook-notifications"))]
            Some(url) => {
                tracing::warn!(
                    url,
                    "webhook_url is set but the webhook-notifications feature is disabled; \
                     reminders will only be logged"
                );
                Ok(Self::Log)
            }
        }
    }
}

impl ReminderSink for Notifier {
    async fn send_reminder(&self, reminder: &Reminder) -> Result<(), NotificationError> {
        match self {
            Self::Log => {
                info!(
                    access_id = %reminder.access_id,
                    code = %reminder.code,
                    opens_at = %reminder.opens_at,
                    recipients = reminder.recipients().len(),
                    "Access window opening soon"
                );
                Ok(())
            }
            #[cfg(feature = "webhook-notifications")]
            Self::Webhook(client) => client.send(reminder).await,
        }
    }
}
