//! Notification dispatch.
//!
//! Lifecycle transitions emit [`NotificationEvent`]s after they commit. The
//! [`Dispatcher`] resolves recipient addresses through the identity store and
//! hands one [`Message`] per event to the configured [`Transport`]. Delivery
//! is attempted once; a failure becomes a [`DispatchWarning`] for the caller
//! and never undoes the transition.

pub mod dispatcher;
pub mod event;
pub mod transport;
#[cfg(feature = "smtp-notifications")]
pub mod smtp;
#[cfg(feature = "webhook-notifications")]
pub mod webhook;

use std::sync::Arc;

use homestay_core::config::{NotificationConfig, TransportKind};

pub use dispatcher::{DispatchWarning, Dispatcher};
pub use event::{EventKind, NotificationEvent, Recipients};
pub use transport::{DisabledTransport, LogTransport, MemoryTransport, Message, Transport};
#[cfg(feature = "smtp-notifications")]
pub use smtp::SmtpMailer;
#[cfg(feature = "webhook-notifications")]
pub use webhook::WebhookTransport;

/// Errors that can occur in the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The transport could not be set up or refused the message.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The event resolved to no deliverable address.
    #[error("No recipients for {0} notification")]
    NoRecipients(EventKind),

    /// The webhook request or SMTP exchange failed.
    #[error("Delivery request error: {0}")]
    Request(String),

    /// The webhook returned a non-success status code.
    #[error("Webhook API error (status {status}): {body}")]
    Api {
        /// HTTP status code returned by the webhook.
        status: u16,
        /// Response body returned by the webhook.
        body: String,
    },

    /// Recipient lookup failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<homestay_core::db::DatabaseError> for NotificationError {
    fn from(e: homestay_core::db::DatabaseError) -> Self {
        Self::Database(e.to_string())
    }
}

/// Build the transport selected by configuration.
pub fn transport_from_config(
    config: &NotificationConfig,
) -> Result<Arc<dyn Transport>, NotificationError> {
    match config.transport {
        TransportKind::Log => Ok(Arc::new(LogTransport)),
        TransportKind::Disabled => Ok(Arc::new(DisabledTransport)),
        TransportKind::Webhook => webhook_transport(config),
        TransportKind::Smtp => smtp_transport(config),
    }
}

#[cfg(feature = "smtp-notifications")]
fn smtp_transport(config: &NotificationConfig) -> Result<Arc<dyn Transport>, NotificationError> {
    Ok(Arc::new(SmtpMailer::new(config)?))
}

#[cfg(not(feature = "smtp-notifications"))]
fn smtp_transport(_config: &NotificationConfig) -> Result<Arc<dyn Transport>, NotificationError> {
    Err(NotificationError::Transport(
        "built without the smtp-notifications feature".into(),
    ))
}

#[cfg(feature = "webhook-notifications")]
fn webhook_transport(config: &NotificationConfig) -> Result<Arc<dyn Transport>, NotificationError> {
    let url = config
        .webhook_url
        .as_deref()
        .ok_or_else(|| NotificationError::Transport("webhook transport needs a webhook_url".into()))?;
    Ok(Arc::new(WebhookTransport::new(url)?))
}

#[cfg(not(feature = "webhook-notifications"))]
fn webhook_transport(_config: &NotificationConfig) -> Result<Arc<dyn Transport>, NotificationError> {
    Err(NotificationError::Transport(
        "built without the webhook-notifications feature".into(),
    ))
}
