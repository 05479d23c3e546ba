//! SMTP transport.
//!
//! Sends each rendered [`Message`] as a plain-text email through a relay.
//! Only compiled with the `smtp-notifications` feature.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message as Email, SmtpTransport, Transport as _};
use tracing::debug;

use homestay_core::config::NotificationConfig;

use super::NotificationError;
use super::transport::{Message, Transport};

/// Port on which the relay expects implicit TLS; any other port uses STARTTLS.
const SUBMISSIONS_PORT: u16 = 465;

/// Delivers notifications by email.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    host: String,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer").field("host", &self.host).finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Build a mailer for the configured relay. Credentials are used only
    /// when both username and password are set.
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotificationError::Transport("smtp transport needs an smtp_host".into()))?;

        let builder = if config.smtp_port == SUBMISSIONS_PORT {
            SmtpTransport::relay(host)
        } else {
            SmtpTransport::starttls_relay(host)
        }
        .map_err(|e| NotificationError::Transport(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port);

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            mailer: builder.build(),
            host: host.to_string(),
        })
    }
}

/// Render a message as an email with one `To` header per recipient.
fn build_email(message: &Message) -> Result<Email, NotificationError> {
    let from = message
        .from
        .parse()
        .map_err(|e| NotificationError::Transport(format!("Invalid from address: {e}")))?;
    let mut builder = Email::builder().from(from);
    for to in &message.to {
        builder = builder.to(to
            .parse()
            .map_err(|e| NotificationError::Transport(format!("Invalid to address {to}: {e}")))?);
    }
    builder
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| NotificationError::Transport(format!("Failed to build email: {e}")))
}

#[async_trait]
impl Transport for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &Message) -> Result<(), NotificationError> {
        let email = build_email(message)?;
        let mailer = self.mailer.clone();

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotificationError::Request(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| NotificationError::Transport(format!("Email task failed: {e}")))??;

        debug!(host = %self.host, recipients = message.to.len(), "Email notification sent");
        Ok(())
    }
}
