//! Webhook transport.
//!
//! POSTs each rendered [`Message`] as JSON to a configured URL, e.g. a mail
//! relay or chat integration. Only compiled with the `webhook-notifications`
//! feature.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::NotificationError;
use super::transport::{Message, Transport};

/// Delivers notifications by HTTP POST.
#[derive(Debug)]
pub struct WebhookTransport {
    http: reqwest::Client,
    url: String,
}

impl WebhookTransport {
    /// Create a transport posting to `url`.
    pub fn new(url: &str) -> Result<Self, NotificationError> {
        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| NotificationError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(url, http))
    }

    /// Create a transport from a pre-built HTTP client.
    pub fn with_client(url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &Message) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %self.url, "Webhook notification sent");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Webhook returned error");
            Err(NotificationError::Api {
                status: status_code,
                body,
            })
        }
    }
}
