//! Delivery transports.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::NotificationError;

/// One rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Outbound channel for rendered notifications.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Attempt delivery once.
    async fn send(&self, message: &Message) -> Result<(), NotificationError>;
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &Message) -> Result<(), NotificationError> {
        info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            body = %message.body,
            "Notification"
        );
        Ok(())
    }
}

/// Accepts and drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTransport;

#[async_trait]
impl Transport for DisabledTransport {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send(&self, message: &Message) -> Result<(), NotificationError> {
        debug!(subject = %message.subject, "Notification dropped (transport disabled)");
        Ok(())
    }
}

/// Records messages in memory. Can be switched offline to make every send
/// fail.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: RwLock<Vec<Message>>,
    offline: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Messages delivered so far, oldest first.
    pub async fn sent(&self) -> Vec<Message> {
        self.sent.read().await.clone()
    }

    /// Messages delivered so far whose recipients include `address`.
    pub async fn sent_to(&self, address: &str) -> Vec<Message> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| m.to.iter().any(|to| to.eq_ignore_ascii_case(address)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, message: &Message) -> Result<(), NotificationError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("transport offline".into()));
        }
        self.sent.write().await.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(to: &str) -> Message {
        Message {
            from: "bookings@homestay.local".into(),
            to: vec![to.into()],
            subject: "Subject".into(),
            body: "Body".into(),
        }
    }

    #[tokio::test]
    async fn memory_transport_records_until_offline() {
        let transport = MemoryTransport::new();
        transport.send(&message("a@example.com")).await.unwrap();

        transport.set_offline(true);
        let err = transport.send(&message("b@example.com")).await.unwrap_err();
        assert!(matches!(err, NotificationError::Transport(_)));

        transport.set_offline(false);
        transport.send(&message("c@example.com")).await.unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(transport.sent_to("A@example.com").await.len(), 1);
        assert!(transport.sent_to("b@example.com").await.is_empty());
    }

    #[tokio::test]
    async fn log_and_disabled_transports_always_succeed() {
        LogTransport.send(&message("a@example.com")).await.unwrap();
        DisabledTransport.send(&message("a@example.com")).await.unwrap();
    }
}
