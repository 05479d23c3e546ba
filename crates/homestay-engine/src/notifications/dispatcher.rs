//! Post-commit notification dispatcher.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::identity::IdentityStore;

use super::event::{EventKind, NotificationEvent, Recipients};
use super::transport::{Message, Transport};
use super::NotificationError;

/// A notification that could not be delivered. Returned next to an otherwise
/// successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchWarning {
    pub kind: EventKind,
    pub reason: String,
}

impl fmt::Display for DispatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} notification not delivered: {}", self.kind, self.reason)
    }
}

/// Resolves recipients and hands rendered messages to a transport.
#[derive(Clone)]
pub struct Dispatcher {
    identities: Arc<dyn IdentityStore>,
    transport: Arc<dyn Transport>,
    sender: String,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport.name())
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        transport: Arc<dyn Transport>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            identities,
            transport,
            sender: sender.into(),
        }
    }

    /// Attempt delivery of `event` once.
    ///
    /// Never fails: any problem is logged and returned as a warning.
    #[instrument(skip(self, event), fields(kind = %event.kind))]
    pub async fn dispatch(&self, event: &NotificationEvent) -> Option<DispatchWarning> {
        match self.deliver(event).await {
            Ok(recipients) => {
                info!(
                    recipients,
                    transport = self.transport.name(),
                    "Notification dispatched"
                );
                None
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transport = self.transport.name(),
                    "Notification dispatch failed"
                );
                #[cfg(feature = "metrics")]
                homestay_core::metrics::record_dispatch_failure(event.kind.as_str());
                Some(DispatchWarning {
                    kind: event.kind,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<usize, NotificationError> {
        let to = self.resolve(&event.recipients).await?;
        if to.is_empty() {
            return Err(NotificationError::NoRecipients(event.kind));
        }

        let message = Message {
            from: self.sender.clone(),
            to,
            subject: event.subject(),
            body: event.body(),
        };
        self.transport.send(&message).await?;
        Ok(message.to.len())
    }

    async fn resolve(&self, recipients: &Recipients) -> Result<Vec<String>, NotificationError> {
        let mut addresses: Vec<String> = match recipients {
            Recipients::Role(role) => self
                .identities
                .resolve_users_by_role(*role)
                .await?
                .into_iter()
                .map(|u| u.email)
                .collect(),
            Recipients::Users(ids) => self
                .identities
                .resolve_users(ids)
                .await?
                .into_iter()
                .map(|u| u.email)
                .collect(),
            Recipients::Addresses(list) => list.clone(),
        };
        addresses.retain(|a| !a.trim().is_empty());
        addresses.dedup();
        Ok(addresses)
    }
}
