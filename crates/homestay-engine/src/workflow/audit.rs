//! Read side of the append-only audit trail.

use serde::Serialize;

use homestay_core::visibility::Transition;
use homestay_core::{Actor, PropertyId, ReservationId, UserId};

use crate::storage::{AuditEntry, AuditEvent, Database};

use super::{WorkflowError, active_account, require};

/// One booking, as recorded when it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingLogEntry {
    pub timestamp: i64,
    pub actor_user_id: UserId,
    pub reservation_id: ReservationId,
    pub property_id: PropertyId,
}

/// Administrator view of the audit trail. There is no way to change or
/// remove an entry; corrections are new entries.
#[derive(Debug, Clone)]
pub struct AuditLog {
    db: Database,
}

impl AuditLog {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every entry, newest first.
    pub async fn entries(&self, reader: &Actor) -> Result<Vec<AuditEntry>, WorkflowError> {
        require(reader, Transition::ReadAudit)?;
        active_account(&self.db, reader).await?;
        Ok(self.db.list_audit_entries().await?)
    }

    /// Bookings with their typed property IDs, newest first.
    pub async fn booking_log(&self, reader: &Actor) -> Result<Vec<BookingLogEntry>, WorkflowError> {
        require(reader, Transition::ReadAudit)?;
        active_account(&self.db, reader).await?;
        let entries = self
            .db
            .list_audit_entries_by_event(AuditEvent::BookingCreated)
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|e| {
                e.property_id.map(|property_id| BookingLogEntry {
                    timestamp: e.timestamp,
                    actor_user_id: e.actor_user_id,
                    reservation_id: e.entity_id,
                    property_id,
                })
            })
            .collect())
    }
}
