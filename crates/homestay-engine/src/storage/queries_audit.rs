//! Audit trail queries.
//!
//! The table is append-only: triggers abort any `UPDATE` or `DELETE`, and no
//! query here issues one.

use sqlx::SqliteConnection;

use homestay_core::UserId;
use homestay_core::db::DatabaseError;

use super::db::Database;
use super::models::{AuditEntry, AuditEvent, EntityKind};

/// Fields of an audit entry about to be written.
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub timestamp: i64,
    pub actor_user_id: UserId,
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub event_kind: AuditEvent,
    pub property_id: Option<i64>,
    pub description: &'a str,
}

impl Database {
    // =========================================================================
    // Audit queries
    // =========================================================================

    /// Append an entry on the caller's connection, normally inside the
    /// transaction that made the audited change.
    pub(super) async fn append_audit_entry(
        conn: &mut SqliteConnection,
        entry: &NewAuditEntry<'_>,
    ) -> Result<i64, DatabaseError> {
        let id = sqlx::query(
            "INSERT INTO audit_entries \
             (timestamp, actor_user_id, entity_kind, entity_id, event_kind, property_id, description) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.timestamp)
        .bind(entry.actor_user_id)
        .bind(entry.entity_kind.as_str())
        .bind(entry.entity_id)
        .bind(entry.event_kind.as_str())
        .bind(entry.property_id)
        .bind(entry.description)
        .execute(conn)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// All entries, newest first.
    pub async fn list_audit_entries(&self) -> Result<Vec<AuditEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM audit_entries ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Entries of one event kind, newest first.
    pub async fn list_audit_entries_by_event(
        &self,
        event: AuditEvent,
    ) -> Result<Vec<AuditEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM audit_entries WHERE event_kind = ? ORDER BY timestamp DESC, id DESC",
        )
        .bind(event.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Number of entries recorded.
    pub async fn count_audit_entries(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_entries")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
