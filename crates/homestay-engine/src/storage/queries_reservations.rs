//! Reservation, customer detail, and revenue queries.

use homestay_core::db::{DatabaseError, unix_timestamp};
use homestay_core::domain::{PropertyStatus, ReservationStatus};
use homestay_core::visibility::Scope;
use homestay_core::{PropertyId, ReservationId, UserId};

use super::db::Database;
use super::models::{
    AuditEvent, EntityKind, MonthlyRevenue, NewCustomer, Pricing, Reservation, ReservationView,
    Stay,
};
use super::queries_audit::NewAuditEntry;
use super::queries_users::placeholders;

/// Columns of [`ReservationView`], joined from reservations, properties, and
/// customer details.
const VIEW_SELECT: &str = "SELECT r.*, \
     p.name AS property_name, p.location AS property_location, p.owner_id AS property_owner_id, \
     TRIM(c.first_name || ' ' || c.last_name) AS customer_name, \
     c.email AS customer_email, c.phone AS customer_phone \
     FROM reservations r \
     JOIN properties p ON p.id = r.property_id \
     JOIN customer_details c ON c.id = r.customer_id";

/// Everything needed to record a booking.
#[derive(Debug, Clone)]
pub struct BookingParams<'a> {
    pub property_id: PropertyId,
    pub customer: &'a NewCustomer,
    pub stay: &'a Stay,
    pub pricing: Pricing,
    pub booked_by: UserId,
}

impl Database {
    // =========================================================================
    // Reservation queries
    // =========================================================================

    /// Record a booking: customer details, then the `Pending` reservation,
    /// then its audit entry, all in one transaction.
    ///
    /// The reservation is only inserted while the listing is `Available`;
    /// otherwise nothing is written and `None` is returned.
    pub async fn create_booking(
        &self,
        params: &BookingParams<'_>,
    ) -> Result<Option<Reservation>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let customer_id = sqlx::query(
            "INSERT INTO customer_details (title, first_name, last_name, email, phone, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&params.customer.title)
        .bind(&params.customer.first_name)
        .bind(&params.customer.last_name)
        .bind(&params.customer.email)
        .bind(&params.customer.phone)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let inserted = sqlx::query(
            "INSERT INTO reservations \
             (property_id, customer_id, booked_by, check_in, check_out, adults, children, request, \
              total_cents, requested_hold_until, payment_hold_until, status, created_at, updated_at) \
             SELECT id, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ? \
             FROM properties WHERE id = ? AND status = ?",
        )
        .bind(customer_id)
        .bind(params.booked_by)
        .bind(params.stay.check_in)
        .bind(params.stay.check_out)
        .bind(params.stay.adults)
        .bind(params.stay.children)
        .bind(&params.stay.request)
        .bind(params.pricing.total_cents)
        .bind(params.stay.hold_until)
        .bind(ReservationStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .bind(params.property_id)
        .bind(PropertyStatus::Available.as_str())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        let reservation_id = inserted.last_insert_rowid();

        let description = format!(
            "Booking created for reservation {reservation_id} and property {}",
            params.property_id
        );
        Self::append_audit_entry(
            &mut tx,
            &NewAuditEntry {
                timestamp: now,
                actor_user_id: params.booked_by,
                entity_kind: EntityKind::Reservation,
                entity_id: reservation_id,
                event_kind: AuditEvent::BookingCreated,
                property_id: Some(params.property_id),
                description: &description,
            },
        )
        .await?;

        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
                .bind(reservation_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(Some(reservation))
    }

    /// Get a reservation by ID.
    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, DatabaseError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Reservation {id}")))
    }

    /// Get a reservation with its listing and customer.
    pub async fn get_reservation_view(
        &self,
        id: ReservationId,
    ) -> Result<ReservationView, DatabaseError> {
        sqlx::query_as::<_, ReservationView>(&format!("{VIEW_SELECT} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Reservation {id}")))
    }

    /// Reservations within a visibility scope whose status is in `statuses`,
    /// newest first.
    pub async fn list_reservations(
        &self,
        scope: Scope,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<ReservationView>, DatabaseError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let (filter, owner) = match scope {
            Scope::Everything => ("", None),
            Scope::OwnedBy(id) => (" AND p.owner_id = ?", Some(id)),
            Scope::BookedBy(id) => (" AND r.booked_by = ?", Some(id)),
            Scope::AvailableOnly | Scope::Nothing => return Ok(Vec::new()),
        };
        let sql = format!(
            "{VIEW_SELECT} WHERE r.status IN ({}){filter} ORDER BY r.created_at DESC, r.id DESC",
            placeholders(statuses.len())
        );

        let mut query = sqlx::query_as::<_, ReservationView>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        if let Some(id) = owner {
            query = query.bind(id);
        }

        Ok(query.fetch_all(self.pool()).await?)
    }

    /// Move a reservation from `from` to `to` if it is still in `from`,
    /// writing `payment_hold_until` in the same statement.
    ///
    /// Returns `None` when no row matched.
    pub async fn compare_and_set_reservation_status(
        &self,
        id: ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
        payment_hold_until: Option<i64>,
    ) -> Result<Option<Reservation>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE reservations SET status = ?, payment_hold_until = ?, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(payment_hold_until)
        .bind(now)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(Some(reservation))
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Revenue of reservations in `statuses`, grouped by UTC check-in month,
    /// oldest month first.
    pub async fn monthly_revenue(
        &self,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<MonthlyRevenue>, DatabaseError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT strftime('%Y-%m', check_in, 'unixepoch') AS month, \
             SUM(total_cents) AS revenue_cents, COUNT(*) AS bookings \
             FROM reservations WHERE status IN ({}) \
             GROUP BY month ORDER BY month",
            placeholders(statuses.len())
        );
        let mut query = sqlx::query_as::<_, MonthlyRevenue>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        Ok(query.fetch_all(self.pool()).await?)
    }
}
