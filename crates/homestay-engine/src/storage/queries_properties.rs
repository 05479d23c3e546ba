//! Property listing and image queries.

use homestay_core::db::{DatabaseError, unix_timestamp};
use homestay_core::domain::PropertyStatus;
use homestay_core::visibility::Scope;
use homestay_core::{PropertyId, UserId};

use super::db::Database;
use super::models::{Property, PropertyDetails, PropertyImage, PropertyUpdate};
use super::queries_users::placeholders;

impl Database {
    // =========================================================================
    // Property queries
    // =========================================================================

    /// Insert a listing and its images in one transaction.
    pub async fn create_property(
        &self,
        owner_id: UserId,
        details: &PropertyDetails,
        status: PropertyStatus,
        images: &[Vec<u8>],
    ) -> Result<Property, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            "INSERT INTO properties \
             (owner_id, name, price_cents, description, location, bed_type, guest_capacity, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(&details.name)
        .bind(details.price_cents)
        .bind(&details.description)
        .bind(&details.location)
        .bind(&details.bed_type)
        .bind(details.guest_capacity)
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, data) in (0_i64..).zip(images) {
            sqlx::query("INSERT INTO property_images (property_id, position, data) VALUES (?, ?, ?)")
                .bind(id)
                .bind(position)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }

        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(property)
    }

    /// Get a listing by ID.
    pub async fn get_property(&self, id: PropertyId) -> Result<Property, DatabaseError> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Property {id}")))
    }

    /// Images of a listing in display order.
    pub async fn get_property_images(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<PropertyImage>, DatabaseError> {
        let images = sqlx::query_as::<_, PropertyImage>(
            "SELECT * FROM property_images WHERE property_id = ? ORDER BY position, id",
        )
        .bind(property_id)
        .fetch_all(self.pool())
        .await?;

        Ok(images)
    }

    /// Listings within a visibility scope, newest first.
    pub async fn list_properties(&self, scope: Scope) -> Result<Vec<Property>, DatabaseError> {
        let base = "SELECT * FROM properties";
        let order = "ORDER BY created_at DESC, id DESC";
        let properties = match scope {
            Scope::Everything => {
                sqlx::query_as::<_, Property>(&format!("{base} {order}"))
                    .fetch_all(self.pool())
                    .await?
            }
            Scope::AvailableOnly => {
                sqlx::query_as::<_, Property>(&format!("{base} WHERE status = ? {order}"))
                    .bind(PropertyStatus::Available.as_str())
                    .fetch_all(self.pool())
                    .await?
            }
            Scope::OwnedBy(owner_id) => {
                sqlx::query_as::<_, Property>(&format!("{base} WHERE owner_id = ? {order}"))
                    .bind(owner_id)
                    .fetch_all(self.pool())
                    .await?
            }
            Scope::BookedBy(_) | Scope::Nothing => Vec::new(),
        };

        Ok(properties)
    }

    /// Listings of one owner in one status, newest first.
    pub async fn list_properties_by_owner_and_status(
        &self,
        owner_id: UserId,
        status: PropertyStatus,
    ) -> Result<Vec<Property>, DatabaseError> {
        let properties = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE owner_id = ? AND status = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .bind(status.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(properties)
    }

    /// `Available` listings in `location` other than `exclude`, closest in
    /// price first.
    pub async fn find_alternative_candidates(
        &self,
        location: &str,
        exclude: PropertyId,
        price_cents: i64,
        limit: u32,
    ) -> Result<Vec<Property>, DatabaseError> {
        let candidates = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties \
             WHERE status = ? AND location = ? COLLATE NOCASE AND id != ? \
             ORDER BY ABS(price_cents - ?), id \
             LIMIT ?",
        )
        .bind(PropertyStatus::Available.as_str())
        .bind(location)
        .bind(exclude)
        .bind(price_cents)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(candidates)
    }

    /// Replace a listing's descriptive fields and edit its image set.
    ///
    /// Images listed in `remove` are deleted; `add` is appended after the
    /// current last position. Status is untouched. The image checks run
    /// inside the transaction, so a concurrent edit cannot leave the listing
    /// without images.
    pub async fn update_property(
        &self,
        id: PropertyId,
        details: &PropertyDetails,
        remove: &[i64],
        add: &[Vec<u8>],
    ) -> Result<PropertyUpdate, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE properties SET name = ?, price_cents = ?, description = ?, location = ?, \
             bed_type = ?, guest_capacity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&details.name)
        .bind(details.price_cents)
        .bind(&details.description)
        .bind(&details.location)
        .bind(&details.bed_type)
        .bind(details.guest_capacity)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(format!("Property {id}")));
        }

        let existing: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM property_images WHERE property_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        if let Some(unknown) = remove.iter().find(|image_id| !existing.contains(image_id)) {
            tx.rollback().await?;
            return Ok(PropertyUpdate::UnknownImage(*unknown));
        }
        let kept = existing.iter().filter(|image_id| !remove.contains(image_id)).count();
        if kept + add.len() == 0 {
            tx.rollback().await?;
            return Ok(PropertyUpdate::NoImagesLeft);
        }

        if !remove.is_empty() {
            let sql = format!(
                "DELETE FROM property_images WHERE property_id = ? AND id IN ({})",
                placeholders(remove.len())
            );
            let mut query = sqlx::query(&sql).bind(id);
            for image_id in remove {
                query = query.bind(image_id);
            }
            query.execute(&mut *tx).await?;
        }

        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM property_images WHERE property_id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        for (position, data) in (next..).zip(add) {
            sqlx::query("INSERT INTO property_images (property_id, position, data) VALUES (?, ?, ?)")
                .bind(id)
                .bind(position)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }

        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PropertyUpdate::Updated(property))
    }

    /// Move a listing from `from` to `to` if it is still in `from`.
    ///
    /// Returns `None` when no row matched.
    pub async fn compare_and_set_property_status(
        &self,
        id: PropertyId,
        from: PropertyStatus,
        to: PropertyStatus,
    ) -> Result<Option<Property>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let updated =
            sqlx::query("UPDATE properties SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(now)
                .bind(id)
                .bind(from.as_str())
                .execute(&mut *tx)
                .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(property))
    }

    /// Force a listing's status, whatever it currently is.
    pub async fn set_property_status(
        &self,
        id: PropertyId,
        status: PropertyStatus,
    ) -> Result<Property, DatabaseError> {
        let updated = sqlx::query("UPDATE properties SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if updated.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Property {id}")));
        }

        self.get_property(id).await
    }
}
