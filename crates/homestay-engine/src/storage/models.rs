//! Data models for Homestay storage.

use serde::{Deserialize, Serialize};

use homestay_core::domain::{Activation, PropertyStatus, ReservationStatus, Role};
use homestay_core::{PropertyId, ReservationId, UserId, stored_enum};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub activation: Activation,
    pub created_at: i64,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.activation == Activation::Active
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Fields of a new user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub name: String,
    pub price_cents: i64,
    pub description: String,
    pub location: String,
    pub bed_type: String,
    pub guest_capacity: i64,
    #[sqlx(try_from = "String")]
    pub status: PropertyStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Descriptive fields of a listing, shared by creation and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub name: String,
    pub price_cents: i64,
    pub description: String,
    pub location: String,
    pub bed_type: String,
    pub guest_capacity: i64,
}

impl From<&Property> for PropertyDetails {
    fn from(p: &Property) -> Self {
        Self {
            name: p.name.clone(),
            price_cents: p.price_cents,
            description: p.description.clone(),
            location: p.location.clone(),
            bed_type: p.bed_type.clone(),
            guest_capacity: p.guest_capacity,
        }
    }
}

/// Result of [`Database::update_property`](super::Database::update_property).
/// Only `Updated` commits anything.
#[derive(Debug, Clone)]
pub enum PropertyUpdate {
    Updated(Property),
    /// An image to remove does not belong to the listing.
    UnknownImage(i64),
    /// The edit would leave the listing without images.
    NoImagesLeft,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyImage {
    pub id: i64,
    pub property_id: PropertyId,
    pub position: i64,
    pub data: Vec<u8>,
}

/// Contact details captured at booking time; not tied to an account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerDetails {
    pub id: i64,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: i64,
}

/// Contact details for a new booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Requested stay of a new booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: i64,
    pub check_out: i64,
    pub adults: i64,
    pub children: i64,
    pub request: String,
    /// Payment deadline asked for at booking time, applied on acceptance.
    pub hold_until: Option<i64>,
}

/// Price of a new booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: ReservationId,
    pub property_id: PropertyId,
    pub customer_id: i64,
    pub booked_by: UserId,
    pub check_in: i64,
    pub check_out: i64,
    pub adults: i64,
    pub children: i64,
    pub request: String,
    pub total_cents: i64,
    pub requested_hold_until: Option<i64>,
    /// Payment deadline; set only while `status` is `Accepted`.
    pub payment_hold_until: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: ReservationStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A reservation joined with the listing and customer it refers to.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReservationView {
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub property_name: String,
    pub property_location: String,
    pub property_owner_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Property,
    Reservation,
}

stored_enum!(EntityKind, "entity kind", [Property, Reservation]);

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvent {
    BookingCreated,
}

stored_enum!(AuditEvent, "audit event", [BookingCreated]);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: i64,
    pub actor_user_id: UserId,
    #[sqlx(try_from = "String")]
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    #[sqlx(try_from = "String")]
    pub event_kind: AuditEvent,
    pub property_id: Option<PropertyId>,
    pub description: String,
}

/// Revenue of one check-in month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`, UTC.
    pub month: String,
    pub revenue_cents: i64,
    pub bookings: i64,
}
