//! Storage layer tests for Homestay.

#![allow(clippy::unwrap_used)]

use homestay_core::domain::{Activation, PropertyStatus, ReservationStatus, Role};
use homestay_core::visibility::Scope;

use super::db::Database;
use super::models::{
    AuditEvent, NewCustomer, NewUser, Pricing, PropertyDetails, PropertyUpdate, Stay, User,
};
use super::BookingParams;
use super::DatabaseError;

async fn test_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

async fn user(db: &Database, username: &str, role: Role) -> User {
    db.create_user(&NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: username.to_string(),
        last_name: "Tester".to_string(),
        title: String::new(),
        role,
    })
    .await
    .unwrap()
}

fn details(name: &str, location: &str, price_cents: i64) -> PropertyDetails {
    PropertyDetails {
        name: name.to_string(),
        price_cents,
        description: "Sea view".to_string(),
        location: location.to_string(),
        bed_type: "Queen".to_string(),
        guest_capacity: 4,
    }
}

fn customer() -> NewCustomer {
    NewCustomer {
        title: "Ms".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Guest".to_string(),
        email: "ada@guest.test".to_string(),
        phone: "555-0100".to_string(),
    }
}

fn stay() -> Stay {
    Stay {
        check_in: 1_709_251_200,  // 2024-03-01
        check_out: 1_709_596_800, // 2024-03-05
        adults: 2,
        children: 1,
        request: "Late arrival".to_string(),
        hold_until: None,
    }
}

// === User tests ===

#[tokio::test]
async fn user_activation_moves_only_from_the_expected_state() {
    let db = test_db().await;
    let alice = user(&db, "alice", Role::Moderator).await;
    assert!(alice.is_active());

    let suspended = db
        .compare_and_set_user_activation(alice.id, Activation::Active, Activation::Inactive)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(suspended.activation, Activation::Inactive);

    let again = db
        .compare_and_set_user_activation(alice.id, Activation::Active, Activation::Inactive)
        .await
        .unwrap();
    assert!(again.is_none());
    assert!(!db.get_user(alice.id).await.unwrap().is_active());
}

#[tokio::test]
async fn create_and_get_user() {
    let db = test_db().await;
    let alice = user(&db, "alice", Role::Moderator).await;

    let fetched = db.get_user(alice.id).await.unwrap();
    assert_eq!(fetched.username, "alice");
    assert_eq!(fetched.role, Role::Moderator);
    assert_eq!(fetched.display_name(), "alice Tester");
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let db = test_db().await;
    assert!(matches!(db.get_user(42).await, Err(DatabaseError::NotFound(_))));
}

#[tokio::test]
async fn user_exists_matches_username_or_email() {
    let db = test_db().await;
    user(&db, "alice", Role::Customer).await;

    assert!(db.user_exists("alice", "other@example.com").await.unwrap());
    assert!(db.user_exists("someone", "ALICE@example.com").await.unwrap());
    assert!(!db.user_exists("bob", "bob@example.com").await.unwrap());
}

#[tokio::test]
async fn users_by_role_and_ids() {
    let db = test_db().await;
    let admin = user(&db, "root", Role::Administrator).await;
    let moderator = user(&db, "mod", Role::Moderator).await;
    user(&db, "cust", Role::Customer).await;

    let admins = db.list_users_with_roles(&[Role::Administrator]).await.unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].id, admin.id);

    let operators = db
        .list_users_with_roles(&[Role::Moderator, Role::Administrator])
        .await
        .unwrap();
    assert_eq!(operators.len(), 2);

    let picked = db.list_users_by_ids(&[moderator.id, 999]).await.unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].id, moderator.id);

    assert!(db.list_users_by_ids(&[]).await.unwrap().is_empty());
}

// === Property tests ===

#[tokio::test]
async fn create_property_stores_images_in_order() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Moderator).await;

    let property = db
        .create_property(
            owner.id,
            &details("Cliff House", "Ubud", 12_000),
            PropertyStatus::Pending,
            &[b"first".to_vec(), b"second".to_vec()],
        )
        .await
        .unwrap();

    assert_eq!(property.status, PropertyStatus::Pending);
    let images = db.get_property_images(property.id).await.unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].data, b"first");
    assert_eq!(images[1].position, 1);
}

#[tokio::test]
async fn list_properties_honours_scope() {
    let db = test_db().await;
    let a = user(&db, "a", Role::Moderator).await;
    let b = user(&db, "b", Role::Moderator).await;
    let img = [b"x".to_vec()];

    db.create_property(a.id, &details("A1", "Ubud", 100), PropertyStatus::Pending, &img)
        .await
        .unwrap();
    db.create_property(a.id, &details("A2", "Ubud", 100), PropertyStatus::Available, &img)
        .await
        .unwrap();
    db.create_property(b.id, &details("B1", "Ubud", 100), PropertyStatus::Available, &img)
        .await
        .unwrap();

    assert_eq!(db.list_properties(Scope::Everything).await.unwrap().len(), 3);
    assert_eq!(db.list_properties(Scope::AvailableOnly).await.unwrap().len(), 2);

    let owned = db.list_properties(Scope::OwnedBy(a.id)).await.unwrap();
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().all(|p| p.owner_id == a.id));

    assert!(db.list_properties(Scope::Nothing).await.unwrap().is_empty());
}

#[tokio::test]
async fn compare_and_set_only_moves_from_expected_status() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Moderator).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Pending, &[vec![1]])
        .await
        .unwrap();

    let moved = db
        .compare_and_set_property_status(property.id, PropertyStatus::Pending, PropertyStatus::Available)
        .await
        .unwrap();
    assert_eq!(moved.unwrap().status, PropertyStatus::Available);

    let again = db
        .compare_and_set_property_status(property.id, PropertyStatus::Pending, PropertyStatus::Rejected)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(
        db.get_property(property.id).await.unwrap().status,
        PropertyStatus::Available
    );
}

#[tokio::test]
async fn update_property_edits_fields_and_images() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Moderator).await;
    let property = db
        .create_property(
            owner.id,
            &details("Old", "Ubud", 1),
            PropertyStatus::Pending,
            &[b"keep".to_vec(), b"drop".to_vec()],
        )
        .await
        .unwrap();
    let images = db.get_property_images(property.id).await.unwrap();

    let PropertyUpdate::Updated(updated) = db
        .update_property(
            property.id,
            &details("New", "Canggu", 2),
            &[images[1].id],
            &[b"added".to_vec()],
        )
        .await
        .unwrap()
    else {
        panic!("listing should have been updated");
    };

    assert_eq!(updated.name, "New");
    assert_eq!(updated.location, "Canggu");
    assert_eq!(updated.status, PropertyStatus::Pending);

    let images = db.get_property_images(property.id).await.unwrap();
    let data: Vec<&[u8]> = images.iter().map(|i| i.data.as_slice()).collect();
    assert_eq!(data, vec![b"keep".as_slice(), b"added".as_slice()]);
}

#[tokio::test]
async fn update_property_checks_images_inside_the_transaction() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Moderator).await;
    let property = db
        .create_property(owner.id, &details("Old", "Ubud", 1), PropertyStatus::Pending, &[vec![1]])
        .await
        .unwrap();
    let only = db.get_property_images(property.id).await.unwrap()[0].id;

    let unknown = db
        .update_property(property.id, &details("New", "Ubud", 1), &[only + 100], &[])
        .await
        .unwrap();
    assert!(matches!(unknown, PropertyUpdate::UnknownImage(id) if id == only + 100));

    let emptied = db
        .update_property(property.id, &details("New", "Ubud", 1), &[only], &[])
        .await
        .unwrap();
    assert!(matches!(emptied, PropertyUpdate::NoImagesLeft));

    // Neither rejected edit touched the row.
    assert_eq!(db.get_property(property.id).await.unwrap().name, "Old");
    assert_eq!(db.get_property_images(property.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_missing_property_is_not_found() {
    let db = test_db().await;
    let result = db.update_property(7, &details("X", "Y", 1), &[], &[]).await;
    assert!(matches!(result, Err(DatabaseError::NotFound(_))));
}

#[tokio::test]
async fn alternative_candidates_are_closest_in_price() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Administrator).await;
    let img = [vec![0]];
    let rejected = db
        .create_property(owner.id, &details("Base", "Ubud", 10_000), PropertyStatus::Available, &img)
        .await
        .unwrap();
    let far = db
        .create_property(owner.id, &details("Far", "ubud", 50_000), PropertyStatus::Available, &img)
        .await
        .unwrap();
    let near = db
        .create_property(owner.id, &details("Near", "Ubud", 11_000), PropertyStatus::Available, &img)
        .await
        .unwrap();
    db.create_property(owner.id, &details("Elsewhere", "Kuta", 10_000), PropertyStatus::Available, &img)
        .await
        .unwrap();
    db.create_property(owner.id, &details("Unlisted", "Ubud", 10_000), PropertyStatus::Pending, &img)
        .await
        .unwrap();

    let candidates = db
        .find_alternative_candidates("Ubud", rejected.id, 10_000, 10)
        .await
        .unwrap();
    let ids: Vec<_> = candidates.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![near.id, far.id]);
}

// === Reservation tests ===

#[tokio::test]
async fn create_booking_writes_reservation_and_one_audit_entry() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Administrator).await;
    let guest = user(&db, "guest", Role::Customer).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();

    let customer = customer();
    let stay = stay();
    let reservation = db
        .create_booking(&BookingParams {
            property_id: property.id,
            customer: &customer,
            stay: &stay,
            pricing: Pricing { total_cents: 48_000 },
            booked_by: guest.id,
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.booked_by, guest.id);
    assert!(reservation.payment_hold_until.is_none());

    let entries = db.list_audit_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_user_id, guest.id);
    assert_eq!(entries[0].entity_id, reservation.id);
    assert_eq!(entries[0].event_kind, AuditEvent::BookingCreated);
    assert_eq!(entries[0].property_id, Some(property.id));

    let view = db.get_reservation_view(reservation.id).await.unwrap();
    assert_eq!(view.customer_name, "Ada Guest");
    assert_eq!(view.customer_email, "ada@guest.test");
    assert_eq!(view.property_owner_id, owner.id);
}

#[tokio::test]
async fn booking_a_listing_that_is_not_available_writes_nothing() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Moderator).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Pending, &[vec![1]])
        .await
        .unwrap();

    let customer = customer();
    let stay = stay();
    let booked = db
        .create_booking(&BookingParams {
            property_id: property.id,
            customer: &customer,
            stay: &stay,
            pricing: Pricing { total_cents: 1 },
            booked_by: owner.id,
        })
        .await
        .unwrap();

    assert!(booked.is_none());
    assert_eq!(db.count_audit_entries().await.unwrap(), 0);
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_details")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn inverted_stay_is_rejected_by_the_schema() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Administrator).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();

    let customer = customer();
    let mut stay = stay();
    std::mem::swap(&mut stay.check_in, &mut stay.check_out);
    let result = db
        .create_booking(&BookingParams {
            property_id: property.id,
            customer: &customer,
            stay: &stay,
            pricing: Pricing { total_cents: 1 },
            booked_by: owner.id,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(db.count_audit_entries().await.unwrap(), 0);
}

#[tokio::test]
async fn audit_entries_cannot_be_rewritten() {
    let db = test_db().await;
    let owner = user(&db, "owner", Role::Administrator).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();
    let customer = customer();
    let stay = stay();
    db.create_booking(&BookingParams {
        property_id: property.id,
        customer: &customer,
        stay: &stay,
        pricing: Pricing { total_cents: 1 },
        booked_by: owner.id,
    })
    .await
    .unwrap()
    .unwrap();

    let update = sqlx::query("UPDATE audit_entries SET description = 'edited'")
        .execute(db.pool())
        .await;
    assert!(update.is_err());
    let delete = sqlx::query("DELETE FROM audit_entries").execute(db.pool()).await;
    assert!(delete.is_err());
    assert_eq!(db.count_audit_entries().await.unwrap(), 1);
}

#[tokio::test]
async fn list_reservations_by_scope_and_status() {
    let db = test_db().await;
    let owner_a = user(&db, "a", Role::Moderator).await;
    let owner_b = user(&db, "b", Role::Moderator).await;
    let guest = user(&db, "guest", Role::Customer).await;
    let pa = db
        .create_property(owner_a.id, &details("A", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();
    let pb = db
        .create_property(owner_b.id, &details("B", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();

    let customer = customer();
    let stay = stay();
    for (property_id, booked_by) in [(pa.id, guest.id), (pb.id, guest.id), (pb.id, owner_a.id)] {
        db.create_booking(&BookingParams {
            property_id,
            customer: &customer,
            stay: &stay,
            pricing: Pricing { total_cents: 1 },
            booked_by,
        })
        .await
        .unwrap()
        .unwrap();
    }

    let active = ReservationStatus::ACTIVE;
    assert_eq!(db.list_reservations(Scope::Everything, active).await.unwrap().len(), 3);

    let owned = db.list_reservations(Scope::OwnedBy(owner_b.id), active).await.unwrap();
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().all(|r| r.property_owner_id == owner_b.id));

    let mine = db.list_reservations(Scope::BookedBy(guest.id), active).await.unwrap();
    assert_eq!(mine.len(), 2);

    let paid = db
        .list_reservations(Scope::Everything, &[ReservationStatus::Paid])
        .await
        .unwrap();
    assert!(paid.is_empty());
}

#[tokio::test]
async fn monthly_revenue_counts_accepted_and_paid_only() {
    use ReservationStatus::{Accepted, Paid, Pending};

    let db = test_db().await;
    let owner = user(&db, "owner", Role::Administrator).await;
    let property = db
        .create_property(owner.id, &details("P", "Ubud", 1), PropertyStatus::Available, &[vec![1]])
        .await
        .unwrap();
    let customer = customer();
    let march = stay();
    let april = Stay {
        check_in: 1_711_929_600,  // 2024-04-01
        check_out: 1_712_016_000, // 2024-04-02
        ..stay()
    };

    let mut ids = Vec::new();
    for (stay, total) in [(&march, 10_000), (&march, 5_000), (&april, 7_000), (&april, 9_999)] {
        let r = db
            .create_booking(&BookingParams {
                property_id: property.id,
                customer: &customer,
                stay,
                pricing: Pricing { total_cents: total },
                booked_by: owner.id,
            })
            .await
            .unwrap()
            .unwrap();
        ids.push(r.id);
    }

    db.compare_and_set_reservation_status(ids[0], Pending, Accepted, Some(1))
        .await
        .unwrap();
    db.compare_and_set_reservation_status(ids[1], Pending, Accepted, Some(1))
        .await
        .unwrap();
    db.compare_and_set_reservation_status(ids[1], Accepted, Paid, None)
        .await
        .unwrap();
    db.compare_and_set_reservation_status(ids[2], Pending, Accepted, Some(1))
        .await
        .unwrap();

    let report = db.monthly_revenue(ReservationStatus::REVENUE).await.unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].month, "2024-03");
    assert_eq!(report[0].revenue_cents, 15_000);
    assert_eq!(report[0].bookings, 2);
    assert_eq!(report[1].month, "2024-04");
    assert_eq!(report[1].revenue_cents, 7_000);
}
