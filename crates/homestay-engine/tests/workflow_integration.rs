#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for the workflow engine.
//!
//! Tests full flows across storage, lifecycles, and dispatch: booking through
//! rejection with an alternative, transport outages, concurrent decisions on
//! a file database, and role-scoped reads.

use std::sync::Arc;

use homestay_core::config::ReservationConfig;
use homestay_core::domain::{PropertyStatus, ReservationStatus, Role};
use homestay_core::visibility::Scope;
use homestay_core::Actor;
use homestay_engine::notifications::{Dispatcher, EventKind, MemoryTransport};
use homestay_engine::storage::{
    Database, NewCustomer, NewUser, Pricing, Property, PropertyDetails, Stay,
};
use homestay_engine::workflow::{Engine, ListingDecision, ReservationDecision, WorkflowError};

const MARCH_1: i64 = 1_709_251_200;
const MARCH_5: i64 = 1_709_596_800;

struct Harness {
    db: Database,
    transport: Arc<MemoryTransport>,
    engine: Engine,
}

impl Harness {
    fn new(db: Database) -> Self {
        let transport = Arc::new(MemoryTransport::new());
        let dispatcher = Dispatcher::new(
            Arc::new(db.clone()),
            transport.clone(),
            "bookings@homestay.local",
        );
        let engine = Engine::new(&db, &dispatcher, &ReservationConfig::default());
        Self {
            db,
            transport,
            engine,
        }
    }

    async fn in_memory() -> Self {
        Self::new(Database::open_in_memory().await.unwrap())
    }

    async fn user(&self, username: &str, role: Role) -> Actor {
        let user = self
            .engine
            .users
            .create_user(&NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: username.into(),
                last_name: "Example".into(),
                title: String::new(),
                role,
            })
            .await
            .unwrap();
        Actor::new(user.id, user.role)
    }

    async fn listing(&self, owner: &Actor, name: &str, location: &str, price_cents: i64) -> Property {
        self.engine
            .properties
            .create_listing(
                owner,
                &PropertyDetails {
                    name: name.into(),
                    price_cents,
                    description: String::new(),
                    location: location.into(),
                    bed_type: "Double".into(),
                    guest_capacity: 2,
                },
                &[vec![1], vec![2]],
            )
            .await
            .unwrap()
            .value
    }

    async fn book(&self, booker: &Actor, property_id: i64) -> i64 {
        self.engine
            .reservations
            .create_reservation(booker, property_id, &guest(), &march_stay(), Pricing {
                total_cents: 40_000,
            })
            .await
            .unwrap()
            .id
    }
}

fn guest() -> NewCustomer {
    NewCustomer {
        title: "Mr".into(),
        first_name: "Tom".into(),
        last_name: "Reed".into(),
        email: "tom.reed@example.com".into(),
        phone: String::new(),
    }
}

fn march_stay() -> Stay {
    Stay {
        check_in: MARCH_1,
        check_out: MARCH_5,
        adults: 2,
        children: 0,
        request: String::new(),
        hold_until: None,
    }
}

#[tokio::test]
async fn initial_listing_status_follows_owner_role() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let moderator = h.user("mod", Role::Moderator).await;
    let customer = h.user("cust", Role::Customer).await;

    assert_eq!(h.listing(&admin, "A", "Faro", 100).await.status, PropertyStatus::Available);
    assert_eq!(h.listing(&moderator, "M", "Faro", 100).await.status, PropertyStatus::Pending);
    assert_eq!(h.listing(&customer, "C", "Faro", 100).await.status, PropertyStatus::Pending);
}

#[tokio::test]
async fn rejected_booking_is_offered_a_similar_listing() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;

    let p1 = h.listing(&admin, "Old Town Loft", "Lisbon", 10_000).await;
    assert_eq!(p1.status, PropertyStatus::Available);
    let p2 = h.listing(&admin, "River House", "Lisbon", 11_000).await;
    h.listing(&admin, "Beach Hut", "Faro", 10_000).await;

    let r1 = h.book(&customer, p1.id).await;
    assert_eq!(
        h.db.get_reservation(r1).await.unwrap().status,
        ReservationStatus::Pending
    );
    let entries = h.db.list_audit_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_user_id, customer.id);
    assert_eq!(entries[0].entity_id, r1);
    assert_eq!(entries[0].property_id, Some(p1.id));
    assert!(entries[0].description.contains(&r1.to_string()));
    assert!(entries[0].description.contains(&p1.id.to_string()));

    let outcome = h
        .engine
        .reservations
        .decide(&admin, r1, ReservationDecision::Reject { suggest_alternative: true })
        .await
        .unwrap();
    assert_eq!(outcome.value.status, ReservationStatus::Rejected);
    assert!(outcome.warnings.is_empty());

    let sent = h.transport.sent_to("tom.reed@example.com").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, format!("Alternative stay suggested: {}", p2.name));
    assert!(sent[0].body.contains("Instead of: Old Town Loft"));
}

#[tokio::test]
async fn offline_transport_does_not_undo_acceptance() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;
    let p1 = h.listing(&admin, "Loft", "Lisbon", 10_000).await;
    let r1 = h.book(&customer, p1.id).await;

    h.transport.set_offline(true);
    let outcome = h
        .engine
        .reservations
        .decide(&admin, r1, ReservationDecision::Accept)
        .await
        .unwrap();

    assert_eq!(outcome.value.status, ReservationStatus::Accepted);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, EventKind::BookingAccepted);
    assert_eq!(
        h.db.get_reservation(r1).await.unwrap().status,
        ReservationStatus::Accepted
    );
    assert!(h.transport.sent().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_decisions_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("homestay.db"), 5).await.unwrap();
    let h = Harness::new(db);
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;
    let p1 = h.listing(&admin, "Loft", "Lisbon", 10_000).await;

    for _ in 0..5 {
        let r = h.book(&customer, p1.id).await;
        let a = h.engine.reservations.clone();
        let b = h.engine.reservations.clone();
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.decide(&admin, r, ReservationDecision::Accept).await }),
            tokio::spawn(async move { b.decide(&admin, r, ReservationDecision::Accept).await }),
        );
        let results = [first.unwrap(), second.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, WorkflowError::InvalidState(_)), "got: {loser}");
        assert_eq!(
            h.db.get_reservation(r).await.unwrap().status,
            ReservationStatus::Accepted
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_listing_decisions_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("homestay.db"), 5).await.unwrap();
    let h = Harness::new(db);
    let admin = h.user("admin", Role::Administrator).await;
    let moderator = h.user("mod", Role::Moderator).await;

    for round in 0..5 {
        let pending = h.listing(&moderator, &format!("Queued {round}"), "Lisbon", 100).await;
        let a = h.engine.properties.clone();
        let b = h.engine.properties.clone();
        let id = pending.id;
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.decide_listing(&admin, id, ListingDecision::Approve).await }),
            tokio::spawn(async move { b.decide_listing(&admin, id, ListingDecision::Reject).await }),
        );
        let results = [first.unwrap(), second.unwrap()];

        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, WorkflowError::InvalidState(_)), "got: {loser}");
        assert_eq!(
            h.db.get_property(id).await.unwrap().status,
            winner.value.status
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn booking_racing_a_withdrawal_never_books_a_withdrawn_listing() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("homestay.db"), 5).await.unwrap();
    let h = Harness::new(db);
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;

    for round in 0..5 {
        let p = h.listing(&admin, &format!("Loft {round}"), "Lisbon", 100).await;
        let reservations = h.engine.reservations.clone();
        let properties = h.engine.properties.clone();
        let id = p.id;
        let (booked, withdrawn) = tokio::join!(
            tokio::spawn(async move {
                reservations
                    .create_reservation(&customer, id, &guest(), &march_stay(), Pricing {
                        total_cents: 1,
                    })
                    .await
            }),
            tokio::spawn(async move {
                properties.set_status(&admin, id, PropertyStatus::Pending).await
            }),
        );
        withdrawn.unwrap().unwrap();

        match booked.unwrap() {
            Ok(reservation) => assert_eq!(reservation.property_id, id),
            Err(err) => assert!(matches!(err, WorkflowError::InvalidState(_)), "got: {err}"),
        }
    }

    let reservations = h
        .db
        .list_reservations(Scope::Everything, ReservationStatus::ALL)
        .await
        .unwrap();
    assert_eq!(
        h.db.count_audit_entries().await.unwrap(),
        i64::try_from(reservations.len()).unwrap()
    );
}

#[tokio::test]
async fn redeciding_a_listing_is_an_invalid_state() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let moderator = h.user("mod", Role::Moderator).await;
    let listed = h.listing(&admin, "Direct", "Lisbon", 100).await;
    let pending = h.listing(&moderator, "Queued", "Lisbon", 100).await;

    h.engine
        .properties
        .decide_listing(&admin, pending.id, ListingDecision::Reject)
        .await
        .unwrap();

    for id in [listed.id, pending.id] {
        for decision in [ListingDecision::Approve, ListingDecision::Reject] {
            let err = h
                .engine
                .properties
                .decide_listing(&admin, id, decision)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidState(_)));
        }
    }
}

#[tokio::test]
async fn inverted_stay_leaves_no_trace() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;
    let p1 = h.listing(&admin, "Loft", "Lisbon", 10_000).await;

    for (check_in, check_out) in [(MARCH_5, MARCH_1), (MARCH_1, MARCH_1)] {
        let stay = Stay {
            check_in,
            check_out,
            ..march_stay()
        };
        let err = h
            .engine
            .reservations
            .create_reservation(&customer, p1.id, &guest(), &stay, Pricing { total_cents: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    assert!(
        h.db.list_reservations(Scope::Everything, ReservationStatus::ALL)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(h.db.count_audit_entries().await.unwrap(), 0);
}

#[tokio::test]
async fn moderators_only_see_their_own_listings_and_bookings() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let mod_a = h.user("mod_a", Role::Moderator).await;
    let mod_b = h.user("mod_b", Role::Moderator).await;
    let customer = h.user("cust", Role::Customer).await;

    let a1 = h.listing(&mod_a, "A1", "Lisbon", 100).await;
    let b1 = h.listing(&mod_b, "B1", "Lisbon", 100).await;
    h.listing(&admin, "Admin", "Lisbon", 100).await;
    for p in [&a1, &b1] {
        h.engine
            .properties
            .decide_listing(&admin, p.id, ListingDecision::Approve)
            .await
            .unwrap();
        h.book(&customer, p.id).await;
    }

    for moderator in [&mod_a, &mod_b] {
        let properties = h.engine.properties.list_visible(Some(moderator)).await.unwrap();
        assert_eq!(properties.len(), 1);
        assert!(properties.iter().all(|p| p.owner_id == moderator.id));

        let reservations = h.engine.reservations.list_visible(Some(moderator)).await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert!(reservations.iter().all(|r| r.property_owner_id == moderator.id));
    }

    assert_eq!(h.engine.properties.list_visible(Some(&admin)).await.unwrap().len(), 3);
    assert_eq!(h.engine.reservations.list_visible(Some(&admin)).await.unwrap().len(), 2);
    assert_eq!(h.engine.properties.list_visible(None).await.unwrap().len(), 3);
    assert_eq!(h.engine.reservations.list_visible(Some(&customer)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn cancel_clears_the_payment_hold() {
    let h = Harness::in_memory().await;
    let admin = h.user("admin", Role::Administrator).await;
    let customer = h.user("cust", Role::Customer).await;
    let p1 = h.listing(&admin, "Loft", "Lisbon", 10_000).await;
    let r1 = h.book(&customer, p1.id).await;

    let accepted = h
        .engine
        .reservations
        .decide(&admin, r1, ReservationDecision::Accept)
        .await
        .unwrap();
    assert!(accepted.value.payment_hold_until.is_some());

    let canceled = h.engine.reservations.cancel(&customer, r1).await.unwrap();
    assert_eq!(canceled.status, ReservationStatus::Canceled);
    assert_eq!(canceled.payment_hold_until, None);

    let err = h.engine.reservations.mark_paid(&admin, r1).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}
