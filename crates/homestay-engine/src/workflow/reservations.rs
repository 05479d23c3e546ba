//! Reservation lifecycle: booking, owner decisions, payment, cancellation,
//! and alternative suggestions for declined bookings.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use homestay_core::config::ReservationConfig;
use homestay_core::db::{DatabaseError, unix_timestamp};
use homestay_core::domain::{PropertyStatus, ReservationStatus};
use homestay_core::lifecycle::Lifecycle;
use homestay_core::visibility::{
    ReservationFacts, Scope, Transition, reservation_scope, reservation_visible,
};
use homestay_core::{Actor, PropertyId, ReservationId, UserId};

use crate::notifications::{Dispatcher, EventKind, NotificationEvent, Recipients};
use crate::storage::{
    BookingParams, Database, NewCustomer, Pricing, Property, Reservation, ReservationView, Stay,
};

use super::format::{format_date, format_money, format_timestamp, party_label};
use super::{Outcome, WorkflowError, active_account, count_transition, require};

/// A property owner's verdict on a pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationDecision {
    Accept,
    /// Decline; with `suggest_alternative` the customer is offered a similar
    /// listing instead of a plain rejection notice when one exists.
    Reject { suggest_alternative: bool },
}

impl ReservationDecision {
    pub const fn target(self) -> ReservationStatus {
        match self {
            Self::Accept => ReservationStatus::Accepted,
            Self::Reject { .. } => ReservationStatus::Rejected,
        }
    }
}

/// Governs bookings from request to payment or cancellation.
#[derive(Debug, Clone)]
pub struct ReservationLifecycle {
    db: Database,
    dispatcher: Dispatcher,
    config: ReservationConfig,
}

impl ReservationLifecycle {
    pub const fn new(db: Database, dispatcher: Dispatcher, config: ReservationConfig) -> Self {
        Self {
            db,
            dispatcher,
            config,
        }
    }

    /// Book an `Available` listing on behalf of `actor`.
    ///
    /// Customer details, the `Pending` reservation, and its audit entry are
    /// written in one transaction.
    #[instrument(skip(self, customer, stay, pricing), fields(actor_id = actor.id))]
    pub async fn create_reservation(
        &self,
        actor: &Actor,
        property_id: PropertyId,
        customer: &NewCustomer,
        stay: &Stay,
        pricing: Pricing,
    ) -> Result<Reservation, WorkflowError> {
        validate_stay(stay)?;
        validate_customer(customer)?;
        if pricing.total_cents < 0 {
            return Err(WorkflowError::Validation("total price cannot be negative".into()));
        }

        let party = party_size(stay)?;
        let booker = active_account(&self.db, actor).await?;

        let property = self.db.get_property(property_id).await?;
        if property.status != PropertyStatus::Available {
            return Err(not_bookable(&property));
        }
        if party > property.guest_capacity {
            warn!(
                property_id,
                guests = party,
                capacity = property.guest_capacity,
                "Party exceeds listed capacity"
            );
        }

        let Some(reservation) = self
            .db
            .create_booking(&BookingParams {
                property_id,
                customer,
                stay,
                pricing,
                booked_by: booker.id,
            })
            .await?
        else {
            // The listing left `Available` after the check above.
            return Err(not_bookable(&self.db.get_property(property_id).await?));
        };
        info!(
            reservation_id = reservation.id,
            property_id,
            "Reservation created"
        );
        count_transition(ReservationStatus::ENTITY, reservation.status.as_str());
        Ok(reservation)
    }

    /// Ask the property owner to decide on a `Pending` booking.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn request_decision(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
    ) -> Result<Outcome<()>, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        require(
            actor,
            Transition::RequestDecision {
                booked_by: view.reservation.booked_by,
            },
        )?;
        active_account(&self.db, actor).await?;
        if view.reservation.status != ReservationStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "reservation {reservation_id} is already {}",
                view.reservation.status
            )));
        }
        let owner = self.db.get_user(view.property_owner_id).await?;

        let event = NotificationEvent::new(
            EventKind::BookingRequested,
            Recipients::Users(vec![owner.id]),
        )
        .with("Property", &view.property_name)
        .with("Reservation", view.reservation.id)
        .with("Guest", &view.customer_name)
        .with("Email", &view.customer_email)
        .with("Phone", &view.customer_phone)
        .with("Check-in", format_date(view.reservation.check_in))
        .with("Check-out", format_date(view.reservation.check_out))
        .with("Party", party_label(view.reservation.adults, view.reservation.children))
        .with("Total", format_money(view.reservation.total_cents))
        .with("Request", &view.reservation.request);

        let mut outcome = Outcome::new(());
        outcome.note(self.dispatcher.dispatch(&event).await);
        info!(reservation_id, owner_id = owner.id, "Decision requested");
        Ok(outcome)
    }

    /// Accept or reject a `Pending` booking.
    ///
    /// Of two concurrent decisions on the same booking exactly one commits;
    /// the other fails with `InvalidState`.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn decide(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
        decision: ReservationDecision,
    ) -> Result<Outcome<Reservation>, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        require(
            actor,
            Transition::DecideReservation {
                property_owner_id: view.property_owner_id,
            },
        )?;
        active_account(&self.db, actor).await?;
        let from = view.reservation.status;
        let to = from.transition(decision.target())?;
        let hold = match decision {
            ReservationDecision::Accept => Some(self.payment_deadline(&view.reservation)),
            ReservationDecision::Reject { .. } => None,
        };

        let reservation = self.move_status(reservation_id, from, to, hold).await?;
        info!(reservation_id, status = %reservation.status, "Reservation decided");
        count_transition(ReservationStatus::ENTITY, reservation.status.as_str());

        let mut outcome = Outcome::new(reservation);
        let event = match decision {
            ReservationDecision::Accept => {
                let deadline = outcome.value.payment_hold_until.unwrap_or_default();
                customer_event(EventKind::BookingAccepted, &view)
                    .with("Pay before", format_timestamp(deadline))
            }
            ReservationDecision::Reject {
                suggest_alternative: true,
            } => match self.find_alternative(&view).await {
                Some(alternative) => alternative_event(&view, &alternative),
                None => customer_event(EventKind::BookingRejected, &view),
            },
            ReservationDecision::Reject {
                suggest_alternative: false,
            } => customer_event(EventKind::BookingRejected, &view),
        };
        outcome.note(self.dispatcher.dispatch(&event).await);
        Ok(outcome)
    }

    /// Record payment for an `Accepted` booking. Clears the payment hold.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn mark_paid(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
    ) -> Result<Reservation, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        require(
            actor,
            Transition::SettleReservation {
                property_owner_id: view.property_owner_id,
            },
        )?;
        active_account(&self.db, actor).await?;
        let from = view.reservation.status;
        let to = from.transition(ReservationStatus::Paid)?;

        let reservation = self.move_status(reservation_id, from, to, None).await?;
        info!(reservation_id, "Reservation paid");
        count_transition(ReservationStatus::ENTITY, reservation.status.as_str());
        Ok(reservation)
    }

    /// Cancel a `Pending` or `Accepted` booking. Clears the payment hold.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
    ) -> Result<Reservation, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        require(
            actor,
            Transition::CancelReservation {
                property_owner_id: view.property_owner_id,
                booked_by: view.reservation.booked_by,
            },
        )?;
        active_account(&self.db, actor).await?;
        let from = view.reservation.status;
        let to = from.transition(ReservationStatus::Canceled)?;

        let reservation = self.move_status(reservation_id, from, to, None).await?;
        info!(reservation_id, from = %from, "Reservation canceled");
        count_transition(ReservationStatus::ENTITY, reservation.status.as_str());
        Ok(reservation)
    }

    /// Pick a similar `Available` listing for a `Rejected` booking and offer
    /// it to the customer. `None` when nothing suitable is listed.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn suggest_alternative(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
    ) -> Result<Outcome<Option<Property>>, WorkflowError> {
        require(actor, Transition::SuggestAlternative)?;
        active_account(&self.db, actor).await?;
        let view = self.rejected_view(reservation_id).await?;

        let Some(alternative) = self.best_alternative(&view).await? else {
            info!(reservation_id, "No alternative listing found");
            return Ok(Outcome::new(None));
        };

        let event = alternative_event(&view, &alternative);
        info!(reservation_id, property_id = alternative.id, "Alternative suggested");
        let mut outcome = Outcome::new(Some(alternative));
        outcome.note(self.dispatcher.dispatch(&event).await);
        Ok(outcome)
    }

    /// Offer an operator-chosen `Available` listing for a `Rejected` booking.
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub async fn suggest_property(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
        property_id: PropertyId,
    ) -> Result<Outcome<Property>, WorkflowError> {
        require(actor, Transition::SuggestAlternative)?;
        active_account(&self.db, actor).await?;
        let view = self.rejected_view(reservation_id).await?;
        if property_id == view.reservation.property_id {
            return Err(WorkflowError::Validation(
                "the suggestion must be a different property".into(),
            ));
        }
        let alternative = self.db.get_property(property_id).await?;
        if alternative.status != PropertyStatus::Available {
            return Err(WorkflowError::InvalidState(format!(
                "property {property_id} is {} and cannot be suggested",
                alternative.status
            )));
        }

        let mut outcome = Outcome::new(alternative);
        let event = alternative_event(&view, &outcome.value);
        outcome.note(self.dispatcher.dispatch(&event).await);
        info!(reservation_id, property_id, "Alternative suggested");
        Ok(outcome)
    }

    /// Tell the given operators a booking needs an alternative. The first to
    /// act handles it; nothing is reserved or locked. Returns the number of
    /// operators addressed.
    #[instrument(skip(self, operator_ids), fields(actor_id = actor.id, operators = operator_ids.len()))]
    pub async fn broadcast_for_suggestion(
        &self,
        actor: &Actor,
        reservation_id: ReservationId,
        operator_ids: &[UserId],
    ) -> Result<Outcome<usize>, WorkflowError> {
        require(actor, Transition::BroadcastSuggestion)?;
        active_account(&self.db, actor).await?;
        if operator_ids.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one operator must be addressed".into(),
            ));
        }
        let view = self.db.get_reservation_view(reservation_id).await?;

        let mut ids = operator_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let operators = self.db.list_users_by_ids(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !operators.iter().any(|u| u.id == **id)) {
            return Err(WorkflowError::NotFound(format!("User {missing}")));
        }
        if let Some(user) = operators.iter().find(|u| !u.role.is_operator()) {
            return Err(WorkflowError::Validation(format!(
                "user {} is not an operator",
                user.id
            )));
        }

        let event = NotificationEvent::new(EventKind::SuggestionOpen, Recipients::Users(ids))
            .with("Property", &view.property_name)
            .with("Location", &view.property_location)
            .with("Reservation", view.reservation.id)
            .with("Check-in", format_date(view.reservation.check_in))
            .with("Check-out", format_date(view.reservation.check_out))
            .with("Party", party_label(view.reservation.adults, view.reservation.children))
            .with("Total", format_money(view.reservation.total_cents));

        let mut outcome = Outcome::new(operators.len());
        outcome.note(self.dispatcher.dispatch(&event).await);
        info!(reservation_id, operators = operators.len(), "Suggestion broadcast");
        Ok(outcome)
    }

    /// Reservations in the active set the viewer may see.
    pub async fn list_visible(
        &self,
        viewer: Option<&Actor>,
    ) -> Result<Vec<ReservationView>, WorkflowError> {
        Ok(self
            .db
            .list_reservations(reservation_scope(viewer), ReservationStatus::ACTIVE)
            .await?)
    }

    /// Every booking made by `user_id`, in any status.
    pub async fn list_bookings_for(
        &self,
        actor: &Actor,
        user_id: UserId,
    ) -> Result<Vec<ReservationView>, WorkflowError> {
        if actor.id != user_id && !actor.is_administrator() {
            return Err(WorkflowError::PermissionDenied(
                "only the booker or an administrator may list these bookings".into(),
            ));
        }
        active_account(&self.db, actor).await?;
        Ok(self
            .db
            .list_reservations(Scope::BookedBy(user_id), ReservationStatus::ALL)
            .await?)
    }

    /// A single reservation, if the viewer may see it. Hidden reservations
    /// read as not found.
    pub async fn get(
        &self,
        viewer: Option<&Actor>,
        reservation_id: ReservationId,
    ) -> Result<ReservationView, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        let facts = ReservationFacts {
            property_owner_id: view.property_owner_id,
            booked_by: view.reservation.booked_by,
            status: view.reservation.status,
        };
        if reservation_visible(viewer, &facts) {
            Ok(view)
        } else {
            Err(WorkflowError::NotFound(format!("Reservation {reservation_id}")))
        }
    }

    fn payment_deadline(&self, reservation: &Reservation) -> i64 {
        reservation
            .requested_hold_until
            .unwrap_or_else(|| unix_timestamp().saturating_add(self.config.payment_hold_secs))
    }

    async fn rejected_view(
        &self,
        reservation_id: ReservationId,
    ) -> Result<ReservationView, WorkflowError> {
        let view = self.db.get_reservation_view(reservation_id).await?;
        if view.reservation.status == ReservationStatus::Rejected {
            Ok(view)
        } else {
            Err(WorkflowError::InvalidState(format!(
                "reservation {reservation_id} is {}, alternatives are only offered for rejected bookings",
                view.reservation.status
            )))
        }
    }

    /// Closest `Available` listing in the same location as the booked one.
    async fn best_alternative(
        &self,
        view: &ReservationView,
    ) -> Result<Option<Property>, DatabaseError> {
        let property = self.db.get_property(view.reservation.property_id).await?;
        let candidates = self
            .db
            .find_alternative_candidates(
                &property.location,
                property.id,
                property.price_cents,
                self.config.suggestion_limit,
            )
            .await?;
        Ok(pick_alternative(
            candidates,
            view.reservation.adults.saturating_add(view.reservation.children),
        ))
    }

    /// Like [`Self::best_alternative`], for a rejection that has already
    /// committed: lookup failures are logged and read as "none found".
    async fn find_alternative(&self, view: &ReservationView) -> Option<Property> {
        self.best_alternative(view).await.unwrap_or_else(|e| {
            warn!(reservation_id = view.reservation.id, error = %e, "Alternative lookup failed");
            None
        })
    }

    async fn move_status(
        &self,
        reservation_id: ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
        payment_hold_until: Option<i64>,
    ) -> Result<Reservation, WorkflowError> {
        if let Some(reservation) = self
            .db
            .compare_and_set_reservation_status(reservation_id, from, to, payment_hold_until)
            .await?
        {
            return Ok(reservation);
        }
        // Lost a race: report against whatever state won.
        let now = self.db.get_reservation(reservation_id).await?;
        Err(now.status.transition(to).map_or_else(Into::into, |_| {
            WorkflowError::InvalidState(format!(
                "reservation {reservation_id} changed concurrently"
            ))
        }))
    }
}

/// Choose among candidates already ordered by price distance: listings that
/// fit the whole party come first, then the closest price, then the lowest ID.
pub fn pick_alternative(candidates: Vec<Property>, party: i64) -> Option<Property> {
    candidates
        .into_iter()
        .enumerate()
        .min_by_key(|(rank, p)| (p.guest_capacity < party, *rank))
        .map(|(_, p)| p)
}

fn validate_stay(stay: &Stay) -> Result<(), WorkflowError> {
    if stay.check_in >= stay.check_out {
        return Err(WorkflowError::Validation(
            "check-in must be before check-out".into(),
        ));
    }
    if stay.adults < 1 {
        return Err(WorkflowError::Validation("at least one adult must stay".into()));
    }
    if stay.children < 0 {
        return Err(WorkflowError::Validation("children cannot be negative".into()));
    }
    party_size(stay)?;
    Ok(())
}

fn party_size(stay: &Stay) -> Result<i64, WorkflowError> {
    stay.adults
        .checked_add(stay.children)
        .ok_or_else(|| WorkflowError::Validation("party size is too large".into()))
}

fn not_bookable(property: &Property) -> WorkflowError {
    WorkflowError::InvalidState(format!(
        "property {} is {} and cannot be booked",
        property.id, property.status
    ))
}

fn validate_customer(customer: &NewCustomer) -> Result<(), WorkflowError> {
    if customer.first_name.trim().is_empty() && customer.last_name.trim().is_empty() {
        return Err(WorkflowError::Validation("customer name is required".into()));
    }
    if !customer.email.contains('@') {
        return Err(WorkflowError::Validation(format!(
            "invalid customer email: {}",
            customer.email
        )));
    }
    Ok(())
}

fn customer_event(kind: EventKind, view: &ReservationView) -> NotificationEvent {
    NotificationEvent::new(
        kind,
        Recipients::Addresses(vec![view.customer_email.clone()]),
    )
    .with("Property", &view.property_name)
    .with("Location", &view.property_location)
    .with("Reservation", view.reservation.id)
    .with("Check-in", format_date(view.reservation.check_in))
    .with("Check-out", format_date(view.reservation.check_out))
    .with("Party", party_label(view.reservation.adults, view.reservation.children))
    .with("Total", format_money(view.reservation.total_cents))
}

fn alternative_event(view: &ReservationView, alternative: &Property) -> NotificationEvent {
    NotificationEvent::new(
        EventKind::AlternativeSuggested,
        Recipients::Addresses(vec![view.customer_email.clone()]),
    )
    .with("Property", &alternative.name)
    .with("Location", &alternative.location)
    .with("Price per night", format_money(alternative.price_cents))
    .with("Guests", alternative.guest_capacity)
    .with("Instead of", &view.property_name)
    .with("Reservation", view.reservation.id)
    .with("Check-in", format_date(view.reservation.check_in))
    .with("Check-out", format_date(view.reservation.check_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: i64, capacity: i64) -> Property {
        Property {
            id,
            owner_id: 1,
            name: format!("P{id}"),
            price_cents: 10_000,
            description: String::new(),
            location: "Lisbon".into(),
            bed_type: "Double".into(),
            guest_capacity: capacity,
            status: PropertyStatus::Available,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn alternative_prefers_listings_that_fit_the_party() {
        let picked = pick_alternative(vec![listing(1, 2), listing(2, 4), listing(3, 6)], 4);
        assert_eq!(picked.map(|p| p.id), Some(2));
    }

    #[test]
    fn alternative_falls_back_to_closest_price_when_none_fit() {
        let picked = pick_alternative(vec![listing(5, 1), listing(6, 2)], 4);
        assert_eq!(picked.map(|p| p.id), Some(5));
    }

    #[test]
    fn no_candidates_means_no_alternative() {
        assert!(pick_alternative(Vec::new(), 2).is_none());
    }

    #[test]
    fn inverted_stay_is_invalid() {
        let stay = Stay {
            check_in: 200,
            check_out: 100,
            adults: 2,
            children: 0,
            request: String::new(),
            hold_until: None,
        };
        assert!(matches!(validate_stay(&stay), Err(WorkflowError::Validation(_))));

        let same_day = Stay {
            check_out: 200,
            ..stay
        };
        assert!(matches!(validate_stay(&same_day), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn oversized_party_is_invalid_rather_than_overflowing() {
        let stay = Stay {
            check_in: 100,
            check_out: 200,
            adults: i64::MAX,
            children: 1,
            request: String::new(),
            hold_until: None,
        };
        assert!(matches!(validate_stay(&stay), Err(WorkflowError::Validation(_))));
        assert!(matches!(party_size(&stay), Err(WorkflowError::Validation(_))));
    }
}
