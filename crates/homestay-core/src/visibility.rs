//! Visibility and authorization filter.
//!
//! One place decides what each role may see and which transitions it may
//! invoke. Both lifecycles call into here instead of branching on role in
//! their own queries, so listing and reservation scoping cannot drift apart.
//!
//! A `None` viewer is the anonymous public, which sees exactly what a
//! Customer sees of listings and nothing of reservations.

use serde::{Deserialize, Serialize};

use crate::domain::{Actor, PropertyStatus, ReservationStatus, Role, UserId};

/// Read scope of a viewer over one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Every row.
    Everything,
    /// Only `Available` listings.
    AvailableOnly,
    /// Rows whose (property) owner is the given user.
    OwnedBy(UserId),
    /// Reservations booked by the given user.
    BookedBy(UserId),
    /// No rows.
    Nothing,
}

/// Facts about a reservation the filter needs; resolved by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationFacts {
    pub property_owner_id: UserId,
    pub booked_by: UserId,
    pub status: ReservationStatus,
}

/// Scope of listings visible to a viewer.
pub const fn property_scope(viewer: Option<&Actor>) -> Scope {
    match viewer {
        None => Scope::AvailableOnly,
        Some(actor) => match actor.role {
            Role::Customer => Scope::AvailableOnly,
            Role::Moderator => Scope::OwnedBy(actor.id),
            Role::Administrator => Scope::Everything,
        },
    }
}

/// Scope of reservations visible to a viewer.
pub const fn reservation_scope(viewer: Option<&Actor>) -> Scope {
    match viewer {
        None => Scope::Nothing,
        Some(actor) => match actor.role {
            Role::Customer => Scope::BookedBy(actor.id),
            Role::Moderator => Scope::OwnedBy(actor.id),
            Role::Administrator => Scope::Everything,
        },
    }
}

/// Whether a listing owned by `owner_id` in `status` is visible to `viewer`.
pub fn property_visible(viewer: Option<&Actor>, owner_id: UserId, status: PropertyStatus) -> bool {
    match property_scope(viewer) {
        Scope::Everything => true,
        Scope::AvailableOnly => status == PropertyStatus::Available,
        Scope::OwnedBy(id) => owner_id == id,
        Scope::BookedBy(_) | Scope::Nothing => false,
    }
}

/// Whether a reservation is visible to `viewer`.
///
/// Operator dashboards only ever show reservations in the active set.
pub fn reservation_visible(viewer: Option<&Actor>, facts: &ReservationFacts) -> bool {
    let in_scope = match reservation_scope(viewer) {
        Scope::Everything => true,
        Scope::OwnedBy(id) => facts.property_owner_id == id,
        Scope::BookedBy(id) => facts.booked_by == id,
        Scope::AvailableOnly | Scope::Nothing => false,
    };
    in_scope && facts.status.is_active()
}

/// A transition or privileged read an actor may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Approve or reject a pending listing.
    DecideListing,
    /// Force a listing's status without the transition graph.
    OverrideListing,
    /// Change a listing's descriptive fields or images.
    EditListing { owner_id: UserId },
    /// Accept or reject a pending booking.
    DecideReservation { property_owner_id: UserId },
    /// Record payment for an accepted booking.
    SettleReservation { property_owner_id: UserId },
    /// Cancel a booking.
    CancelReservation {
        property_owner_id: UserId,
        booked_by: UserId,
    },
    /// Ask the property owner to decide on a booking.
    RequestDecision { booked_by: UserId },
    /// Send an alternative listing to a booking's customer.
    SuggestAlternative,
    /// Open a booking for suggestions to other operators.
    BroadcastSuggestion,
    /// Read the audit trail.
    ReadAudit,
    /// Read revenue reports.
    ReadReports,
    /// Suspend or reactivate a user account.
    ManageAccounts,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny { reason: String },
}

impl Access {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }
}

/// Decide whether `actor` may invoke `transition`.
pub fn authorize(actor: &Actor, transition: Transition) -> Access {
    let admin = actor.is_administrator();
    match transition {
        Transition::DecideListing
        | Transition::OverrideListing
        | Transition::ReadAudit
        | Transition::ManageAccounts => {
            if admin {
                Access::Allow
            } else {
                Access::deny("only administrators may do this")
            }
        }
        Transition::ReadReports | Transition::SuggestAlternative | Transition::BroadcastSuggestion => {
            if actor.role.is_operator() {
                Access::Allow
            } else {
                Access::deny("only operators may do this")
            }
        }
        Transition::EditListing { owner_id }
        | Transition::DecideReservation {
            property_owner_id: owner_id,
        }
        | Transition::SettleReservation {
            property_owner_id: owner_id,
        } => {
            if admin || actor.id == owner_id {
                Access::Allow
            } else {
                Access::deny("only the property owner or an administrator may do this")
            }
        }
        Transition::CancelReservation {
            property_owner_id,
            booked_by,
        } => {
            if admin || actor.id == property_owner_id || actor.id == booked_by {
                Access::Allow
            } else {
                Access::deny("only the booker, the property owner or an administrator may cancel")
            }
        }
        Transition::RequestDecision { booked_by } => {
            if actor.role.is_operator() || actor.id == booked_by {
                Access::Allow
            } else {
                Access::deny("only the booker or an operator may request a decision")
            }
        }
    }
}
