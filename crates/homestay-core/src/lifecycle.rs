//! Transition tables for account, listing, and reservation statuses.
//!
//! Each status enum declares the `(from, to)` edges it permits. Anything not in
//! the table is rejected; there is no implicit "same state" edge, so deciding an
//! already-decided entity is an error rather than a no-op.

use std::fmt::{Debug, Display};

use crate::domain::{Activation, PropertyStatus, ReservationStatus};

/// A transition that is not an edge of the lifecycle graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

/// A finite state machine over a fieldless status enum.
pub trait Lifecycle: Copy + Eq + Debug + Display + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Permitted `(from, to)` edges.
    const EDGES: &'static [(Self, Self)];

    fn can_transition(self, to: Self) -> bool {
        Self::EDGES.iter().any(|&(f, t)| f == self && t == to)
    }

    /// Validate `self -> to`, returning the new state.
    fn transition(self, to: Self) -> Result<Self, TransitionError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: Self::ENTITY,
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl Lifecycle for Activation {
    const ENTITY: &'static str = "account";

    const EDGES: &'static [(Self, Self)] = &[
        (Self::Active, Self::Inactive),
        (Self::Inactive, Self::Active),
    ];
}

impl Lifecycle for PropertyStatus {
    const ENTITY: &'static str = "property";

    // Available and Rejected are terminal; re-listing is a new creation.
    const EDGES: &'static [(Self, Self)] = &[
        (Self::Pending, Self::Available),
        (Self::Pending, Self::Rejected),
    ];
}

impl Lifecycle for ReservationStatus {
    const ENTITY: &'static str = "reservation";

    const EDGES: &'static [(Self, Self)] = &[
        (Self::Pending, Self::Accepted),
        (Self::Pending, Self::Rejected),
        (Self::Pending, Self::Canceled),
        (Self::Accepted, Self::Paid),
        (Self::Accepted, Self::Canceled),
    ];
}
