//! Domain vocabulary shared by the storage layer and both lifecycles.
//!
//! Statuses and roles are persisted as their [`as_str`](Role::as_str) text and
//! parsed back through `TryFrom<String>`, so an unknown value in the database
//! surfaces as a decode error instead of a silently-wrong branch.

use serde::{Deserialize, Serialize};

/// Row identifier of a user account.
pub type UserId = i64;
/// Row identifier of a property listing.
pub type PropertyId = i64;
/// Row identifier of a reservation.
pub type ReservationId = i64;

/// Generates `ALL`, `as_str`, `Display`, `FromStr` and `TryFrom<String>` for
/// a fieldless enum whose variants are stored under their own names.
#[macro_export]
macro_rules! stored_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored / wire representation.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::error::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| $crate::error::Error::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl ::std::convert::TryFrom<String> for $ty {
            type Error = $crate::error::Error;

            fn try_from(value: String) -> ::std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// Role of a user account. Immutable once the account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Moderator,
    Administrator,
}

stored_enum!(Role, "role", [Customer, Moderator, Administrator]);

impl Role {
    /// The "Operator" read scope: Moderator or Administrator.
    pub const fn is_operator(self) -> bool {
        matches!(self, Self::Moderator | Self::Administrator)
    }
}

/// Identity of the caller invoking a workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub const fn is_administrator(&self) -> bool {
        matches!(self.role, Role::Administrator)
    }
}

/// Whether an account may act. Suspension is reversible and never deletes
/// anything the account owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Active,
    Inactive,
}

stored_enum!(Activation, "activation", [Active, Inactive]);

/// Moderation status of a property listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
    Pending,
    Available,
    Rejected,
}

stored_enum!(PropertyStatus, "property status", [Pending, Available, Rejected]);

impl PropertyStatus {
    /// Status a new listing starts in, given the role of its owner.
    pub const fn initial_for(owner_role: Role) -> Self {
        match owner_role {
            Role::Administrator => Self::Available,
            Role::Customer | Role::Moderator => Self::Pending,
        }
    }
}

/// Booking status of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Accepted,
    Rejected,
    Paid,
    Canceled,
}

stored_enum!(
    ReservationStatus,
    "reservation status",
    [Pending, Accepted, Rejected, Paid, Canceled]
);

impl ReservationStatus {
    /// Statuses shown on operator dashboards.
    pub const ACTIVE: &'static [Self] = &[
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
        Self::Canceled,
        Self::Paid,
    ];

    /// Statuses that count towards revenue.
    pub const REVENUE: &'static [Self] = &[Self::Accepted, Self::Paid];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}
