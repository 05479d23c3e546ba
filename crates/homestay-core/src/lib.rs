//! Homestay Core Library
//!
//! Shared functionality for Homestay components:
//! - Roles, actors, and the typed status enums of accounts, listings, and
//!   reservations
//! - Transition tables for the account, listing, and reservation lifecycles
//! - The visibility/authorization filter shared by both lifecycles
//! - Configuration resolution and hierarchy
//! - Database pool helpers and tracing initialisation

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod lifecycle;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod tracing_init;
pub mod visibility;

pub use config::Config;
pub use domain::{
    Activation, Actor, PropertyId, PropertyStatus, ReservationId, ReservationStatus, Role, UserId,
};
pub use error::{Error, Result};
pub use lifecycle::{Lifecycle, TransitionError};
