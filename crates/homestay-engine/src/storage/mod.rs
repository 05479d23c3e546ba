//! SQLite storage for the Homestay workflow engine.
//!
//! Provides persistence for users, property listings and their images,
//! customer details, reservations, and the append-only audit trail.
//!
//! Status changes go through compare-and-set updates (`... WHERE id = ? AND
//! status = ?`); a `None` result means the row was missing or had already
//! moved, and the caller decides which.

mod db;
mod models;
mod queries_audit;
mod queries_properties;
mod queries_reservations;
mod queries_users;

#[cfg(test)]
mod tests;

pub use db::Database;
pub use homestay_core::db::DatabaseError;
pub use models::*;
pub use queries_reservations::BookingParams;
