//! Homestay Workflow Engine
//!
//! Core functionality for the Homestay rental backend:
//! - SQLite storage for users, listings, customer details, reservations,
//!   and the append-only audit trail
//! - Listing and reservation lifecycles gated by the shared visibility filter
//! - Post-commit notification dispatch over pluggable transports
//! - The `homestay` command-line surface

pub mod cli;
pub mod identity;
pub mod notifications;
pub mod storage;
pub mod workflow;
