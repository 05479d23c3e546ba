//! Workflow engine: the listing and reservation lifecycles and their readers.
//!
//! Every operation takes the acting [`Actor`], checks it against the
//! visibility filter, validates input, commits the change, and only then
//! dispatches notifications. Dispatch problems come back as warnings inside
//! [`Outcome`], never as a [`WorkflowError`].

pub mod audit;
pub mod format;
pub mod properties;
pub mod reports;
pub mod reservations;
pub mod users;

use std::fmt;

use serde::Serialize;

use homestay_core::Actor;
use homestay_core::config::ReservationConfig;
use homestay_core::db::DatabaseError;
use homestay_core::lifecycle::TransitionError;
use homestay_core::visibility::{Access, Transition, authorize};

use crate::notifications::{DispatchWarning, Dispatcher};
use crate::storage::{Database, User};

pub use audit::AuditLog;
pub use properties::{ImageDelta, ListingDecision, PropertyLifecycle};
pub use reports::Reports;
pub use reservations::{ReservationDecision, ReservationLifecycle};
pub use users::UserRegistry;

/// Errors returned by workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity is not in a state that permits the transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The actor may not invoke the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Persistence failed; nothing was committed.
    #[error("Store error: {0}")]
    Store(DatabaseError),
}

/// Coarse failure category for callers that speak HTTP-like status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    BadRequest,
    NotFound,
    Conflict,
    Forbidden,
    Internal,
}

impl ErrorCategory {
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

impl WorkflowError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::BadRequest,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::InvalidState(_) => ErrorCategory::Conflict,
            Self::PermissionDenied(_) => ErrorCategory::Forbidden,
            Self::Store(_) => ErrorCategory::Internal,
        }
    }
}

impl From<DatabaseError> for WorkflowError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(e: TransitionError) -> Self {
        Self::InvalidState(e.to_string())
    }
}

/// Successful result of an operation plus any notifications that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<DispatchWarning>,
}

impl<T> Outcome<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Record the result of one dispatch attempt.
    pub fn note(&mut self, warning: Option<DispatchWarning>) {
        self.warnings.extend(warning);
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        Ok(())
    }
}

/// Every workflow component, wired to one database and dispatcher.
#[derive(Debug, Clone)]
pub struct Engine {
    pub users: UserRegistry,
    pub properties: PropertyLifecycle,
    pub reservations: ReservationLifecycle,
    pub audit: AuditLog,
    pub reports: Reports,
}

impl Engine {
    pub fn new(db: &Database, dispatcher: &Dispatcher, config: &ReservationConfig) -> Self {
        Self {
            users: UserRegistry::new(db.clone()),
            properties: PropertyLifecycle::new(db.clone(), dispatcher.clone()),
            reservations: ReservationLifecycle::new(db.clone(), dispatcher.clone(), config.clone()),
            audit: AuditLog::new(db.clone()),
            reports: Reports::new(db.clone()),
        }
    }
}

/// Fail with `PermissionDenied` unless `actor` may invoke `transition`.
pub(crate) fn require(actor: &Actor, transition: Transition) -> Result<(), WorkflowError> {
    match authorize(actor, transition) {
        Access::Allow => Ok(()),
        Access::Deny { reason } => Err(WorkflowError::PermissionDenied(reason)),
    }
}

/// Load the acting account. A suspended account may not act, whatever its
/// role allows.
pub(crate) async fn active_account(db: &Database, actor: &Actor) -> Result<User, WorkflowError> {
    let user = db.get_user(actor.id).await?;
    if user.is_active() {
        Ok(user)
    } else {
        Err(WorkflowError::PermissionDenied(format!(
            "account {} is suspended",
            user.id
        )))
    }
}

#[cfg(feature = "metrics")]
pub(crate) fn count_transition(entity: &'static str, to: &'static str) {
    homestay_core::metrics::record_transition(entity, to);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn count_transition(_entity: &'static str, _to: &'static str) {}
