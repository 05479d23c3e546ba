//! Operator reports.

use homestay_core::Actor;
use homestay_core::domain::ReservationStatus;
use homestay_core::visibility::Transition;

use crate::storage::{Database, MonthlyRevenue};

use super::{WorkflowError, active_account, require};

#[derive(Debug, Clone)]
pub struct Reports {
    db: Database,
}

impl Reports {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Revenue of accepted and paid bookings per check-in month, oldest first.
    pub async fn monthly_revenue(&self, reader: &Actor) -> Result<Vec<MonthlyRevenue>, WorkflowError> {
        require(reader, Transition::ReadReports)?;
        active_account(&self.db, reader).await?;
        Ok(self.db.monthly_revenue(ReservationStatus::REVENUE).await?)
    }
}
