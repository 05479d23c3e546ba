//! Report subcommands: revenue.

use std::io::Write;

use crate::workflow::format::format_money;

use super::Context;

/// Report subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ReportAction {
    /// Accepted and paid revenue per check-in month.
    Revenue,
}

/// Execute a report subcommand.
pub async fn run(action: ReportAction, ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        ReportAction::Revenue => {
            let rows = ctx.engine.reports.monthly_revenue(ctx.actor()?).await?;
            if rows.is_empty() {
                writeln!(out, "No revenue recorded")?;
                return Ok(());
            }
            writeln!(out, "{:<8} {:>12} {:>9}", "MONTH", "REVENUE", "BOOKINGS")?;
            for row in &rows {
                writeln!(
                    out,
                    "{:<8} {:>12} {:>9}",
                    row.month,
                    format_money(row.revenue_cents),
                    row.bookings
                )?;
            }
            Ok(())
        }
    }
}
