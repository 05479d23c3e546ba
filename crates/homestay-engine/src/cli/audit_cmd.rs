//! Audit trail output (administrators).

use std::io::Write;

use crate::workflow::format::format_timestamp;

use super::Context;

/// Print the audit trail, or only the booking log with `bookings_only`.
pub async fn run(bookings_only: bool, ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    if bookings_only {
        let log = ctx.engine.audit.booking_log(actor).await?;
        if log.is_empty() {
            writeln!(out, "No bookings recorded")?;
            return Ok(());
        }
        writeln!(out, "{:<20} {:<6} {:<12} {:<9}", "WHEN", "BY", "RESERVATION", "PROPERTY")?;
        for entry in &log {
            writeln!(
                out,
                "{:<20} {:<6} {:<12} {:<9}",
                format_timestamp(entry.timestamp),
                entry.actor_user_id,
                entry.reservation_id,
                entry.property_id
            )?;
        }
        return Ok(());
    }

    let entries = ctx.engine.audit.entries(actor).await?;
    if entries.is_empty() {
        writeln!(out, "No audit entries")?;
        return Ok(());
    }
    for e in &entries {
        writeln!(
            out,
            "{}  user {}  {} {} {}: {}",
            format_timestamp(e.timestamp),
            e.actor_user_id,
            e.event_kind,
            e.entity_kind,
            e.entity_id,
            e.description
        )?;
    }
    Ok(())
}
