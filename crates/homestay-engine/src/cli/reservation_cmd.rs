//! Reservation subcommands: create, request-decision, decide, pay, cancel,
//! suggest, broadcast, list, mine, show.

use std::io::Write;

use homestay_core::{PropertyId, ReservationId, UserId};

use crate::storage::{NewCustomer, Pricing, ReservationView, Stay};
use crate::workflow::{Outcome, ReservationDecision};
use crate::workflow::format::{
    format_date, format_money, format_timestamp, parse_money, parse_timestamp, party_label,
};

use super::{Context, clip, print_warnings};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum DecisionArg {
    Accept,
    Reject,
}

/// Reservation subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ReservationAction {
    /// Book an available property.
    Create {
        property_id: PropertyId,
        /// YYYY-MM-DD or RFC 3339.
        #[arg(long)]
        check_in: String,
        #[arg(long)]
        check_out: String,
        #[arg(long, default_value_t = 1)]
        adults: i64,
        #[arg(long, default_value_t = 0)]
        children: i64,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        request: String,
        /// Total price, e.g. 480.00.
        #[arg(long)]
        total: String,
        /// Payment deadline to apply on acceptance.
        #[arg(long)]
        hold_until: Option<String>,
    },
    /// Ask the property owner to decide on a pending booking.
    RequestDecision { reservation_id: ReservationId },
    /// Accept or reject a pending booking.
    Decide {
        reservation_id: ReservationId,
        #[arg(value_enum)]
        decision: DecisionArg,
        /// On reject, offer the customer a similar listing.
        #[arg(long)]
        suggest: bool,
    },
    /// Record payment for an accepted booking.
    Pay { reservation_id: ReservationId },
    /// Cancel a pending or accepted booking.
    Cancel { reservation_id: ReservationId },
    /// Offer an alternative for a rejected booking.
    Suggest {
        reservation_id: ReservationId,
        /// Listing to offer; picked automatically when omitted.
        #[arg(long)]
        property: Option<PropertyId>,
    },
    /// Ask operators to find an alternative for a booking.
    Broadcast {
        reservation_id: ReservationId,
        /// Operator user ID; repeat for several. Defaults to every other
        /// active operator.
        #[arg(long = "operator")]
        operators: Vec<UserId>,
    },
    /// List the reservations visible to the acting user.
    List,
    /// List the acting user's own bookings.
    Mine,
    /// Show one reservation.
    Show { reservation_id: ReservationId },
}

/// Execute a reservation subcommand.
pub async fn run(
    action: ReservationAction,
    ctx: &Context,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let reservations = &ctx.engine.reservations;
    match action {
        ReservationAction::Create {
            property_id,
            check_in,
            check_out,
            adults,
            children,
            title,
            first_name,
            last_name,
            email,
            phone,
            request,
            total,
            hold_until,
        } => {
            let customer = NewCustomer {
                title,
                first_name,
                last_name,
                email,
                phone,
            };
            let stay = Stay {
                check_in: parse_timestamp(&check_in)?,
                check_out: parse_timestamp(&check_out)?,
                adults,
                children,
                request,
                hold_until: hold_until.as_deref().map(parse_timestamp).transpose()?,
            };
            let pricing = Pricing {
                total_cents: parse_money(&total)?,
            };
            let reservation = reservations
                .create_reservation(ctx.actor()?, property_id, &customer, &stay, pricing)
                .await?;
            writeln!(
                out,
                "Created reservation {} ({})",
                reservation.id, reservation.status
            )?;
            Ok(())
        }
        ReservationAction::RequestDecision { reservation_id } => {
            let outcome = reservations
                .request_decision(ctx.actor()?, reservation_id)
                .await?;
            writeln!(out, "Asked the owner to decide on reservation {reservation_id}")?;
            print_warnings(out, &outcome.warnings)
        }
        ReservationAction::Decide {
            reservation_id,
            decision,
            suggest,
        } => {
            let decision = match decision {
                DecisionArg::Accept => ReservationDecision::Accept,
                DecisionArg::Reject => ReservationDecision::Reject {
                    suggest_alternative: suggest,
                },
            };
            let outcome = reservations
                .decide(ctx.actor()?, reservation_id, decision)
                .await?;
            writeln!(
                out,
                "Reservation {reservation_id} is now {}",
                outcome.value.status
            )?;
            if let Some(deadline) = outcome.value.payment_hold_until {
                writeln!(out, "Payment due by {}", format_timestamp(deadline))?;
            }
            print_warnings(out, &outcome.warnings)
        }
        ReservationAction::Pay { reservation_id } => {
            let reservation = reservations.mark_paid(ctx.actor()?, reservation_id).await?;
            writeln!(out, "Reservation {reservation_id} is now {}", reservation.status)?;
            Ok(())
        }
        ReservationAction::Cancel { reservation_id } => {
            let reservation = reservations.cancel(ctx.actor()?, reservation_id).await?;
            writeln!(out, "Reservation {reservation_id} is now {}", reservation.status)?;
            Ok(())
        }
        ReservationAction::Suggest {
            reservation_id,
            property,
        } => {
            let actor = ctx.actor()?;
            let outcome = match property {
                Some(property_id) => {
                    let o = reservations
                        .suggest_property(actor, reservation_id, property_id)
                        .await?;
                    Outcome {
                        value: Some(o.value),
                        warnings: o.warnings,
                    }
                }
                None => reservations.suggest_alternative(actor, reservation_id).await?,
            };
            match &outcome.value {
                Some(p) => writeln!(out, "Suggested property {} ({})", p.id, p.name)?,
                None => writeln!(out, "No similar available property found")?,
            }
            print_warnings(out, &outcome.warnings)
        }
        ReservationAction::Broadcast {
            reservation_id,
            operators,
        } => {
            let actor = ctx.actor()?;
            let operators = if operators.is_empty() {
                ctx.engine
                    .users
                    .operators()
                    .await?
                    .into_iter()
                    .filter(|u| u.id != actor.id && u.is_active())
                    .map(|u| u.id)
                    .collect()
            } else {
                operators
            };
            let outcome = reservations
                .broadcast_for_suggestion(actor, reservation_id, &operators)
                .await?;
            writeln!(out, "Notified {} operator(s)", outcome.value)?;
            print_warnings(out, &outcome.warnings)
        }
        ReservationAction::List => {
            let views = reservations.list_visible(ctx.actor.as_ref()).await?;
            print_table(out, &views)
        }
        ReservationAction::Mine => {
            let actor = ctx.actor()?;
            let views = reservations.list_bookings_for(actor, actor.id).await?;
            print_table(out, &views)
        }
        ReservationAction::Show { reservation_id } => {
            let v = reservations.get(ctx.actor.as_ref(), reservation_id).await?;
            let r = &v.reservation;
            writeln!(out, "Reservation {}: {}", r.id, r.status)?;
            writeln!(out, "Property: {} ({})", v.property_name, r.property_id)?;
            writeln!(out, "Location: {}", v.property_location)?;
            writeln!(out, "Guest: {} <{}>", v.customer_name, v.customer_email)?;
            if !v.customer_phone.is_empty() {
                writeln!(out, "Phone: {}", v.customer_phone)?;
            }
            writeln!(
                out,
                "Stay: {} to {}",
                format_date(r.check_in),
                format_date(r.check_out)
            )?;
            writeln!(out, "Party: {}", party_label(r.adults, r.children))?;
            writeln!(out, "Total: {}", format_money(r.total_cents))?;
            if let Some(deadline) = r.payment_hold_until {
                writeln!(out, "Payment due by {}", format_timestamp(deadline))?;
            }
            if !r.request.is_empty() {
                writeln!(out, "Request: {}", r.request)?;
            }
            Ok(())
        }
    }
}

fn print_table(out: &mut impl Write, views: &[ReservationView]) -> anyhow::Result<()> {
    if views.is_empty() {
        writeln!(out, "No reservations")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<5} {:<20} {:<20} {:<10} {:<10} {:>10} {:<9}",
        "ID", "PROPERTY", "GUEST", "CHECK-IN", "CHECK-OUT", "TOTAL", "STATUS"
    )?;
    for v in views {
        let r = &v.reservation;
        writeln!(
            out,
            "{:<5} {:<20} {:<20} {:<10} {:<10} {:>10} {:<9}",
            r.id,
            clip(&v.property_name, 20),
            clip(&v.customer_name, 20),
            format_date(r.check_in),
            format_date(r.check_out),
            format_money(r.total_cents),
            r.status
        )?;
    }
    Ok(())
}
