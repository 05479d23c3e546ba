//! Property subcommands: create, decide, update, set-status, list, inventory, show.

use std::io::Write;
use std::path::{Path, PathBuf};

use homestay_core::PropertyId;
use homestay_core::domain::PropertyStatus;

use crate::storage::{Property, PropertyDetails};
use crate::workflow::format::{format_money, parse_money};
use crate::workflow::{ImageDelta, ListingDecision};

use super::{Context, clip, print_warnings};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for ListingDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => Self::Approve,
            DecisionArg::Reject => Self::Reject,
        }
    }
}

/// Property subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum PropertyAction {
    /// List a property as the acting user.
    Create {
        name: String,
        /// Nightly price, e.g. 120.50.
        #[arg(long)]
        price: String,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "Double")]
        bed_type: String,
        #[arg(long, default_value_t = 2)]
        guests: i64,
        /// Image file; repeat for several.
        #[arg(long = "image", required = true)]
        images: Vec<PathBuf>,
    },
    /// Approve or reject a pending listing (administrators).
    Decide {
        property_id: PropertyId,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Edit descriptive fields and images; status is unchanged.
    Update {
        property_id: PropertyId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        bed_type: Option<String>,
        #[arg(long)]
        guests: Option<i64>,
        /// Image ID to delete; repeat for several.
        #[arg(long = "remove-image")]
        remove_images: Vec<i64>,
        /// Image file to append; repeat for several.
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// Force a listing's status (administrators).
    SetStatus {
        property_id: PropertyId,
        status: PropertyStatus,
    },
    /// List the listings visible to the acting user.
    List,
    /// List the acting operator's available listings.
    Inventory,
    /// Show one listing and its images.
    Show { property_id: PropertyId },
}

/// Execute a property subcommand.
pub async fn run(action: PropertyAction, ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        PropertyAction::Create {
            name,
            price,
            location,
            description,
            bed_type,
            guests,
            images,
        } => {
            let details = PropertyDetails {
                name,
                price_cents: parse_money(&price)?,
                description,
                location,
                bed_type,
                guest_capacity: guests,
            };
            let images = read_images(&images)?;
            let outcome = ctx
                .engine
                .properties
                .create_listing(ctx.actor()?, &details, &images)
                .await?;
            writeln!(
                out,
                "Created property {} ({})",
                outcome.value.id, outcome.value.status
            )?;
            print_warnings(out, &outcome.warnings)
        }
        PropertyAction::Decide {
            property_id,
            decision,
        } => {
            let outcome = ctx
                .engine
                .properties
                .decide_listing(ctx.actor()?, property_id, decision.into())
                .await?;
            writeln!(out, "Property {property_id} is now {}", outcome.value.status)?;
            print_warnings(out, &outcome.warnings)
        }
        PropertyAction::Update {
            property_id,
            name,
            price,
            location,
            description,
            bed_type,
            guests,
            remove_images,
            images,
        } => {
            let actor = ctx.actor()?;
            let current = ctx.engine.properties.get(Some(actor), property_id).await?;
            let mut details = PropertyDetails::from(&current);
            if let Some(name) = name {
                details.name = name;
            }
            if let Some(price) = price {
                details.price_cents = parse_money(&price)?;
            }
            if let Some(location) = location {
                details.location = location;
            }
            if let Some(description) = description {
                details.description = description;
            }
            if let Some(bed_type) = bed_type {
                details.bed_type = bed_type;
            }
            if let Some(guests) = guests {
                details.guest_capacity = guests;
            }
            let delta = ImageDelta {
                remove: remove_images,
                add: read_images(&images)?,
            };
            let updated = ctx
                .engine
                .properties
                .update_listing(actor, property_id, &details, &delta)
                .await?;
            writeln!(out, "Updated property {}", updated.id)?;
            Ok(())
        }
        PropertyAction::SetStatus {
            property_id,
            status,
        } => {
            let property = ctx
                .engine
                .properties
                .set_status(ctx.actor()?, property_id, status)
                .await?;
            writeln!(out, "Property {property_id} forced to {}", property.status)?;
            Ok(())
        }
        PropertyAction::List => {
            let properties = ctx.engine.properties.list_visible(ctx.actor.as_ref()).await?;
            print_table(out, &properties)
        }
        PropertyAction::Inventory => {
            let properties = ctx.engine.properties.operator_properties(ctx.actor()?).await?;
            print_table(out, &properties)
        }
        PropertyAction::Show { property_id } => {
            let viewer = ctx.actor.as_ref();
            let p = ctx.engine.properties.get(viewer, property_id).await?;
            let images = ctx.engine.properties.images(viewer, property_id).await?;
            writeln!(out, "Property {}: {}", p.id, p.name)?;
            writeln!(out, "Status: {}", p.status)?;
            writeln!(out, "Owner: {}", p.owner_id)?;
            writeln!(out, "Location: {}", p.location)?;
            writeln!(out, "Price per night: {}", format_money(p.price_cents))?;
            writeln!(out, "Guests: {}", p.guest_capacity)?;
            writeln!(out, "Bed type: {}", p.bed_type)?;
            if !p.description.is_empty() {
                writeln!(out, "Description: {}", p.description)?;
            }
            for image in &images {
                writeln!(out, "Image {} ({} bytes)", image.id, image.data.len())?;
            }
            Ok(())
        }
    }
}

fn read_images(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    paths.iter().map(|p| read_image(p)).collect()
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read image {}: {e}", path.display()))
}

fn print_table(out: &mut impl Write, properties: &[Property]) -> anyhow::Result<()> {
    if properties.is_empty() {
        writeln!(out, "No properties")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<5} {:<24} {:<16} {:>10} {:<6} {:<10}",
        "ID", "NAME", "LOCATION", "PRICE", "GUESTS", "STATUS"
    )?;
    for p in properties {
        writeln!(
            out,
            "{:<5} {:<24} {:<16} {:>10} {:<6} {:<10}",
            p.id,
            clip(&p.name, 24),
            clip(&p.location, 16),
            format_money(p.price_cents),
            p.guest_capacity,
            p.status
        )?;
    }
    Ok(())
}
