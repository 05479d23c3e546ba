//! Listing lifecycle: creation, moderation, edits, and visibility-scoped reads.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use homestay_core::domain::{PropertyStatus, Role};
use homestay_core::lifecycle::Lifecycle;
use homestay_core::visibility::{Transition, property_scope, property_visible};
use homestay_core::{Actor, PropertyId};

use crate::notifications::{Dispatcher, EventKind, NotificationEvent, Recipients};
use crate::storage::{Database, Property, PropertyDetails, PropertyImage, PropertyUpdate};

use super::format::format_money;
use super::{Outcome, WorkflowError, active_account, count_transition, require};

/// An administrator's verdict on a pending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingDecision {
    Approve,
    Reject,
}

impl ListingDecision {
    pub const fn target(self) -> PropertyStatus {
        match self {
            Self::Approve => PropertyStatus::Available,
            Self::Reject => PropertyStatus::Rejected,
        }
    }

    const fn event(self) -> EventKind {
        match self {
            Self::Approve => EventKind::ListingAccepted,
            Self::Reject => EventKind::ListingRejected,
        }
    }
}

/// Image edits applied by [`PropertyLifecycle::update_listing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDelta {
    /// Image IDs to delete.
    pub remove: Vec<i64>,
    /// New images, appended in order.
    pub add: Vec<Vec<u8>>,
}

/// Governs listing status from creation through moderation.
#[derive(Debug, Clone)]
pub struct PropertyLifecycle {
    db: Database,
    dispatcher: Dispatcher,
}

impl PropertyLifecycle {
    pub const fn new(db: Database, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Create a listing owned by `owner`.
    ///
    /// Administrators list straight to `Available`; everyone else starts
    /// `Pending`. A moderator's listing is announced to all administrators.
    #[instrument(skip(self, details, images), fields(owner_id = owner.id, images = images.len()))]
    pub async fn create_listing(
        &self,
        owner: &Actor,
        details: &PropertyDetails,
        images: &[Vec<u8>],
    ) -> Result<Outcome<Property>, WorkflowError> {
        if images.is_empty() {
            return Err(WorkflowError::Validation(
                "a listing needs at least one image".into(),
            ));
        }
        validate_details(details)?;

        let owner_user = active_account(&self.db, owner).await?;
        let status = PropertyStatus::initial_for(owner_user.role);
        let property = self
            .db
            .create_property(owner_user.id, details, status, images)
            .await?;
        info!(property_id = property.id, status = %property.status, "Listing created");

        let mut outcome = Outcome::new(property);
        if owner_user.role == Role::Moderator {
            let event = listing_event(
                EventKind::ListingRequested,
                Recipients::Role(Role::Administrator),
                &outcome.value,
            )
            .with("Submitted by", owner_user.display_name());
            outcome.note(self.dispatcher.dispatch(&event).await);
        }
        Ok(outcome)
    }

    /// Approve or reject a `Pending` listing.
    ///
    /// Deciding a listing that is no longer `Pending` is `InvalidState`,
    /// whichever decision is given.
    #[instrument(skip(self), fields(decider_id = decider.id))]
    pub async fn decide_listing(
        &self,
        decider: &Actor,
        property_id: PropertyId,
        decision: ListingDecision,
    ) -> Result<Outcome<Property>, WorkflowError> {
        require(decider, Transition::DecideListing)?;
        active_account(&self.db, decider).await?;

        let current = self.db.get_property(property_id).await?;
        let target = current.status.transition(decision.target())?;
        let property = self.move_status(property_id, current.status, target).await?;
        info!(property_id, status = %property.status, "Listing decided");
        count_transition(PropertyStatus::ENTITY, property.status.as_str());

        let mut outcome = Outcome::new(property);
        let event = listing_event(
            decision.event(),
            Recipients::Users(vec![outcome.value.owner_id]),
            &outcome.value,
        );
        outcome.note(self.dispatcher.dispatch(&event).await);
        Ok(outcome)
    }

    /// Replace descriptive fields and edit images. Status is unchanged.
    #[instrument(skip(self, details, images), fields(editor_id = editor.id))]
    pub async fn update_listing(
        &self,
        editor: &Actor,
        property_id: PropertyId,
        details: &PropertyDetails,
        images: &ImageDelta,
    ) -> Result<Property, WorkflowError> {
        let current = self.db.get_property(property_id).await?;
        require(
            editor,
            Transition::EditListing {
                owner_id: current.owner_id,
            },
        )?;
        active_account(&self.db, editor).await?;
        validate_details(details)?;

        let property = match self
            .db
            .update_property(property_id, details, &images.remove, &images.add)
            .await?
        {
            PropertyUpdate::Updated(property) => property,
            PropertyUpdate::UnknownImage(unknown) => {
                return Err(WorkflowError::Validation(format!(
                    "image {unknown} does not belong to property {property_id}"
                )));
            }
            PropertyUpdate::NoImagesLeft => {
                return Err(WorkflowError::Validation(
                    "a listing needs at least one image".into(),
                ));
            }
        };
        info!(
            property_id,
            removed = images.remove.len(),
            added = images.add.len(),
            "Listing updated"
        );
        Ok(property)
    }

    /// Administrative override of a listing's status.
    ///
    /// Skips the transition table and sends no notification.
    #[instrument(skip(self), fields(admin_id = admin.id))]
    pub async fn set_status(
        &self,
        admin: &Actor,
        property_id: PropertyId,
        status: PropertyStatus,
    ) -> Result<Property, WorkflowError> {
        require(admin, Transition::OverrideListing)?;
        active_account(&self.db, admin).await?;
        let property = self.db.set_property_status(property_id, status).await?;
        warn!(property_id, status = %status, "Listing status overridden");
        Ok(property)
    }

    /// Listings the viewer may see; `None` is the public.
    pub async fn list_visible(&self, viewer: Option<&Actor>) -> Result<Vec<Property>, WorkflowError> {
        Ok(self.db.list_properties(property_scope(viewer)).await?)
    }

    /// An operator's own `Available` listings, the pool they suggest from.
    pub async fn operator_properties(&self, operator: &Actor) -> Result<Vec<Property>, WorkflowError> {
        require(operator, Transition::SuggestAlternative)?;
        active_account(&self.db, operator).await?;
        Ok(self
            .db
            .list_properties_by_owner_and_status(operator.id, PropertyStatus::Available)
            .await?)
    }

    /// A single listing, if the viewer may see it. Hidden listings read as
    /// not found.
    pub async fn get(
        &self,
        viewer: Option<&Actor>,
        property_id: PropertyId,
    ) -> Result<Property, WorkflowError> {
        let property = self.db.get_property(property_id).await?;
        if property_visible(viewer, property.owner_id, property.status) {
            Ok(property)
        } else {
            Err(WorkflowError::NotFound(format!("Property {property_id}")))
        }
    }

    pub async fn images(
        &self,
        viewer: Option<&Actor>,
        property_id: PropertyId,
    ) -> Result<Vec<PropertyImage>, WorkflowError> {
        self.get(viewer, property_id).await?;
        Ok(self.db.get_property_images(property_id).await?)
    }

    async fn move_status(
        &self,
        property_id: PropertyId,
        from: PropertyStatus,
        to: PropertyStatus,
    ) -> Result<Property, WorkflowError> {
        if let Some(property) = self
            .db
            .compare_and_set_property_status(property_id, from, to)
            .await?
        {
            return Ok(property);
        }
        // Lost a race: report against whatever state won.
        let now = self.db.get_property(property_id).await?;
        Err(now.status.transition(to).map_or_else(Into::into, |_| {
            WorkflowError::InvalidState(format!("property {property_id} changed concurrently"))
        }))
    }
}

fn validate_details(details: &PropertyDetails) -> Result<(), WorkflowError> {
    if details.name.trim().is_empty() {
        return Err(WorkflowError::Validation("a listing needs a name".into()));
    }
    if details.price_cents < 0 {
        return Err(WorkflowError::Validation("price cannot be negative".into()));
    }
    if details.guest_capacity < 1 {
        return Err(WorkflowError::Validation(
            "guest capacity must be at least 1".into(),
        ));
    }
    Ok(())
}

fn listing_event(kind: EventKind, recipients: Recipients, property: &Property) -> NotificationEvent {
    NotificationEvent::new(kind, recipients)
        .with("Property", &property.name)
        .with("Location", &property.location)
        .with("Price per night", format_money(property.price_cents))
        .with("Guests", property.guest_capacity)
        .with("Bed type", &property.bed_type)
}

