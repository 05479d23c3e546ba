//! Notification events and their plain-text rendering.

use serde::{Deserialize, Serialize};

use homestay_core::domain::Role;
use homestay_core::{UserId, stored_enum};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ListingRequested,
    ListingAccepted,
    ListingRejected,
    BookingRequested,
    BookingAccepted,
    BookingRejected,
    AlternativeSuggested,
    SuggestionOpen,
}

stored_enum!(
    EventKind,
    "event kind",
    [
        ListingRequested,
        ListingAccepted,
        ListingRejected,
        BookingRequested,
        BookingAccepted,
        BookingRejected,
        AlternativeSuggested,
        SuggestionOpen,
    ]
);

impl EventKind {
    const fn title(self) -> &'static str {
        match self {
            Self::ListingRequested => "Listing approval requested",
            Self::ListingAccepted => "Listing approved",
            Self::ListingRejected => "Listing not approved",
            Self::BookingRequested => "New booking request",
            Self::BookingAccepted => "Booking accepted",
            Self::BookingRejected => "Booking not accepted",
            Self::AlternativeSuggested => "Alternative stay suggested",
            Self::SuggestionOpen => "Alternative needed",
        }
    }

    const fn headline(self) -> &'static str {
        match self {
            Self::ListingRequested => "A new listing is waiting for approval.",
            Self::ListingAccepted => "Your listing has been approved and is now available.",
            Self::ListingRejected => "Your listing was reviewed and not approved.",
            Self::BookingRequested => "A guest has asked to book your property.",
            Self::BookingAccepted => {
                "Your booking has been accepted. Please complete payment before the deadline."
            }
            Self::BookingRejected => "Unfortunately your booking could not be accepted.",
            Self::AlternativeSuggested => {
                "Your booking could not be accepted, but a similar place is available."
            }
            Self::SuggestionOpen => {
                "A booking was declined and needs an alternative. The first operator to pick it up handles it."
            }
        }
    }
}

/// Who an event is addressed to; resolved to addresses at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipients {
    /// Every account holding the role.
    Role(Role),
    /// Specific accounts.
    Users(Vec<UserId>),
    /// Literal addresses, e.g. a guest's booking email.
    Addresses(Vec<String>),
}

/// A notification waiting to be dispatched. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub recipients: Recipients,
    /// Labelled details, rendered in insertion order.
    pub context: Vec<(String, String)>,
}

impl NotificationEvent {
    pub const fn new(kind: EventKind, recipients: Recipients) -> Self {
        Self {
            kind,
            recipients,
            context: Vec::new(),
        }
    }

    /// Append a labelled detail.
    #[must_use]
    pub fn with(mut self, label: &str, value: impl ToString) -> Self {
        self.context.push((label.to_string(), value.to_string()));
        self
    }

    /// Value of the first detail with `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn subject(&self) -> String {
        match self.get("Property") {
            Some(property) => format!("{}: {property}", self.kind.title()),
            None => self.kind.title().to_string(),
        }
    }

    pub fn body(&self) -> String {
        let mut body = String::from(self.kind.headline());
        if !self.context.is_empty() {
            body.push('\n');
        }
        for (label, value) in &self.context {
            body.push('\n');
            body.push_str(label);
            body.push_str(": ");
            body.push_str(value);
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_names_the_property_when_known() {
        let event = NotificationEvent::new(EventKind::BookingAccepted, Recipients::Users(vec![1]))
            .with("Property", "Cliff House")
            .with("Guests", "2 Adults");
        assert_eq!(event.subject(), "Booking accepted: Cliff House");

        let bare = NotificationEvent::new(EventKind::ListingRequested, Recipients::Role(Role::Administrator));
        assert_eq!(bare.subject(), "Listing approval requested");
    }

    #[test]
    fn body_lists_details_in_insertion_order() {
        let event = NotificationEvent::new(EventKind::BookingRequested, Recipients::Users(vec![1]))
            .with("Property", "Cliff House")
            .with("Check-in", "2024-03-01");
        assert_eq!(
            event.body(),
            "A guest has asked to book your property.\n\nProperty: Cliff House\nCheck-in: 2024-03-01"
        );
    }

    #[test]
    fn get_returns_first_match() {
        let event = NotificationEvent::new(EventKind::SuggestionOpen, Recipients::Users(vec![]))
            .with("Reservation", 7)
            .with("Reservation", 8);
        assert_eq!(event.get("Reservation"), Some("7"));
        assert_eq!(event.get("Missing"), None);
    }
}
