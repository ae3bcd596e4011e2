//! Collaborator interfaces for rendering and user feedback
//!
//! The session never talks to a map widget or a notification API directly. It
//! returns [`Effect`]s, and [`apply_effects`] forwards them to whichever
//! backends implement these traits.

use crate::{Category, Effect, FacilityId, Position};

/// What a marker on the map represents
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerKind {
    /// The user's last known location (only one exists)
    User,
    /// A loaded facility
    Facility { id: FacilityId, category: Category },
    /// A highlighted crowded area
    Crowd,
}

/// A single marker to place on the map
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub position: Position,
    pub kind: MarkerKind,
    pub label: String,
}

/// A notification for the user (title + body)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Map rendering and routing backend
pub trait MapSurface {
    /// Place a marker. Placing a [`MarkerKind::User`] marker moves the existing one.
    fn place_marker(&mut self, marker: Marker);

    /// Draw a route between two positions, replacing any existing route
    fn draw_route(&mut self, from: Position, to: Position);

    /// Remove the current route, if any
    fn clear_route(&mut self);

    /// Adjust the view so both positions are visible
    fn fit_bounds(&mut self, _a: Position, _b: Position) {}
}

/// Delivers notifications (OS, browser or in-app)
pub trait NotificationSink {
    fn notify(&mut self, notification: &Notification);
}

/// Shows short informational messages (e.g. "No restroom found.")
pub trait UserPrompt {
    fn inform(&mut self, message: &str);
}

/// Forward effects to the collaborators, in order
///
/// Notifications and informational messages usually end up in the same place
/// (a toast area), so both go to one `feedback` backend.
pub fn apply_effects<F>(
    effects: impl IntoIterator<Item = Effect>,
    surface: &mut dyn MapSurface,
    feedback: &mut F,
) where
    F: NotificationSink + UserPrompt + ?Sized,
{
    for effect in effects {
        match effect {
            Effect::PlaceMarker(marker) => surface.place_marker(marker),
            Effect::DrawRoute { from, to } => surface.draw_route(from, to),
            Effect::ClearRoute => surface.clear_route(),
            Effect::FitBounds(a, b) => surface.fit_bounds(a, b),
            Effect::Notify(notification) => feedback.notify(&notification),
            Effect::Inform(message) => feedback.inform(&message),
        }
    }
}
