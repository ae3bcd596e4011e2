//! Session context and event dispatch
//!
//! A [`Session`] holds the per-session mutable state: the user's last known
//! position, the notified set and the active route. Each incoming [`Event`] is
//! handled to completion by [`Session::handle`], which returns the [`Effect`]s
//! the caller must apply to the map and notification backends.
//!
//! State transitions:
//! - position: `None -> Some` on the first fix, then only updated
//! - route: `None -> Some -> Some (replaced)`, at most one at a time

use crate::{
    Category, FacilityId, FacilityStore, Marker, MarkerKind, Notification, Position,
    ProximityWatcher, find_nearest, utils,
};

/// Something that happened outside the session
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The facility store finished loading (possibly empty)
    FacilitiesLoaded,
    /// A new location report
    LocationChanged(Position),
    /// The location source reported an error
    LocationUnavailable(String),
    /// The user asked for the nearest facility of a category
    CategorySelected(Category),
}

/// Something the caller must do in response to an event
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    PlaceMarker(Marker),
    DrawRoute { from: Position, to: Position },
    ClearRoute,
    FitBounds(Position, Position),
    Notify(Notification),
    Inform(String),
}

/// State of the location feed
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LocationStatus {
    /// No report yet
    #[default]
    Pending,
    /// At least one position has been received
    Available,
    /// The source failed before producing any position
    Unavailable(String),
}

/// The route currently shown to the user
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveRoute {
    pub facility_id: FacilityId,
    pub destination: Position,
}

/// Per-session state owned by the application controller
#[derive(Clone, Debug, Default)]
pub struct Session {
    position: Option<Position>,
    location_status: LocationStatus,
    watcher: ProximityWatcher,
    active_route: Option<ActiveRoute>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one event and return the effects to apply, in order
    pub fn handle(&mut self, store: &FacilityStore, event: Event) -> Vec<Effect> {
        profiling::scope!("Session::handle");
        match event {
            Event::FacilitiesLoaded => self.on_facilities_loaded(store),
            Event::LocationChanged(position) => self.on_location(store, position),
            Event::LocationUnavailable(reason) => self.on_location_error(reason),
            Event::CategorySelected(category) => self.on_category(store, &category),
        }
    }

    fn on_facilities_loaded(&self, store: &FacilityStore) -> Vec<Effect> {
        store
            .iter()
            .map(|facility| {
                Effect::PlaceMarker(Marker {
                    position: facility.position,
                    kind: MarkerKind::Facility {
                        id: facility.id.clone(),
                        category: facility.category.clone(),
                    },
                    label: facility.label(),
                })
            })
            .collect()
    }

    fn on_location(&mut self, store: &FacilityStore, position: Position) -> Vec<Effect> {
        if !utils::is_valid_wgs84(position.lat(), position.lon()) {
            tracing::warn!("Ignoring invalid location report {}", position);
            return Vec::new();
        }

        if self.position.is_none() {
            tracing::info!("First location fix at {}", position);
        }
        self.position = Some(position);
        self.location_status = LocationStatus::Available;

        let mut effects = vec![Effect::PlaceMarker(Marker {
            position,
            kind: MarkerKind::User,
            label: "You are here".to_string(),
        })];

        for alert in self.watcher.check(store, position) {
            tracing::info!(
                "Notifying about {} ({:.0} m away)",
                alert.facility_id,
                alert.distance_meters
            );
            effects.push(Effect::Notify(alert.notification));
        }

        // Keep the active route starting at the user
        if let Some(route) = &self.active_route {
            effects.push(Effect::DrawRoute {
                from: position,
                to: route.destination,
            });
        }

        effects
    }

    fn on_location_error(&mut self, reason: String) -> Vec<Effect> {
        tracing::warn!("Location unavailable: {}", reason);
        // A failure after a fix keeps the last known position
        if self.position.is_none() {
            self.location_status = LocationStatus::Unavailable(reason);
        }
        Vec::new()
    }

    fn on_category(&mut self, store: &FacilityStore, category: &Category) -> Vec<Effect> {
        let found = match find_nearest(store, category, self.position) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("Nearest search for '{}' failed: {}", category, e);
                return vec![Effect::Inform(e.to_string())];
            }
        };

        let from = found.origin;
        let to = found.facility.position;

        tracing::info!(
            "Nearest {} is {} at {}",
            category,
            found.facility.name,
            utils::format_distance(found.distance_meters)
        );

        let mut effects = Vec::with_capacity(3);
        if self.active_route.is_some() {
            effects.push(Effect::ClearRoute);
        }
        effects.push(Effect::DrawRoute { from, to });
        effects.push(Effect::FitBounds(from, to));

        self.active_route = Some(ActiveRoute {
            facility_id: found.facility.id.clone(),
            destination: to,
        });

        effects
    }

    /// Prepare for a replaced data set
    ///
    /// Drops the route, which points into the old set. Position, location
    /// status and the notified set stay for the rest of the session.
    pub fn reset_for_store(&mut self) {
        if let Some(route) = self.active_route.take() {
            tracing::debug!("Dropping route to {} for the new data set", route.facility_id);
        }
    }

    /// The user's last known position
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    #[inline]
    pub fn location_status(&self) -> &LocationStatus {
        &self.location_status
    }

    #[inline]
    pub fn active_route(&self) -> Option<&ActiveRoute> {
        self.active_route.as_ref()
    }

    #[inline]
    pub fn watcher(&self) -> &ProximityWatcher {
        &self.watcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Facility;

    fn store() -> FacilityStore {
        FacilityStore::from_facilities([
            Facility::new("r1", "Restroom A", "restroom", Position::new(23.182, 75.784)),
            Facility::new("m1", "Medical Post", "medical", Position::new(23.176, 75.789)),
            Facility::new("r2", "Restroom B", "restroom", Position::new(23.190, 75.770)),
        ])
    }

    fn notifications(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify(n) => Some(n.body.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_facilities_loaded_places_markers() {
        let store = store();
        let effects = Session::new().handle(&store, Event::FacilitiesLoaded);
        assert_eq!(effects.len(), 3);
        match &effects[1] {
            Effect::PlaceMarker(marker) => {
                assert_eq!(marker.label, "Medical Post (medical)");
                assert_eq!(
                    marker.kind,
                    MarkerKind::Facility {
                        id: FacilityId::new("m1"),
                        category: Category::new("medical"),
                    }
                );
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_first_location_places_user_and_notifies() {
        let store = store();
        let mut session = Session::new();
        assert_eq!(session.location_status(), &LocationStatus::Pending);

        let effects = session.handle(&store, Event::LocationChanged(Position::new(23.1825, 75.7845)));

        assert!(matches!(
            &effects[0],
            Effect::PlaceMarker(Marker { kind: MarkerKind::User, .. })
        ));
        assert_eq!(notifications(&effects), vec!["Restroom A (restroom) is nearby"]);
        assert_eq!(session.location_status(), &LocationStatus::Available);
        assert!(session.position().is_some());
    }

    #[test]
    fn test_repeated_locations_notify_once() {
        let store = store();
        let mut session = Session::new();
        let here = Position::new(23.1825, 75.7845);

        let first = session.handle(&store, Event::LocationChanged(here));
        let second = session.handle(&store, Event::LocationChanged(here));

        assert_eq!(notifications(&first).len(), 1);
        assert!(notifications(&second).is_empty());
        assert_eq!(second.len(), 1); // only the user marker move
    }

    #[test]
    fn test_search_before_location_asks_to_wait() {
        let store = store();
        let mut session = Session::new();
        let effects = session.handle(&store, Event::CategorySelected("restroom".into()));
        assert_eq!(
            effects,
            vec![Effect::Inform("Waiting for your location...".to_string())]
        );
        assert!(session.active_route().is_none());
    }

    #[test]
    fn test_search_unknown_category_informs() {
        let store = store();
        let mut session = Session::new();
        session.handle(&store, Event::LocationChanged(Position::new(23.0, 75.0)));
        let effects = session.handle(&store, Event::CategorySelected("parking".into()));
        assert_eq!(effects, vec![Effect::Inform("No parking found.".to_string())]);
    }

    #[test]
    fn test_search_blank_category_informs() {
        let store = store();
        let mut session = Session::new();
        session.handle(&store, Event::LocationChanged(Position::new(23.0, 75.0)));
        let effects = session.handle(&store, Event::CategorySelected("".into()));
        assert_eq!(
            effects,
            vec![Effect::Inform("Please select a category.".to_string())]
        );
    }

    #[test]
    fn test_search_draws_route_and_replaces_previous() {
        let store = store();
        let mut session = Session::new();
        let user = Position::new(23.183, 75.783);
        session.handle(&store, Event::LocationChanged(user));

        let effects = session.handle(&store, Event::CategorySelected("restroom".into()));
        let restroom_a = Position::new(23.182, 75.784);
        assert_eq!(
            effects,
            vec![
                Effect::DrawRoute {
                    from: user,
                    to: restroom_a
                },
                Effect::FitBounds(user, restroom_a),
            ]
        );
        assert_eq!(
            session.active_route().map(|r| r.facility_id.as_str()),
            Some("r1")
        );

        let effects = session.handle(&store, Event::CategorySelected("medical".into()));
        assert_eq!(effects[0], Effect::ClearRoute);
        assert!(matches!(effects[1], Effect::DrawRoute { .. }));
        assert_eq!(
            session.active_route().map(|r| r.facility_id.as_str()),
            Some("m1")
        );
    }

    #[test]
    fn test_active_route_follows_user() {
        let store = store();
        let mut session = Session::new();
        session.handle(&store, Event::LocationChanged(Position::new(23.0, 75.0)));
        session.handle(&store, Event::CategorySelected("medical".into()));

        let moved = Position::new(23.01, 75.01);
        let effects = session.handle(&store, Event::LocationChanged(moved));
        assert_eq!(
            effects.last(),
            Some(&Effect::DrawRoute {
                from: moved,
                to: Position::new(23.176, 75.789)
            })
        );
    }

    #[test]
    fn test_failed_search_keeps_existing_route() {
        let store = store();
        let mut session = Session::new();
        session.handle(&store, Event::LocationChanged(Position::new(23.0, 75.0)));
        session.handle(&store, Event::CategorySelected("medical".into()));
        session.handle(&store, Event::CategorySelected("parking".into()));
        assert_eq!(
            session.active_route().map(|r| r.facility_id.as_str()),
            Some("m1")
        );
    }

    #[test]
    fn test_location_error_before_fix() {
        let mut session = Session::new();
        let effects = session.handle(
            &FacilityStore::default(),
            Event::LocationUnavailable("permission denied".to_string()),
        );
        assert!(effects.is_empty());
        assert_eq!(
            session.location_status(),
            &LocationStatus::Unavailable("permission denied".to_string())
        );
    }

    #[test]
    fn test_location_error_after_fix_keeps_position() {
        let store = FacilityStore::default();
        let mut session = Session::new();
        let here = Position::new(1.0, 1.0);
        session.handle(&store, Event::LocationChanged(here));
        session.handle(&store, Event::LocationUnavailable("timeout".to_string()));

        assert_eq!(session.position(), Some(here));
        assert_eq!(session.location_status(), &LocationStatus::Available);
    }

    #[test]
    fn test_reset_for_store_keeps_notified_set() {
        let store = store();
        let mut session = Session::new();
        let here = Position::new(23.1825, 75.7845);
        session.handle(&store, Event::LocationChanged(here));
        session.handle(&store, Event::CategorySelected("medical".into()));

        session.reset_for_store();
        assert!(session.active_route().is_none());
        assert_eq!(session.position(), Some(here));
        assert_eq!(session.location_status(), &LocationStatus::Available);

        // Same data again: the restroom was already announced
        let effects = session.handle(&store, Event::LocationChanged(here));
        assert!(notifications(&effects).is_empty());
        assert!(!effects.iter().any(|e| matches!(e, Effect::DrawRoute { .. })));
    }

    #[test]
    fn test_invalid_location_is_ignored() {
        let mut session = Session::new();
        let effects = session.handle(
            &FacilityStore::default(),
            Event::LocationChanged(Position::new(f64::NAN, 0.0)),
        );
        assert!(effects.is_empty());
        assert!(session.position().is_none());
    }
}
