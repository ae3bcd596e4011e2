//! Proximity notifications
//!
//! Every position update is checked against all facilities. A facility closer
//! than [`PROXIMITY_RADIUS_METERS`] produces exactly one alert per session: its
//! identifier goes into the [`NotifiedSet`] and is never removed, so leaving and
//! re-entering the radius stays silent.

use crate::{Facility, FacilityId, FacilityStore, Notification, Position, utils};
use std::collections::HashSet;

/// Radius within which a facility triggers a notification
pub const PROXIMITY_RADIUS_METERS: f64 = 150.0;

/// Title used for every proximity notification
pub const PROXIMITY_TITLE: &str = "Facility Nearby";

/// Identifiers of facilities already notified this session (grow-only)
#[derive(Clone, Debug, Default)]
pub struct NotifiedSet {
    ids: HashSet<FacilityId>,
}

impl NotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, id: &FacilityId) -> bool {
        self.ids.contains(id)
    }

    /// Record an identifier; returns `false` if it was already present
    #[inline]
    pub fn insert(&mut self, id: FacilityId) -> bool {
        self.ids.insert(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A facility the user just came near
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityAlert {
    pub facility_id: FacilityId,
    pub distance_meters: f64,
    pub notification: Notification,
}

impl ProximityAlert {
    fn for_facility(facility: &Facility, distance_meters: f64) -> Self {
        Self {
            facility_id: facility.id.clone(),
            distance_meters,
            notification: Notification::new(
                PROXIMITY_TITLE,
                format!("{} is nearby", facility.label()),
            ),
        }
    }
}

/// Tracks which facilities have been announced and detects new ones
#[derive(Clone, Debug, Default)]
pub struct ProximityWatcher {
    notified: NotifiedSet,
}

impl ProximityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a new user position against every facility
    ///
    /// Returns alerts for facilities inside the radius that were not notified
    /// before, in store order, and marks them as notified.
    pub fn check(&mut self, store: &FacilityStore, position: Position) -> Vec<ProximityAlert> {
        profiling::scope!("ProximityWatcher::check");

        let mut alerts = Vec::new();
        for facility in store {
            let distance = utils::haversine_distance(position, facility.position);
            if distance < PROXIMITY_RADIUS_METERS && !self.notified.contains(&facility.id) {
                tracing::debug!(
                    "Facility {} within {:.0} m of {}",
                    facility.id,
                    distance,
                    position
                );
                self.notified.insert(facility.id.clone());
                alerts.push(ProximityAlert::for_facility(facility, distance));
            }
        }
        alerts
    }

    /// Facilities already notified this session
    #[inline]
    pub fn notified(&self) -> &NotifiedSet {
        &self.notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FacilityStore {
        FacilityStore::from_facilities([
            Facility::new("near", "Restroom A", "restroom", Position::new(23.182, 75.784)),
            Facility::new("far", "Medical Post", "medical", Position::new(23.176, 75.789)),
        ])
    }

    #[test]
    fn test_alert_inside_radius() {
        let mut watcher = ProximityWatcher::new();
        let alerts = watcher.check(&store(), Position::new(23.1825, 75.7845));

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.facility_id.as_str(), "near");
        assert!(alert.distance_meters < PROXIMITY_RADIUS_METERS);
        assert_eq!(alert.notification.title, "Facility Nearby");
        assert_eq!(alert.notification.body, "Restroom A (restroom) is nearby");
        assert!(watcher.notified().contains(&FacilityId::new("near")));
    }

    #[test]
    fn test_second_check_does_not_renotify() {
        let store = store();
        let mut watcher = ProximityWatcher::new();
        let user = Position::new(23.1825, 75.7845);

        assert_eq!(watcher.check(&store, user).len(), 1);
        assert!(watcher.check(&store, user).is_empty());
        assert_eq!(watcher.notified().len(), 1);
    }

    #[test]
    fn test_reentering_radius_stays_silent() {
        let store = store();
        let mut watcher = ProximityWatcher::new();

        assert_eq!(watcher.check(&store, Position::new(23.182, 75.784)).len(), 1);
        // Walk a few km away and back
        assert!(watcher.check(&store, Position::new(23.22, 75.80)).is_empty());
        assert!(watcher.check(&store, Position::new(23.182, 75.784)).is_empty());
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let facility = Position::new(0.0, 0.0);
        // Latitude offset giving ~150.0 m on the 6371 km sphere
        let delta = PROXIMITY_RADIUS_METERS / utils::EARTH_RADIUS_M;
        let just_outside = Position::new((delta * 1.001).to_degrees(), 0.0);
        let just_inside = Position::new((delta * 0.999).to_degrees(), 0.0);

        let store = FacilityStore::from_facilities([Facility::new("x", "X", "c", facility)]);
        assert!(ProximityWatcher::new().check(&store, just_outside).is_empty());
        assert_eq!(ProximityWatcher::new().check(&store, just_inside).len(), 1);
    }

    #[test]
    fn test_multiple_alerts_in_store_order() {
        let store = FacilityStore::from_facilities([
            Facility::new("b", "B", "c", Position::new(10.0001, 10.0)),
            Facility::new("a", "A", "c", Position::new(10.0, 10.0001)),
        ]);
        let alerts = ProximityWatcher::new().check(&store, Position::new(10.0, 10.0));
        let ids: Vec<&str> = alerts.iter().map(|a| a.facility_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_store_never_alerts() {
        let mut watcher = ProximityWatcher::new();
        assert!(watcher.check(&FacilityStore::default(), Position::new(0.0, 0.0)).is_empty());
        assert!(watcher.notified().is_empty());
    }
}
