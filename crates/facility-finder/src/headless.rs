//! Headless mode: run the session without a window
//!
//! Location updates come from `--replay-gpx` (all points, back to back) or
//! `--position`. Notifications and search results are logged, which makes the
//! mode handy for checking a facility file against a recorded walk.

use crate::app::location::TrackReplay;
use crate::app::settings::Settings;
use facility_finder_lib::{
    Category, Event, FacilityStore, MapSurface, Marker, MarkerKind, Notification,
    NotificationSink, Position, Session, UserPrompt, apply_effects, utils,
};
use std::time::Duration;

/// What happened during a headless run
#[derive(Debug, Default, PartialEq)]
pub struct Report {
    /// Location updates fed to the session
    pub updates: usize,
    /// Notifications delivered, in order
    pub notifications: Vec<Notification>,
    /// Informational messages shown
    pub messages: Vec<String>,
    /// Route drawn by the final search, if any
    pub route: Option<(Position, Position)>,
}

/// Collects effects instead of drawing them
#[derive(Default)]
struct Recorder {
    report: Report,
    facility_markers: usize,
}

impl MapSurface for Recorder {
    fn place_marker(&mut self, marker: Marker) {
        if let MarkerKind::Facility { .. } = marker.kind {
            self.facility_markers += 1;
        }
    }

    fn draw_route(&mut self, from: Position, to: Position) {
        self.report.route = Some((from, to));
    }

    fn clear_route(&mut self) {
        self.report.route = None;
    }
}

impl NotificationSink for Recorder {
    fn notify(&mut self, notification: &Notification) {
        tracing::info!("🔔 {}: {}", notification.title, notification.body);
        self.report.notifications.push(notification.clone());
    }
}

impl UserPrompt for Recorder {
    fn inform(&mut self, message: &str) {
        tracing::info!("ℹ {}", message);
        self.report.messages.push(message.to_string());
    }
}

/// Run headless with the given settings
pub fn run(settings: &Settings) -> Report {
    let store = FacilityStore::load_or_empty(&settings.facilities);

    let positions = match (&settings.replay_gpx, settings.position) {
        (Some(path), _) => match TrackReplay::from_path(path, Duration::ZERO) {
            Ok(replay) => Ok(replay.points().to_vec()),
            Err(e) => Err(format!("Failed to load GPX replay {}: {}", path.display(), e)),
        },
        (None, Some(position)) => Ok(vec![position]),
        (None, None) => Err("No location source (use --position or --replay-gpx)".to_string()),
    };

    let category = settings.find.as_deref().map(Category::new);
    let report = run_with(&store, positions, category);

    tracing::info!(
        "Headless run finished: {} updates, {} notifications",
        report.updates,
        report.notifications.len()
    );
    report
}

/// Feed `positions` (or the location error) through a fresh session, then search `find`
pub fn run_with(
    store: &FacilityStore,
    positions: Result<Vec<Position>, String>,
    find: Option<Category>,
) -> Report {
    profiling::scope!("headless::run_with");

    let mut session = Session::new();
    let mut recorder = Recorder::default();
    let mut feedback = Recorder::default();

    let effects = session.handle(store, Event::FacilitiesLoaded);
    apply_effects(effects, &mut recorder, &mut feedback);
    tracing::info!("Placed {} facility markers", recorder.facility_markers);

    match positions {
        Ok(positions) => {
            for position in positions {
                feedback.report.updates += 1;
                let effects = session.handle(store, Event::LocationChanged(position));
                apply_effects(effects, &mut recorder, &mut feedback);
            }
        }
        Err(reason) => {
            tracing::warn!("{}", reason);
            let effects = session.handle(store, Event::LocationUnavailable(reason));
            apply_effects(effects, &mut recorder, &mut feedback);
        }
    }

    if let Some(category) = find {
        let effects = session.handle(store, Event::CategorySelected(category));
        apply_effects(effects, &mut recorder, &mut feedback);
        if let Some((from, to)) = recorder.report.route {
            tracing::info!(
                "Route from {} to {} ({})",
                from,
                to,
                utils::format_distance(from.distance_to(to))
            );
        }
    }

    Report {
        route: recorder.report.route,
        ..feedback.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facility_finder_lib::Facility;

    fn store() -> FacilityStore {
        FacilityStore::from_facilities([
            Facility::new("r1", "Restroom A", "restroom", Position::new(23.182, 75.784)),
            Facility::new("m1", "Clinic", "medical", Position::new(23.190, 75.790)),
        ])
    }

    #[test]
    fn test_walk_notifies_once_per_facility() {
        let walk = vec![
            Position::new(23.1800, 75.7840),
            Position::new(23.1815, 75.7840),
            Position::new(23.1819, 75.7840),
            Position::new(23.1821, 75.7840),
        ];
        let report = run_with(&store(), Ok(walk), None);
        assert_eq!(report.updates, 4);
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].body, "Restroom A (restroom) is nearby");
        assert!(report.route.is_none());
    }

    #[test]
    fn test_find_after_walk_draws_route() {
        let report = run_with(
            &store(),
            Ok(vec![Position::new(23.185, 75.786)]),
            Some(Category::new("medical")),
        );
        assert_eq!(
            report.route,
            Some((Position::new(23.185, 75.786), Position::new(23.190, 75.790)))
        );
        assert!(report.messages.is_empty());
    }

    #[test]
    fn test_no_location_source_asks_to_wait() {
        let report = run_with(
            &store(),
            Err("No location source".to_string()),
            Some(Category::new("medical")),
        );
        assert_eq!(report.updates, 0);
        assert_eq!(report.messages, vec!["Waiting for your location...".to_string()]);
    }

    #[test]
    fn test_unknown_category_is_reported() {
        let report = run_with(
            &store(),
            Ok(vec![Position::new(23.185, 75.786)]),
            Some(Category::new("parking")),
        );
        assert_eq!(report.messages, vec!["No parking found.".to_string()]);
        assert!(report.route.is_none());
    }
}
