//! Location sources
//!
//! The session only sees `LocationChanged` / `LocationUnavailable` events. Where
//! they come from depends on the platform:
//!
//! - web: `navigator.geolocation.watchPosition` with high accuracy
//! - desktop: a fixed `--position`, or the points of a GPX track replayed at a
//!   fixed interval (`--replay-gpx`)

use crate::app::settings::Settings;
use facility_finder_lib::{Event, Position, utils};
use std::path::Path;
use std::time::Duration;

/// Errors from building a GPX replay
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("GPX file has no usable points")]
    EmptyTrack,
}

/// One report from a location source
#[derive(Clone, Debug, PartialEq)]
pub enum LocationUpdate {
    Fix(Position),
    Error(String),
}

impl From<LocationUpdate> for Event {
    fn from(update: LocationUpdate) -> Self {
        match update {
            LocationUpdate::Fix(position) => Event::LocationChanged(position),
            LocationUpdate::Error(reason) => Event::LocationUnavailable(reason),
        }
    }
}

/// Replays the points of a GPX file one at a time
#[derive(Clone, Debug)]
pub struct TrackReplay {
    points: Vec<Position>,
    next_index: usize,
    interval: Duration,
    last_emit: Option<instant::Instant>,
}

impl TrackReplay {
    /// Load a replay from a GPX file
    pub fn from_path(path: impl AsRef<Path>, interval: Duration) -> Result<Self, LocationError> {
        let file = std::fs::File::open(path.as_ref())?;
        let gpx = gpx::read(std::io::BufReader::new(file))?;
        Self::from_gpx(&gpx, interval)
    }

    /// Collect track points in order; files without tracks fall back to routes, then waypoints
    pub fn from_gpx(gpx: &gpx::Gpx, interval: Duration) -> Result<Self, LocationError> {
        let to_position = |w: &gpx::Waypoint| Position::new(w.point().y(), w.point().x());

        let mut points: Vec<Position> = gpx
            .tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .map(to_position)
            .collect();
        if points.is_empty() {
            points = gpx
                .routes
                .iter()
                .flat_map(|route| &route.points)
                .map(to_position)
                .collect();
        }
        if points.is_empty() {
            points = gpx.waypoints.iter().map(to_position).collect();
        }

        let before = points.len();
        points.retain(|p| utils::is_valid_wgs84(p.lat(), p.lon()));
        if points.len() < before {
            tracing::warn!("Skipped {} invalid GPX points", before - points.len());
        }

        if points.is_empty() {
            return Err(LocationError::EmptyTrack);
        }

        Ok(Self {
            points,
            next_index: 0,
            interval,
            last_emit: None,
        })
    }

    /// Next point if it is due at `now`; the first point is due immediately
    pub fn next_due(&mut self, now: instant::Instant) -> Option<Position> {
        let point = *self.points.get(self.next_index)?;
        if let Some(last) = self.last_emit
            && now.duration_since(last) < self.interval
        {
            return None;
        }
        self.last_emit = Some(now);
        self.next_index += 1;
        Some(point)
    }

    /// Time until the next point is due, `None` once finished
    pub fn time_to_next(&self, now: instant::Instant) -> Option<Duration> {
        if self.is_finished() {
            return None;
        }
        Some(match self.last_emit {
            Some(last) => self.interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        })
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.next_index >= self.points.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// All points, regardless of replay progress
    #[inline]
    pub fn points(&self) -> &[Position] {
        &self.points
    }
}

enum Source {
    /// Nothing can produce a location; reports one error
    Unavailable { reason: String, reported: bool },
    /// A single fixed position, reported once
    Fixed { position: Position, reported: bool },
    Replay(TrackReplay),
    #[cfg(target_arch = "wasm32")]
    Browser(browser::BrowserGeolocation),
}

/// The active location source for the app
pub struct LocationFeed {
    source: Source,
}

impl LocationFeed {
    /// Pick a source from the settings: replay, then fixed position, then the platform default
    pub fn from_settings(settings: &Settings, ctx: &egui::Context) -> Self {
        if let Some(path) = &settings.replay_gpx {
            let interval = Duration::from_millis(settings.replay_interval_ms);
            match TrackReplay::from_path(path, interval) {
                Ok(replay) => {
                    tracing::info!(
                        "Replaying {} points from {} every {} ms",
                        replay.len(),
                        path.display(),
                        settings.replay_interval_ms
                    );
                    return Self::replay(replay);
                }
                Err(e) => {
                    tracing::error!("Failed to load GPX replay {}: {}", path.display(), e);
                }
            }
        }

        if let Some(position) = settings.position {
            return Self::fixed(position);
        }

        Self::platform_default(ctx)
    }

    pub fn fixed(position: Position) -> Self {
        Self {
            source: Source::Fixed {
                position,
                reported: false,
            },
        }
    }

    pub fn replay(replay: TrackReplay) -> Self {
        Self {
            source: Source::Replay(replay),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            source: Source::Unavailable {
                reason: reason.into(),
                reported: false,
            },
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn platform_default(ctx: &egui::Context) -> Self {
        Self {
            source: Source::Browser(browser::BrowserGeolocation::start(ctx.clone())),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn platform_default(_ctx: &egui::Context) -> Self {
        Self::unavailable("Geolocation not available (use --position or --replay-gpx)")
    }

    /// Drain the updates available at `now`
    pub fn poll(&mut self, now: instant::Instant) -> Vec<LocationUpdate> {
        match &mut self.source {
            Source::Unavailable { reason, reported } => {
                if *reported {
                    Vec::new()
                } else {
                    *reported = true;
                    vec![LocationUpdate::Error(reason.clone())]
                }
            }
            Source::Fixed { position, reported } => {
                if *reported {
                    Vec::new()
                } else {
                    *reported = true;
                    vec![LocationUpdate::Fix(*position)]
                }
            }
            Source::Replay(replay) => replay
                .next_due(now)
                .map(LocationUpdate::Fix)
                .into_iter()
                .collect(),
            #[cfg(target_arch = "wasm32")]
            Source::Browser(browser) => browser.drain(),
        }
    }

    /// How long the UI may sleep before the next poll is useful
    pub fn time_to_next(&self, now: instant::Instant) -> Option<Duration> {
        match &self.source {
            Source::Replay(replay) => replay.time_to_next(now),
            _ => None,
        }
    }

    /// Short description for the sidebar
    pub fn describe(&self) -> String {
        match &self.source {
            Source::Unavailable { .. } => "No location source".to_string(),
            Source::Fixed { position, .. } => format!("Fixed position {}", position),
            Source::Replay(replay) => format!(
                "GPX replay ({}/{})",
                replay.next_index.min(replay.len()),
                replay.len()
            ),
            #[cfg(target_arch = "wasm32")]
            Source::Browser(_) => "Browser geolocation".to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::LocationUpdate;
    use facility_finder_lib::Position;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::Closure;

    type Queue = Rc<RefCell<VecDeque<LocationUpdate>>>;

    /// `navigator.geolocation.watchPosition` feeding a queue drained each frame
    pub struct BrowserGeolocation {
        queue: Queue,
        // The watch runs for the lifetime of the page, so the callbacks must stay alive
        _on_position: Option<Closure<dyn FnMut(web_sys::GeolocationPosition)>>,
        _on_error: Option<Closure<dyn FnMut(web_sys::GeolocationPositionError)>>,
    }

    impl BrowserGeolocation {
        pub fn start(ctx: egui::Context) -> Self {
            let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));

            let geolocation = web_sys::window().and_then(|w| w.navigator().geolocation().ok());
            let Some(geolocation) = geolocation else {
                queue
                    .borrow_mut()
                    .push_back(LocationUpdate::Error("Geolocation not available".to_string()));
                return Self {
                    queue,
                    _on_position: None,
                    _on_error: None,
                };
            };

            let position_queue = queue.clone();
            let position_ctx = ctx.clone();
            let on_position = Closure::<dyn FnMut(web_sys::GeolocationPosition)>::new(
                move |position: web_sys::GeolocationPosition| {
                    let coords = position.coords();
                    position_queue
                        .borrow_mut()
                        .push_back(LocationUpdate::Fix(Position::new(
                            coords.latitude(),
                            coords.longitude(),
                        )));
                    position_ctx.request_repaint();
                },
            );

            let error_queue = queue.clone();
            let on_error = Closure::<dyn FnMut(web_sys::GeolocationPositionError)>::new(
                move |error: web_sys::GeolocationPositionError| {
                    error_queue
                        .borrow_mut()
                        .push_back(LocationUpdate::Error(error.message()));
                    ctx.request_repaint();
                },
            );

            let options = web_sys::PositionOptions::new();
            options.set_enable_high_accuracy(true);

            match geolocation.watch_position_with_error_callback_and_options(
                on_position.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &options,
            ) {
                Ok(watch_id) => tracing::debug!("Started geolocation watch {}", watch_id),
                Err(e) => {
                    tracing::error!("Failed to start geolocation watch: {:?}", e);
                    queue.borrow_mut().push_back(LocationUpdate::Error(
                        "Failed to start geolocation watch".to_string(),
                    ));
                }
            }

            Self {
                queue,
                _on_position: Some(on_position),
                _on_error: Some(on_error),
            }
        }

        pub fn drain(&mut self) -> Vec<LocationUpdate> {
            self.queue.borrow_mut().drain(..).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpx::{Gpx, Track, TrackSegment, Waypoint};

    fn create_test_waypoint(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(geo::Point::new(lon, lat))
    }

    fn create_test_gpx() -> Gpx {
        let mut gpx = Gpx::default();
        let mut track = Track::default();
        let mut segment = TrackSegment::default();

        segment.points.push(create_test_waypoint(23.180, 75.780));
        segment.points.push(create_test_waypoint(23.181, 75.782));
        segment.points.push(create_test_waypoint(23.182, 75.784));

        track.segments.push(segment);
        gpx.tracks.push(track);
        gpx
    }

    #[test]
    fn test_replay_emits_in_order_at_interval() {
        let interval = Duration::from_millis(500);
        let mut replay = TrackReplay::from_gpx(&create_test_gpx(), interval).unwrap();
        let start = instant::Instant::now();

        assert_eq!(replay.next_due(start), Some(Position::new(23.180, 75.780)));
        // Not due yet
        assert_eq!(replay.next_due(start + Duration::from_millis(100)), None);
        assert_eq!(
            replay.next_due(start + Duration::from_millis(500)),
            Some(Position::new(23.181, 75.782))
        );
        assert_eq!(
            replay.next_due(start + Duration::from_millis(1000)),
            Some(Position::new(23.182, 75.784))
        );
        assert!(replay.is_finished());
        assert_eq!(replay.next_due(start + Duration::from_secs(10)), None);
        assert_eq!(replay.time_to_next(start), None);
    }

    #[test]
    fn test_replay_falls_back_to_waypoints() {
        let mut gpx = Gpx::default();
        gpx.waypoints.push(create_test_waypoint(1.0, 2.0));
        let replay = TrackReplay::from_gpx(&gpx, Duration::ZERO).unwrap();
        assert_eq!(replay.points(), &[Position::new(1.0, 2.0)]);
    }

    #[test]
    fn test_empty_gpx_fails() {
        let result = TrackReplay::from_gpx(&Gpx::default(), Duration::ZERO);
        assert!(matches!(result, Err(LocationError::EmptyTrack)));
    }

    #[test]
    fn test_missing_file_fails() {
        let result = TrackReplay::from_path("/definitely/not/here.gpx", Duration::ZERO);
        assert!(matches!(result, Err(LocationError::Io(_))));
    }

    #[test]
    fn test_fixed_source_reports_once() {
        let here = Position::new(1.0, 1.0);
        let mut feed = LocationFeed::fixed(here);
        let now = instant::Instant::now();
        assert_eq!(feed.poll(now), vec![LocationUpdate::Fix(here)]);
        assert!(feed.poll(now).is_empty());
    }

    #[test]
    fn test_unavailable_source_reports_error_once() {
        let mut feed = LocationFeed::unavailable("no gps");
        let now = instant::Instant::now();
        let updates = feed.poll(now);
        assert_eq!(updates, vec![LocationUpdate::Error("no gps".to_string())]);
        assert_eq!(
            Event::from(updates[0].clone()),
            Event::LocationUnavailable("no gps".to_string())
        );
        assert!(feed.poll(now).is_empty());
    }
}
