//! Facility Finder Library - Core logic for the facility map
//!
//! This library holds everything the map application needs that is not drawing:
//! the facility data model, great-circle distances, nearest-facility search and the
//! proximity notification state, all driven through an explicit [`Session`].
//!
//! # Architecture
//!
//! - **[`Facility`]** / **[`FacilityStore`]**: Immutable facility records loaded once per session
//! - **[`utils::haversine_distance`]**: Spherical-earth distance in meters
//! - **[`ProximityWatcher`]**: One-time alerts when the user comes near a facility
//! - **[`find_nearest`]**: Closest facility of a category to the user
//! - **[`Session`]**: Event entry points returning [`Effect`]s for the collaborators
//! - **[`MapSurface`]** / **[`NotificationSink`]** / **[`UserPrompt`]**: Rendering and delivery seams
//!
//! # Example
//!
//! ```
//! use facility_finder_lib::{Event, FacilityStore, Position, Session};
//!
//! let store = FacilityStore::from_json_str(
//!     r#"[{"_id": "a", "name": "Restroom A", "type": "restroom",
//!          "location": {"type": "Point", "coordinates": [75.784, 23.182]}}]"#,
//! )
//! .unwrap();
//!
//! let mut session = Session::new();
//! let effects = session.handle(&store, Event::LocationChanged(Position::new(23.1821, 75.7841)));
//! assert_eq!(effects.len(), 2); // user marker + one notification
//! ```

mod facility;
mod nearest;
mod proximity;
mod session;
mod store;
mod surface;
pub mod utils;

// Public API exports
pub use facility::{Category, Facility, FacilityId, Position};
pub use nearest::{NearestError, NearestMatch, find_nearest};
pub use proximity::{
    NotifiedSet, PROXIMITY_RADIUS_METERS, PROXIMITY_TITLE, ProximityAlert, ProximityWatcher,
};
pub use session::{ActiveRoute, Effect, Event, LocationStatus, Session};
pub use store::FacilityStore;
pub use surface::{
    MapSurface, Marker, MarkerKind, Notification, NotificationSink, UserPrompt, apply_effects,
};

/// Error types for facility data loading
#[derive(Debug, thiserror::Error)]
pub enum FacilityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid facility record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, FacilityError>;
