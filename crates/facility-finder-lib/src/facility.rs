//! Facility data model
//!
//! Facilities are immutable once loaded. Positions are stored as WGS84
//! latitude/longitude in degrees.

use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic position (WGS84 degrees)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    lat: f64,
    lon: f64,
}

impl Position {
    /// Create a position from latitude and longitude in degrees
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Distance to another position in meters
    #[inline]
    pub fn distance_to(&self, other: Position) -> f64 {
        crate::utils::haversine_distance(*self, other)
    }
}

/// `geo` points use x = longitude, y = latitude
impl From<Position> for Point<f64> {
    fn from(position: Position) -> Self {
        Point::new(position.lon, position.lat)
    }
}

impl From<Point<f64>> for Position {
    fn from(point: Point<f64>) -> Self {
        Position::new(point.y(), point.x())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// Unique facility identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(String);

impl FacilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facility category label (e.g. "restroom", "medical")
///
/// Categories compare by exact string equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the label is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A point of interest with a category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub category: Category,
    pub position: Position,
}

impl Facility {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: FacilityId::new(id),
            name: name.into(),
            category: Category::new(category),
            position,
        }
    }

    /// Label shown on the map and in notifications
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.category)
    }
}
