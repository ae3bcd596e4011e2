//! Facility store and JSON loading
//!
//! The store is loaded once at startup from a JSON array of facility records:
//!
//! ```json
//! [{"_id": "f1", "name": "Restroom A", "type": "restroom",
//!   "location": {"type": "Point", "coordinates": [75.784, 23.182]}}]
//! ```
//!
//! Coordinates follow GeoJSON ordering (longitude first). Invalid records are
//! skipped with a warning so one bad entry does not hide the rest of the data.

use crate::{Category, Facility, FacilityError, FacilityId, Position, Result, utils};
use geo::{BoundingRect, MultiPoint, Point, Rect};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Raw facility record as found in the data source
#[derive(Deserialize)]
struct FacilityRecord {
    #[serde(rename = "_id", alias = "id")]
    id: RawId,
    name: String,
    #[serde(rename = "type", alias = "category")]
    category: String,
    location: RawLocation,
}

/// Identifiers may be strings or numbers in the source data
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for FacilityId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => FacilityId::new(s),
            RawId::Number(n) => FacilityId::new(n.to_string()),
        }
    }
}

/// GeoJSON-like point: `coordinates` is `[longitude, latitude]`
#[derive(Deserialize)]
struct RawLocation {
    coordinates: Vec<f64>,
}

impl FacilityRecord {
    fn into_facility(self, index: usize) -> Result<Facility> {
        let (lon, lat) = match self.location.coordinates.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => {
                return Err(FacilityError::InvalidRecord {
                    index,
                    reason: "location needs [longitude, latitude]".to_string(),
                });
            }
        };

        if !utils::is_valid_wgs84(lat, lon) {
            return Err(FacilityError::InvalidRecord {
                index,
                reason: format!("coordinates out of range: lat {lat}, lon {lon}"),
            });
        }

        Ok(Facility {
            id: self.id.into(),
            name: self.name,
            category: Category::new(self.category),
            position: Position::new(lat, lon),
        })
    }
}

/// Read-only collection of the facilities known to the session
#[derive(Clone, Debug, Default)]
pub struct FacilityStore {
    /// Facilities in input order
    facilities: Vec<Facility>,
    /// Identifier to index in `facilities`
    by_id: HashMap<FacilityId, usize>,
}

impl FacilityStore {
    /// Build a store from already-constructed facilities
    ///
    /// Duplicate identifiers are skipped (first one wins).
    pub fn from_facilities(facilities: impl IntoIterator<Item = Facility>) -> Self {
        let mut store = Self::default();
        for facility in facilities {
            store.push(facility);
        }
        store
    }

    /// Parse a store from JSON text
    ///
    /// Fails only if the text is not a JSON array; individual bad records are
    /// skipped with a warning.
    pub fn from_json_str(json: &str) -> Result<Self> {
        profiling::scope!("FacilityStore::from_json_str");
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self::from_values(values))
    }

    /// Parse a store from a reader producing JSON
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        profiling::scope!("FacilityStore::from_reader");
        let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        Ok(Self::from_values(values))
    }

    /// Load a store from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Load a store from a JSON file, degrading to an empty store on failure
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(store) => {
                tracing::info!("Loaded {} facilities from {}", store.len(), path.display());
                store
            }
            Err(e) => {
                tracing::error!("Failed to load facilities from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn from_values(values: Vec<serde_json::Value>) -> Self {
        let mut store = Self::default();
        for (index, value) in values.into_iter().enumerate() {
            let facility = serde_json::from_value::<FacilityRecord>(value)
                .map_err(|e| FacilityError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                })
                .and_then(|record| record.into_facility(index));

            match facility {
                Ok(facility) => store.push(facility),
                Err(e) => tracing::warn!("Skipping facility: {}", e),
            }
        }
        store
    }

    fn push(&mut self, facility: Facility) {
        if self.by_id.contains_key(&facility.id) {
            tracing::warn!("Skipping facility with duplicate id {}", facility.id);
            return;
        }
        self.by_id.insert(facility.id.clone(), self.facilities.len());
        self.facilities.push(facility);
    }

    /// Iterate facilities in input order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Facility> {
        self.facilities.iter()
    }

    /// All facilities in input order
    #[inline]
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// Look up a facility by identifier
    pub fn get(&self, id: &FacilityId) -> Option<&Facility> {
        self.by_id.get(id).map(|&i| &self.facilities[i])
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Vec::new();
        for facility in &self.facilities {
            if !categories.contains(&facility.category) {
                categories.push(facility.category.clone());
            }
        }
        categories
    }

    /// Number of facilities in a category
    pub fn count_in(&self, category: &Category) -> usize {
        self.facilities
            .iter()
            .filter(|f| &f.category == category)
            .count()
    }

    /// Extent of all facilities as a `geo::Rect` (x = longitude, y = latitude)
    ///
    /// Returns `None` if the store is empty.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.facilities
            .iter()
            .map(|f| Point::from(f.position))
            .collect::<MultiPoint<f64>>()
            .bounding_rect()
    }
}

impl<'a> IntoIterator for &'a FacilityStore {
    type Item = &'a Facility;
    type IntoIter = std::slice::Iter<'a, Facility>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
