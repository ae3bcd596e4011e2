//! Nearest facility search
//!
//! A linear scan over the store: facilities are few and the search runs once per
//! user request. Among equidistant candidates the first one in store order wins.

use crate::{Category, Facility, FacilityStore, Position, utils};

/// Result of a successful nearest search
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestMatch<'a> {
    pub facility: &'a Facility,
    /// Position the search was made from
    pub origin: Position,
    pub distance_meters: f64,
}

/// Reasons a nearest search has no answer
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NearestError {
    #[error("Waiting for your location...")]
    NoPosition,

    #[error("Please select a category.")]
    NoCategory,

    #[error("No {0} found.")]
    NoMatch(Category),
}

/// Find the facility of `category` closest to `position`
///
/// The position check comes first: with no known location the category is
/// irrelevant.
pub fn find_nearest<'a>(
    store: &'a FacilityStore,
    category: &Category,
    position: Option<Position>,
) -> Result<NearestMatch<'a>, NearestError> {
    profiling::scope!("find_nearest");

    let position = position.ok_or(NearestError::NoPosition)?;
    if category.is_blank() {
        return Err(NearestError::NoCategory);
    }

    let mut best: Option<NearestMatch<'a>> = None;
    for facility in store.iter().filter(|f| &f.category == category) {
        let distance = utils::haversine_distance(position, facility.position);
        // Strict comparison keeps the earliest facility on ties
        if best.is_none_or(|b| distance < b.distance_meters) {
            best = Some(NearestMatch {
                facility,
                origin: position,
                distance_meters: distance,
            });
        }
    }

    best.ok_or_else(|| NearestError::NoMatch(category.clone()))
}
