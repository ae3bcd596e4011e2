//! Map overlay state
//!
//! [`MapLayer`] is the app's [`MapSurface`]: session effects update it, and the
//! walkers plugin draws a cheap snapshot of it every frame.

use egui::Color32;
use facility_finder_lib::{Category, MapSurface, Marker, MarkerKind, Position};
use geo::{Haversine, InterpolatePoint, Point};
use std::sync::Arc;

/// The route currently drawn (straight great-circle leg between the endpoints)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteLine {
    pub from: Position,
    pub to: Position,
}

impl RouteLine {
    #[inline]
    pub fn distance_meters(&self) -> f64 {
        self.from.distance_to(self.to)
    }

    /// Points along the great-circle leg, endpoints included
    pub fn interpolate(&self, steps: usize) -> Vec<Position> {
        let steps = steps.max(1);
        let (from, to) = (Point::from(self.from), Point::from(self.to));
        (0..=steps)
            .map(|i| match i {
                0 => self.from,
                i if i == steps => self.to,
                i => Haversine
                    .point_at_ratio_between(from, to, i as f64 / steps as f64)
                    .into(),
            })
            .collect()
    }
}

/// Everything the plugin needs to draw one frame
#[derive(Clone, Debug, Default)]
pub struct LayerData {
    pub facilities: Vec<Marker>,
    pub crowds: Vec<Marker>,
    pub user: Option<Marker>,
    pub route: Option<RouteLine>,
    /// Category colors, in first-seen order
    pub category_colors: Vec<(Category, Color32)>,
}

impl LayerData {
    pub fn color_for(&self, category: &Category) -> Color32 {
        self.category_colors
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, color)| *color)
            .unwrap_or(Color32::GRAY)
    }
}

/// Map overlay updated by session effects
#[derive(Default)]
pub struct MapLayer {
    data: Arc<LayerData>,
    pending_fit: Option<(Position, Position)>,
}

impl MapLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared snapshot for the plugin (cheap to clone)
    #[inline]
    pub fn snapshot(&self) -> Arc<LayerData> {
        self.data.clone()
    }

    #[inline]
    pub fn data(&self) -> &LayerData {
        &self.data
    }

    /// Take the bounds requested by the last `fit_bounds` effect
    pub fn take_pending_fit(&mut self) -> Option<(Position, Position)> {
        self.pending_fit.take()
    }

    /// Remove facility markers, user marker and route (crowd zones stay)
    pub fn reset_session(&mut self) {
        let data = Arc::make_mut(&mut self.data);
        data.facilities.clear();
        data.category_colors.clear();
        data.user = None;
        data.route = None;
        self.pending_fit = None;
    }
}

impl MapSurface for MapLayer {
    fn place_marker(&mut self, marker: Marker) {
        let data = Arc::make_mut(&mut self.data);
        match &marker.kind {
            MarkerKind::User => data.user = Some(marker),
            MarkerKind::Facility { category, .. } => {
                if !data.category_colors.iter().any(|(c, _)| c == category) {
                    let color = category_color(data.category_colors.len());
                    data.category_colors.push((category.clone(), color));
                }
                data.facilities.push(marker);
            }
            MarkerKind::Crowd => data.crowds.push(marker),
        }
    }

    fn draw_route(&mut self, from: Position, to: Position) {
        Arc::make_mut(&mut self.data).route = Some(RouteLine { from, to });
    }

    fn clear_route(&mut self) {
        Arc::make_mut(&mut self.data).route = None;
    }

    fn fit_bounds(&mut self, a: Position, b: Position) {
        self.pending_fit = Some((a, b));
    }
}

/// Generate a distinct color for a category based on its index
pub fn category_color(index: usize) -> Color32 {
    // Golden angle for better distribution
    let hue = (index as f32 * 137.508) % 360.0;
    let saturation = 0.7;
    let value = 0.85;

    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = if hue < 60.0 {
        (c, x, 0.0)
    } else if hue < 120.0 {
        (x, c, 0.0)
    } else if hue < 180.0 {
        (0.0, c, x)
    } else if hue < 240.0 {
        (0.0, x, c)
    } else if hue < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Color32::from_rgb(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Zoom level that fits a lat/lon span in the view
pub fn zoom_for_span(lat_span: f64, lon_span: f64) -> f64 {
    let max_span = lat_span.abs().max(lon_span.abs());
    if max_span > 0.0 {
        let zoom_estimate = (4.0 * 360.0 / max_span).log2();
        (zoom_estimate - 0.5).clamp(1.0, 18.0)
    } else {
        17.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facility_finder_lib::FacilityId;

    fn facility_marker(id: &str, category: &str) -> Marker {
        Marker {
            position: Position::new(1.0, 1.0),
            kind: MarkerKind::Facility {
                id: FacilityId::new(id),
                category: Category::new(category),
            },
            label: id.to_string(),
        }
    }

    #[test]
    fn test_user_marker_is_replaced() {
        let mut layer = MapLayer::new();
        for lat in [1.0, 2.0] {
            layer.place_marker(Marker {
                position: Position::new(lat, 0.0),
                kind: MarkerKind::User,
                label: "You are here".to_string(),
            });
        }
        assert_eq!(layer.data().user.as_ref().unwrap().position.lat(), 2.0);
    }

    #[test]
    fn test_category_colors_assigned_once() {
        let mut layer = MapLayer::new();
        layer.place_marker(facility_marker("a", "restroom"));
        layer.place_marker(facility_marker("b", "medical"));
        layer.place_marker(facility_marker("c", "restroom"));

        let data = layer.data();
        assert_eq!(data.facilities.len(), 3);
        assert_eq!(data.category_colors.len(), 2);
        assert_ne!(
            data.color_for(&Category::new("restroom")),
            data.color_for(&Category::new("medical"))
        );
        assert_eq!(data.color_for(&Category::new("unknown")), Color32::GRAY);
    }

    #[test]
    fn test_route_draw_replace_clear() {
        let mut layer = MapLayer::new();
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 1.0);
        layer.draw_route(a, b);
        layer.draw_route(b, a);
        assert_eq!(layer.data().route, Some(RouteLine { from: b, to: a }));
        layer.clear_route();
        assert!(layer.data().route.is_none());
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_changes() {
        let mut layer = MapLayer::new();
        let snapshot = layer.snapshot();
        layer.place_marker(facility_marker("a", "x"));
        assert!(snapshot.facilities.is_empty());
        assert_eq!(layer.data().facilities.len(), 1);
    }

    #[test]
    fn test_reset_session_keeps_crowds() {
        let mut layer = MapLayer::new();
        layer.place_marker(Marker {
            position: Position::new(0.0, 0.0),
            kind: MarkerKind::Crowd,
            label: "Crowd".to_string(),
        });
        layer.place_marker(facility_marker("a", "x"));
        layer.fit_bounds(Position::new(0.0, 0.0), Position::new(1.0, 1.0));
        layer.reset_session();

        assert_eq!(layer.data().crowds.len(), 1);
        assert!(layer.data().facilities.is_empty());
        assert!(layer.take_pending_fit().is_none());
    }

    #[test]
    fn test_route_interpolation_follows_great_circle() {
        let along_equator = RouteLine {
            from: Position::new(0.0, 0.0),
            to: Position::new(0.0, 2.0),
        };
        let points = along_equator.interpolate(2);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], along_equator.from);
        assert_eq!(points[2], along_equator.to);
        assert!(points[1].lat().abs() < 1e-9);
        assert!((points[1].lon() - 1.0).abs() < 1e-9);

        // East-west legs away from the equator bow towards the pole
        let northern = RouteLine {
            from: Position::new(60.0, 0.0),
            to: Position::new(60.0, 40.0),
        };
        let midpoint = northern.interpolate(2)[1];
        assert!(midpoint.lat() > 60.5);
        assert!((midpoint.lon() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_for_span() {
        assert_eq!(zoom_for_span(0.0, 0.0), 17.0);
        assert!(zoom_for_span(0.01, 0.01) > zoom_for_span(1.0, 1.0));
        assert_eq!(zoom_for_span(360.0, 360.0), 1.5);
    }
}
