//! Walkers plugin for drawing facilities, the user and the active route
//!
//! The plugin draws a [`LayerData`] snapshot on top of the map tiles. Hovering a
//! facility marker shows its name and category.

use crate::app::map_layer::LayerData;
use egui::{Color32, Pos2, Stroke};
use facility_finder_lib::{Position, utils};
use std::sync::Arc;
use walkers::{Plugin, Projector};

/// Marker radius in pixels
const MARKER_RADIUS: f32 = 7.0;

/// Hover distance for showing a marker label, in pixels
const HOVER_RADIUS: f32 = 12.0;

/// Crowd zone circle radius in pixels
const CROWD_RADIUS: f32 = 20.0;

const USER_COLOR: Color32 = Color32::from_rgb(40, 110, 230);
const ROUTE_COLOR: Color32 = Color32::from_rgb(70, 130, 220);
const CROWD_COLOR: (u8, u8, u8) = (230, 40, 40);

/// Plugin rendering the overlay on the map
pub struct FacilityPlugin {
    layer: Arc<LayerData>,
    route_width: f32,
    /// Seconds since app start, drives the crowd zone pulse
    time: f64,
}

impl FacilityPlugin {
    pub fn new(layer: Arc<LayerData>, route_width: f32, time: f64) -> Self {
        Self {
            layer,
            route_width,
            time,
        }
    }

    fn to_screen(projector: &Projector, position: Position) -> Pos2 {
        let screen_vec = projector.project(walkers::lat_lon(position.lat(), position.lon()));
        Pos2::new(screen_vec.x, screen_vec.y)
    }

    fn render_route(&self, projector: &Projector, painter: &egui::Painter) {
        let Some(route) = self.layer.route else {
            return;
        };

        let screen_points: Vec<Pos2> = route
            .interpolate(32)
            .into_iter()
            .map(|p| Self::to_screen(projector, p))
            .collect();

        // Dark outline first for visibility on any tiles
        painter.add(egui::Shape::line(
            screen_points.clone(),
            Stroke::new(self.route_width + 2.0, Color32::from_black_alpha(160)),
        ));
        painter.add(egui::Shape::line(
            screen_points,
            Stroke::new(self.route_width, ROUTE_COLOR),
        ));

        let destination = Self::to_screen(projector, route.to);
        painter.circle_stroke(destination, MARKER_RADIUS + 4.0, Stroke::new(2.0, ROUTE_COLOR));

        let midpoint = route.interpolate(2)[1];
        painter.text(
            Self::to_screen(projector, midpoint) + egui::vec2(0.0, -10.0),
            egui::Align2::CENTER_BOTTOM,
            utils::format_distance(route.distance_meters()),
            egui::FontId::proportional(13.0),
            Color32::BLACK,
        );
    }

    fn render_crowds(&self, projector: &Projector, painter: &egui::Painter) {
        // Pulse between 20% and 60% opacity
        let pulse = 0.4 + 0.2 * (self.time * 4.0).sin() as f32;
        let (r, g, b) = CROWD_COLOR;
        let fill = Color32::from_rgba_unmultiplied(r, g, b, (pulse * 255.0) as u8);

        for crowd in &self.layer.crowds {
            let center = Self::to_screen(projector, crowd.position);
            painter.circle_filled(center, CROWD_RADIUS, fill);
            painter.circle_stroke(center, CROWD_RADIUS, Stroke::new(1.5, Color32::from_rgb(r, g, b)));
        }
    }

    fn render_facilities(&self, projector: &Projector, painter: &egui::Painter) {
        for marker in &self.layer.facilities {
            let color = match &marker.kind {
                facility_finder_lib::MarkerKind::Facility { category, .. } => {
                    self.layer.color_for(category)
                }
                _ => Color32::GRAY,
            };
            let center = Self::to_screen(projector, marker.position);
            painter.circle_filled(center, MARKER_RADIUS, color);
            painter.circle_stroke(center, MARKER_RADIUS, Stroke::new(1.5, Color32::WHITE));
        }
    }

    fn render_user(&self, projector: &Projector, painter: &egui::Painter) {
        let Some(user) = &self.layer.user else {
            return;
        };
        let center = Self::to_screen(projector, user.position);
        painter.circle_filled(center, MARKER_RADIUS + 5.0, USER_COLOR.gamma_multiply(0.25));
        painter.circle_filled(center, MARKER_RADIUS, USER_COLOR);
        painter.circle_stroke(center, MARKER_RADIUS, Stroke::new(2.0, Color32::WHITE));
    }

    /// Label of the marker closest to the pointer, if any is close enough
    fn hovered_label(&self, projector: &Projector, pointer: Pos2) -> Option<(Pos2, &str)> {
        let candidates = self
            .layer
            .facilities
            .iter()
            .chain(&self.layer.crowds)
            .chain(self.layer.user.iter());

        candidates
            .map(|marker| {
                let center = Self::to_screen(projector, marker.position);
                (center, marker.label.as_str(), center.distance(pointer))
            })
            .filter(|(_, _, distance)| *distance <= HOVER_RADIUS)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(center, label, _)| (center, label))
    }

    fn render_hover_label(&self, projector: &Projector, response: &egui::Response, painter: &egui::Painter) {
        let Some(pointer) = response.hover_pos() else {
            return;
        };
        let Some((anchor, label)) = self.hovered_label(projector, pointer) else {
            return;
        };

        let anchor = anchor + egui::vec2(0.0, -MARKER_RADIUS - 6.0);
        let galley = painter.layout_no_wrap(
            label.to_string(),
            egui::FontId::proportional(13.0),
            Color32::WHITE,
        );
        let rect = egui::Align2::CENTER_BOTTOM
            .anchor_size(anchor, galley.size())
            .expand(4.0);
        painter.rect_filled(rect, 4.0, Color32::from_black_alpha(200));
        painter.galley(rect.min + egui::vec2(4.0, 4.0), galley, Color32::WHITE);
    }
}

impl Plugin for FacilityPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("FacilityPlugin::run");

        let painter = ui.painter();

        self.render_crowds(projector, painter);
        self.render_route(projector, painter);
        self.render_facilities(projector, painter);
        self.render_user(projector, painter);
        self.render_hover_label(projector, response, painter);
    }
}
