//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen map view with facility, user, route and crowd overlays
//! - Toggleable sidebar for searching and status
//! - Toasts for proximity notifications and messages
//! - Responsive layout (sidebar from bottom on portrait displays)

pub(crate) mod location;
pub(crate) mod map_layer;
pub(crate) mod notify;
mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::map_layer::zoom_for_span;
use crate::app::plugin::FacilityPlugin;
use crate::app::settings::Settings;
use crate::app::state::{AppState, TilesProvider, UiSettings};
use eframe::egui;
use facility_finder_lib::Position;
use std::time::Duration;
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Repaint interval while crowd zones pulse
const PULSE_REPAINT: Duration = Duration::from_millis(50);

/// Custom OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17
    }
}

/// Persisted UI settings (never session state)
#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
struct PersistedSettings {
    tiles_provider: String,
    sidebar_open: bool,
    route_width: f32,
    selected_category: String,
}

impl From<&UiSettings> for PersistedSettings {
    fn from(settings: &UiSettings) -> Self {
        Self {
            tiles_provider: settings.tiles_provider.name().to_string(),
            sidebar_open: settings.sidebar_open,
            route_width: settings.route_width,
            selected_category: settings.selected_category.clone(),
        }
    }
}

impl From<PersistedSettings> for UiSettings {
    fn from(settings: PersistedSettings) -> Self {
        Self {
            tiles_provider: TilesProvider::from_name(&settings.tiles_provider),
            sidebar_open: settings.sidebar_open,
            route_width: settings.route_width.clamp(1.0, 10.0),
            selected_category: settings.selected_category,
        }
    }
}

const PERSISTED_KEY: &str = "persisted_settings";

/// Main application structure
pub struct FacilityFinderApp {
    /// Application state (store, session, overlays, UI settings)
    state: AppState,

    /// Map tiles provider (OpenStreetMap)
    tiles_osm: HttpTiles,

    /// Map tiles provider (OpenTopoMap)
    tiles_otm: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Where the map looks before the first location fix
    initial_center: Position,

    /// Show help overlay
    show_help: bool,
}

impl FacilityFinderApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();
        Self::with_settings(cc, &cli_args)
    }

    pub fn with_settings(cc: &eframe::CreationContext<'_>, cli_args: &Settings) -> Self {
        let mut state = AppState::new(cli_args, &cc.egui_ctx);

        if cli_args.ignore_persisted {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
        } else if let Some(storage) = cc.storage
            && let Some(settings) = Self::load_persisted_settings(storage)
        {
            state.ui_settings = settings;
        }

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());

        let mut map_memory = MapMemory::default();
        if map_memory.set_zoom(cli_args.zoom).is_err() {
            tracing::warn!("Invalid initial zoom {}, using the default", cli_args.zoom);
        }

        Self {
            state,
            tiles_osm,
            tiles_otm,
            map_memory,
            initial_center: cli_args.center,
            show_help: false,
        }
    }

    fn load_persisted_settings(storage: &dyn eframe::Storage) -> Option<UiSettings> {
        if let Some(json) = storage.get_string(PERSISTED_KEY)
            && !json.is_empty()
        {
            match serde_json::from_str::<PersistedSettings>(&json) {
                Ok(settings) => {
                    tracing::info!("Restored UI settings");
                    return Some(settings.into());
                }
                Err(e) => tracing::warn!("Ignoring invalid persisted settings: {}", e),
            }
        }
        tracing::info!("No persisted settings found, starting fresh");
        None
    }

    /// Center and zoom the map so both positions are visible
    fn fit_to_bounds(&mut self, a: Position, b: Position) {
        let center_lat = (a.lat() + b.lat()) / 2.0;
        let center_lon = (a.lon() + b.lon()) / 2.0;
        let zoom = zoom_for_span(a.lat() - b.lat(), a.lon() - b.lon());

        self.map_memory
            .center_at(walkers::lat_lon(center_lat, center_lon));
        let _ = self.map_memory.set_zoom(zoom);

        tracing::trace!("Fitted view to {} - {}, zoom: {:.1}", a, b, zoom);
    }

    /// Ask for the next frame only when something will change
    fn schedule_repaint(&self, ctx: &egui::Context, now: instant::Instant) {
        if self.state.notifier.has_toasts() {
            ctx.request_repaint();
            return;
        }
        let mut next = self.state.location.time_to_next(now);
        if !self.state.map_layer.data().crowds.is_empty() {
            next = Some(next.map_or(PULSE_REPAINT, |d| d.min(PULSE_REPAINT)));
        }
        if let Some(delay) = next {
            ctx.request_repaint_after(delay);
        }
    }
}

#[profiling::all_functions]
impl eframe::App for FacilityFinderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = instant::Instant::now();

        // Handle keyboard shortcuts
        let mut find_requested = false;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) || (i.key_pressed(egui::Key::H) && i.modifiers.ctrl)
            {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::F) && i.modifiers.ctrl {
                find_requested = true;
            }
        });
        if find_requested {
            self.state.find_nearest();
        }

        // Background data and location updates
        if self.state.poll_load() {
            ctx.request_repaint();
        }
        self.state.poll_location(now);

        if let Some((a, b)) = self.state.map_layer.take_pending_fit() {
            self.fit_to_bounds(a, b);
        }

        #[cfg(not(target_arch = "wasm32"))]
        ui_panels::show_file_picker(ctx, &mut self.state);

        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        ui_panels::render_sidebar(ctx, &mut self.state);

        let layer = self.state.map_layer.snapshot();
        let route_width = self.state.ui_settings.route_width;
        let tiles_provider = self.state.ui_settings.tiles_provider;
        let my_position = self.state.session.position().unwrap_or(self.initial_center);
        let time = ctx.input(|i| i.time);

        // Central panel: Map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                };

                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(my_position.lat(), my_position.lon()),
                )
                .with_plugin(FacilityPlugin::new(layer, route_width, time));

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    tiles_provider.attribution(),
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        ui_panels::render_toasts(ctx, &mut self.state.notifier, now);

        self.schedule_repaint(ctx, now);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings::from(&self.state.ui_settings);
        match serde_json::to_string(&settings) {
            Ok(json) => {
                storage.set_string(PERSISTED_KEY, json);
                tracing::debug!("Saved settings");
            }
            Err(e) => tracing::warn!("Failed to serialize settings: {}", e),
        }
    }
}
