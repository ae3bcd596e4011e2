//! Application state management
//!
//! This module owns the facility store and the session, feeds location updates
//! and UI actions into the session as events, and forwards the resulting effects
//! to the map layer and the notifier.

use crate::app::location::LocationFeed;
use crate::app::map_layer::MapLayer;
use crate::app::notify::Notifier;
use crate::app::settings::{CrowdZone, Settings};
use facility_finder_lib::{
    Category, Event, FacilityStore, LocationStatus, MapSurface, Marker, MarkerKind, Session,
    apply_effects,
};
use geo::Point;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of a background facility load: the raw JSON, or an error message
type LoadResult = Result<String, String>;

/// Slot written by the background loader and polled by the UI thread
type LoadSlot = Arc<RwLock<Option<LoadResult>>>;

/// Main application state
pub struct AppState {
    /// Facilities of the current session
    pub store: FacilityStore,

    /// Location, notification and route state
    pub session: Session,

    /// Map overlay (the session's map surface)
    pub map_layer: MapLayer,

    /// Toasts and notification history
    pub notifier: Notifier,

    /// Where location updates come from
    pub location: LocationFeed,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// Facility data loading state
    pub data: DataLoader,

    /// Highlighted crowded areas
    crowd_zones: Vec<CrowdZone>,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone, Debug, PartialEq)]
pub struct UiSettings {
    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Route line width in pixels
    pub route_width: f32,

    /// Category picked in the sidebar (empty = none)
    pub selected_category: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
            route_width: 4.0,
            selected_category: String::new(),
        }
    }
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }

    pub fn from_name(name: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .unwrap_or(Self::OpenStreetMap)
    }
}

/// Facility data loading state
pub struct DataLoader {
    /// Path or URL of the current data set
    pub source: String,

    /// Last load error, shown in the sidebar
    pub error: Option<String>,

    /// Whether a load is in flight
    pub loading: bool,

    /// Show file picker dialog
    pub show_picker: bool,

    slot: LoadSlot,
}

impl DataLoader {
    fn new(source: String) -> Self {
        Self {
            source,
            error: None,
            loading: false,
            show_picker: false,
            slot: Arc::new(RwLock::new(None)),
        }
    }
}

impl AppState {
    /// Create new application state from CLI settings
    pub fn new(settings: &Settings, ctx: &egui::Context) -> Self {
        let mut state = Self {
            store: FacilityStore::default(),
            session: Session::new(),
            map_layer: MapLayer::new(),
            notifier: Notifier::new(),
            location: LocationFeed::from_settings(settings, ctx),
            ui_settings: UiSettings::default(),
            data: DataLoader::new(settings.facilities.clone()),
            crowd_zones: settings.crowd_zones(),
        };
        state.place_crowd_zones();
        state.start_load(settings.facilities.clone(), ctx);
        state
    }

    /// State with an empty store and no background load
    #[cfg(test)]
    pub(crate) fn for_tests(location: LocationFeed) -> Self {
        Self {
            store: FacilityStore::default(),
            session: Session::new(),
            map_layer: MapLayer::new(),
            notifier: Notifier::default(),
            location,
            ui_settings: UiSettings::default(),
            data: DataLoader::new("test.json".to_string()),
            crowd_zones: CrowdZone::defaults(),
        }
    }

    fn place_crowd_zones(&mut self) {
        for zone in &self.crowd_zones {
            self.map_layer.place_marker(Marker {
                position: zone.position,
                kind: MarkerKind::Crowd,
                label: zone.name.clone(),
            });
        }
    }

    /// Run one event through the session and apply its effects
    pub fn dispatch(&mut self, event: Event) {
        profiling::scope!("dispatch");
        let effects = self.session.handle(&self.store, event);
        apply_effects(effects, &mut self.map_layer, &mut self.notifier);
    }

    /// Feed pending location updates into the session
    pub fn poll_location(&mut self, now: instant::Instant) {
        for update in self.location.poll(now) {
            self.dispatch(update.into());
        }
    }

    /// Search the nearest facility of the selected category
    pub fn find_nearest(&mut self) {
        let category = Category::new(self.ui_settings.selected_category.clone());
        tracing::debug!("Finding nearest '{}'", category);
        self.dispatch(Event::CategorySelected(category));
    }

    /// Start loading a facility data set in the background
    ///
    /// Native reads a file path on a blocking tokio task; web fetches the path
    /// relative to the page.
    pub fn start_load(&mut self, source: String, ctx: &egui::Context) {
        tracing::info!("Loading facilities from {}", source);
        self.data.source = source.clone();
        self.data.loading = true;
        self.data.error = None;
        spawn_load(source, self.data.slot.clone(), ctx.clone());
    }

    /// Check the load slot; returns true when a data set was installed
    pub fn poll_load(&mut self) -> bool {
        let result = match self.data.slot.try_write() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(result) = result else {
            return false;
        };
        self.data.loading = false;

        let store = match result.and_then(|json| {
            FacilityStore::from_json_str(&json).map_err(|e| e.to_string())
        }) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Failed to load facilities from {}: {}", self.data.source, e);
                self.data.error = Some(e);
                FacilityStore::default()
            }
        };
        self.install_store(store);
        true
    }

    /// Replace the data set within the running session
    ///
    /// The route is dropped; position, location status and already notified
    /// facilities carry over. The last position is replayed so the user marker
    /// returns and nearby facilities new to this session are notified. Without
    /// a position the map is fitted to the extent of the new set.
    pub fn install_store(&mut self, store: FacilityStore) {
        tracing::info!("Installed {} facilities", store.len());

        self.store = store;
        self.session.reset_for_store();
        self.map_layer.reset_session();
        self.dispatch(Event::FacilitiesLoaded);
        match self.session.position() {
            Some(position) => self.dispatch(Event::LocationChanged(position)),
            None => {
                if let Some(extent) = self.store.bounding_box() {
                    self.map_layer.fit_bounds(
                        Point::from(extent.min()).into(),
                        Point::from(extent.max()).into(),
                    );
                }
            }
        }

        if !self.ui_settings.selected_category.is_empty()
            && self.store.count_in(&Category::new(self.ui_settings.selected_category.as_str())) == 0
        {
            self.ui_settings.selected_category.clear();
        }
    }

    /// Sidebar text for the location state
    pub fn location_status_text(&self) -> String {
        match self.session.location_status() {
            LocationStatus::Pending => "Waiting for your location...".to_string(),
            LocationStatus::Available => match self.session.position() {
                Some(position) => format!("You are at {}", position),
                None => "Location available".to_string(),
            },
            LocationStatus::Unavailable(reason) => reason.clone(),
        }
    }

    /// Name and distance of the facility the route leads to
    pub fn route_summary(&self) -> Option<(String, f64)> {
        let route = self.session.active_route()?;
        let facility = self.store.get(&route.facility_id)?;
        let distance = self
            .session
            .position()
            .map(|p| p.distance_to(route.destination))
            .unwrap_or_default();
        Some((facility.label(), distance))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(source: String, slot: LoadSlot, ctx: egui::Context) {
    let read = move || std::fs::read_to_string(&source).map_err(|e| format!("{}: {}", source, e));

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                let result = match tokio::task::spawn_blocking(read).await {
                    Ok(result) => result,
                    Err(e) => Err(format!("Loader task failed: {}", e)),
                };
                *slot.write().await = Some(result);
                ctx.request_repaint();
            });
        }
        Err(_) => {
            // No runtime (e.g. embedded use): read synchronously
            if let Ok(mut guard) = slot.try_write() {
                *guard = Some(read());
            }
            ctx.request_repaint();
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(source: String, slot: LoadSlot, ctx: egui::Context) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = fetch_text(&source).await;
        *slot.write().await = Some(result);
        ctx.request_repaint();
    });
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> LoadResult {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or("No window available")?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("Fetch of {} failed: {:?}", url, e))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|e| format!("Unexpected fetch result: {:?}", e))?;
    if !response.ok() {
        return Err(format!("Fetch of {} failed: HTTP {}", url, response.status()));
    }
    let text = response
        .text()
        .map_err(|e| format!("Failed to read response body: {:?}", e))?;
    let text = JsFuture::from(text)
        .await
        .map_err(|e| format!("Failed to read response body: {:?}", e))?;
    text.as_string()
        .ok_or_else(|| "Response body is not text".to_string())
}
