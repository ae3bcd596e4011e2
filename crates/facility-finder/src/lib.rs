//! Facility Finder - Application Library
//!
//! This is the main application crate that puts the facility session from
//! `facility-finder-lib` on a map, with live location and notifications.

mod app;
pub mod logging;

#[cfg(not(target_arch = "wasm32"))]
pub mod headless;

#[cfg(target_arch = "wasm32")]
pub mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebHandle;

pub use app::FacilityFinderApp;
pub use app::settings::Settings;

/// Window title and app id
pub const APP_NAME: &str = "Facility Finder";

/// Run the desktop application (or headless mode) with the given settings
#[cfg(not(target_arch = "wasm32"))]
pub async fn native_main(settings: Settings) {
    if settings.headless {
        headless::run(&settings);
        return;
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(APP_NAME),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| Ok(Box::new(FacilityFinderApp::with_settings(cc, &settings)))),
    ) {
        tracing::error!("Application error: {}", e);
    }
}
