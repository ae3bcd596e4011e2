//! Web entry point
//!
//! JavaScript creates a [`WebHandle`] and calls `start` with the canvas. Settings
//! come from `cli`-prefixed GET parameters and `envLOG_LEVEL` picks the console
//! log level.

use crate::FacilityFinderApp;
use crate::app::settings::{get_env, parse_env};
use crate::logging::{log_version_info, parse_level};
use wasm_bindgen::prelude::*;

/// Handle to the web app from JavaScript.
#[derive(Clone)]
#[wasm_bindgen]
pub struct WebHandle {
    runner: eframe::WebRunner,
}

#[wasm_bindgen]
impl WebHandle {
    /// Installs a panic hook and console logging, then returns.
    #[allow(clippy::new_without_default)]
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Env must be known before the log level is picked
        parse_env();
        {
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            use tracing_wasm::WASMLayerConfigBuilder;

            let default_level = if cfg!(debug_assertions) {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            let max_level = get_env::<String>("LOG_LEVEL")
                .and_then(|level| parse_level(&level))
                .unwrap_or(default_level);

            let mut builder = WASMLayerConfigBuilder::new();
            builder.set_max_level(max_level);
            let _ = tracing_subscriber::registry()
                .with(tracing_wasm::WASMLayer::new(builder.build()))
                .try_init();
        }
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        log_version_info();

        Self {
            runner: eframe::WebRunner::new(),
        }
    }

    /// Call this once from JavaScript to start the app.
    #[wasm_bindgen]
    pub async fn start(&self, canvas: web_sys::HtmlCanvasElement) -> Result<(), JsValue> {
        self.runner
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(|cc| Ok(Box::new(FacilityFinderApp::new(cc)))),
            )
            .await
    }

    /// Destroys the app and frees resources.
    #[wasm_bindgen]
    pub fn destroy(&self) {
        self.runner.destroy();
    }

    /// The JavaScript can check whether or not the app has crashed.
    #[wasm_bindgen]
    pub fn has_panicked(&self) -> bool {
        self.runner.has_panicked()
    }

    /// Returns the panic message if the app has panicked.
    #[wasm_bindgen]
    pub fn panic_message(&self) -> Option<String> {
        self.runner.panic_summary().map(|s| s.message())
    }
}
