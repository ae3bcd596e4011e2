//! Logging initialization
//!
//! Native builds log through `tracing-subscriber` filtered by `RUST_LOG`; web
//! builds log to the browser console (see `web.rs`). With the `profiling`
//! feature, `profiling::scope!` markers become tracing spans.

/// Initialize logging with sensible defaults.
#[cfg(not(target_arch = "wasm32"))]
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var(
                    "RUST_LOG",
                    "debug,eframe::native=warn,walkers=info,egui::context=warn,reqwest::connect=info",
                );
            } else {
                std::env::set_var("RUST_LOG", "info,eframe=warn");
            }
        }
    }

    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());
    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging was already initialized");
    }

    log_version_info();
}

/// Map a level name (case-insensitive) to a tracing level
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

pub fn short_version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

pub fn log_version_info() {
    tracing::info!("{}", short_version_info());
    if cfg!(feature = "profiling") {
        tracing::info!("Profiling scopes are recorded as tracing spans");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_version_info_names_the_package() {
        assert!(short_version_info().starts_with("facility-finder "));
    }
}
