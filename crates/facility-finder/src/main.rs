#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        use facility_finder::{Settings, logging, native_main};

        logging::setup_logging();
        let settings = Settings::from_cli();

        let rt = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to create Tokio runtime: {}", e);
                std::process::exit(1);
            }
        };

        rt.block_on(native_main(settings));
    }
}
