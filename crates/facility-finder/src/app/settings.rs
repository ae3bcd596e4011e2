use clap::Parser;
use facility_finder_lib::Position;
#[cfg(target_arch = "wasm32")]
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Facility Finder - A map of nearby facilities with live location and proximity notifications
pub struct Settings {
    /// Facility JSON to load on startup (file path on desktop, URL relative to the page on web)
    #[clap(short, long, value_name = "FILE", default_value = "facilities.json")]
    pub facilities: String,

    /// Fixed user position as LAT,LON (desktop has no geolocation)
    #[clap(short, long, value_name = "LAT,LON", value_parser = parse_lat_lon)]
    pub position: Option<Position>,

    /// Replay the points of a GPX track as location updates
    #[clap(long, value_name = "FILE")]
    pub replay_gpx: Option<PathBuf>,

    /// Delay between replayed location updates in milliseconds
    #[clap(long, default_value = "1000")]
    pub replay_interval_ms: u64,

    /// Crowded area to highlight as NAME@LAT,LON (repeatable, replaces the built-in ones)
    #[clap(long, value_name = "NAME@LAT,LON", value_parser = parse_crowd_zone)]
    pub crowd_zone: Vec<CrowdZone>,

    /// Initial map center as LAT,LON
    #[clap(long, value_name = "LAT,LON", default_value = "23.182,75.784", value_parser = parse_lat_lon)]
    pub center: Position,

    /// Initial map zoom level
    #[clap(long, default_value = "14.0")]
    pub zoom: f64,

    /// Run without a window: replay locations and log notifications
    #[clap(long, default_value = "false")]
    pub headless: bool,

    /// In headless mode, search the nearest facility of this category after the replay
    #[clap(long, value_name = "CATEGORY")]
    pub find: Option<String>,

    /// Ignore previously persisted UI settings and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

/// A named crowded area drawn as a pulsing circle
#[derive(Clone, Debug, PartialEq)]
pub struct CrowdZone {
    pub name: String,
    pub position: Position,
}

impl CrowdZone {
    pub fn defaults() -> Vec<CrowdZone> {
        vec![
            CrowdZone {
                name: "Crowded Area - Mahakaleshwar Temple".to_string(),
                position: Position::new(23.182, 75.784),
            },
            CrowdZone {
                name: "Crowded Area - Ram Ghat (Shipra)".to_string(),
                position: Position::new(23.176, 75.789),
            },
        ]
    }
}

/// Parse `LAT,LON` in degrees
pub fn parse_lat_lon(s: &str) -> Result<Position, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;
    if !facility_finder_lib::utils::is_valid_wgs84(lat, lon) {
        return Err(format!("coordinates out of range: {lat},{lon}"));
    }
    Ok(Position::new(lat, lon))
}

/// Parse `NAME@LAT,LON`
pub fn parse_crowd_zone(s: &str) -> Result<CrowdZone, String> {
    let (name, coords) = s
        .rsplit_once('@')
        .ok_or_else(|| format!("expected NAME@LAT,LON, got '{s}'"))?;
    if name.trim().is_empty() {
        return Err("crowd zone name is empty".to_string());
    }
    Ok(CrowdZone {
        name: name.trim().to_string(),
        position: parse_lat_lon(coords)?,
    })
}

impl Settings {
    /// Parse settings, falling back to defaults on web if the query string is invalid
    pub fn from_cli() -> Self {
        match parse_args::<Settings>() {
            Ok(args) => args,
            Err(e) => {
                #[cfg(not(target_arch = "wasm32"))]
                e.exit();
                #[cfg(target_arch = "wasm32")]
                {
                    let user_msg = format!(
                        "Error parsing CLI:\n{}\n
    You should change the GET params, using the cli prefix.\n
    Starting anyway without args.",
                        e
                    );
                    if let Some(window) = web_sys::window() {
                        window.alert_with_message(&user_msg).unwrap_or(());
                    } else {
                        tracing::error!(user_msg);
                    }
                    Settings::parse_from(Vec::<String>::new())
                }
            }
        }
    }

    /// Crowd zones to draw: the configured ones, or the built-in defaults
    pub fn crowd_zones(&self) -> Vec<CrowdZone> {
        if self.crowd_zone.is_empty() {
            CrowdZone::defaults()
        } else {
            self.crowd_zone.clone()
        }
    }
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static ENV_MAP: std::cell::RefCell<HashMap<String, String>> = std::cell::RefCell::new(HashMap::new());
}

/// Get a setting from the environment (native) or from `env`-prefixed GET parameters (web)
#[allow(dead_code)]
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    #[cfg(target_arch = "wasm32")]
    {
        ENV_MAP.with(|map| map.borrow().get(key).and_then(|s| s.parse().ok()))
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::env::var(key).ok().and_then(|s| s.parse().ok())
    }
}

/// Split a URL query string into (key, value) pairs; bare keys get an empty value
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn query_pairs(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Turn `cli`-prefixed query pairs into command line arguments
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn args_from_query(pairs: &[(String, String)]) -> Vec<String> {
    let mut args = vec!["facility-finder".to_string()];
    for (key, value) in pairs {
        if let Some(arg_key) = key.strip_prefix("cli") {
            if !arg_key.is_empty() {
                args.push(format!("--{}", arg_key));
            }
            if !value.is_empty() {
                args.push(value.clone());
            }
        }
    }
    args
}

/// Parses from the command line arguments on native and from GET parameters on web.
///
/// On web, `?cliposition=23.1,75.7&envLOG_LEVEL=debug` becomes `--position 23.1,75.7`
/// plus the `LOG_LEVEL` setting.
pub fn parse_args<T: Parser>() -> Result<T, clap::Error> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        T::try_parse()
    }
    #[cfg(target_arch = "wasm32")]
    {
        parse_env();
        let href = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default();
        T::try_parse_from(args_from_query(&query_pairs(&href)))
    }
}

/// Load `env`-prefixed GET parameters (web only; native reads the process environment)
pub fn parse_env() {
    #[cfg(target_arch = "wasm32")]
    {
        let href = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default();
        ENV_MAP.with(|map| {
            let mut map = map.borrow_mut();
            for (key, value) in query_pairs(&href) {
                if let Some(env_key) = key.strip_prefix("env")
                    && !env_key.is_empty()
                {
                    map.insert(env_key.to_string(), value);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lat_lon() {
        assert_eq!(parse_lat_lon("23.182,75.784"), Ok(Position::new(23.182, 75.784)));
        assert_eq!(parse_lat_lon(" -1.5 , 2 "), Ok(Position::new(-1.5, 2.0)));
        assert!(parse_lat_lon("23.182").is_err());
        assert!(parse_lat_lon("abc,1").is_err());
        assert!(parse_lat_lon("91,0").is_err());
    }

    #[test]
    fn test_parse_crowd_zone() {
        let zone = parse_crowd_zone("Main Gate @ 23.18,75.78").unwrap();
        assert_eq!(zone.name, "Main Gate");
        assert_eq!(zone.position, Position::new(23.18, 75.78));

        // Names may contain '@'
        let zone = parse_crowd_zone("Stage @ North@1,2").unwrap();
        assert_eq!(zone.name, "Stage @ North");

        assert!(parse_crowd_zone("@1,2").is_err());
        assert!(parse_crowd_zone("no coordinates").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["facility-finder"]);
        assert_eq!(settings.facilities, "facilities.json");
        assert_eq!(settings.center, Position::new(23.182, 75.784));
        assert_eq!(settings.replay_interval_ms, 1000);
        assert!(settings.position.is_none());
        assert!(!settings.headless);
        assert_eq!(settings.crowd_zones(), CrowdZone::defaults());
    }

    #[test]
    fn test_explicit_crowd_zones_replace_defaults() {
        let settings = Settings::parse_from([
            "facility-finder",
            "--crowd-zone",
            "Gate@1,2",
            "--position",
            "23.1,75.7",
        ]);
        assert_eq!(settings.crowd_zones().len(), 1);
        assert_eq!(settings.position, Some(Position::new(23.1, 75.7)));
    }

    #[test]
    fn test_query_to_args() {
        let pairs = query_pairs(
            "https://example.org/map/?cliposition=23.1,75.7&envLOG_LEVEL=debug&cliheadless&other=1",
        );
        assert_eq!(
            args_from_query(&pairs),
            vec!["facility-finder", "--position", "23.1,75.7", "--headless"]
        );
        assert!(query_pairs("https://example.org/").is_empty());
    }
}
