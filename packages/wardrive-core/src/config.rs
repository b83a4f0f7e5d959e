//! Layered configuration.
//!
//! Every value resolves with priority:
//! 1. Environment variable (`WARDRIVE_*`)
//! 2. Config file (`~/.config/wardrive/config.toml`)
//! 3. Default values

use crate::error::ConfigError;
use crate::location::gpsd::DEFAULT_GPSD_ADDR;
use crate::location::{FixedPosition, GpsdProvider, NoPosition, PositionProvider};
use crate::radio::RadioProvider;
use crate::radio::nmcli::NmcliRadio;
use crate::scan_loop::DEFAULT_SCAN_INTERVAL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const ENV_GPSD_ADDR: &str = "WARDRIVE_GPSD_ADDR";
const ENV_EXPORT_DIR: &str = "WARDRIVE_EXPORT_DIR";
const ENV_SCAN_INTERVAL_MS: &str = "WARDRIVE_SCAN_INTERVAL_MS";

const MIN_SCAN_INTERVAL_MS: u64 = 100;

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    scan: Option<ScanSection>,
    location: Option<LocationSection>,
    export: Option<ExportSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSection {
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LocationSection {
    backend: Option<LocationBackend>,
    gpsd_addr: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ExportSection {
    directory: Option<PathBuf>,
}

/// Where a configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// A resolved value and its origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Setting<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationBackend {
    Gpsd,
    Fixed,
    None,
}

impl std::fmt::Display for LocationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationBackend::Gpsd => write!(f, "gpsd"),
            LocationBackend::Fixed => write!(f, "fixed"),
            LocationBackend::None => write!(f, "none"),
        }
    }
}

/// Coordinates for the fixed backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub scan_interval_ms: Setting<u64>,
    pub location_backend: Setting<LocationBackend>,
    pub gpsd_addr: Setting<String>,
    pub fixed_position: Option<FixedCoordinates>,
    pub export_dir: Setting<PathBuf>,
}

impl Settings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.value)
    }

    /// Build the radio backend (NetworkManager).
    pub fn radio_provider(&self) -> Arc<dyn RadioProvider> {
        Arc::new(NmcliRadio::new())
    }

    /// Build the configured position backend.
    pub fn position_provider(&self) -> Box<dyn PositionProvider> {
        match (self.location_backend.value, self.fixed_position) {
            (LocationBackend::Gpsd, _) => Box::new(GpsdProvider::new(self.gpsd_addr.value.clone())),
            (LocationBackend::Fixed, Some(fixed)) => Box::new(FixedPosition::new(
                fixed.latitude,
                fixed.longitude,
                fixed.accuracy_meters,
            )),
            (LocationBackend::Fixed, None) => {
                tracing::warn!("Fixed location backend selected without latitude/longitude; location disabled");
                Box::new(NoPosition::new())
            }
            (LocationBackend::None, _) => Box::new(NoPosition::new()),
        }
    }
}

/// Get the path to the configuration file
pub fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("wardrive").join("config.toml"))
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/wardrive/config.toml".to_string())
}

fn default_export_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .map(|p| p.join("wardrive"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Read and parse a config file. `Ok(None)` when it does not exist.
fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Load settings from the default config path and the process environment.
pub fn load_settings() -> Settings {
    let path = get_config_file_path();
    load_settings_from(path.as_deref(), |key| std::env::var(key).ok())
}

/// Load settings from an explicit file and environment lookup.
///
/// A config file that cannot be read or parsed is logged and ignored.
pub fn load_settings_from(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let file = match path.map(read_config_file) {
        Some(Ok(Some(config))) => {
            tracing::debug!("Loaded config from {:?}", path);
            config
        }
        Some(Ok(None)) | None => ConfigFile::default(),
        Some(Err(e)) => {
            tracing::warn!("{}; using defaults", e);
            ConfigFile::default()
        }
    };

    let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let scan = file.scan.unwrap_or_default();
    let location = file.location.unwrap_or_default();
    let export = file.export.unwrap_or_default();

    let scan_interval_ms = match lookup(ENV_SCAN_INTERVAL_MS).map(|v| v.parse::<u64>()) {
        Some(Ok(ms)) => Setting::new(ms, ConfigSource::Environment),
        other => {
            if let Some(Err(e)) = other {
                tracing::warn!("Ignoring {}: {}", ENV_SCAN_INTERVAL_MS, e);
            }
            match scan.interval_ms {
                Some(ms) => Setting::new(ms, ConfigSource::ConfigFile),
                None => Setting::new(DEFAULT_SCAN_INTERVAL.as_millis() as u64, ConfigSource::Default),
            }
        }
    };
    let scan_interval_ms = Setting {
        value: scan_interval_ms.value.max(MIN_SCAN_INTERVAL_MS),
        ..scan_interval_ms
    };

    let gpsd_addr = match lookup(ENV_GPSD_ADDR) {
        Some(addr) => Setting::new(addr, ConfigSource::Environment),
        None => match location.gpsd_addr.filter(|a| !a.trim().is_empty()) {
            Some(addr) => Setting::new(addr.trim().to_string(), ConfigSource::ConfigFile),
            None => Setting::new(DEFAULT_GPSD_ADDR.to_string(), ConfigSource::Default),
        },
    };

    let fixed_position = match (location.latitude, location.longitude) {
        (Some(latitude), Some(longitude)) => Some(FixedCoordinates {
            latitude,
            longitude,
            accuracy_meters: location.accuracy.unwrap_or(0.0),
        }),
        _ => None,
    };

    let location_backend = match location.backend {
        Some(backend) => Setting::new(backend, ConfigSource::ConfigFile),
        None if lookup(ENV_GPSD_ADDR).is_some() => Setting::new(LocationBackend::Gpsd, ConfigSource::Environment),
        None => Setting::new(LocationBackend::Gpsd, ConfigSource::Default),
    };

    let export_dir = match lookup(ENV_EXPORT_DIR) {
        Some(dir) => Setting::new(PathBuf::from(dir), ConfigSource::Environment),
        None => match export.directory {
            Some(dir) => Setting::new(dir, ConfigSource::ConfigFile),
            None => Setting::new(default_export_dir(), ConfigSource::Default),
        },
    };

    Settings {
        scan_interval_ms,
        location_backend,
        gpsd_addr,
        fixed_position,
        export_dir,
    }
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Wardrive Configuration
# Place this file at: ~/.config/wardrive/config.toml

[scan]
# Milliseconds between scan ticks (env: WARDRIVE_SCAN_INTERVAL_MS)
# interval_ms = 1000

[location]
# Position source: "gpsd", "fixed" or "none"
# backend = "gpsd"

# gpsd address (env: WARDRIVE_GPSD_ADDR)
# gpsd_addr = "127.0.0.1:2947"

# Coordinates used by the "fixed" backend
# latitude = 52.5200
# longitude = 13.4050
# accuracy = 10.0

[export]
# Directory for wardrive_data.{csv,kml,gpx} (env: WARDRIVE_EXPORT_DIR)
# directory = "/home/you/wardrive"
"#
    .to_string()
}
