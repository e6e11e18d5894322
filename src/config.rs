//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::session::Settings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MIXTAPE_BACK_CONFIG_PATH";
/// Default directory for per-user preference blobs.
const DEFAULT_PREFERENCES_DIR: &str = "data/preferences";
/// Default port when neither config nor environment name one.
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding host preference blobs, one JSON file per user.
    pub preferences_dir: PathBuf,
    /// Settings seed used when a host has no stored preferences.
    pub default_settings: Settings,
    /// Port the HTTP listener binds to (env `PORT` still wins).
    pub port: u16,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferences_dir: PathBuf::from(DEFAULT_PREFERENCES_DIR),
            default_settings: Settings::default(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    preferences_dir: Option<PathBuf>,
    default_settings: Option<Settings>,
    port: Option<u16>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            preferences_dir: value.preferences_dir.unwrap_or(defaults.preferences_dir),
            default_settings: value.default_settings.unwrap_or(defaults.default_settings),
            port: value.port.unwrap_or(defaults.port),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
