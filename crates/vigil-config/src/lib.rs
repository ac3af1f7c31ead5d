//! Shared configuration for the vigil dashboard.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `vigil_core::MonitorConfig`. No credentials live here: the admin
//! backend sits behind a trusted network boundary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vigil_core::MonitorConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://127.0.0.1:8080").
    pub backend: String,

    /// Disable the WebSocket event stream (polling only).
    #[serde(default)]
    pub no_websocket: bool,

    /// Override the polling interval (seconds, 0 = never poll).
    pub poll_interval: Option<u64>,

    /// Override the request timeout (seconds).
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vigil", "vigil").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vigil");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// Environment variables use the `VIGIL_` prefix with `_`-separated
/// paths, e.g. `VIGIL_DEFAULTS_TIMEOUT=10`.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("VIGIL_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Profile resolution ──────────────────────────────────────────────

/// Select a profile by name, falling back to the config's default.
pub fn select_profile<'a>(
    config: &'a Config,
    name: Option<&'a str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let name = name
        .or(config.default_profile.as_deref())
        .unwrap_or("default");
    config
        .profiles
        .get(name)
        .map(|profile| (name, profile))
        .ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
}

/// Build a `MonitorConfig` from a profile, applying global defaults.
pub fn profile_to_monitor_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<MonitorConfig, ConfigError> {
    let url: url::Url = profile.backend.parse().map_err(|_| ConfigError::Validation {
        field: "backend".into(),
        reason: format!("invalid URL: {}", profile.backend),
    })?;

    Ok(MonitorConfig {
        url,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        websocket_enabled: !profile.no_websocket,
        poll_interval_secs: profile.poll_interval.unwrap_or(defaults.poll_interval),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let mut profiles = HashMap::new();
        profiles.insert(
            "lab".into(),
            Profile {
                backend: "http://10.0.0.5:8080".into(),
                no_websocket: true,
                poll_interval: Some(5),
                timeout: None,
            },
        );
        Config {
            default_profile: Some("lab".into()),
            defaults: Defaults::default(),
            profiles,
        }
    }

    #[test]
    fn select_profile_falls_back_to_default() {
        let config = sample_config();
        let (name, _) = select_profile(&config, None).expect("default profile");
        assert_eq!(name, "lab");

        let err = select_profile(&config, Some("prod")).expect_err("unknown");
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn profile_overrides_beat_global_defaults() {
        let config = sample_config();
        let (_, profile) = select_profile(&config, Some("lab")).expect("profile");
        let monitor = profile_to_monitor_config(profile, &config.defaults).expect("config");

        assert_eq!(monitor.poll_interval_secs, 5);
        assert_eq!(monitor.timeout, Duration::from_secs(30));
        assert!(!monitor.websocket_enabled);
    }

    #[test]
    fn invalid_backend_url_is_a_validation_error() {
        let profile = Profile {
            backend: "not a url".into(),
            no_websocket: false,
            poll_interval: None,
            timeout: None,
        };
        let err = profile_to_monitor_config(&profile, &Defaults::default()).expect_err("invalid");
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = sample_config();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.default_profile.as_deref(), Some("lab"));
        assert!(parsed.profiles.contains_key("lab"));
    }
}
