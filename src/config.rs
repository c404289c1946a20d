//! Configuration for settlewatch.
//!
//! Layered the usual way:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SETTLEWATCH_` and use double
//! underscores to separate nested levels:
//! - `SETTLEWATCH_WATCH__DEAD_TIME_MS=500` sets `watch.dead_time_ms`
//! - `SETTLEWATCH_WATCH__DELIVERY=best_effort` sets `watch.delivery`
//! - `SETTLEWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::watcher::Delivery;

const ENV_PREFIX: &str = "SETTLEWATCH_";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Debounce behaviour
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Quiet period before a settled-event, in milliseconds
    #[serde(default = "default_dead_time_ms")]
    pub dead_time_ms: u64,

    /// `blocking` waits for the receiver, `best_effort` drops unobserved events
    #[serde(default)]
    pub delivery: Delivery,

    /// Capacity of the notification channel (0 = rendezvous)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level applied to every module without an override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `settlewatch = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_dead_time_ms() -> u64 {
    200
}
fn default_event_buffer() -> usize {
    64
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dead_time_ms: default_dead_time_ms(),
            delivery: Delivery::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl WatchConfig {
    pub fn dead_time(&self) -> Duration {
        Duration::from_millis(self.dead_time_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// A missing file is not an error; its layer is simply empty.
    pub fn load(config_path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".") // Double underscore becomes dot
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file, without environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
