//! Configuration file parsing and structures.
//!
//! sentinel-datetime uses TOML for declarative configuration. Everything the
//! module needs (pub/sub broker, timer device id, timezone, optional location)
//! is carried in [`Config`] and handed to the components at construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Environment variable that overrides `pubsub.host`
pub const PUBSUB_HOST_ENV: &str = "SENTINEL_PUBSUB_HOST";

/// Default endpoint of the sunrise/sunset service
pub const DEFAULT_SUNRISE_URL: &str = "https://api.sunrise-sunset.org/json";

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub pubsub: PubSubConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub location: Option<LocationConfig>,
    #[serde(default)]
    pub sunrise: SunriseConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `rumqttc = "warn"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

fn default_pubsub_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "sentinel-datetime".to_string()
}

/// Pub/sub broker connection
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    /// Broker hostname or IP address
    pub host: String,

    #[serde(default = "default_pubsub_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Which field layout the status snapshot uses.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusProfile {
    /// `dayOfWeek`, sunrise/sunset as `{event, minutes}` in the configured timezone
    #[default]
    Current,
    /// `day`, sunrise/sunset as the raw instants returned by the service
    Legacy,
}

/// The synthetic timer device
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device id used as the key in both caches
    pub id: String,

    /// IANA timezone identifier (e.g., "Europe/Oslo")
    pub timezone: String,

    #[serde(default)]
    pub profile: StatusProfile,
}

/// Geographic location used for sunrise/sunset lookups
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,
}

fn default_sunrise_url() -> String {
    DEFAULT_SUNRISE_URL.to_string()
}

fn default_sunrise_timeout() -> u64 {
    90
}

#[derive(Debug, Clone, Deserialize)]
pub struct SunriseConfig {
    #[serde(default = "default_sunrise_url")]
    pub url: String,

    #[serde(default = "default_sunrise_timeout")]
    pub timeout_secs: u64,
}

impl Default for SunriseConfig {
    fn default() -> Self {
        Self {
            url: default_sunrise_url(),
            timeout_secs: default_sunrise_timeout(),
        }
    }
}

impl SunriseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_backoff_ms() -> u64 {
    60_000
}

/// Poll cadence
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Delay before the next tick after a successful one
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Delay before the next tick after a failed one
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// HTTP query API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub listen: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// `SENTINEL_PUBSUB_HOST`, when set, replaces `pubsub.host`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        let mut config = Self::from_toml(&contents)?;
        if let Ok(host) = std::env::var(PUBSUB_HOST_ENV) {
            config.pubsub.host = host;
        }
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if let Some(location) = &self.location {
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(ConfigError::Invalid(format!(
                    "location.latitude {} is out of range",
                    location.latitude
                )));
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(ConfigError::Invalid(format!(
                    "location.longitude {} is out of range",
                    location.longitude
                )));
            }
        }

        if self.device.id.is_empty() {
            return Err(ConfigError::Invalid("device.id must not be empty".into()));
        }

        Ok(())
    }

    /// The configured timezone
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.device
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.device.timezone.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
