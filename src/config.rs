use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::predict::{utc_offset, Observer, PredictError, SearchOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid station: {0}")]
    Station(#[from] PredictError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub threshold_deg: f64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub step: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub precision: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub horizon: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub guard: Duration,
    #[serde(deserialize_with = "deserialize_timezone")]
    pub timezone: FixedOffset,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            threshold_deg: options.threshold_deg,
            step: options.step,
            precision: options.precision,
            horizon: options.horizon,
            guard: options.guard,
            timezone: options.timezone,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::seconds(30)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn observer(&self) -> Result<Observer, ConfigError> {
        Ok(Observer::from_coordinates(
            &self.station.coordinates,
            Some(self.station.altitude_m),
        )?)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            threshold_deg: self.search.threshold_deg,
            step: self.search.step,
            precision: self.search.precision,
            horizon: self.search.horizon,
            guard: self.search.guard,
            timezone: self.search.timezone,
        }
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

/// `UTC`, `Z` or a `±HH:MM` offset.
pub fn parse_timezone(s: &str) -> Result<FixedOffset, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return Ok(utc_offset());
    }
    s.parse::<FixedOffset>()
        .map_err(|e| format!("invalid time zone '{}': {}", s, e))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timezone(&s).map_err(serde::de::Error::custom)
}
