//! Engine configuration.
//!
//! Settings come from defaults, overridden by environment variables
//! (`MATVIEW_*`); a `.env` file is honored when present. The CLI can
//! override individual fields on top of that.

use crate::engine::{ChangeCaptureMode, RefreshCadence};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Default result-set cap for view queries
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Runtime configuration for the maintenance engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// UTC hour of the daily refresh
    pub refresh_hour: u32,
    /// UTC minute of the daily refresh
    pub refresh_minute: u32,
    /// Which change-capture strategy this deployment runs
    pub capture_mode: ChangeCaptureMode,
    /// Default maximum rows returned by a view query
    pub query_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        // Daily at midnight UTC, matching the view's historical refresh
        Self {
            refresh_hour: 0,
            refresh_minute: 0,
            capture_mode: ChangeCaptureMode::Manual,
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl Config {
    /// Build a config from defaults plus `MATVIEW_*` environment overrides.
    ///
    /// Recognized variables: `MATVIEW_REFRESH_HOUR`, `MATVIEW_REFRESH_MINUTE`,
    /// `MATVIEW_CAPTURE_MODE` (`reactive`/`manual`), `MATVIEW_QUERY_LIMIT`.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(hour) = read_env("MATVIEW_REFRESH_HOUR")? {
            config.refresh_hour = parse_env("MATVIEW_REFRESH_HOUR", &hour)?;
        }
        if let Some(minute) = read_env("MATVIEW_REFRESH_MINUTE")? {
            config.refresh_minute = parse_env("MATVIEW_REFRESH_MINUTE", &minute)?;
        }
        if let Some(mode) = read_env("MATVIEW_CAPTURE_MODE")? {
            config.capture_mode = mode.parse()?;
        }
        if let Some(limit) = read_env("MATVIEW_QUERY_LIMIT")? {
            config.query_limit = parse_env("MATVIEW_QUERY_LIMIT", &limit)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// The refresh cadence this config describes
    pub fn cadence(&self) -> RefreshCadence {
        RefreshCadence::DailyAt {
            hour: self.refresh_hour,
            minute: self.refresh_minute,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_hour > 23 {
            return Err(Error::Configuration(format!(
                "refresh hour {} out of range 0-23",
                self.refresh_hour
            )));
        }
        if self.refresh_minute > 59 {
            return Err(Error::Configuration(format!(
                "refresh minute {} out of range 0-59",
                self.refresh_minute
            )));
        }
        if self.query_limit == 0 {
            return Err(Error::Configuration(
                "query limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Configuration(format!("{key}: {e}"))),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Configuration(format!("{key}: invalid value '{value}'")))
}
