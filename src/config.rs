use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// Settings for one run of the report tool.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub cache_ttl: chrono::Duration,
    pub log_level: String,
}

impl AppConfig {
    /// Read `.env` (if any) and the `TRIP_REPORT_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_path = lookup("TRIP_REPORT_DATA").unwrap_or_else(|| "trips.csv".to_string());
        let output_dir = lookup("TRIP_REPORT_OUTPUT_DIR").unwrap_or_else(|| ".".to_string());
        let log_level = lookup("TRIP_REPORT_LOG").unwrap_or_else(|| "info".to_string());

        let cache_ttl = match lookup("TRIP_REPORT_CACHE_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .and_then(chrono::Duration::try_seconds)
                .ok_or(ConfigError::InvalidTtl(raw))?,
            None => chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        };

        Ok(Self {
            data_path: PathBuf::from(data_path),
            output_dir: PathBuf::from(output_dir),
            cache_ttl,
            log_level,
        })
    }
}
