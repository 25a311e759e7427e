use std::path::PathBuf;

/// Failure to obtain a raw snapshot from the data source.
///
/// The aggregation core itself never fails; only loading can.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Csv(#[from] csv::Error),
    #[error("snapshot has no header row")]
    MissingHeader,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TRIP_REPORT_CACHE_TTL_SECS must be a non-negative integer, got '{0}'")]
    InvalidTtl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}
