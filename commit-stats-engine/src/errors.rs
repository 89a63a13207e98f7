//! Crate-wide error hierarchy for commit-stats-engine.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type StatsEngineResult<T> = Result<T, StatsEngineError>;

/// Root error type for the commit-stats-engine crate.
#[derive(Debug, Error)]
pub enum StatsEngineError {
    /// Configuration problems (time window, batch size, base URL).
    #[error(transparent)]
    Config(#[from] StatsEngineConfigError),

    /// Missing or rejected API credential. Fatal before any fetch.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Repository directory failure. Fatal only when no valid repository
    /// remains after probing; per-repository probe failures are soft and
    /// reported through `RunSummary` instead.
    #[error("repository directory error: {0}")]
    Directory(String),

    /// Hosting API (GitHub) related failure.
    #[error(transparent)]
    Provider(#[from] StatsEngineProviderError),
}

/// Provider-specific error used inside the GitHub client layer.
#[derive(Debug, Error)]
pub enum StatsEngineProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Configuration errors surfaced before any network activity.
#[derive(Debug, Error)]
pub enum StatsEngineConfigError {
    /// Malformed explicit time range. Expected `YYYY-MM-DD:YYYY-MM-DD`.
    #[error("invalid time range '{value}': {source}")]
    InvalidTimeRange {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Time range missing the `start:end` separator.
    #[error("invalid time range '{0}': expected YYYY-MM-DD:YYYY-MM-DD")]
    MalformedTimeRange(String),

    /// Explicit time range with the start after the end.
    #[error("invalid time range '{0}': start is after end")]
    ReversedTimeRange(String),

    /// Batch size of zero would make the fetcher loop forever.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    /// Invalid base API URL.
    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

// ===== Conversions for `?` ergonomics at the crate root =====

impl From<reqwest::Error> for StatsEngineError {
    fn from(e: reqwest::Error) -> Self {
        StatsEngineError::Provider(StatsEngineProviderError::from(e))
    }
}

impl From<serde_json::Error> for StatsEngineError {
    fn from(e: serde_json::Error) -> Self {
        StatsEngineError::Provider(StatsEngineProviderError::InvalidResponse(e.to_string()))
    }
}

// ===== Mapping from reqwest::Error into StatsEngineProviderError =====

impl From<reqwest::Error> for StatsEngineProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return StatsEngineProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => StatsEngineProviderError::Unauthorized,
                403 => StatsEngineProviderError::Forbidden,
                404 => StatsEngineProviderError::NotFound,
                429 => StatsEngineProviderError::RateLimited,
                500..=599 => StatsEngineProviderError::Server(code),
                _ => StatsEngineProviderError::HttpStatus(code),
            };
        }

        StatsEngineProviderError::Network(e.to_string())
    }
}
