//! Dashboard configuration.
//!
//! Values come from defaults, then `FDA_*` environment variables, then
//! whatever the front end overrides with the `with_*` builders.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AnalyzerError, AnalyzerResult};
use crate::observability::{LogConfig, LogFormat};

/// Environment variable holding the service base URL.
pub const ENV_API_URL: &str = "FDA_API_URL";
/// Environment variable for the single-job poll interval.
pub const ENV_JOB_POLL_INTERVAL_MS: &str = "FDA_JOB_POLL_INTERVAL_MS";
/// Environment variable for the roster refresh interval.
pub const ENV_LIST_REFRESH_INTERVAL_MS: &str = "FDA_LIST_REFRESH_INTERVAL_MS";
/// Environment variable for the health check interval.
pub const ENV_HEALTH_INTERVAL_MS: &str = "FDA_HEALTH_INTERVAL_MS";
/// Environment variable for the roster page size.
pub const ENV_LIST_LIMIT: &str = "FDA_LIST_LIMIT";
/// Environment variable for the upload size limit.
pub const ENV_MAX_FILE_SIZE_MB: &str = "FDA_MAX_FILE_SIZE_MB";
/// Environment variable selecting the log format.
pub const ENV_LOG_FORMAT: &str = "FDA_LOG_FORMAT";

/// Configuration shared by the API client, the pollers and the upload form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL of the analysis service.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Single-job poll interval in milliseconds.
    #[serde(default = "default_job_poll_interval_ms")]
    pub job_poll_interval_ms: u64,
    /// Roster refresh interval in milliseconds.
    #[serde(default = "default_list_refresh_interval_ms")]
    pub list_refresh_interval_ms: u64,
    /// Health check interval in milliseconds.
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// Number of jobs requested per roster fetch.
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
    /// Largest PDF the upload form accepts, in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Logging setup.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_job_poll_interval_ms() -> u64 {
    2_500
}

const fn default_list_refresh_interval_ms() -> u64 {
    5_000
}

const fn default_health_interval_ms() -> u64 {
    30_000
}

const fn default_list_limit() -> u32 {
    30
}

const fn default_max_file_size_mb() -> u64 {
    10
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            job_poll_interval_ms: default_job_poll_interval_ms(),
            list_refresh_interval_ms: default_list_refresh_interval_ms(),
            health_interval_ms: default_health_interval_ms(),
            list_limit: default_list_limit(),
            max_file_size_mb: default_max_file_size_mb(),
            log: LogConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> AnalyzerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AnalyzerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(ms) = parse_var(&lookup, ENV_JOB_POLL_INTERVAL_MS)? {
            config.job_poll_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, ENV_LIST_REFRESH_INTERVAL_MS)? {
            config.list_refresh_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, ENV_HEALTH_INTERVAL_MS)? {
            config.health_interval_ms = ms;
        }
        if let Some(limit) = parse_var(&lookup, ENV_LIST_LIMIT)? {
            config.list_limit = limit;
        }
        if let Some(mb) = parse_var(&lookup, ENV_MAX_FILE_SIZE_MB)? {
            config.max_file_size_mb = mb;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).filter(|v| !v.trim().is_empty()) {
            config.log.format = format.parse::<LogFormat>()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the service base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the single-job poll interval.
    #[must_use]
    pub fn with_job_poll_interval(mut self, interval: Duration) -> Self {
        self.job_poll_interval_ms = duration_ms(interval);
        self
    }

    /// Sets the roster refresh interval.
    #[must_use]
    pub fn with_list_refresh_interval(mut self, interval: Duration) -> Self {
        self.list_refresh_interval_ms = duration_ms(interval);
        self
    }

    /// Sets the health check interval.
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval_ms = duration_ms(interval);
        self
    }

    /// Sets the roster page size.
    #[must_use]
    pub const fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit;
        self
    }

    /// Sets the upload size limit.
    #[must_use]
    pub const fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    /// Sets the logging setup.
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Single-job poll interval.
    #[must_use]
    pub const fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_ms)
    }

    /// Roster refresh interval.
    #[must_use]
    pub const fn list_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.list_refresh_interval_ms)
    }

    /// Health check interval.
    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    /// Upload size limit in bytes.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Checks the values a poller or client cannot work with.
    pub fn validate(&self) -> AnalyzerResult<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AnalyzerError::Config(format!(
                "API URL must start with http:// or https://, got '{url}'"
            )));
        }
        for (name, value) in [
            ("job poll interval", self.job_poll_interval_ms),
            ("list refresh interval", self.list_refresh_interval_ms),
            ("health interval", self.health_interval_ms),
        ] {
            if value == 0 {
                return Err(AnalyzerError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.list_limit == 0 {
            return Err(AnalyzerError::Config("list limit must be greater than zero".to_string()));
        }
        if self.max_file_size_mb == 0 || self.max_file_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(AnalyzerError::Config(format!(
                "max file size must be between 1 and {} MB, got {}",
                u64::MAX / BYTES_PER_MB,
                self.max_file_size_mb
            )));
        }
        Ok(())
    }
}

/// Bytes in one megabyte of upload limit.
pub(crate) const BYTES_PER_MB: u64 = 1024 * 1024;

fn duration_ms(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> AnalyzerResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AnalyzerError::Config(format!("{key} must be a number, got '{raw}'"))),
    }
}
