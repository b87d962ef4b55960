//! Configuration loader for the `aqi-dashboard` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing here is required: with an empty
//! environment the service talks to the public upstream API without a key.
//!
use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::remote::DEFAULT_BASE_URL;
use crate::retry::RetryPolicy;
use crate::service::{DEFAULT_MAX_STATIONS, DEFAULT_RADIUS_KM};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable, treating empty as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Upstream air-quality API base URL.
    pub api_url: String,

    /// Upstream API key, sent as `X-API-Key` when present.
    pub api_key: Option<String>,

    /// Per-request timeout for upstream calls.
    pub http_timeout: Duration,

    /// Retry schedule wrapped around the upstream call.
    pub retry: RetryPolicy,

    /// Radius used when a request does not name one.
    pub default_radius_km: f64,

    /// Station count used when a request does not name one.
    pub default_max_stations: usize,

    /// HTTP listen port.
    pub listen_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            default_radius_km: DEFAULT_RADIUS_KM,
            default_max_stations: DEFAULT_MAX_STATIONS,
            listen_port: 8080,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `OPENAQ_API_URL` – upstream base URL (default: `https://api.openaq.org/v2`)
/// - `OPENAQ_API_KEY` – upstream API key (default: unset)
/// - `HTTP_TIMEOUT_SECS` – upstream request timeout (default: 30)
/// - `RETRY_MAX_ATTEMPTS` – attempts per upstream call (default: 3)
/// - `RETRY_BASE_DELAY_MS` – wait before the second attempt (default: 1000)
/// - `RETRY_MULTIPLIER` – backoff factor per attempt (default: 2.0)
/// - `DEFAULT_RADIUS_KM` – search radius (default: 25)
/// - `DEFAULT_MAX_STATIONS` – stations per response (default: 10)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
///
/// Returns an error if any numeric variable does not parse.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let api_url = optional_env!("OPENAQ_API_URL").unwrap_or(defaults.api_url);
    let api_key = optional_env!("OPENAQ_API_KEY");
    let http_timeout = Duration::from_secs(parse_env!("HTTP_TIMEOUT_SECS", u64, 30));

    let retry = RetryPolicy {
        max_attempts: parse_env!("RETRY_MAX_ATTEMPTS", u32, defaults.retry.max_attempts),
        base_delay: Duration::from_millis(parse_env!("RETRY_BASE_DELAY_MS", u64, 1000)),
        multiplier: parse_env!("RETRY_MULTIPLIER", f64, defaults.retry.multiplier),
    };

    let default_radius_km = parse_env!("DEFAULT_RADIUS_KM", f64, defaults.default_radius_km);
    let default_max_stations = parse_env!("DEFAULT_MAX_STATIONS", usize, defaults.default_max_stations);
    let listen_port = parse_env!("LISTEN_PORT", u16, defaults.listen_port);

    Ok(Config {
        api_url,
        api_key,
        http_timeout,
        retry,
        default_radius_km,
        default_max_stations,
        listen_port,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the API key while showing all other configuration values.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  OPENAQ_API_URL       : {}", self.api_url);
        tracing::info!("  OPENAQ_API_KEY       : {}", mask_secret(self.api_key.as_deref()));
        tracing::info!("  HTTP_TIMEOUT_SECS    : {}", self.http_timeout.as_secs());
        tracing::info!("  RETRY_MAX_ATTEMPTS   : {}", self.retry.max_attempts);
        tracing::info!("  RETRY_BASE_DELAY_MS  : {}", self.retry.base_delay.as_millis());
        tracing::info!("  RETRY_MULTIPLIER     : {}", self.retry.multiplier);
        tracing::info!("  DEFAULT_RADIUS_KM    : {}", self.default_radius_km);
        tracing::info!("  DEFAULT_MAX_STATIONS : {}", self.default_max_stations);
        tracing::info!("  LISTEN_PORT          : {}", self.listen_port);
    }
}

/// Show at most the last four characters of a secret.
fn mask_secret(secret: Option<&str>) -> String {
    // ---
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 4 => "****".to_string(),
        Some(s) => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            format!("****{tail}")
        }
    }
}
