//! Configuration management for the order confirmation service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Only the delivery endpoint is required.

use order_confirmation_core::order::DuplicatePolicy;
use order_confirmation_runtime::retry::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Value as found
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// `host:port` bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Downstream delivery configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryConfig {
    /// Confirmation endpoint, optionally containing `{order_id}`
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Backoff for transport failures
    pub retry: RetryPolicy,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Delivery settings
    pub delivery: DeliveryConfig,
    /// Treatment of redelivered reports
    pub duplicate_policy: DuplicatePolicy,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the delivery endpoint is unset, any
    /// variable holds an unparseable value, or the retry settings would
    /// not give strictly growing backoff (`RETRY_MULTIPLIER` below
    /// `1 + RETRY_JITTER`, or `RETRY_MAX_DELAY_MS` below
    /// `RETRY_INITIAL_DELAY_MS`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("DELIVERY_CONFIRMATION_ENDPOINT")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("DELIVERY_CONFIRMATION_ENDPOINT"))?;

        let initial_delay = parse_or(&lookup, "RETRY_INITIAL_DELAY_MS", 100)?;
        let max_delay = parse_or(&lookup, "RETRY_MAX_DELAY_MS", 30_000)?;
        if max_delay < initial_delay {
            return Err(ConfigError::Invalid {
                key: "RETRY_MAX_DELAY_MS",
                value: max_delay.to_string(),
                reason: format!("must be at least RETRY_INITIAL_DELAY_MS ({initial_delay})"),
            });
        }

        let multiplier = parse_positive(&lookup, "RETRY_MULTIPLIER", 2.0)?;
        let jitter = parse_fraction(&lookup, "RETRY_JITTER", 0.25)?;
        // Below 1 + jitter a jittered delay can exceed the next one
        if multiplier < 1.0 + jitter {
            return Err(ConfigError::Invalid {
                key: "RETRY_MULTIPLIER",
                value: multiplier.to_string(),
                reason: format!("must be at least 1 + RETRY_JITTER ({})", 1.0 + jitter),
            });
        }

        let retry = RetryPolicy::builder()
            .max_retries(parse_or(&lookup, "RETRY_MAX_RETRIES", 3)?)
            .initial_delay(Duration::from_millis(initial_delay))
            .max_delay(Duration::from_millis(max_delay))
            .multiplier(multiplier)
            .jitter(jitter)
            .build();

        Ok(Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8080)?,
                metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", true)?,
            },
            delivery: DeliveryConfig {
                endpoint,
                timeout: Duration::from_millis(parse_or(&lookup, "DELIVERY_TIMEOUT_MS", 10_000)?),
                retry,
            },
            duplicate_policy: parse_or(&lookup, "DUPLICATE_REPORTS", DuplicatePolicy::Reapply)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be a finite number >= 1.0".to_string(),
        })
    }
}

fn parse_fraction<F>(lookup: &F, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be between 0.0 and 1.0".to_string(),
        })
    }
}
