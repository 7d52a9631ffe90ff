//! Configuration types for pkg-sweep

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default hosting API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// OAuth application credentials for the hosting API
///
/// Authenticated requests can make up to 5000 requests per hour, otherwise
/// the API allows 60 requests per hour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubAuth {
    /// Client ID
    pub id: String,
    /// Client secret
    pub secret: String,
}

impl GithubAuth {
    /// Create credentials from an id/secret pair
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Credentials from `GITHUB_CLIENT_ID` and `GITHUB_CLIENT_SECRET`
    ///
    /// Returns `None` unless both variables are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Some(Self::new(
            non_empty("GITHUB_CLIENT_ID")?,
            non_empty("GITHUB_CLIENT_SECRET")?,
        ))
    }
}

/// Token bucket parameters for the shared rate limiter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of tokens the bucket holds (burst size)
    pub capacity: u32,

    /// Time to refill a single token
    #[serde(with = "duration_millis_serde")]
    pub interval: Duration,
}

impl RateLimitConfig {
    /// Tier for anonymous API use: 60 requests per hour, no burst
    pub fn unauthenticated() -> Self {
        Self {
            capacity: 1,
            interval: Duration::from_secs(60),
        }
    }

    /// Tier for authenticated API use: 5000 requests per hour, small burst
    pub fn authenticated() -> Self {
        Self {
            capacity: 10,
            interval: Duration::from_millis(720),
        }
    }

    /// Pick the tier matching the credentials in use
    pub fn for_auth(auth: Option<&GithubAuth>) -> Self {
        match auth {
            Some(_) => Self::authenticated(),
            None => Self::unauthenticated(),
        }
    }
}

/// Batch evaluator configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Number of concurrent workers (default: 8)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Hosting API base URL (default: "https://api.github.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Credentials sent as `client_id`/`client_secret` query parameters
    #[serde(default)]
    pub auth: Option<GithubAuth>,

    /// Wait before retrying a 403 that carries no reset timestamp (default: 60 seconds)
    #[serde(default = "default_forbidden_backoff", with = "duration_serde")]
    pub forbidden_backoff: Duration,

    /// Per-request timeout for the default HTTP transport (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Explicit rate limit, overriding the tier derived from `auth`
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            api_base_url: default_api_base_url(),
            auth: None,
            forbidden_backoff: default_forbidden_backoff(),
            request_timeout: default_request_timeout(),
            rate_limit: None,
        }
    }
}

impl EvaluatorConfig {
    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("invalid configuration JSON: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rate limit in effect for a batch
    pub fn effective_rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
            .unwrap_or_else(|| RateLimitConfig::for_auth(self.auth.as_ref()))
    }

    /// Check the configuration for values the evaluator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers must be at least 1", "workers"));
        }

        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(Error::config(
                format!("invalid API base URL: {}", self.api_base_url),
                "api_base_url",
            ));
        }

        if let Some(auth) = &self.auth
            && (auth.id.is_empty() || auth.secret.is_empty())
        {
            return Err(Error::config(
                "both client id and secret are required for authentication",
                "auth",
            ));
        }

        if let Some(limit) = &self.rate_limit {
            if limit.capacity == 0 {
                return Err(Error::config(
                    "rate limit capacity must be at least 1",
                    "rate_limit.capacity",
                ));
            }
            if limit.interval.is_zero() {
                return Err(Error::config(
                    "rate limit interval must be non-zero",
                    "rate_limit.interval",
                ));
            }
        }

        Ok(())
    }
}

fn default_workers() -> usize {
    8
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_forbidden_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

// Durations as (possibly fractional) seconds, e.g. `60` or `0.25`
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        let nanos = (secs * 1e9).round();
        if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
            return Err(D::Error::custom(format!("invalid duration: {secs} seconds")));
        }
        Ok(Duration::from_nanos(nanos as u64))
    }
}

// Token refill intervals are sub-second for the authenticated tier
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
