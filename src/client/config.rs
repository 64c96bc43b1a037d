//! Client configuration options.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::{Error, Result};

/// Prefix of every configuration key read by [`ClientConfig::from_lookup`].
pub const CONFIG_PREFIX: &str = "LEDGERLINK_";

/// Requests per second used when none is configured.
pub const DEFAULT_RATE_LIMIT: u32 = 4;

/// Configuration for the API client.
///
/// # Example
///
/// ```
/// use ledgerlink::{ClientConfig, RateLimit};
/// use std::time::Duration;
///
/// let config = ClientConfig::new("https://api.example.com/3/")
///     .unwrap()
///     .with_access_token("token")
///     .with_client_secret("secret")
///     .with_rate_limit(RateLimit::new(2).unwrap())
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    pub base_url: Url,
    /// API credentials
    pub credentials: Credentials,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Requests-per-second ceiling of the remote service
    pub rate_limit: RateLimit,
    /// Retry configuration for throttled requests
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default values.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!("Invalid base URL: {}", base_url)));
        }

        Ok(Self {
            base_url,
            credentials: Credentials::default(),
            timeout: Duration::from_secs(30),
            user_agent: format!("ledgerlink/{} (Rust)", env!("CARGO_PKG_VERSION")),
            rate_limit: RateLimit::default(),
            retry: RetryConfig::default(),
        })
    }

    /// Build a configuration from a key-value lookup.
    ///
    /// Keys (all prefixed with [`CONFIG_PREFIX`]): `BASE_URL` (required),
    /// `ACCESS_TOKEN`, `CLIENT_SECRET`, `RATE_LIMIT` and `TIMEOUT_SECS`.
    /// The rate limit is resolved here, once, and defaults to
    /// [`DEFAULT_RATE_LIMIT`].
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use ledgerlink::ClientConfig;
    ///
    /// let vars = HashMap::from([
    ///     ("LEDGERLINK_BASE_URL", "https://api.example.com/3/"),
    ///     ("LEDGERLINK_RATE_LIMIT", "8"),
    /// ]);
    /// let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.rate_limit.get(), 8);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{}{}", CONFIG_PREFIX, key)).filter(|v| !v.trim().is_empty())
        };

        let base_url = get("BASE_URL")
            .ok_or_else(|| Error::Config(format!("{}BASE_URL is not set", CONFIG_PREFIX)))?;
        let mut config = Self::new(base_url.trim())?;

        if let Some(token) = get("ACCESS_TOKEN") {
            config = config.with_access_token(token);
        }
        if let Some(secret) = get("CLIENT_SECRET") {
            config = config.with_client_secret(secret);
        }
        if let Some(limit) = get("RATE_LIMIT") {
            config.rate_limit = limit.parse()?;
        }
        if let Some(secs) = get("TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{}TIMEOUT_SECS must be an integer: {}", CONFIG_PREFIX, secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Set the access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the client secret.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.credentials.client_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Credentials sent with every request.
///
/// Secrets are redacted from `Debug` output.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Value of the `Access-Token` header
    pub access_token: Option<SecretString>,
    /// Value of the `Client-Secret` header
    pub client_secret: Option<SecretString>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<SecretString>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

/// Requests-per-second ceiling of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimit(NonZeroU32);

impl RateLimit {
    /// Create a rate limit. Returns `None` for zero.
    pub fn new(per_second: u32) -> Option<Self> {
        NonZeroU32::new(per_second).map(Self)
    }

    /// Requests per second.
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// One evenly spaced slot within a second: `1_000_000 µs / limit`.
    pub fn slot(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.0.get()))
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self(NonZeroU32::new(DEFAULT_RATE_LIMIT).unwrap_or(NonZeroU32::MIN))
    }
}

impl std::str::FromStr for RateLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(RateLimit::new)
            .ok_or_else(|| Error::Config(format!("Rate limit must be a positive integer: {}", s)))
    }
}

/// Configuration for retrying throttled (HTTP 429) requests.
///
/// The first wait is one rate-limit slot; each further attempt doubles
/// it up to `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries; `None` retries until cancelled
    pub max_retries: Option<u32>,
    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(10),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: Some(0),
            ..Default::default()
        }
    }

    /// Create a configuration that retries until cancelled.
    pub fn unbounded() -> Self {
        Self {
            max_retries: None,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Returns `true` if another retry is allowed after `attempt` retries.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.map_or(true, |max| attempt < max)
    }

    /// Calculate the backoff duration for a given attempt.
    pub fn backoff_for_attempt(&self, rate_limit: RateLimit, attempt: u32) -> Duration {
        let slot = rate_limit.slot();
        let factor = 2u32.saturating_pow(attempt.min(31));
        slot.saturating_mul(factor).min(self.max_backoff)
    }
}
