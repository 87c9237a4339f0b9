//! HTTP transport and client configuration.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;

use crate::ThrottleConfig;
use crate::url::BASE_URL;

/// Status codes retried by default: server errors, request timeout,
/// rate limiting and forbidden.
pub const DEFAULT_TRANSIENT_STATUSES: [u16; 7] = [500, 502, 503, 504, 408, 429, 403];

/// Configuration for fetching snapshots.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; the date is appended as the last path segment.
    pub base_url: String,
    /// User agent string.
    pub user_agent: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum requests in flight across all targets.
    pub global_concurrency: usize,
    /// Maximum requests in flight against a single target host.
    pub per_target_concurrency: usize,
    /// Maximum number of attempts per date, including the first one.
    pub max_attempts: u32,
    /// Status codes treated as transient and retried.
    pub transient_statuses: Vec<u16>,
    /// Adaptive delay settings.
    pub throttle: ThrottleConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            user_agent: format!(
                "carburantes/{} (historical fuel price client)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            global_concurrency: 4,
            per_target_concurrency: 2,
            max_attempts: 4,
            transient_statuses: DEFAULT_TRANSIENT_STATUSES.to_vec(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the global and per-target concurrency caps.
    #[must_use]
    pub const fn with_concurrency(mut self, global: usize, per_target: usize) -> Self {
        self.global_concurrency = global;
        self.per_target_concurrency = per_target;
        self
    }

    /// Sets the maximum number of attempts per date.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the throttle configuration.
    #[must_use]
    pub const fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Returns true if the status code is in the transient set.
    #[must_use]
    pub fn is_transient(&self, status: u16) -> bool {
        self.transient_statuses.contains(&status)
    }

    /// Checks the configuration for inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_concurrency == 0 || self.per_target_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.per_target_concurrency > self.global_concurrency {
            return Err(ConfigError::PerTargetExceedsGlobal {
                per_target: self.per_target_concurrency,
                global: self.global_concurrency,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        self.throttle.validate()
    }
}

/// Errors in fetch configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A concurrency cap is zero.
    #[error("Concurrency caps must be at least 1")]
    ZeroConcurrency,

    /// The per-target cap exceeds the global cap.
    #[error("Per-target concurrency ({per_target}) exceeds global concurrency ({global})")]
    PerTargetExceedsGlobal {
        /// Configured per-target cap.
        per_target: usize,
        /// Configured global cap.
        global: usize,
    },

    /// No attempts allowed.
    #[error("Maximum attempts must be at least 1")]
    ZeroAttempts,

    /// Delay bounds are inverted.
    #[error("Minimum delay {min:?} exceeds maximum delay {max:?}")]
    InvertedDelayBounds {
        /// Configured minimum.
        min: Duration,
        /// Configured maximum.
        max: Duration,
    },

    /// Jitter fraction outside `[0, 1]`.
    #[error("Jitter must be within [0, 1], got {0}")]
    InvalidJitter(f64),

    /// Target concurrency must be positive.
    #[error("Target concurrency must be positive, got {0}")]
    InvalidTargetConcurrency(f64),

    /// Smoothing or step limits outside their domain.
    #[error("Invalid throttle tuning: {0}")]
    InvalidTuning(String),
}

/// A response as seen by the scheduler: status and full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Classification of a transport failure that produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or connection timed out.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The request failed while being sent or its body while being read.
    Request,
    /// The request could not be built (not retryable).
    Builder,
}

/// A failure before any HTTP status was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Underlying error text.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network-level failures are retried; builder errors are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self.kind, TransportErrorKind::Builder)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_builder() {
            TransportErrorKind::Builder
        } else if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, error.to_string())
    }
}

/// Issues a single GET request. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs `GET url`, returning the status and the full body.
    ///
    /// # Errors
    ///
    /// Returns an error if no HTTP response was obtained.
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport with connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a new transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-ES,es;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(config.per_target_concurrency)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    /// Creates a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(&ClientConfig::default())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.global_concurrency, 4);
        assert_eq!(config.per_target_concurrency, 2);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("carburantes/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transient_set() {
        let config = ClientConfig::default();
        for status in [500, 502, 503, 504, 408, 429, 403] {
            assert!(config.is_transient(status), "{status} should be transient");
        }
        for status in [200, 400, 401, 404, 410] {
            assert!(!config.is_transient(status), "{status} should not be transient");
        }
    }

    #[test]
    fn test_validate_rejects_bad_caps() {
        let config = ClientConfig::default().with_concurrency(2, 3);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PerTargetExceedsGlobal { per_target: 3, global: 2 })
        ));
        let config = ClientConfig::default().with_concurrency(0, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
        let config = ClientConfig::default().with_max_attempts(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn test_transport_error_retryable() {
        assert!(TransportError::new(TransportErrorKind::Timeout, "t").is_retryable());
        assert!(TransportError::new(TransportErrorKind::Connect, "c").is_retryable());
        assert!(!TransportError::new(TransportErrorKind::Builder, "b").is_retryable());
    }

    #[tokio::test]
    async fn test_transport_creation() {
        assert!(HttpTransport::with_defaults().is_ok());
    }
}
