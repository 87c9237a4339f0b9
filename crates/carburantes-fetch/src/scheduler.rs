//! Rate-gated, capped and retrying dispatch of snapshot requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use carburantes_types::{DateKey, MAX_DIAGNOSTIC_CHARS, truncate_diagnostic};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ClientConfig, RawResponse, Transport, TransportError};
use crate::throttle::ThrottleController;
use crate::url::{snapshot_url, target_key};

/// Lifecycle of one date's request.
///
/// `Queued -> Dispatched -> {Succeeded | RetryPending | Failed}` and
/// `RetryPending -> Dispatched`. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Waiting for its first dispatch.
    Queued,
    /// An HTTP call is in flight.
    Dispatched,
    /// Waiting for the throttle delay before another attempt.
    RetryPending,
    /// A final response was obtained.
    Succeeded,
    /// The retry budget was exhausted or the failure was not retryable.
    Failed,
}

impl RequestState {
    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued | Self::RetryPending, Self::Dispatched)
                | (
                    Self::Dispatched,
                    Self::Succeeded | Self::RetryPending | Self::Failed
                )
        )
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One date's request and its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The date being fetched.
    pub date: DateKey,
    /// Full request URL.
    pub url: String,
    /// Number of HTTP calls issued so far.
    pub attempts: u32,
    state: RequestState,
}

impl FetchRequest {
    /// Creates a queued request.
    #[must_use]
    pub const fn new(date: DateKey, url: String) -> Self {
        Self {
            date,
            url,
            attempts: 0,
            state: RequestState::Queued,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }

    /// Moves to `next`, counting an attempt on every dispatch.
    ///
    /// Returns false, leaving the request untouched, if the transition is
    /// not allowed.
    pub const fn advance(&mut self, next: RequestState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        if matches!(next, RequestState::Dispatched) {
            self.attempts += 1;
        }
        self.state = next;
        true
    }
}

/// A final (non-transient) HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// The date fetched.
    pub date: DateKey,
    /// HTTP status code. Any code outside the transient set, 200 included.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
    /// Number of HTTP calls made.
    pub attempts: u32,
    /// Latency of the last call.
    pub latency: Duration,
}

/// A date for which no final response could be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Every attempt ended in a transient status (or a network error after
    /// at least one transient status).
    #[error("HTTP {status} after {attempts} attempts: {body_excerpt}")]
    RetriesExhausted {
        /// Last observed status code.
        status: u16,
        /// Number of HTTP calls made.
        attempts: u32,
        /// Start of the last response body.
        body_excerpt: String,
    },

    /// No attempt produced an HTTP response.
    #[error("Network error after {attempts} attempts: {message}")]
    Network {
        /// Last transport error.
        message: String,
        /// Number of HTTP calls made.
        attempts: u32,
    },

    /// The scheduler was closed before the request could be dispatched.
    #[error("Fetch cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of HTTP calls made.
        attempts: u32,
    },
}

impl FetchFailure {
    /// Returns the number of HTTP calls made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::RetriesExhausted { attempts, .. }
            | Self::Network { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Dispatches one request per date under the configured caps and pacing.
///
/// Every dispatch, retries included, waits for a turn spaced by the
/// throttle delay. At most `global_concurrency` calls are in flight overall
/// and at most `per_target_concurrency` against one host.
#[derive(Debug)]
pub struct FetchScheduler<T> {
    transport: T,
    config: ClientConfig,
    throttle: Arc<ThrottleController>,
    global: Arc<Semaphore>,
    targets: Mutex<HashMap<String, Arc<Semaphore>>>,
    next_slot: tokio::sync::Mutex<Option<Instant>>,
    in_flight: AtomicUsize,
}

impl<T: Transport> FetchScheduler<T> {
    /// Creates a scheduler over a transport.
    #[must_use]
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let throttle = Arc::new(ThrottleController::new(config.throttle.clone()));
        Self::with_throttle(transport, config, throttle)
    }

    /// Creates a scheduler sharing an existing throttle controller.
    #[must_use]
    pub fn with_throttle(
        transport: T,
        config: ClientConfig,
        throttle: Arc<ThrottleController>,
    ) -> Self {
        Self {
            transport,
            global: Arc::new(Semaphore::new(config.global_concurrency.max(1))),
            targets: Mutex::new(HashMap::new()),
            next_slot: tokio::sync::Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            throttle,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the shared throttle controller.
    #[must_use]
    pub const fn throttle(&self) -> &Arc<ThrottleController> {
        &self.throttle
    }

    /// Returns the number of HTTP calls currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stops granting new dispatches. Requests waiting for a slot fail with
    /// [`FetchFailure::Cancelled`]; calls already in flight complete.
    pub fn close(&self) {
        self.global.close();
    }

    /// Fetches one date, retrying transient failures.
    ///
    /// A non-transient status (200, 404, ...) is returned as
    /// [`FetchedResponse`] after a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`FetchFailure`] once `max_attempts` calls have failed
    /// transiently, or on a transport error that cannot be retried.
    pub async fn fetch(&self, date: DateKey) -> Result<FetchedResponse, FetchFailure> {
        let mut request = FetchRequest::new(date, snapshot_url(&self.config.base_url, date));
        let target = self.target_semaphore(&request.url);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_status: Option<(u16, Bytes)> = None;

        loop {
            let retry = matches!(request.state(), RequestState::RetryPending);
            let Some((_global, _target)) = self.acquire(&target).await else {
                return Err(FetchFailure::Cancelled {
                    attempts: request.attempts,
                });
            };
            self.wait_turn(retry).await;

            request.advance(RequestState::Dispatched);
            let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let started = Instant::now();
            let result = self.transport.get(&request.url).await;
            let latency = started.elapsed();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.throttle.observe(latency, concurrent);

            let exhausted = request.attempts >= max_attempts;
            match result {
                Ok(RawResponse { status, body }) if self.config.is_transient(status) => {
                    if exhausted {
                        request.advance(RequestState::Failed);
                        warn!(
                            date = %date,
                            status,
                            attempts = request.attempts,
                            "Retries exhausted"
                        );
                        return Err(FetchFailure::RetriesExhausted {
                            status,
                            attempts: request.attempts,
                            body_excerpt: excerpt(&body),
                        });
                    }
                    debug!(
                        date = %date,
                        status,
                        attempt = request.attempts,
                        "Transient status, retrying"
                    );
                    last_status = Some((status, body));
                    request.advance(RequestState::RetryPending);
                }
                Ok(RawResponse { status, body }) => {
                    request.advance(RequestState::Succeeded);
                    return Ok(FetchedResponse {
                        date,
                        status,
                        body,
                        attempts: request.attempts,
                        latency,
                    });
                }
                Err(error) if error.is_retryable() && !exhausted => {
                    debug!(
                        date = %date,
                        attempt = request.attempts,
                        error = %truncate_diagnostic(&error.message, 100),
                        "Network error, retrying"
                    );
                    request.advance(RequestState::RetryPending);
                }
                Err(error) => {
                    request.advance(RequestState::Failed);
                    return Err(network_failure(error, last_status, request.attempts));
                }
            }
        }
    }

    async fn acquire(
        &self,
        target: &Arc<Semaphore>,
    ) -> Option<(OwnedSemaphorePermit, OwnedSemaphorePermit)> {
        let global = Arc::clone(&self.global).acquire_owned().await.ok()?;
        let target = Arc::clone(target).acquire_owned().await.ok()?;
        Some((global, target))
    }

    /// Waits until this dispatch's turn. Turns are spaced by the throttle
    /// delay; a retry additionally waits a full delay from now.
    async fn wait_turn(&self, retry: bool) {
        let delay = self.throttle.next_delay();
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let mut slot = next_slot.map_or(now, |s| s.max(now));
            if retry {
                slot = slot.max(now + delay);
            }
            *next_slot = Some(slot + delay);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    fn target_semaphore(&self, url: &str) -> Arc<Semaphore> {
        let per_target = self.config.per_target_concurrency.max(1);
        let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            targets
                .entry(target_key(url))
                .or_insert_with(|| Arc::new(Semaphore::new(per_target))),
        )
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty body".to_string()
    } else {
        truncate_diagnostic(text, MAX_DIAGNOSTIC_CHARS)
    }
}

fn network_failure(
    error: TransportError,
    last_status: Option<(u16, Bytes)>,
    attempts: u32,
) -> FetchFailure {
    match last_status {
        Some((status, body)) => FetchFailure::RetriesExhausted {
            status,
            attempts,
            body_excerpt: excerpt(&body),
        },
        None => FetchFailure::Network {
            message: truncate_diagnostic(&error.to_string(), MAX_DIAGNOSTIC_CHARS),
            attempts,
        },
    }
}
