//! Adaptive inter-request delay.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::ConfigError;

/// Tunables of the adaptive delay.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    /// Delay used before any latency has been observed.
    pub base_delay: Duration,
    /// Random factor applied around the current delay, as a fraction
    /// (`0.5` draws from `[0.5 * d, 1.5 * d]`).
    pub jitter: f64,
    /// Lower bound of every issued delay.
    pub min_delay: Duration,
    /// Upper bound of every issued delay.
    pub max_delay: Duration,
    /// Number of requests the server should be handling in parallel on average.
    pub target_concurrency: f64,
    /// Weight of the newest sample in the mean latency estimate, in `(0, 1]`.
    pub smoothing: f64,
    /// Largest relative change of the delay per observation.
    pub max_step: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            jitter: 0.5,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            target_concurrency: 1.5,
            smoothing: 0.3,
            max_step: 0.25,
        }
    }
}

impl ThrottleConfig {
    /// A configuration that never waits. Meant for tests and local mirrors.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            base_delay: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay bounds.
    #[must_use]
    pub const fn with_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Sets the jitter fraction.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the target concurrency.
    #[must_use]
    pub const fn with_target_concurrency(mut self, target: f64) -> Self {
        self.target_concurrency = target;
        self
    }

    /// Checks the tunables.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvertedDelayBounds {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }
        if !(self.target_concurrency.is_finite() && self.target_concurrency > 0.0) {
            return Err(ConfigError::InvalidTargetConcurrency(self.target_concurrency));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::InvalidTuning(format!(
                "smoothing must be within (0, 1], got {}",
                self.smoothing
            )));
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(ConfigError::InvalidTuning(format!(
                "max step must be positive, got {}",
                self.max_step
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ThrottleState {
    delay_secs: f64,
    mean_latency: Option<f64>,
    observations: u64,
}

/// Adaptive delay shared by every in-flight fetch.
///
/// The delay rises while more requests are in flight than the target
/// concurrency and falls back toward `mean_latency / target_concurrency`
/// otherwise, by at most `max_step` per observation. Every delay handed out
/// lies within `[min_delay, max_delay]`.
#[derive(Debug)]
pub struct ThrottleController {
    config: ThrottleConfig,
    state: Mutex<ThrottleState>,
}

impl ThrottleController {
    /// Creates a controller starting at the configured base delay.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        let delay_secs = clamp_secs(&config, config.base_delay.as_secs_f64());
        Self {
            config,
            state: Mutex::new(ThrottleState {
                delay_secs,
                mean_latency: None,
                observations: 0,
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Returns the jittered delay to wait before the next dispatch.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }

    /// Like [`next_delay`](Self::next_delay) with a caller-supplied RNG.
    pub fn next_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let current = self.state().delay_secs;
        let jitter = self.config.jitter;
        let factor = if jitter > 0.0 {
            rng.gen_range((1.0 - jitter)..=(1.0 + jitter))
        } else {
            1.0
        };
        self.to_duration(clamp_secs(&self.config, current * factor))
    }

    /// Feeds one response latency and the number of requests in flight when
    /// it was dispatched, returning the adjusted delay.
    pub fn observe(&self, latency: Duration, in_flight: usize) -> Duration {
        let config = &self.config;
        let mut state = self.state();

        let sample = latency.as_secs_f64();
        let mean = state
            .mean_latency
            .map_or(sample, |m| m + config.smoothing * (sample - m));
        state.mean_latency = Some(mean);
        state.observations += 1;

        let pressure = in_flight as f64 / config.target_concurrency;
        let equilibrium = mean / config.target_concurrency;
        let current = state.delay_secs;
        let up = 1.0 + config.max_step;

        let proposed = if current <= f64::EPSILON {
            if pressure > 1.0 { equilibrium } else { current }
        } else {
            let ratio = equilibrium / current;
            let factor = if pressure > 1.0 {
                ratio.max(pressure).clamp(1.0, up)
            } else {
                ratio.min(1.0).clamp(up.recip(), 1.0)
            };
            current * factor
        };

        let next = clamp_secs(config, proposed);
        debug!(
            latency_ms = latency.as_millis() as u64,
            in_flight,
            mean_latency = mean,
            delay_from = current,
            delay_to = next,
            "Throttle adjusted"
        );
        state.delay_secs = next;
        self.to_duration(next)
    }

    /// Returns the current (unjittered) delay.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.to_duration(self.state().delay_secs)
    }

    /// Returns the smoothed mean latency, if any response was observed.
    #[must_use]
    pub fn mean_latency(&self) -> Option<Duration> {
        self.state()
            .mean_latency
            .and_then(|m| Duration::try_from_secs_f64(m).ok())
    }

    /// Returns the number of observations so far.
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.state().observations
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn to_duration(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs).unwrap_or(self.config.min_delay)
    }
}

fn clamp_secs(config: &ThrottleConfig, secs: f64) -> f64 {
    let min = config.min_delay.as_secs_f64();
    let max = config.max_delay.as_secs_f64();
    if secs.is_nan() {
        return min;
    }
    secs.clamp(min, max.max(min))
}
