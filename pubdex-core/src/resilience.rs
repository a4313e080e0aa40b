// Copyright 2025 Pubdex (https://github.com/pubdex)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resilience primitives (retry policy + circuit breaker).
//!
//! Upstream calls run through the composed pipeline outer to inner:
//! circuit breaker, retry with exponential backoff, per-attempt timeout.

use crate::error::RegistryError;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Exponential backoff with full jitter from a cryptographic RNG.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `k` sleeps `min(base * 2^(k-1) + jitter, base * 2^max)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` failed attempts.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let exp = base * 2f64.powi(attempt.saturating_sub(1) as i32);
        let jitter = base * OsRng.gen::<f64>();
        let cap = base * 2f64.powi(self.max_attempts as i32);
        Duration::from_secs_f64((exp + jitter).min(cap))
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Sliding window over which the failure ratio is computed.
    pub window: Duration,
    /// Minimum calls inside the window before the ratio is consulted.
    pub min_throughput: u32,
    /// Failure ratio at or above which the circuit opens.
    pub failure_ratio: f64,
    /// How long the circuit stays open before a trial call is allowed.
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(30),
            min_throughput: 5,
            failure_ratio: 0.5,
            open_duration: Duration::from_secs(15),
        }
    }
}

/// Observable circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum InnerState {
    Closed,
    Open { until: Instant },
    HalfOpen { trial_in_flight: bool },
}

struct BreakerInner {
    state: InnerState,
    /// `(when, succeeded)` outcomes inside the sliding window.
    outcomes: VecDeque<(Instant, bool)>,
}

/// Rejection issued while the circuit is open.
#[derive(Debug, Clone, Error)]
#[error("circuit open, retry after {retry_after:?}")]
pub struct CircuitOpen {
    pub retry_after: Duration,
}

/// A {Closed, Open, HalfOpen} breaker with a windowed failure-ratio
/// calculator. All transitions happen under one mutex; the guarded
/// sections never block on I/O.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: InnerState::Closed,
                outcomes: VecDeque::new(),
            }),
        }
    }

    /// Admission check. While open, callers are rejected until the open
    /// duration elapses; the first caller afterwards becomes the half-open
    /// trial and everyone else keeps getting rejected until it reports.
    pub fn try_acquire(&self) -> Result<(), CircuitOpen> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            InnerState::Closed => Ok(()),
            InnerState::Open { until } => {
                if now >= until {
                    inner.state = InnerState::HalfOpen { trial_in_flight: true };
                    Ok(())
                } else {
                    Err(CircuitOpen { retry_after: until - now })
                }
            }
            InnerState::HalfOpen { trial_in_flight } => {
                if trial_in_flight {
                    Err(CircuitOpen {
                        retry_after: Duration::ZERO,
                    })
                } else {
                    inner.state = InnerState::HalfOpen { trial_in_flight: true };
                    Ok(())
                }
            }
        }
    }

    /// Record a healthy upstream interaction.
    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            InnerState::Closed => {
                inner.outcomes.push_back((now, true));
                Self::prune(&mut inner.outcomes, now, self.config.window);
            }
            InnerState::HalfOpen { .. } => {
                // One success closes the circuit.
                inner.state = InnerState::Closed;
                inner.outcomes.clear();
            }
            InnerState::Open { .. } => {}
        }
    }

    /// Record an upstream failure; may trip the circuit.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            InnerState::Closed => {
                inner.outcomes.push_back((now, false));
                Self::prune(&mut inner.outcomes, now, self.config.window);
                let total = inner.outcomes.len() as u32;
                let failures = inner.outcomes.iter().filter(|(_, ok)| !ok).count() as f64;
                if total >= self.config.min_throughput
                    && failures / f64::from(total) >= self.config.failure_ratio
                {
                    tracing::warn!(
                        failures,
                        total,
                        open_for = ?self.config.open_duration,
                        "circuit breaker opened",
                    );
                    inner.state = InnerState::Open {
                        until: now + self.config.open_duration,
                    };
                    inner.outcomes.clear();
                }
            }
            InnerState::HalfOpen { .. } => {
                tracing::warn!("circuit breaker reopened after failed trial call");
                inner.state = InnerState::Open {
                    until: now + self.config.open_duration,
                };
            }
            InnerState::Open { .. } => {}
        }
    }

    /// Release a half-open trial slot without judging the upstream (the
    /// call was cancelled before it could tell us anything).
    pub fn record_neutral(&self) {
        let mut inner = self.inner.lock();
        if let InnerState::HalfOpen { .. } = inner.state {
            inner.state = InnerState::HalfOpen {
                trial_in_flight: false,
            };
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.inner.lock().state {
            InnerState::Closed => CircuitState::Closed,
            InnerState::Open { .. } => CircuitState::Open,
            InnerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    fn prune(outcomes: &mut VecDeque<(Instant, bool)>, now: Instant, window: Duration) {
        while let Some((when, _)) = outcomes.front() {
            if now.duration_since(*when) > window {
                outcomes.pop_front();
            } else {
                break;
            }
        }
    }
}

/// The composed breaker → retry → per-attempt-timeout pipeline.
#[derive(Debug, Clone)]
pub struct ResiliencePipeline {
    pub retry: RetryPolicy,
    pub attempt_timeout: Duration,
}

impl Default for ResiliencePipeline {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(3),
        }
    }
}

impl ResiliencePipeline {
    /// Run `attempt` through the pipeline.
    ///
    /// Only transient failures are retried and only transient failures
    /// count against the breaker; a definite upstream answer (404, a 4xx
    /// rejection, an undecodable body) proves the upstream alive.
    /// Cancellation aborts immediately and is not recorded either way.
    pub async fn execute<F, Fut, T>(
        &self,
        breaker: &CircuitBreaker,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        if let Err(open) = breaker.try_acquire() {
            return Err(RegistryError::UpstreamUnavailable(format!(
                "circuit open, retry after {:?}",
                open.retry_after
            )));
        }

        let result = self.run_attempts(cancel, &mut attempt).await;
        match &result {
            Ok(_) => breaker.record_success(),
            Err(err) if err.is_transient() => breaker.record_failure(),
            // Cancellation says nothing about upstream health.
            Err(RegistryError::Cancelled) => breaker.record_neutral(),
            // A definite upstream answer (404, 4xx rejection, undecodable
            // body) proves the upstream alive.
            Err(_) => breaker.record_success(),
        }

        result.map_err(|err| match err {
            // Rate limiting that survived the retry budget is surfaced as
            // plain unavailability.
            RegistryError::RateLimited(detail) => RegistryError::UpstreamUnavailable(format!(
                "rate limited after {} attempts: {detail}",
                self.retry.max_attempts
            )),
            other => other,
        })
    }

    async fn run_attempts<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        attempt: &mut F,
    ) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        let mut attempts_made = 0u32;
        loop {
            attempts_made += 1;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                timed = tokio::time::timeout(self.attempt_timeout, attempt()) => match timed {
                    Ok(inner) => inner,
                    Err(_) => Err(RegistryError::UpstreamUnavailable(format!(
                        "attempt timed out after {:?}",
                        self.attempt_timeout
                    ))),
                },
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempts_made < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempts_made);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
