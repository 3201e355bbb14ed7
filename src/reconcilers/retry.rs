// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic for Kubernetes and metal API calls.
//!
//! Kubernetes calls retry transient errors (429, 5xx, connection failures)
//! with exponential backoff and fail fast on everything else. Metal API calls
//! that the metal API itself reports as temporarily inconsistent are retried
//! a fixed number of times at a fixed interval.

use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::errors::{Error, Result};

/// Retrying Kubernetes calls stops after this long
const KUBE_RETRY_BUDGET: Duration = Duration::from_secs(120);

const KUBE_FIRST_DELAY: Duration = Duration::from_millis(100);

const KUBE_MAX_DELAY: Duration = Duration::from_secs(10);

/// Exponential backoff with ±10% jitter and a total time budget.
#[derive(Debug)]
pub struct Backoff {
    /// Un-jittered delay of the next attempt
    pub delay: Duration,
    pub max_delay: Duration,
    pub budget: Duration,
    started: Instant,
}

impl Backoff {
    #[must_use]
    pub fn new(first_delay: Duration, max_delay: Duration, budget: Duration) -> Self {
        Self {
            delay: first_delay,
            max_delay,
            budget,
            started: Instant::now(),
        }
    }

    /// Backoff for Kubernetes API calls: 100ms doubling up to 10s, for 2 minutes
    #[must_use]
    pub fn kube() -> Self {
        Self::new(KUBE_FIRST_DELAY, KUBE_MAX_DELAY, KUBE_RETRY_BUDGET)
    }

    /// Jittered delay before the next attempt; `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.budget {
            return None;
        }
        let delay = self.delay;
        self.delay = (delay * 2).min(self.max_delay);

        let secs = delay.as_secs_f64();
        let jitter = rand::thread_rng().gen_range(-0.1..=0.1) * secs;
        Some(Duration::from_secs_f64((secs + jitter).max(0.0)))
    }
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Automatically retries on transient errors (HTTP 429, 5xx, connection
/// failures) and fails immediately on permanent errors.
///
/// # Errors
///
/// Returns the last error if it is not retryable or the backoff is exhausted.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, kube::Error>>,
{
    let mut backoff = Backoff::kube();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    return Err(e.into());
                }

                if let Some(duration) = backoff.next_delay() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable Kubernetes API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(Error::transient(
                        operation_name,
                        format!("backoff exhausted after {attempt} attempts: {e}"),
                    ));
                }
            }
        }
    }
}

/// Retry `operation` up to `attempts` times, sleeping `interval` between
/// attempts, as long as `should_retry` accepts the error.
///
/// # Errors
///
/// Returns the last error.
pub async fn retry_fixed<T, F, Fut>(
    attempts: u32,
    interval: Duration,
    should_retry: impl Fn(&Error) -> bool,
    mut operation: F,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && should_retry(&e) => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?interval,
                    error = %e,
                    "retrying"
                );
                attempt += 1;
                tokio::time::sleep(interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Determine if a Kubernetes error is retryable.
///
/// Rate limiting (429), server errors (5xx) and connection failures are
/// retryable; client errors are not.
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
