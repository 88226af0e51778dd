//! Retry logic.
//!
//! # Responsibilities
//! - Determine if request is retryable (idempotent methods only)
//! - Execute retries with exponential backoff + jitter
//! - Enforce retry budget (share of traffic that may be retries)
//!
//! # Design Decisions
//! - Never retry POST/PATCH (non-idempotent)
//! - Connection errors and timeouts are retryable; of the statuses only 502/503/504
//! - Disabled policy means exactly one attempt

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::{Method, StatusCode};

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Milli-tokens per retry.
const TOKEN: u64 = 1000;

/// Token bucket limiting retries to a ratio of recorded requests.
#[derive(Debug)]
pub struct RetryBudget {
    deposit: u64,
    capacity: u64,
    tokens: AtomicU64,
}

impl RetryBudget {
    /// `ratio` of each request is deposited; `reserve` retries are available
    /// up front and bound the balance.
    pub fn new(ratio: f32, reserve: u32) -> Self {
        let capacity = u64::from(reserve) * TOKEN;
        Self {
            deposit: (f64::from(ratio.clamp(0.0, 1.0)) * TOKEN as f64).round() as u64,
            capacity,
            tokens: AtomicU64::new(capacity),
        }
    }

    /// Account for one inbound request.
    pub fn record_request(&self) {
        let _ = self.tokens.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
            Some(t.saturating_add(self.deposit).min(self.capacity))
        });
    }

    /// Withdraw one retry if the budget allows it.
    pub fn can_retry(&self) -> bool {
        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(TOKEN))
            .is_ok()
    }
}

/// Whether a finished attempt may be repeated.
pub fn is_retryable(method: &Method, status: Option<StatusCode>, connection_error: bool) -> bool {
    if !method.is_idempotent() {
        return false;
    }
    if connection_error {
        return true;
    }
    matches!(
        status,
        Some(StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT)
    )
}

/// Anything an upstream attempt can yield a status from.
pub trait UpstreamStatus {
    fn upstream_status(&self) -> StatusCode;
}

impl<B> UpstreamStatus for axum::http::Response<B> {
    fn upstream_status(&self) -> StatusCode {
        self.status()
    }
}

impl UpstreamStatus for reqwest::Response {
    fn upstream_status(&self) -> StatusCode {
        self.status()
    }
}

/// Retry settings resolved from config.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Attempts allowed for `method`.
    pub fn attempts_for(&self, method: &Method) -> u32 {
        if self.enabled && method.is_idempotent() {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Drive `send` until it yields a final answer.
///
/// `send` receives the 1-based attempt number. Each retry withdraws from
/// `budget`; once it is empty the last outcome is returned as is.
pub async fn with_retries<T, E, F, Fut>(
    policy: &RetryPolicy,
    budget: &RetryBudget,
    method: &Method,
    mut send: F,
) -> Result<T, E>
where
    T: UpstreamStatus,
    E: fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.attempts_for(method);
    budget.record_request();

    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = send(attempt).await;

        let retryable = match &outcome {
            Ok(response) => is_retryable(method, Some(response.upstream_status()), false),
            Err(_) => is_retryable(method, None, true),
        };

        if !retryable || attempt >= max_attempts || !budget.can_retry() {
            return outcome;
        }

        let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
        match &outcome {
            Ok(response) => tracing::info!(
                attempt,
                delay = ?delay,
                status = %response.upstream_status(),
                "Retrying upstream request"
            ),
            Err(e) => tracing::info!(
                attempt,
                delay = ?delay,
                error = %e,
                "Retrying upstream request after error"
            ),
        }
        tokio::time::sleep(delay).await;
    }
}
