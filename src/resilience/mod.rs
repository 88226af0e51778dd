//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce connect/exchange deadline)
//!     → On failure: retries.rs (check if retryable, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are opt-in and only for idempotent requests (GET, HEAD, etc.)
//! - A shared retry budget caps the share of retried traffic

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{with_retries, RetryBudget, RetryPolicy, UpstreamStatus};
pub use timeouts::{with_deadline, CallError};
