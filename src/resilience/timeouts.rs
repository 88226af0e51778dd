//! Timeout enforcement for upstream calls.
//!
//! Every outbound exchange runs under a deadline taken from
//! `timeouts.upstream_secs`; connect timeouts are set on the clients
//! themselves. A timed-out call (504) is kept apart from a failed one (502).

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Outcome of an upstream call that did not produce a value.
#[derive(Debug)]
pub enum CallError<E> {
    /// The deadline elapsed first.
    TimedOut(Duration),
    /// The call itself failed.
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
            CallError::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Run `call` with a deadline.
pub async fn with_deadline<T, E, F>(limit: Duration, call: F) -> Result<T, CallError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Failed(e)),
        Err(_) => Err(CallError::TimedOut(limit)),
    }
}
