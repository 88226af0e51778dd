//! Outbound HTTP clients.
//!
//! The generic forwarder talks raw hyper so the request target and body go
//! out untouched. Backend and feed calls go through reqwest, which handles
//! basic auth and query building. Every upstream body is read in full under
//! what is left of the exchange deadline and capped at
//! `limits.max_response_bytes` before it is relayed.

use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::{ProxyConfig, TimeoutConfig};

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("upstream body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to read upstream body: {0}")]
    Read(#[from] reqwest::Error),

    #[error("failed to read upstream body: {0}")]
    Stream(#[from] axum::Error),
}

/// Clients, deadline and size cap shared by all forwarders.
#[derive(Clone)]
pub struct Upstream {
    pub raw: Client<HttpConnector, Body>,
    pub http: reqwest::Client,
    pub deadline: Duration,
    pub max_body: usize,
}

impl Upstream {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let TimeoutConfig {
            connect_secs,
            upstream_secs,
            ..
        } = config.timeouts;
        let connect_timeout = Duration::from_secs(connect_secs);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let raw = Client::builder(TokioExecutor::new()).build(connector);

        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("geonode-proxy/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;

        Ok(Self {
            raw,
            http,
            deadline: Duration::from_secs(upstream_secs),
            max_body: config.limits.max_response_bytes,
        })
    }

    /// Deadline left for an exchange that began at `started`.
    pub fn remaining(&self, started: Instant) -> Duration {
        self.deadline.saturating_sub(started.elapsed())
    }

    /// Buffer a reqwest response body, failing once it passes `max_body`.
    pub async fn read(&self, mut response: reqwest::Response) -> Result<Bytes, BodyError> {
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body as u64)
        {
            return Err(BodyError::TooLarge(self.max_body));
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if buffer.len() + chunk.len() > self.max_body {
                return Err(BodyError::TooLarge(self.max_body));
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }

    /// Buffer a raw response body, failing once it passes `max_body`.
    pub async fn read_body(&self, body: Body) -> Result<Bytes, BodyError> {
        Ok(axum::body::to_bytes(body, self.max_body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(max_response_bytes: usize) -> Upstream {
        let mut config = ProxyConfig::default();
        config.limits.max_response_bytes = max_response_bytes;
        Upstream::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_raw_body_within_limit() {
        let bytes = upstream(16).read_body(Body::from("sixteen bytes!!!")).await.unwrap();
        assert_eq!(&bytes[..], b"sixteen bytes!!!");
    }

    #[tokio::test]
    async fn test_raw_body_over_limit() {
        let err = upstream(4).read_body(Body::from("too long")).await.unwrap_err();
        assert!(matches!(err, BodyError::Stream(_)));
    }

    #[test]
    fn test_remaining_never_underflows() {
        let mut config = ProxyConfig::default();
        config.timeouts.upstream_secs = 0;
        let expired = Upstream::new(&config).unwrap();
        assert_eq!(expired.remaining(Instant::now()), Duration::ZERO);

        let upstream = upstream(16);
        assert!(upstream.remaining(Instant::now()) <= upstream.deadline);
    }
}
