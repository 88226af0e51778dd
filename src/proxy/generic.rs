//! Generic URL forwarder (`/proxy/?url=...`).
//!
//! Connects to the host named by the `url` parameter and replays the inbound
//! method and body against the parameter's path, query and fragment. The
//! browser's cookies travel along only when they carry the session cookie.

use std::time::Instant;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Uri},
    response::Response,
};
use url::Url;

use crate::http::request::request_id;
use crate::http::response::relayed;
use crate::http::server::Runtime;
use crate::proxy::auth::{cookie_header, cookie_value};
use crate::proxy::error::ForwardError;
use crate::proxy::query_param;
use crate::resilience::{with_deadline, with_retries};

/// Where an inbound `url` parameter points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub locator: String,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, ForwardError> {
        let url = Url::parse(raw).map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(ForwardError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ForwardError::InvalidTarget(format!("'{}' has no host", raw)))?
            .to_string();

        Ok(Self {
            host,
            port: url.port().unwrap_or(80),
            locator: locator(&url),
        })
    }

    /// Absolute URI the outbound connection is made with.
    pub fn uri(&self) -> Result<Uri, ForwardError> {
        format!("http://{}:{}{}", self.host, self.port, self.locator)
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ForwardError::InvalidTarget(e.to_string()))
    }
}

/// Path, then `?query` and `#fragment` when non-empty.
///
/// The fragment is part of the locator for logging; `http::Uri` drops it on
/// the wire since a request target cannot carry one.
pub fn locator(url: &Url) -> String {
    let mut locator = url.path().to_string();
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        locator.push('?');
        locator.push_str(query);
    }
    if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
        locator.push('#');
        locator.push_str(fragment);
    }
    locator
}

/// Empty allow-list admits every host.
pub fn host_allowed(host: &str, allowed_hosts: &[String]) -> bool {
    allowed_hosts.is_empty() || allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
}

pub async fn forward(rt: &Runtime, request: Request<Body>) -> Result<Response, ForwardError> {
    let raw_url = query_param(request.uri().query(), "url").ok_or(ForwardError::MissingUrl)?;
    let target = Target::parse(&raw_url)?;
    if !host_allowed(&target.host, &rt.config.proxy.allowed_hosts) {
        return Err(ForwardError::HostNotAllowed(target.host));
    }
    let uri = target.uri()?;

    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let cookie = if cookie_value(&parts.headers, &rt.config.session.cookie_name).is_some() {
        cookie_header(&parts.headers).and_then(|c| HeaderValue::from_str(&c).ok())
    } else {
        None
    };
    let body = axum::body::to_bytes(body, rt.config.limits.max_body_bytes)
        .await
        .map_err(ForwardError::Body)?;

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        host = %target.host,
        port = target.port,
        locator = %target.locator,
        with_session = cookie.is_some(),
        "Forwarding to URL target"
    );

    let method = parts.method.clone();
    let mut attempt_started = Instant::now();
    let outcome = with_retries(&rt.retry_policy, &rt.retry_budget, &method, |_attempt| {
        attempt_started = Instant::now();
        let mut outbound = Request::new(Body::from(body.clone()));
        *outbound.method_mut() = method.clone();
        *outbound.uri_mut() = uri.clone();
        if let Some(cookie) = &cookie {
            outbound.headers_mut().insert(header::COOKIE, cookie.clone());
        }
        with_deadline(rt.upstream.deadline, rt.upstream.raw.request(outbound))
    })
    .await;

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, host = %target.host, error = %e, "Upstream error");
            return Err(e.into());
        }
    };

    let (upstream, upstream_body) = response.into_parts();
    let content_type = upstream
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/plain"));

    let remaining = rt.upstream.remaining(attempt_started);
    let bytes = match with_deadline(remaining, rt.upstream.read_body(Body::new(upstream_body))).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, host = %target.host, error = %e, "Upstream body error");
            return Err(e.into());
        }
    };

    Ok(relayed(upstream.status, Some(content_type), Body::from(bytes)))
}
