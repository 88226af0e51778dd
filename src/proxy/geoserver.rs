//! GeoServer forwarder (`/geoserver/...`).
//!
//! Everything after the routed prefix is appended to the GeoServer base
//! URL and sent with the server-to-server basic-auth credentials. Writes
//! require a session; a GeoServer 404 is never shown to the browser verbatim.

use std::time::Instant;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::response::relayed;
use crate::http::server::Runtime;
use crate::proxy::auth::require_access;
use crate::proxy::error::ForwardError;
use crate::resilience::{with_deadline, with_retries};

/// Body sent in place of any GeoServer 404.
pub const NOT_FOUND_BODY: &str = "Something went wrong";

/// GeoServer URL for an inbound path (with query).
pub fn backend_url(base_url: &str, prefix: &str, path_and_query: &str) -> String {
    let relative = path_and_query
        .strip_prefix(prefix.trim_end_matches('/'))
        .unwrap_or(path_and_query);
    let relative = relative.strip_prefix('/').unwrap_or(relative);
    format!("{}/{}", base_url.trim_end_matches('/'), relative)
}

/// `prefix` is the one the route table was built with; it does not follow
/// config reloads.
pub async fn forward(rt: &Runtime, prefix: &str, request: Request<Body>) -> Result<Response, ForwardError> {
    let geoserver = &rt.config.geoserver;
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let authenticated = rt.authenticator.is_authenticated(&parts.headers);
    if let Err(e) = require_access(&parts.method, &geoserver.public_methods, authenticated) {
        tracing::info!(request_id = %request_id, method = %parts.method, "Rejected anonymous GeoServer write");
        return Err(e);
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = backend_url(&geoserver.base_url, prefix, path_and_query);

    let content_type = if parts.method == Method::POST || parts.method == Method::PUT {
        parts.headers.get(header::CONTENT_TYPE).cloned()
    } else {
        None
    };
    let body = axum::body::to_bytes(body, rt.config.limits.max_body_bytes)
        .await
        .map_err(ForwardError::Body)?;

    tracing::debug!(request_id = %request_id, method = %parts.method, url = %url, "Forwarding to GeoServer");

    let method = parts.method.clone();
    let mut attempt_started = Instant::now();
    let outcome = with_retries(&rt.retry_policy, &rt.retry_budget, &method, |_attempt| {
        attempt_started = Instant::now();
        let mut outbound = rt
            .upstream
            .http
            .request(method.clone(), url.as_str())
            .basic_auth(&geoserver.username, Some(&geoserver.password));
        if let Some(content_type) = &content_type {
            outbound = outbound.header(header::CONTENT_TYPE, content_type.clone());
        }
        if !body.is_empty() {
            outbound = outbound.body(body.clone());
        }
        with_deadline(rt.upstream.deadline, outbound.send())
    })
    .await;

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, url = %url, error = %e, "GeoServer unreachable");
            return Err(e.into());
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        tracing::info!(request_id = %request_id, url = %url, "GeoServer returned 404");
        return Ok((
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            NOT_FOUND_BODY,
        )
            .into_response());
    }

    let content_type: Option<HeaderValue> = response.headers().get(header::CONTENT_TYPE).cloned();
    let remaining = rt.upstream.remaining(attempt_started);
    let bytes = match with_deadline(remaining, rt.upstream.read(response)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, url = %url, error = %e, "GeoServer body error");
            return Err(e.into());
        }
    };

    Ok(relayed(status, content_type, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080/geoserver/";

    #[test]
    fn test_prefix_is_stripped() {
        assert_eq!(
            backend_url(BASE, "/geoserver/", "/geoserver/wms?SERVICE=WMS&REQUEST=GetMap"),
            "http://localhost:8080/geoserver/wms?SERVICE=WMS&REQUEST=GetMap"
        );
        assert_eq!(
            backend_url(BASE, "/geoserver/", "/geoserver/rest/layers.json"),
            "http://localhost:8080/geoserver/rest/layers.json"
        );
    }

    #[test]
    fn test_bare_prefix() {
        assert_eq!(backend_url(BASE, "/geoserver/", "/geoserver/"), BASE);
        assert_eq!(backend_url(BASE, "/geoserver/", "/geoserver"), BASE);
    }

    #[test]
    fn test_prefix_and_base_without_trailing_slash() {
        assert_eq!(
            backend_url("http://gs.internal:8080/geoserver", "/gs", "/gs/ows?SERVICE=WFS"),
            "http://gs.internal:8080/geoserver/ows?SERVICE=WFS"
        );
    }
}
