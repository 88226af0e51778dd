//! Session detection and access guards.
//!
//! The proxy never validates sessions itself. Whether a caller counts as
//! authenticated is decided by an [`Authenticator`] handed to the server.

use axum::http::{header, HeaderMap, Method};

use crate::proxy::error::ForwardError;

/// Capability answering "is this request authenticated".
pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
}

/// Treats a non-empty session cookie as an authenticated session.
#[derive(Debug, Clone)]
pub struct SessionCookieAuthenticator {
    cookie_name: String,
}

impl SessionCookieAuthenticator {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl Authenticator for SessionCookieAuthenticator {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        cookie_value(headers, &self.cookie_name).is_some_and(|v| !v.is_empty())
    }
}

/// Fixed answer, for deployments that authenticate upstream of the proxy.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthenticator(pub bool);

impl Authenticator for StaticAuthenticator {
    fn is_authenticated(&self, _headers: &HeaderMap) -> bool {
        self.0
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// The inbound `Cookie` header as sent, multiple headers joined with `; `.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// Methods in `public_methods` pass; anything else needs a session.
pub fn require_access(
    method: &Method,
    public_methods: &[String],
    authenticated: bool,
) -> Result<(), ForwardError> {
    let public = public_methods
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method.as_str()));
    if public || authenticated {
        Ok(())
    } else {
        Err(ForwardError::LoginRequired)
    }
}
