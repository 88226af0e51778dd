//! Forwarding errors and their HTTP answers.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::resilience::CallError;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("The proxy service requires a URL-encoded URL as a parameter.")]
    MissingUrl,

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Unsupported URL scheme '{0}', only http is proxied")]
    UnsupportedScheme(String),

    #[error("Proxying to host '{0}' is not allowed")]
    HostNotAllowed(String),

    #[error("You must be logged in to access GeoServer")]
    LoginRequired,

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid BBOX '{0}': expected four comma separated numbers")]
    InvalidBoundingBox(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Could not read request body")]
    Body(#[source] axum::Error),

    #[error("Upstream request failed")]
    Upstream(String),

    #[error("Upstream request timed out")]
    Timeout(Duration),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::MissingUrl
            | ForwardError::InvalidTarget(_)
            | ForwardError::UnsupportedScheme(_)
            | ForwardError::MissingParameter(_)
            | ForwardError::InvalidBoundingBox(_)
            | ForwardError::Body(_) => StatusCode::BAD_REQUEST,
            ForwardError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            ForwardError::LoginRequired => StatusCode::UNAUTHORIZED,
            ForwardError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl<E: std::fmt::Display> From<CallError<E>> for ForwardError {
    fn from(err: CallError<E>) -> Self {
        match err {
            CallError::TimedOut(limit) => ForwardError::Timeout(limit),
            CallError::Failed(e) => ForwardError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ForwardError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ForwardError::LoginRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ForwardError::HostNotAllowed("evil.test".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ForwardError::from(CallError::<String>::TimedOut(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ForwardError::from(CallError::Failed("refused")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_response_is_plain_text() {
        let response = ForwardError::LoginRequired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }
}
