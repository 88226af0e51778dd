//! Response assembly for relayed upstream answers.
//!
//! Only status, content-type and body cross the proxy; every other upstream
//! header (hop-by-hop or not) is dropped.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

/// Build the client-facing response for an upstream answer.
pub fn relayed(status: StatusCode, content_type: Option<HeaderValue>, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relayed_keeps_status_type_and_body() {
        let response = relayed(
            StatusCode::CREATED,
            Some(HeaderValue::from_static("application/json")),
            Body::from(r#"{"a":1}"#),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"a":1}"#);
    }

    #[test]
    fn test_relayed_without_content_type() {
        let response = relayed(StatusCode::OK, None, Body::empty());
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
