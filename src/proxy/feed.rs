//! Photo feed forwarder (`/picasa`).

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    response::Response,
};
use url::Url;

use crate::http::request::request_id;
use crate::http::response::relayed;
use crate::http::server::Runtime;
use crate::proxy::error::ForwardError;
use crate::proxy::query_param;
use crate::resilience::{with_deadline, with_retries};

/// Parameters read from the inbound query string or form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub kind: String,
    pub bbox: String,
    pub query: String,
    pub max_results: String,
}

impl FeedQuery {
    /// Read every parameter from an urlencoded string.
    pub fn from_urlencoded(encoded: &str) -> Result<Self, ForwardError> {
        let param = |name: &'static str| {
            query_param(Some(encoded), name).ok_or(ForwardError::MissingParameter(name))
        };
        Ok(Self {
            kind: param("KIND")?,
            bbox: param("BBOX")?,
            query: param("Q")?,
            max_results: param("MAX-RESULTS")?,
        })
    }

    /// Upstream feed URL for this query.
    pub fn feed_url(&self, endpoint: &str, thumbsize: &str) -> Result<Url, ForwardError> {
        let mut url = Url::parse(endpoint).map_err(|e| ForwardError::Upstream(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("thumbsize", thumbsize)
            .append_pair("kind", &self.kind)
            .append_pair("max-results", &self.max_results)
            .append_pair("bbox", &clamp_bbox(&self.bbox)?)
            .append_pair("q", &self.query);
        Ok(url)
    }
}

/// Keep the west edge at or above -180 and the east edge at or below 180.
///
/// Latitudes pass through untouched. Coordinates already in range keep
/// their original spelling.
pub fn clamp_bbox(bbox: &str) -> Result<String, ForwardError> {
    let invalid = || ForwardError::InvalidBoundingBox(bbox.to_string());

    let coords: Vec<&str> = bbox.split(',').map(str::trim).collect();
    let [west, south, east, north] = coords.as_slice() else {
        return Err(invalid());
    };
    let mut parsed = [0f64; 4];
    for (slot, raw) in parsed.iter_mut().zip([west, south, east, north]) {
        *slot = raw.parse::<f64>().map_err(|_| invalid())?;
        if !slot.is_finite() {
            return Err(invalid());
        }
    }

    let west = if parsed[0] < -180.0 { "-180" } else { *west };
    let east = if parsed[2] > 180.0 { "180" } else { *east };
    Ok(format!("{},{},{},{}", west, south, east, north))
}

pub async fn forward(rt: &Runtime, request: Request<Body>) -> Result<Response, ForwardError> {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let feed_query = match parts.method {
        Method::GET => FeedQuery::from_urlencoded(parts.uri.query().unwrap_or_default())?,
        Method::POST => {
            let body = axum::body::to_bytes(body, rt.config.limits.max_body_bytes)
                .await
                .map_err(ForwardError::Body)?;
            FeedQuery::from_urlencoded(&String::from_utf8_lossy(&body))?
        }
        _ => return Err(ForwardError::MethodNotAllowed),
    };

    let url = feed_query.feed_url(&rt.config.feed.endpoint, &rt.config.feed.thumbsize)?;
    tracing::debug!(request_id = %request_id, url = %url, "Fetching photo feed");

    let mut attempt_started = Instant::now();
    let outcome = with_retries(&rt.retry_policy, &rt.retry_budget, &Method::GET, |_attempt| {
        attempt_started = Instant::now();
        with_deadline(rt.upstream.deadline, rt.upstream.http.get(url.clone()).send())
    })
    .await;

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Photo feed unreachable");
            return Err(e.into());
        }
    };

    let status = response.status();
    let remaining = rt.upstream.remaining(attempt_started);
    let bytes = match with_deadline(remaining, rt.upstream.read(response)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Photo feed body error");
            return Err(e.into());
        }
    };

    Ok(relayed(
        status,
        Some(HeaderValue::from_static("text/xml")),
        Body::from(bytes),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longitudes_are_clamped() {
        assert_eq!(clamp_bbox("-200,10,200,20").unwrap(), "-180,10,180,20");
    }

    #[test]
    fn test_in_range_bbox_is_unchanged() {
        assert_eq!(clamp_bbox("-73.5,40.25,-72.0,41").unwrap(), "-73.5,40.25,-72.0,41");
        assert_eq!(clamp_bbox("-180,-90,180,90").unwrap(), "-180,-90,180,90");
    }

    #[test]
    fn test_latitudes_are_not_clamped() {
        assert_eq!(clamp_bbox("0,-120,10,120").unwrap(), "0,-120,10,120");
    }

    #[test]
    fn test_malformed_bbox() {
        for bad in ["", "1,2,3", "1,2,3,4,5", "a,2,3,4", "1,2,NaN,4"] {
            assert!(
                matches!(clamp_bbox(bad), Err(ForwardError::InvalidBoundingBox(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_parameter_is_named() {
        let err = FeedQuery::from_urlencoded("KIND=photo&BBOX=1,2,3,4&Q=lake").unwrap_err();
        assert!(matches!(err, ForwardError::MissingParameter("MAX-RESULTS")));
    }

    #[test]
    fn test_feed_url_layout() {
        let query = FeedQuery::from_urlencoded("KIND=photo&BBOX=-190,1,2,3&Q=lake+view&MAX-RESULTS=20").unwrap();
        let url = query
            .feed_url("http://picasaweb.google.com/data/feed/base/all", "160c")
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("thumbsize".to_string(), "160c".to_string()),
                ("kind".to_string(), "photo".to_string()),
                ("max-results".to_string(), "20".to_string()),
                ("bbox".to_string(), "-180,1,2,3".to_string()),
                ("q".to_string(), "lake view".to_string()),
            ]
        );
    }
}
