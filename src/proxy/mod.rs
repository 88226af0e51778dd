//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → auth.rs (session detection, access guard)
//!     → generic.rs   /proxy/?url=...   any http host
//!     → geoserver.rs /geoserver/...    configured GeoServer, basic auth
//!     → feed.rs      /picasa           third-party photo feed
//!     → upstream.rs (hyper / reqwest clients)
//!     → relay status, content-type and body
//! ```
//!
//! # Design Decisions
//! - One inbound request, one outbound exchange (plus opt-in retries)
//! - Every outbound call runs under a deadline
//! - Failures become plain-text answers through `ForwardError`

pub mod auth;
pub mod error;
pub mod feed;
pub mod generic;
pub mod geoserver;
pub mod upstream;

pub use auth::{Authenticator, SessionCookieAuthenticator, StaticAuthenticator};
pub use error::ForwardError;
pub use upstream::Upstream;

/// First value of `name` in an urlencoded query string.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
