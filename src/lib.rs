//! GeoNode proxy library.
//!
//! Browser-facing forwarders for a GeoNode deployment: any http URL, the
//! GeoServer behind it, and a public photo feed. Also exposes the base
//! layer catalogue and GeoServer layer creation used by the CLI.

pub mod basemaps;
pub mod catalog;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
