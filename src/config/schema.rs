//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the GeoNode proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Session cookie used to detect an authenticated browser.
    pub session: SessionConfig,

    /// Generic `/proxy/` forwarder settings.
    pub proxy: GenericProxyConfig,

    /// GeoServer backend and catalog settings.
    pub geoserver: GeoServerConfig,

    /// Third-party photo feed settings.
    pub feed: FeedConfig,

    /// Base layer configuration.
    pub basemaps: BasemapConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the framework session cookie.
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessionid".to_string(),
        }
    }
}

/// Generic URL forwarder configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GenericProxyConfig {
    /// Hosts the forwarder may reach. Empty allows any host.
    pub allowed_hosts: Vec<String>,
}

/// GeoServer backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoServerConfig {
    /// Public base URL requests are forwarded to (trailing slash expected).
    pub base_url: String,

    /// Prefix stripped from inbound paths.
    pub path_prefix: String,

    /// Basic-auth user for server-to-server calls.
    pub username: String,

    /// Basic-auth password for server-to-server calls.
    pub password: String,

    /// Methods forwarded without an authenticated session.
    pub public_methods: Vec<String>,

    /// REST catalog root used for layer creation.
    pub rest_url: String,

    /// PostGIS datastore new layers are created in.
    pub datastore: Option<String>,
}

impl Default for GeoServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/geoserver/".to_string(),
            path_prefix: "/geoserver/".to_string(),
            username: "admin".to_string(),
            password: "geoserver".to_string(),
            public_methods: vec!["GET".to_string()],
            rest_url: "http://localhost:8080/geoserver/rest".to_string(),
            datastore: None,
        }
    }
}

/// Photo feed forwarder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed endpoint, without query string.
    pub endpoint: String,

    /// Thumbnail size requested from the feed.
    pub thumbsize: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://picasaweb.google.com/data/feed/base/all".to_string(),
            thumbsize: "160c".to_string(),
        }
    }
}

/// Base layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BasemapConfig {
    /// Google Maps API key. No Google layers are produced without one.
    pub google_api_key: Option<String>,

    /// Per map-type toggles.
    pub google: GoogleMapsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GoogleMapsConfig {
    pub hybrid: MapTypeConfig,
    pub roadmap: MapTypeConfig,
    pub satellite: MapTypeConfig,
    pub terrain: MapTypeConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct MapTypeConfig {
    pub enabled: bool,
    pub visibility: bool,
}

impl Default for MapTypeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visibility: false,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream exchange timeout (request sent to response headers/body) in seconds.
    pub upstream_secs: u64,

    /// Inbound request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Percentage of requests that can be retries (retry budget).
    /// e.g., 0.1 for 10% budget.
    pub budget_ratio: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            budget_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,

    /// Maximum buffered upstream response size in bytes.
    pub max_response_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            max_response_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
