//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise `observability.log_level` is used,
//! either as a bare level or as a full filter directive.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(config: &ObservabilityConfig) -> String {
    let level = config.log_level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("geonode_proxy={level},tower_http={level}")
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
