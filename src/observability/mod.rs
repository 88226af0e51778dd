//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarders produce:
//!     → logging.rs (structured log events, request id on every line)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log collection
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
