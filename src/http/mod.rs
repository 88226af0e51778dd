//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (request ID)
//!     → proxy::{generic, geoserver, feed} (forwarding)
//!     → response.rs (status, content-type, body relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, Runtime};
