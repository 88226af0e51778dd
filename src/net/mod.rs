//! Network layer helpers.
//!
//! Plain TCP listeners come straight from tokio; TLS termination is
//! handed to axum-server with certificates loaded here.

pub mod tls;
