//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Hold the swappable runtime (config, clients, base layers, retry budget)
//! - Apply config reloads without dropping in-flight requests
//! - Serve over plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::basemaps::{google_base_layers, BaseLayer};
use crate::config::ProxyConfig;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::proxy::{
    feed, generic, geoserver, Authenticator, ForwardError, SessionCookieAuthenticator, Upstream,
};
use crate::resilience::{RetryBudget, RetryPolicy};

/// Retries available before any traffic has paid into the budget.
const RETRY_RESERVE: u32 = 10;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request needs, rebuilt as a whole on config reload.
pub struct Runtime {
    pub config: ProxyConfig,
    pub upstream: Upstream,
    pub authenticator: Arc<dyn Authenticator>,
    pub base_layers: Vec<BaseLayer>,
    pub retry_policy: RetryPolicy,
    pub retry_budget: Arc<RetryBudget>,
}

impl Runtime {
    /// `authenticator` overrides the session-cookie check derived from config.
    pub fn build(
        config: ProxyConfig,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Self, ServerError> {
        let retry_budget = Arc::new(RetryBudget::new(config.retries.budget_ratio, RETRY_RESERVE));
        Self::assemble(config, authenticator, retry_budget)
    }

    /// Build the successor of `self`, keeping the retry budget's balance
    /// unless its ratio changed.
    pub fn rebuild(
        &self,
        config: ProxyConfig,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Self, ServerError> {
        if config.retries.budget_ratio == self.config.retries.budget_ratio {
            let retry_budget = self.retry_budget.clone();
            Self::assemble(config, authenticator, retry_budget)
        } else {
            Self::build(config, authenticator)
        }
    }

    fn assemble(
        config: ProxyConfig,
        authenticator: Option<Arc<dyn Authenticator>>,
        retry_budget: Arc<RetryBudget>,
    ) -> Result<Self, ServerError> {
        let upstream = Upstream::new(&config)?;
        let authenticator = authenticator.unwrap_or_else(|| {
            Arc::new(SessionCookieAuthenticator::new(config.session.cookie_name.clone()))
        });
        Ok(Self {
            upstream,
            authenticator,
            base_layers: google_base_layers(&config.basemaps),
            retry_policy: RetryPolicy::from(&config.retries),
            retry_budget,
            config,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<Runtime>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    /// GeoServer prefix the routes were built with.
    geoserver_prefix: Arc<str>,
}

impl AppState {
    fn new(config: ProxyConfig, authenticator: Option<Arc<dyn Authenticator>>) -> Result<Self, ServerError> {
        let geoserver_prefix = Arc::from(config.geoserver.path_prefix.as_str());
        let runtime = Runtime::build(config, authenticator.clone())?;
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(runtime)),
            authenticator,
            geoserver_prefix,
        })
    }

    /// Current runtime snapshot.
    pub fn runtime(&self) -> Arc<Runtime> {
        self.inner.load_full()
    }

    /// Swap in a runtime built from `config`.
    ///
    /// Route paths are fixed at startup, so a new `geoserver.path_prefix`
    /// only takes effect after a restart.
    pub fn reload(&self, config: ProxyConfig) -> Result<(), ServerError> {
        if config.geoserver.path_prefix != *self.geoserver_prefix {
            tracing::warn!(
                current = %self.geoserver_prefix,
                requested = %config.geoserver.path_prefix,
                "geoserver.path_prefix changes need a restart, keeping the current prefix"
            );
        }
        let runtime = self.runtime().rebuild(config, self.authenticator.clone())?;
        self.inner.store(Arc::new(runtime));
        Ok(())
    }

    /// GeoServer prefix the routes were built with.
    pub fn geoserver_prefix(&self) -> &str {
        &self.geoserver_prefix
    }
}

/// HTTP server for the GeoNode proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that treats the session cookie as authentication.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        Self::build(config, None)
    }

    /// Create a server with an explicit authentication capability.
    pub fn with_authenticator(
        config: ProxyConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, ServerError> {
        Self::build(config, Some(authenticator))
    }

    fn build(config: ProxyConfig, authenticator: Option<Arc<dyn Authenticator>>) -> Result<Self, ServerError> {
        let state = AppState::new(config.clone(), authenticator)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Route paths, timeout and body limit are fixed at startup.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let geoserver_prefix = config.geoserver.path_prefix.trim_end_matches('/');

        Router::new()
            .route("/proxy", any(proxy_url))
            .route("/proxy/", any(proxy_url))
            .route(geoserver_prefix, any(proxy_geoserver))
            .route(&format!("{}/", geoserver_prefix), any(proxy_geoserver))
            .route(&format!("{}/{{*path}}", geoserver_prefix), any(proxy_geoserver))
            .route("/picasa", any(proxy_feed))
            .route("/picasa/", any(proxy_feed))
            .route("/maps/baselayers", get(base_layers))
            .route("/health", get(health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(tower_http::map_response_body::MapResponseBodyLayer::new(Body::new))
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes)),
            )
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Handle for inspecting or reloading the live runtime.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reloader = spawn_reloader(self.state.clone(), config_updates, shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let reloader = spawn_reloader(self.state.clone(), config_updates, shutdown.resubscribe());

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        reloader.abort();
        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Apply config updates until the channel closes or shutdown fires.
fn spawn_reloader(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    match state.reload(config) {
                        Ok(()) => tracing::info!("Configuration reloaded"),
                        Err(e) => tracing::error!(error = %e, "Failed to apply reloaded configuration"),
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Turn a forwarder outcome into a response and record it.
fn finish(
    forwarder: &'static str,
    method: &Method,
    start: Instant,
    outcome: Result<Response, ForwardError>,
) -> Response {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ForwardError::Upstream(_) => metrics::record_upstream_error(forwarder, "failed"),
                ForwardError::Timeout(_) => metrics::record_upstream_error(forwarder, "timeout"),
                _ => {}
            }
            e.into_response()
        }
    };
    metrics::record_request(forwarder, method.as_str(), response.status().as_u16(), start);
    response
}

async fn proxy_url(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let runtime = state.runtime();
    finish("url", &method, start, generic::forward(&runtime, request).await)
}

async fn proxy_geoserver(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let runtime = state.runtime();
    let outcome = geoserver::forward(&runtime, state.geoserver_prefix(), request).await;
    finish("geoserver", &method, start, outcome)
}

async fn proxy_feed(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let runtime = state.runtime();
    finish("feed", &method, start, feed::forward(&runtime, request).await)
}

async fn base_layers(State(state): State<AppState>) -> Json<Vec<BaseLayer>> {
    Json(state.runtime().base_layers.clone())
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(config: ProxyConfig) -> AppState {
        AppState::new(config, None).unwrap()
    }

    fn drain(budget: &RetryBudget) {
        while budget.can_retry() {}
    }

    #[test]
    fn test_reload_keeps_retry_budget_balance() {
        let config = ProxyConfig::default();
        let state = state(config.clone());
        drain(&state.runtime().retry_budget);

        let mut reloaded = config;
        reloaded.basemaps.google_api_key = Some("key".into());
        state.reload(reloaded).unwrap();

        assert!(!state.runtime().retry_budget.can_retry());
        assert_eq!(state.runtime().base_layers.len(), 4);
    }

    #[test]
    fn test_new_budget_ratio_starts_a_fresh_budget() {
        let config = ProxyConfig::default();
        let state = state(config.clone());
        drain(&state.runtime().retry_budget);

        let mut reloaded = config;
        reloaded.retries.budget_ratio = 0.5;
        state.reload(reloaded).unwrap();

        assert!(state.runtime().retry_budget.can_retry());
    }

    #[test]
    fn test_reload_keeps_routed_geoserver_prefix() {
        let config = ProxyConfig::default();
        let state = state(config.clone());

        let mut reloaded = config;
        reloaded.geoserver.path_prefix = "/gs/".into();
        state.reload(reloaded).unwrap();

        assert_eq!(state.geoserver_prefix(), "/geoserver/");
        assert_eq!(state.runtime().config.geoserver.path_prefix, "/gs/");
    }
}
