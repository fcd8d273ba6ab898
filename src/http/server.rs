//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay's routes
//! - Wire up middleware (request ID, tracing, timeout, limits, cache headers)
//! - Bind server to a plain or TLS listener
//! - Answer every request, mapping relay failures to a status

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::hop::{H2HopClient, HopClient};
use crate::http::request::{cookie_headers, request_id, user_param, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response;
use crate::observability::metrics;
use crate::relay::LoginRelay;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<LoginRelay>,
}

/// HTTP server for the login relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Server whose hops go out over HTTP/2 + TLS.
    pub fn new(config: RelayConfig) -> Result<Self, url::ParseError> {
        let hops = Arc::new(H2HopClient::from_config(&config));
        Self::with_hop_client(config, hops)
    }

    /// Server driving its flows through the given hop client.
    pub fn with_hop_client(
        config: RelayConfig,
        hops: Arc<dyn HopClient>,
    ) -> Result<Self, url::ParseError> {
        let state = AppState {
            relay: Arc::new(LoginRelay::new(hops, &config)?),
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let routes = &config.routes;
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(RequestBodyLimitLayer::new(config.limits.max_request_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route(&routes.message_path, get(message_handler))
            .route(&routes.initiate_path, get(initiate_handler))
            .route(&routes.completion_path, get(complete_handler))
            .fallback(fallback_handler)
            .method_not_allowed_fallback(fallback_handler)
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let watcher = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            watcher.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// The fully layered router, for serving it elsewhere.
    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn message_handler() -> Response {
    let started = Instant::now();
    let response = response::message();
    metrics::record_request("message", response.status().as_u16(), started);
    response
}

/// Flow A.
async fn initiate_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let user = user_param(query.as_deref());

    tracing::debug!(
        request_id = %request_id(&headers),
        has_user = user.as_deref().is_some_and(|u| !u.is_empty()),
        "Login requested"
    );

    let response = match state.relay.initiate(user.as_deref()).await {
        Ok(redirect) => redirect.into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request_id(&headers), error = %e, "Login initiation failed");
            e.into_response()
        }
    };
    metrics::record_request("initiate", response.status().as_u16(), started);
    response
}

/// Flow B.
async fn complete_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let raw = cookie_headers(&headers);
    let cookies: Vec<&str> = raw.iter().map(AsRef::as_ref).collect();

    let response = match state.relay.complete(&cookies).await {
        Ok(redirect) => redirect.into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request_id(&headers), error = %e, "Login completion failed");
            e.into_response()
        }
    };
    metrics::record_request("complete", response.status().as_u16(), started);
    response
}

async fn fallback_handler(headers: HeaderMap) -> Response {
    let started = Instant::now();
    tracing::debug!(request_id = %request_id(&headers), "No route matched");
    let response = response::not_found();
    metrics::record_request("not_found", response.status().as_u16(), started);
    response
}
