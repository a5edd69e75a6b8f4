//! Streaming reverse proxy in front of the configured backend.
//!
//! Every incoming request is forwarded to the backend's `api/` base URL with
//! a leading `api/` path segment stripped, so clients speaking to a local
//! Ollama endpoint transparently reach the remote server. Generation and chat
//! requests additionally have their `model` field passed through the redirect
//! table before forwarding.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ConfigStore;
use crate::error::{RellamaError, Result};

use super::rewrite::{is_rewritable_route, rewrite_model};

/// Default listen address, matching the port Ollama clients expect.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:11434";

/// Hop-by-hop headers that should not be forwarded in either direction.
/// Content-length is recomputed since the body may be rewritten in flight.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "proxy-connection",
    "te",
    "upgrade",
    "content-length",
];

/// Shared state for all proxy handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration store holding the backend URL and redirect table
    pub config: Arc<ConfigStore>,
    /// HTTP client for backend requests
    pub client: reqwest::Client,
}

/// The reverse proxy server
pub struct ProxyServer {
    listen_addr: String,
    config: Arc<ConfigStore>,
}

impl ProxyServer {
    pub fn new(listen_addr: impl Into<String>, config: Arc<ConfigStore>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            config,
        }
    }

    /// Bind the listener and serve until a shutdown signal arrives.
    pub async fn serve(&self) -> Result<()> {
        let backend = self
            .config
            .url()?
            .ok_or_else(|| RellamaError::Config("No backend URL configured".to_string()))?;

        // Redirects are never followed: a redirect response belongs to the
        // client, and a streaming body must come from the first hop.
        // Response bodies are open-ended, so only the connect is bounded.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| RellamaError::Network(format!("Failed to create HTTP client: {e}")))?;

        let app_state = Arc::new(AppState {
            config: self.config.clone(),
            client,
        });

        let app = create_router(app_state);

        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .map_err(|e| RellamaError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting proxy server on {addr}");
        tracing::info!("Forwarding requests to {backend}");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RellamaError::Network(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RellamaError::Network(format!("Server error: {e}")))?;

        tracing::info!("Proxy server shut down gracefully");
        Ok(())
    }
}

/// Create the router; every route falls through to the proxy handler.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().fallback(proxy_handler).with_state(state)
}

async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response<Body> {
    match forward_request(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Proxy request failed: {e}");
            error_response(e)
        }
    }
}

/// Strip a leading `api/` segment (case-insensitive) from the request path.
///
/// The backend base URL already ends in `api/`, so the client's own prefix
/// must not be doubled up. Paths without the prefix are forwarded verbatim.
fn backend_route(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("api/") => &trimmed[4..],
        _ => trimmed,
    }
}

/// Forward one request to the backend and stream the response back.
async fn forward_request(state: &AppState, request: Request<Body>) -> Result<Response<Body>> {
    let backend = state
        .config
        .url()?
        .ok_or_else(|| RellamaError::Config("No backend URL configured".to_string()))?;

    let route = backend_route(request.uri().path()).to_string();
    let target_url = match request.uri().query() {
        Some(query) => format!("{backend}{route}?{query}"),
        None => format!("{backend}{route}"),
    };

    let method = request.method().clone();
    // Append rather than insert so repeated headers keep all their values.
    let mut forwarded_headers = HeaderMap::new();
    for (name, value) in request.headers() {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            forwarded_headers.append(name.clone(), value.clone());
        }
    }

    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| RellamaError::Network(format!("Failed to read request body: {e}")))?;

    let body = if is_rewritable_route(&route) {
        rewrite_model(&state.config, body)
    } else {
        body
    };

    tracing::debug!(%method, %target_url, "Forwarding request");

    let response = state
        .client
        .request(method, &target_url)
        .headers(forwarded_headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                RellamaError::Network(format!("Request timed out: {e}"))
            } else if e.is_connect() {
                RellamaError::Network(format!("Failed to connect to backend: {e}"))
            } else {
                RellamaError::Network(format!("Request failed: {e}"))
            }
        })?;

    let status = response.status();
    let mut builder = Response::builder().status(status);
    for (name, value) in response.headers() {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            builder = builder.header(name, value);
        }
    }

    // Relay the body chunk by chunk so streamed generations reach the client
    // as they are produced rather than after the generation completes.
    let stream = response.bytes_stream().map_err(std::io::Error::other);
    builder
        .body(Body::from_stream(stream))
        .map_err(|e| RellamaError::Network(format!("Failed to build response: {e}")))
}

/// Any per-request failure becomes a 500 with the error text as the body.
fn error_response(error: RellamaError) -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("content-type", HeaderValue::from_static("text/plain; charset=utf-8"))
        .body(Body::from(error.to_string()))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap()
        })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
