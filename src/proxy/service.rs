//! Main proxy service implementation
//!
//! The `ProxyService` is the HTTP entry point. It accepts any method on any
//! path, buffers the complete request body and hands the request to the
//! [`ProxyDecisionEngine`].
//!
//! ## Service Lifecycle
//!
//! ```rust,ignore
//! use fixture_proxy::proxy::{ProxyConfig, ProxyService};
//!
//! let service = ProxyService::new(ProxyConfig::default());
//! let router = service.into_router();
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use crate::proxy::engine::ProxyDecisionEngine;
use crate::proxy::error_response::into_http_response;
use crate::proxy::forwarder::{Forwarder, HttpForwarder};
use crate::proxy::types::*;
use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Caching proxy in front of a single upstream
#[derive(Clone)]
pub struct ProxyService {
    engine: Arc<ProxyDecisionEngine>,
}

impl ProxyService {
    /// Create a proxy forwarding to the configured loopback upstream
    pub fn new(config: ProxyConfig) -> Self {
        let forwarder = Arc::new(HttpForwarder::new(config.upstream_port));
        Self::with_forwarder(config, forwarder)
    }

    /// Create a proxy with a caller-supplied forwarder
    pub fn with_forwarder(config: ProxyConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            engine: Arc::new(ProxyDecisionEngine::new(config, forwarder)),
        }
    }

    pub fn engine(&self) -> &ProxyDecisionEngine {
        &self.engine
    }

    /// Every method and path falls through to the proxy handler
    pub fn into_router(self) -> axum::Router {
        axum::Router::new()
            .fallback(proxy_handler)
            .with_state(self.engine)
            .layer(TraceLayer::new_for_http())
    }
}

/// Axum handler for proxying requests
async fn proxy_handler(
    State(engine): State<Arc<ProxyDecisionEngine>>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let body = body
        .collect()
        .await
        .map_err(|e| ProxyError::RequestBody(e.to_string()))?
        .to_bytes();

    let inbound = InboundRequest::new(parts.method, parts.uri, parts.headers, body);
    let method = inbound.method.clone();
    let url = inbound.url().to_string();

    let outcome = engine.handle(inbound).await;

    info!(
        %method,
        %url,
        key = %outcome.key,
        cache = %outcome.status,
        status = outcome.response.status.as_u16(),
        "Request handled"
    );

    Ok(into_http_response(outcome.response))
}
