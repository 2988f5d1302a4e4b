//! Upstream forwarding
//!
//! The [`Forwarder`] trait is the engine's only way to reach the backend, so
//! tests can swap in a scripted double. [`HttpForwarder`] is the real
//! implementation: it replays the request against the loopback upstream and
//! buffers the complete response before returning.

use crate::proxy::types::{CachedResponse, HeaderList, InboundRequest, UpstreamPort};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

/// Loopback host every upstream request goes to
pub const UPSTREAM_HOST: &str = "127.0.0.1";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The upstream could not be reached or the exchange broke off
#[derive(Error, Debug)]
#[error("Unable to forward {method} {url} to {target}: {source}")]
pub struct ForwardError {
    method: String,
    url: String,
    target: String,
    #[source]
    source: BoxError,
}

impl ForwardError {
    pub fn new(request: &InboundRequest, target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url().to_string(),
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Sends a request to the backend and collects the full response
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: &InboundRequest) -> Result<CachedResponse, ForwardError>;
}

/// Forwarder speaking HTTP/1.1 to `127.0.0.1:<upstream port>`
#[derive(Clone)]
pub struct HttpForwarder {
    upstream_port: UpstreamPort,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpForwarder {
    pub fn new(upstream_port: UpstreamPort) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http1_title_case_headers(true)
            .http1_preserve_header_case(true)
            .build_http();

        Self {
            upstream_port,
            client,
        }
    }

    pub fn authority(&self) -> String {
        format!("{UPSTREAM_HOST}:{}", self.upstream_port)
    }

    fn target_uri(&self, request: &InboundRequest) -> String {
        format!("http://{}{}", self.authority(), request.url())
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: &InboundRequest) -> Result<CachedResponse, ForwardError> {
        let target = self.target_uri(request);

        let mut outgoing = Request::builder()
            .method(request.method.clone())
            .uri(target.as_str())
            .body(Full::new(request.body.clone()))
            .map_err(|e| ForwardError::new(request, &target, e))?;
        *outgoing.headers_mut() = request.headers.clone();

        let response = self
            .client
            .request(outgoing)
            .await
            .map_err(|e| ForwardError::new(request, &target, e))?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ForwardError::new(request, &target, e))?
            .to_bytes();

        Ok(CachedResponse::new(
            parts.status,
            HeaderList::from_header_map(&parts.headers),
            body,
        ))
    }
}
