//! Error responses produced by the proxy itself
//!
//! Failures are reported in GraphQL error shape so GraphQL clients surface
//! them like any other server error.

use crate::proxy::graphql::GraphqlOperationName;
use crate::proxy::headers::{content_types, CONTENT_TYPE};
use crate::proxy::types::{CachedResponse, HeaderList, ProxyError, UpstreamPort};
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};

/// Machine-readable code for an unreachable upstream
pub const BAD_GATEWAY_CODE: &str = "BAD_GATEWAY";

/// Machine-readable code for an unreadable request body
pub const BAD_REQUEST_CODE: &str = "BAD_REQUEST";

/// `{"errors":[...]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    pub extensions: ErrorExtensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorExtensions {
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorEntry {
                message: message.into(),
                extensions: ErrorExtensions { code: code.into() },
            }],
        }
    }

    /// Serialized JSON body
    pub fn to_body(&self) -> Vec<u8> {
        // Only strings are serialized here, which cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Package as a response with a JSON content type
    pub fn into_cached_response(self, status: StatusCode) -> CachedResponse {
        let mut headers = HeaderList::new();
        headers.push(CONTENT_TYPE, HeaderValue::from_static(content_types::JSON));
        CachedResponse::new(status, headers, self.to_body())
    }
}

/// The fixed 502 returned when the upstream cannot be reached
pub fn bad_gateway(
    upstream_port: UpstreamPort,
    method: &Method,
    url: &str,
    operation: Option<&GraphqlOperationName>,
) -> CachedResponse {
    let operation = operation.map(|name| name.as_ref()).unwrap_or_default();
    ErrorResponse::new(
        BAD_GATEWAY_CODE,
        format!("Unable to reach server on {upstream_port} for {method} {url} {operation}"),
    )
    .into_cached_response(StatusCode::BAD_GATEWAY)
}

/// Replay a captured response: status, headers in order, and body verbatim
pub fn into_http_response(cached: CachedResponse) -> Response {
    let mut response = Response::new(axum::body::Body::from(cached.body));
    *response.status_mut() = cached.status;
    let headers = response.headers_mut();
    for (name, value) in cached.headers.into_vec() {
        headers.append(name, value);
    }
    response
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
        };
        into_http_response(
            ErrorResponse::new(BAD_REQUEST_CODE, self.to_string()).into_cached_response(status),
        )
    }
}
