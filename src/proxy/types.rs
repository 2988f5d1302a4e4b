//! Type definitions for the proxy module

use crate::proxy::headers::SESSION;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use nutype::nutype;
use std::path::PathBuf;
use thiserror::Error;

// ========== Configuration Types ==========

/// Port the proxy listens on
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |port: &u16| *port > 0),
)]
pub struct ListenPort(u16);

/// Loopback port of the real backend
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |port: &u16| *port > 0),
)]
pub struct UpstreamPort(u16);

/// Request header whose value takes part in the fingerprint
#[nutype(
    sanitize(trim, lowercase),
    validate(predicate = |name: &str| !name.is_empty() && HeaderName::from_bytes(name.as_bytes()).is_ok()),
    derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, TryFrom, AsRef),
)]
pub struct AllowedHeaderName(String);

/// Path prefix identifying GraphQL requests
#[nutype(
    sanitize(trim),
    validate(predicate = |prefix: &str| prefix.starts_with('/')),
    derive(Clone, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
)]
pub struct GraphqlPathPrefix(String);

// ========== Constants ==========

/// Header allow-listed for fingerprinting when nothing else is configured
pub const DEFAULT_FINGERPRINT_HEADER: &str = SESSION;

/// Default GraphQL endpoint prefix
pub const DEFAULT_GRAPHQL_PATH: &str = "/graphql";

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".fixtures";

/// Default upstream port
pub const DEFAULT_UPSTREAM_PORT: u16 = 3000;

/// Default path when a request URI carries none
pub const DEFAULT_PATH: &str = "/";

/// Core proxy configuration, built once at startup
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Loopback port of the backend being recorded
    pub upstream_port: UpstreamPort,
    /// Always forward and overwrite, never replay
    pub skip_cache: bool,
    /// Directory holding one record per cache key
    pub cache_dir: PathBuf,
    /// Headers whose values are folded into the fingerprint
    pub allowed_headers: Vec<AllowedHeaderName>,
    /// Requests under this path are inspected for an `operationName`
    pub graphql_path: GraphqlPathPrefix,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_port: UpstreamPort::try_new(DEFAULT_UPSTREAM_PORT)
                .expect("default upstream port is non-zero"),
            skip_cache: false,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            allowed_headers: vec![AllowedHeaderName::try_new(SESSION)
                .expect("default fingerprint header is a valid header name")],
            graphql_path: GraphqlPathPrefix::try_new(DEFAULT_GRAPHQL_PATH)
                .expect("default GraphQL path starts with '/'"),
        }
    }
}

// ========== HTTP Types ==========

/// Ordered header list; duplicate names are kept as separate entries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(HeaderName, HeaderValue)>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.push((name, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All values recorded under `name`, in order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Copy a header map; values sharing a name stay adjacent in arrival order
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        Self(
            headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn into_vec(self) -> Vec<(HeaderName, HeaderValue)> {
        self.0
    }
}

impl From<Vec<(HeaderName, HeaderValue)>> for HeaderList {
    fn from(headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self(headers)
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A backend reply captured in full, as stored on disk and replayed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderList,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderList, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// An inbound request whose body has been read completely
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
        }
    }

    /// Path plus query, exactly as the client sent it
    pub fn url(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(DEFAULT_PATH)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

/// How a request was answered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// Replayed from disk without contacting the backend
    Hit,
    /// Forwarded because no usable record existed
    Miss,
    /// Forwarded because skip-cache mode is on
    Bypass,
    /// Forwarding failed; a synthesized 502 was returned
    Unreachable,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
            Self::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the proxy's HTTP layer
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Failed to read request body: {0}")]
    RequestBody(String),
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
