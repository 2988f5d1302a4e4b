//! Caching reverse proxy
//!
//! Requests are fingerprinted, answered from the on-disk fixture cache when
//! a record exists, and otherwise forwarded to the upstream and recorded:
//! - Fingerprint + GraphQL operation name form the cache key
//! - Records live one file per key under the cache directory
//! - An unreachable upstream yields a synthesized 502 that is never recorded

pub mod cache_store;
pub mod codec;
pub mod engine;
pub mod error_response;
pub mod fingerprint;
pub mod forwarder;
pub mod graphql;
pub mod headers;
pub mod service;
pub mod test_utils;
pub mod types;



pub use engine::{Outcome, ProxyDecisionEngine};
pub use service::ProxyService;
pub use types::{ProxyConfig, ProxyError, ProxyResult};
