//! Replay-or-forward decision per request
//!
//! ```text
//! compute key ──┬── skip-cache ───────────────┐
//!               └── lookup ── hit ──► respond │
//!                         └── miss ──► forward ◄┘
//!                                       ├── ok ──► persist ──► respond
//!                                       └── err ─► synthesize 502 ──► respond
//! ```
//!
//! Each request makes at most one forwarding attempt. Synthesized errors are
//! never persisted, and a failed write does not stop the forwarded response
//! from reaching the client.

use crate::proxy::cache_store::CacheStore;
use crate::proxy::error_response::bad_gateway;
use crate::proxy::fingerprint::{CacheKey, RequestFingerprinter};
use crate::proxy::forwarder::Forwarder;
use crate::proxy::graphql::GraphqlOperationExtractor;
use crate::proxy::types::{CacheStatus, CachedResponse, InboundRequest, ProxyConfig};
use std::sync::Arc;
use tracing::{error, warn};

/// Result of handling one request
#[derive(Clone, Debug)]
pub struct Outcome {
    pub key: CacheKey,
    pub status: CacheStatus,
    pub response: CachedResponse,
}

/// Orchestrates fingerprinting, the cache store and the forwarder
pub struct ProxyDecisionEngine {
    config: Arc<ProxyConfig>,
    fingerprinter: RequestFingerprinter,
    operations: GraphqlOperationExtractor,
    store: CacheStore,
    forwarder: Arc<dyn Forwarder>,
}

impl ProxyDecisionEngine {
    pub fn new(config: ProxyConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        let fingerprinter = RequestFingerprinter::new(config.allowed_headers.iter().cloned());
        let operations = GraphqlOperationExtractor::new(config.graphql_path.clone());
        let store = CacheStore::new(config.cache_dir.clone());

        Self {
            config: Arc::new(config),
            fingerprinter,
            operations,
            store,
            forwarder,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn cache_key(&self, request: &InboundRequest) -> CacheKey {
        let fingerprint = self.fingerprinter.fingerprint(
            &request.method,
            request.url(),
            &request.headers,
            &request.body,
        );
        let operation = self.operations.extract(request.path(), &request.body);
        CacheKey::new(operation, fingerprint)
    }

    pub async fn handle(&self, request: InboundRequest) -> Outcome {
        let key = self.cache_key(&request);

        let forwarded_status = if self.config.skip_cache {
            CacheStatus::Bypass
        } else if let Some(response) = self.store.get(&key).await {
            return Outcome {
                key,
                status: CacheStatus::Hit,
                response,
            };
        } else {
            CacheStatus::Miss
        };

        match self.forwarder.forward(&request).await {
            Ok(response) => {
                if let Err(e) = self.store.put(&key, &response).await {
                    error!(%key, error = %e, "Failed to persist forwarded response");
                }
                Outcome {
                    key,
                    status: forwarded_status,
                    response,
                }
            }
            Err(e) => {
                warn!(%key, error = %e, "Upstream unreachable");
                let response = bad_gateway(
                    self.config.upstream_port,
                    &request.method,
                    request.url(),
                    key.operation(),
                );
                Outcome {
                    key,
                    status: CacheStatus::Unreachable,
                    response,
                }
            }
        }
    }
}
