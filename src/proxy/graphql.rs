//! GraphQL operation name extraction
//!
//! Requests under the configured GraphQL path are namespaced by their
//! `operationName` so that distinct operations never share a cache record.

use crate::proxy::types::GraphqlPathPrefix;
use nutype::nutype;
use serde::Deserialize;
use tracing::debug;

/// Operation name usable as a file name prefix
#[nutype(
    validate(predicate = |name: &str| {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
    }),
    derive(Clone, Debug, Display, PartialEq, Eq, Hash, TryFrom, AsRef),
)]
pub struct GraphqlOperationName(String);

#[derive(Deserialize)]
struct OperationEnvelope {
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
}

/// Reads `operationName` from bodies posted under a GraphQL path prefix
#[derive(Clone, Debug)]
pub struct GraphqlOperationExtractor {
    path_prefix: GraphqlPathPrefix,
}

impl GraphqlOperationExtractor {
    pub fn new(path_prefix: GraphqlPathPrefix) -> Self {
        Self { path_prefix }
    }

    /// Returns `None` for other paths without looking at the body. A body that
    /// is not a JSON object with a string `operationName` also yields `None`.
    pub fn extract(&self, path: &str, body: &[u8]) -> Option<GraphqlOperationName> {
        if !path.starts_with(self.path_prefix.as_ref()) {
            return None;
        }

        let envelope = match serde_json::from_slice::<OperationEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(path, error = %e, "GraphQL body has no readable operationName");
                return None;
            }
        };

        let name = envelope.operation_name?;
        match GraphqlOperationName::try_new(name) {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(path, error = %e, "Ignoring operationName unusable as a file name");
                None
            }
        }
    }
}
