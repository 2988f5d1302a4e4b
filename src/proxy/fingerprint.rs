//! Deterministic request fingerprints and the cache keys built from them
//!
//! A fingerprint digests the method, the URL (path and query), the values of
//! the allow-listed headers and the raw body. Nothing else about a request
//! influences it, so volatile headers such as timestamps or auth tokens never
//! break replay. The digest is SHA-256 rendered as unpadded URL-safe base64,
//! which makes it usable directly as a file name.

use crate::proxy::graphql::GraphqlOperationName;
use crate::proxy::types::AllowedHeaderName;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::{HeaderMap, Method};
use nutype::nutype;
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between allow-listed header values
const HEADER_VALUE_SEPARATOR: &[u8] = b"\n";

/// Separator between repeated values of one header
const REPEATED_VALUE_SEPARATOR: &[u8] = b", ";

/// Opaque digest identifying a request
#[nutype(derive(Clone, Debug, Display, PartialEq, Eq, Hash, AsRef))]
pub struct RequestFingerprint(String);

/// Computes fingerprints over a fixed header allow-list
#[derive(Clone, Debug)]
pub struct RequestFingerprinter {
    allowed_headers: Vec<AllowedHeaderName>,
}

impl RequestFingerprinter {
    /// The allow-list is sorted and deduplicated once so header order never matters
    pub fn new(allowed_headers: impl IntoIterator<Item = AllowedHeaderName>) -> Self {
        let mut allowed_headers: Vec<_> = allowed_headers.into_iter().collect();
        allowed_headers.sort();
        allowed_headers.dedup();
        Self { allowed_headers }
    }

    pub fn allowed_headers(&self) -> &[AllowedHeaderName] {
        &self.allowed_headers
    }

    pub fn fingerprint(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> RequestFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(url.as_bytes());
        hasher.update(self.joined_header_values(headers));
        hasher.update(body);

        RequestFingerprint::new(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Allow-listed values in name order; an absent header leaves an empty segment
    fn joined_header_values(&self, headers: &HeaderMap) -> Vec<u8> {
        let mut joined = Vec::new();
        for (index, name) in self.allowed_headers.iter().enumerate() {
            if index > 0 {
                joined.extend_from_slice(HEADER_VALUE_SEPARATOR);
            }
            for (position, value) in headers.get_all(name.as_ref()).iter().enumerate() {
                if position > 0 {
                    joined.extend_from_slice(REPEATED_VALUE_SEPARATOR);
                }
                joined.extend_from_slice(value.as_bytes());
            }
        }
        joined
    }
}

/// Cache key: optional GraphQL operation name plus the request fingerprint
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: Option<GraphqlOperationName>,
    fingerprint: RequestFingerprint,
}

impl CacheKey {
    pub fn new(operation: Option<GraphqlOperationName>, fingerprint: RequestFingerprint) -> Self {
        Self {
            operation,
            fingerprint,
        }
    }

    pub fn operation(&self) -> Option<&GraphqlOperationName> {
        self.operation.as_ref()
    }

    pub fn fingerprint(&self) -> &RequestFingerprint {
        &self.fingerprint
    }

    /// `<operationName>_<fingerprint>`, or just `<fingerprint>`
    pub fn file_name(&self) -> String {
        match &self.operation {
            Some(operation) => format!("{operation}_{}", self.fingerprint),
            None => self.fingerprint.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use rstest::rstest;

    fn session_fingerprinter() -> RequestFingerprinter {
        RequestFingerprinter::new([AllowedHeaderName::try_new("session").unwrap()])
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn fingerprint_is_stable_across_calls() {
        let fingerprinter = session_fingerprinter();
        let h = headers(&[("session", "abc")]);

        let first = fingerprinter.fingerprint(&Method::POST, "/graphql", &h, b"{}");
        let second = fingerprinter.fingerprint(&Method::POST, "/graphql", &h, b"{}");

        assert_eq!(first, second);
    }

    #[test]
    fn fingerprint_matches_pinned_digest() {
        // "GET" + "/items" + "" + "" hashed with SHA-256, URL-safe base64
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(b"GET/items"));

        let fingerprint =
            session_fingerprinter().fingerprint(&Method::GET, "/items", &HeaderMap::new(), b"");

        assert_eq!(fingerprint.as_ref(), expected.as_str());
    }

    #[test]
    fn fingerprint_is_filesystem_safe() {
        let fingerprinter = session_fingerprinter();
        for body in ["a", "bb", "ccc", "\u{ff}\u{fe}", "{\"query\":\"{a}\"}"] {
            let fingerprint =
                fingerprinter.fingerprint(&Method::POST, "/x?y=z", &HeaderMap::new(), body.as_bytes());
            let text = fingerprint.as_ref();
            assert!(!text.contains('/'));
            assert!(!text.contains('+'));
            assert!(!text.contains('='));
        }
    }

    #[test]
    fn headers_outside_allow_list_are_ignored() {
        let fingerprinter = session_fingerprinter();
        let plain = headers(&[("session", "s1")]);
        let noisy = headers(&[
            ("session", "s1"),
            ("date", "Tue, 01 Jan 2030 00:00:00 GMT"),
            ("authorization", "Bearer token"),
        ]);

        assert_eq!(
            fingerprinter.fingerprint(&Method::GET, "/a", &plain, b""),
            fingerprinter.fingerprint(&Method::GET, "/a", &noisy, b"")
        );
    }

    #[test]
    fn allow_listed_header_changes_fingerprint() {
        let fingerprinter = session_fingerprinter();

        assert_ne!(
            fingerprinter.fingerprint(&Method::GET, "/a", &headers(&[("session", "s1")]), b""),
            fingerprinter.fingerprint(&Method::GET, "/a", &headers(&[("session", "s2")]), b"")
        );
    }

    #[test]
    fn allow_list_order_does_not_matter() {
        let forward = RequestFingerprinter::new([
            AllowedHeaderName::try_new("session").unwrap(),
            AllowedHeaderName::try_new("x-tenant").unwrap(),
        ]);
        let reversed = RequestFingerprinter::new([
            AllowedHeaderName::try_new("X-Tenant").unwrap(),
            AllowedHeaderName::try_new("session").unwrap(),
        ]);
        let h = headers(&[("x-tenant", "t"), ("session", "s")]);

        assert_eq!(
            forward.fingerprint(&Method::GET, "/", &h, b""),
            reversed.fingerprint(&Method::GET, "/", &h, b"")
        );
    }

    #[test]
    fn missing_header_leaves_empty_segment() {
        let fingerprinter = RequestFingerprinter::new([
            AllowedHeaderName::try_new("a").unwrap(),
            AllowedHeaderName::try_new("b").unwrap(),
        ]);
        // Only "b" present: the joined value is "\nvalue", not "value"
        let only_b = headers(&[("b", "value")]);
        let only_a = headers(&[("a", "value")]);

        assert_ne!(
            fingerprinter.fingerprint(&Method::GET, "/", &only_a, b""),
            fingerprinter.fingerprint(&Method::GET, "/", &only_b, b"")
        );
    }

    #[rstest]
    #[case(Method::GET, "/items", "")]
    #[case(Method::POST, "/items", "")]
    #[case(Method::GET, "/items?page=2", "")]
    #[case(Method::GET, "/items", "body")]
    fn each_input_influences_fingerprint(
        #[case] method: Method,
        #[case] url: &str,
        #[case] body: &str,
    ) {
        let fingerprinter = session_fingerprinter();
        let baseline = fingerprinter.fingerprint(&Method::GET, "/items", &HeaderMap::new(), b"");
        let candidate = fingerprinter.fingerprint(&method, url, &HeaderMap::new(), body.as_bytes());

        if method == Method::GET && url == "/items" && body.is_empty() {
            assert_eq!(baseline, candidate);
        } else {
            assert_ne!(baseline, candidate);
        }
    }

    #[test]
    fn cache_key_file_name_with_operation() {
        let fingerprint = RequestFingerprint::new("abc".to_string());
        let key = CacheKey::new(
            Some(GraphqlOperationName::try_new("GetA").unwrap()),
            fingerprint,
        );
        assert_eq!(key.file_name(), "GetA_abc");
        assert_eq!(key.to_string(), "GetA_abc");
    }

    #[test]
    fn cache_key_file_name_without_operation() {
        let key = CacheKey::new(None, RequestFingerprint::new("abc".to_string()));
        assert_eq!(key.file_name(), "abc");
    }
}
