//! Fingerprints must be stable, blind to non allow-listed headers and usable
//! as file names for any request the proxy can receive.

use fixture_proxy::proxy::fingerprint::{CacheKey, RequestFingerprinter};
use fixture_proxy::proxy::graphql::{GraphqlOperationExtractor, GraphqlOperationName};
use fixture_proxy::proxy::types::{AllowedHeaderName, GraphqlPathPrefix};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use proptest::prelude::*;

pub mod generators {
    use super::*;
    use proptest::collection::vec;
    use proptest::string::string_regex;

    pub fn method() -> impl Strategy<Value = Method> {
        prop_oneof![
            Just(Method::GET),
            Just(Method::POST),
            Just(Method::PUT),
            Just(Method::PATCH),
            Just(Method::DELETE),
            Just(Method::OPTIONS),
        ]
    }

    /// Origin-form request targets
    pub fn url() -> impl Strategy<Value = String> {
        string_regex(r"/[a-zA-Z0-9/_.-]{0,40}(\?[a-z0-9=&]{0,20})?").unwrap()
    }

    pub fn header_value() -> impl Strategy<Value = HeaderValue> {
        string_regex("[a-zA-Z0-9=;:._-]{0,30}")
            .unwrap()
            .prop_map(|s| HeaderValue::from_str(&s).unwrap())
    }

    /// Header names that never collide with the `session` allow-list entry
    pub fn noise_header_name() -> impl Strategy<Value = HeaderName> {
        string_regex("x-[a-z]{1,12}")
            .unwrap()
            .prop_map(|s| HeaderName::from_bytes(s.as_bytes()).unwrap())
    }

    pub fn noise_headers() -> impl Strategy<Value = Vec<(HeaderName, HeaderValue)>> {
        vec((noise_header_name(), header_value()), 0..8)
    }

    pub fn body() -> impl Strategy<Value = Vec<u8>> {
        vec(any::<u8>(), 0..512)
    }

    pub fn operation_name() -> impl Strategy<Value = String> {
        string_regex("[A-Za-z_][A-Za-z0-9_]{0,30}").unwrap()
    }
}

fn session_fingerprinter() -> RequestFingerprinter {
    RequestFingerprinter::new([AllowedHeaderName::try_new("session").unwrap()])
}

fn header_map(headers: &[(HeaderName, HeaderValue)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(name.clone(), value.clone());
    }
    map
}

proptest! {
    #[test]
    fn fingerprint_is_deterministic(
        method in generators::method(),
        url in generators::url(),
        session in generators::header_value(),
        body in generators::body(),
    ) {
        let fingerprinter = session_fingerprinter();
        let mut headers = HeaderMap::new();
        headers.insert("session", session);

        let first = fingerprinter.fingerprint(&method, &url, &headers, &body);
        let second = fingerprinter.fingerprint(&method, &url, &headers.clone(), &body.clone());

        prop_assert_eq!(first, second);
    }

    #[test]
    fn non_allow_listed_headers_never_change_the_fingerprint(
        method in generators::method(),
        url in generators::url(),
        noise in generators::noise_headers(),
        body in generators::body(),
    ) {
        let fingerprinter = session_fingerprinter();

        let bare = fingerprinter.fingerprint(&method, &url, &HeaderMap::new(), &body);
        let noisy = fingerprinter.fingerprint(&method, &url, &header_map(&noise), &body);

        prop_assert_eq!(bare, noisy);
    }

    #[test]
    fn header_insertion_order_is_irrelevant(
        url in generators::url(),
        session in generators::header_value(),
        noise in generators::noise_headers(),
    ) {
        let fingerprinter = session_fingerprinter();
        let mut forward = noise.clone();
        forward.push((HeaderName::from_static("session"), session.clone()));
        let mut backward = noise;
        backward.reverse();
        backward.insert(0, (HeaderName::from_static("session"), session));

        let a = fingerprinter.fingerprint(&Method::GET, &url, &header_map(&forward), b"");
        let b = fingerprinter.fingerprint(&Method::GET, &url, &header_map(&backward), b"");

        prop_assert_eq!(a, b);
    }

    #[test]
    fn differing_bodies_produce_differing_fingerprints(
        url in generators::url(),
        body in generators::body(),
        extra in any::<u8>(),
    ) {
        let fingerprinter = session_fingerprinter();
        let mut longer = body.clone();
        longer.push(extra);

        let a = fingerprinter.fingerprint(&Method::POST, &url, &HeaderMap::new(), &body);
        let b = fingerprinter.fingerprint(&Method::POST, &url, &HeaderMap::new(), &longer);

        prop_assert_ne!(a, b);
    }

    #[test]
    fn cache_file_names_are_filesystem_safe(
        method in generators::method(),
        url in generators::url(),
        body in generators::body(),
        operation in proptest::option::of(generators::operation_name()),
    ) {
        let fingerprint = session_fingerprinter().fingerprint(&method, &url, &HeaderMap::new(), &body);
        let operation = operation.map(|name| GraphqlOperationName::try_new(name).unwrap());
        let file_name = CacheKey::new(operation.clone(), fingerprint.clone()).file_name();

        prop_assert!(!file_name.contains('/'));
        prop_assert!(!file_name.contains('\\'));
        prop_assert!(file_name.ends_with(fingerprint.as_ref()));
        if let Some(operation) = operation {
            let prefix = format!("{operation}_");
            prop_assert!(file_name.starts_with(&prefix));
        }
    }

    #[test]
    fn extracted_operation_names_round_trip(name in generators::operation_name()) {
        let extractor = GraphqlOperationExtractor::new(GraphqlPathPrefix::try_new("/graphql").unwrap());
        let body = serde_json::json!({ "query": "{ a }", "operationName": name }).to_string();

        let extracted = extractor.extract("/graphql", body.as_bytes());

        prop_assert_eq!(extracted.map(|op| op.as_ref().to_string()), Some(name));
    }

    #[test]
    fn arbitrary_bodies_never_panic_the_extractor(body in generators::body()) {
        let extractor = GraphqlOperationExtractor::new(GraphqlPathPrefix::try_new("/graphql").unwrap());
        let _ = extractor.extract("/graphql", &body);
    }
}
