//! HTTP header constants for the proxy service

/// Header allow-listed for fingerprinting by default
pub const SESSION: &str = "session";

/// Standard header re-exports for convenience
pub use ::http::header::CONTENT_TYPE;

/// Content types used by responses the proxy builds itself
pub mod content_types {
    pub const JSON: &str = "application/json";
}
