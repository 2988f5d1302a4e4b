//! Property-based tests for fingerprinting and cache key invariants

pub mod fingerprint_invariants;
