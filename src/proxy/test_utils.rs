//! Test utilities for proxy module testing
//!
//! This module provides a scripted forwarder, request builders and a mock
//! upstream server so proxy components can be exercised without a real
//! backend.
