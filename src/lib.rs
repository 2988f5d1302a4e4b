//! Fixture Proxy - a record-and-replay HTTP proxy for local development
//!
//! Every request is fingerprinted and answered from an on-disk fixture when
//! one exists; otherwise it is forwarded to a backend on the loopback
//! interface and the response is recorded for later replays.

pub mod application;
pub mod config;
pub mod error;
pub mod proxy;

pub use application::Application;
pub use config::{CommandLine, Settings};
pub use error::{Error, Result};
