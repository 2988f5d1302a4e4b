//! Application wiring
//!
//! Turns validated settings into a running proxy server.

pub mod app;

pub use app::Application;
