//! HTTP server for the document conversion service.
//!
//! The binary lives in `main.rs`; the router, handlers and state are
//! exposed here so integration tests can drive the API in-process.

pub mod api;
pub mod metrics;
pub mod state;
