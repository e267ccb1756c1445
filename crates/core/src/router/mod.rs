//! Fallback routing of conversion requests.
//!
//! The router resolves a request's capability chain, executes it in
//! order with per-attempt deadlines, discards partial results between
//! attempts, and finalizes the job. Pool workers are checked out only
//! for the capabilities that need one.

mod config;
mod error;
mod runner;

pub use config::RouterConfig;
pub use error::RouterError;
pub use runner::FallbackRouter;
