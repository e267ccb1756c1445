//! Bounded pool of long-lived external-engine worker processes.
//!
//! The office engine is expensive, crashable and stateful, so it runs
//! behind a fixed set of worker slots with checkout/release semantics,
//! crash detection, generation counters and rate-limited respawn. See
//! [`ProcessPoolManager`] for the contract.

mod config;
mod engine;
mod error;
mod manager;
mod types;

pub use config::PoolConfig;
pub use engine::{Engine, SofficeEngine, WorkerInstance};
pub use error::PoolError;
pub use manager::{PoolWorker, ProcessPoolManager};
pub use types::{PoolHealth, PoolStatus, WorkerOutcome, WorkerState};
