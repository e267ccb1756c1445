//! Conversion jobs and their tracker.
//!
//! Every accepted request becomes a job. Jobs move through a
//! forward-only state machine and keep the full failure history of
//! their conversion attempts for the API to report.

mod error;
mod tracker;
mod types;

pub use error::JobError;
pub use tracker::JobTracker;
pub use types::{AttemptFailure, ConversionRequest, Job, JobFilter, JobId, JobState};
