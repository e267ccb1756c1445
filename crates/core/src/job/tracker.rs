//! In-memory job tracker.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use super::error::JobError;
use super::types::{AttemptFailure, ConversionRequest, Job, JobFilter, JobId, JobState};

struct Entry {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// Tracks every conversion job from acceptance to its terminal state.
///
/// State changes go through [`transition`](JobTracker::transition),
/// which enforces the forward-only state machine. Each job carries a
/// watch channel used to signal cancellation to the router; the tracker
/// itself never races half-written jobs because the map lock covers
/// every read and write.
pub struct JobTracker {
    inner: RwLock<HashMap<JobId, Entry>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Accepts a request and registers a Queued job for it.
    pub fn create(&self, request: ConversionRequest) -> Job {
        let now = Utc::now();
        let job = Job {
            id: JobId::generate(),
            request,
            state: JobState::Queued,
            failure_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let (cancel_tx, _) = watch::channel(false);
        debug!(job_id = %job.id, source = %job.request.source, target = %job.request.target, "job created");

        let mut inner = self.inner.write().expect("job tracker lock poisoned");
        inner.insert(
            job.id.clone(),
            Entry {
                job: job.clone(),
                cancel_tx,
            },
        );
        job
    }

    pub fn get(&self, id: &JobId) -> Result<Job, JobError> {
        let inner = self.inner.read().expect("job tracker lock poisoned");
        inner
            .get(id)
            .map(|e| e.job.clone())
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Jobs matching the filter, newest first.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let inner = self.inner.read().expect("job tracker lock poisoned");
        let mut jobs: Vec<Job> = inner
            .values()
            .map(|e| e.job.clone())
            .filter(|job| {
                filter
                    .state
                    .as_deref()
                    .is_none_or(|s| job.state.state_type() == s)
            })
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if filter.limit > 0 {
            jobs.truncate(filter.limit);
        }
        jobs
    }

    /// Moves a job to a new state, rejecting backwards transitions.
    pub fn transition(&self, id: &JobId, new_state: JobState) -> Result<Job, JobError> {
        let mut inner = self.inner.write().expect("job tracker lock poisoned");
        let entry = inner.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        if !entry.job.state.can_transition_to(&new_state) {
            return Err(JobError::IllegalTransition {
                id: id.clone(),
                from: entry.job.state.state_type(),
                to: new_state.state_type(),
            });
        }
        debug!(job_id = %id, from = entry.job.state.state_type(), to = new_state.state_type(), "job transition");
        entry.job.state = new_state;
        entry.job.updated_at = Utc::now();
        Ok(entry.job.clone())
    }

    /// Appends one attempt failure to the job's history.
    pub fn record_failure(&self, id: &JobId, failure: AttemptFailure) -> Result<(), JobError> {
        let mut inner = self.inner.write().expect("job tracker lock poisoned");
        let entry = inner.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        entry.job.failure_history.push(failure);
        entry.job.updated_at = Utc::now();
        Ok(())
    }

    /// Requests cancellation.
    ///
    /// Queued jobs finalize immediately. Running jobs get the flag
    /// raised and finalize when the router observes it; the returned
    /// job still shows the pre-cancellation state in that case.
    /// Terminal jobs reject the request.
    pub fn cancel(&self, id: &JobId) -> Result<Job, JobError> {
        let mut inner = self.inner.write().expect("job tracker lock poisoned");
        let entry = inner.get_mut(id).ok_or_else(|| JobError::NotFound(id.clone()))?;
        match &entry.job.state {
            JobState::Queued => {
                entry.job.state = JobState::Cancelled {
                    cancelled_at: Utc::now(),
                };
                entry.job.updated_at = Utc::now();
                info!(job_id = %id, "queued job cancelled");
            }
            JobState::Running { .. } => {
                let _ = entry.cancel_tx.send(true);
                info!(job_id = %id, "cancellation requested for running job");
            }
            state => {
                return Err(JobError::IllegalTransition {
                    id: id.clone(),
                    from: state.state_type(),
                    to: "cancelled",
                })
            }
        }
        Ok(entry.job.clone())
    }

    /// Receiver side of the job's cancellation flag.
    pub fn cancel_signal(&self, id: &JobId) -> Result<watch::Receiver<bool>, JobError> {
        let inner = self.inner.read().expect("job tracker lock poisoned");
        inner
            .get(id)
            .map(|e| e.cancel_tx.subscribe())
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("job tracker lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
