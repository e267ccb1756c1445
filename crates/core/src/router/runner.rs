//! The fallback router: chain-ordered conversion execution.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::artifact::{Artifact, ArtifactId, ArtifactStore};
use crate::capability::{CapabilityError, CapabilityId, InvokeContext};
use crate::format::{ConversionChain, FormatRegistry};
use crate::job::{AttemptFailure, ConversionRequest, Job, JobId, JobState, JobTracker};
use crate::metrics;
use crate::pool::{PoolError, ProcessPoolManager, WorkerOutcome};

use super::config::RouterConfig;
use super::error::RouterError;

/// Drives accepted conversion requests through their capability chain.
///
/// Attempts run strictly in chain order, never in parallel. Each
/// attempt gets a fresh output path and scratch directory; a failed
/// attempt discards both before the next capability runs, so a partial
/// write can never leak into a later attempt or a download. Worker
/// checkout happens only for capabilities that declare the need.
pub struct FallbackRouter {
    registry: Arc<FormatRegistry>,
    store: Arc<ArtifactStore>,
    pool: Arc<ProcessPoolManager>,
    tracker: Arc<JobTracker>,
    config: RouterConfig,
}

impl FallbackRouter {
    pub fn new(
        registry: Arc<FormatRegistry>,
        store: Arc<ArtifactStore>,
        pool: Arc<ProcessPoolManager>,
        tracker: Arc<JobTracker>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            store,
            pool,
            tracker,
            config,
        }
    }

    /// Validates and registers a request. Unsupported pairs are
    /// rejected here, before any job or artifact exists.
    fn accept(&self, request: ConversionRequest) -> Result<Job, RouterError> {
        if !self.registry.is_supported(request.source, request.target) {
            return Err(RouterError::NotSupported {
                source: request.source,
                target: request.target,
            });
        }
        Ok(self.tracker.create(request))
    }

    /// Accepts a request and runs it in a background task.
    pub fn submit(self: &Arc<Self>, request: ConversionRequest) -> Result<Job, RouterError> {
        let job = self.accept(request)?;
        let router = Arc::clone(self);
        let id = job.id.clone();
        tokio::spawn(async move {
            router.run(id).await;
        });
        Ok(job)
    }

    /// Accepts a request, runs it to completion, and returns the
    /// terminal job.
    pub async fn execute(self: &Arc<Self>, request: ConversionRequest) -> Result<Job, RouterError> {
        let job = self.accept(request)?;
        self.run(job.id.clone()).await;
        Ok(self.tracker.get(&job.id)?)
    }

    /// Runs one job to a terminal state.
    async fn run(&self, id: JobId) {
        let job = match self.tracker.get(&id) {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = %id, "job vanished before execution: {}", e);
                return;
            }
        };
        if job.state.is_terminal() {
            // Cancelled while still queued.
            return;
        }
        let request = job.request;

        // Supported at accept time, and the registry never changes.
        let chain = match self.registry.resolve_chain(request.source, request.target) {
            Some(chain) => chain.clone(),
            None => {
                self.finalize(&id, Err(RouterError::NotSupported {
                    source: request.source,
                    target: request.target,
                }));
                return;
            }
        };

        let input = match self.store.get(&request.input) {
            Some(artifact) if !artifact.is_expired(Utc::now()) => artifact,
            _ => {
                self.finalize(&id, Err(RouterError::Artifact(
                    crate::artifact::ArtifactError::NotFound(request.input.clone()),
                )));
                return;
            }
        };

        // The input must survive sweeps for as long as the job runs.
        self.store.pin(&input.id);
        let result = self.run_chain(&id, &request, &chain, &input).await;
        self.store.unpin(&input.id);
        self.finalize(&id, result);
    }

    async fn run_chain(
        &self,
        id: &JobId,
        request: &ConversionRequest,
        chain: &ConversionChain,
        input: &Artifact,
    ) -> Result<(CapabilityId, ArtifactId), RouterError> {
        let mut cancel_rx = self.tracker.cancel_signal(id)?;

        for (idx, entry) in chain.entries.iter().enumerate() {
            if *cancel_rx.borrow() {
                return Err(RouterError::Cancelled);
            }
            if idx > 0 {
                metrics::CONVERSION_FALLBACKS.inc();
            }
            let capability = Arc::clone(&entry.capability);
            let capability_id = capability.id();
            self.tracker.transition(
                id,
                JobState::Running {
                    capability: capability_id,
                    attempt: idx + 1,
                    started_at: Utc::now(),
                },
            )?;

            let output = self.store.allocate_output(request.target.extension());
            self.store.pin(&output.id);
            let scratch = match self.store.allocate_scratch().await {
                Ok(scratch) => scratch,
                Err(e) => {
                    self.discard(&output.id).await;
                    return Err(e.into());
                }
            };

            let worker = if capability.requires_worker() {
                match self.pool.checkout(self.pool.checkout_timeout()).await {
                    Ok(worker) => Some(worker),
                    Err(e) => {
                        self.discard(&output.id).await;
                        let _ = self.store.remove(&scratch.id).await;
                        match e {
                            PoolError::QueueFull { .. } => return Err(RouterError::QueueFull),
                            PoolError::Unhealthy { reason } => {
                                return Err(RouterError::PoolUnhealthy { reason })
                            }
                            PoolError::Draining => {
                                return Err(RouterError::PoolUnhealthy {
                                    reason: "pool is draining".to_string(),
                                })
                            }
                            // A checkout timeout is one failed attempt;
                            // the next capability may not need a worker.
                            other => {
                                self.record_failure(id, capability_id, &other.to_string());
                                continue;
                            }
                        }
                    }
                }
            } else {
                None
            };

            debug!(
                job_id = %id,
                capability = %capability_id,
                attempt = idx + 1,
                "invoking capability"
            );
            let ctx = InvokeContext {
                source: request.source,
                target: request.target,
                input,
                output: &output,
                options: &request.options,
                scratch_dir: &scratch.path,
                deadline: self.config.timeout_for(capability_id),
                worker: worker.as_ref(),
            };
            let started = Instant::now();
            let result = tokio::select! {
                result = capability.invoke(ctx) => result,
                _ = cancel_requested(&mut cancel_rx) => Err(CapabilityError::Cancelled),
            };
            metrics::CONVERSION_DURATION
                .with_label_values(&[capability_id.as_str()])
                .observe(started.elapsed().as_secs_f64());

            if let Some(worker) = worker {
                // A crashed or abandoned engine call poisons the worker.
                let outcome = match &result {
                    Err(e) if e.is_worker_crash() => WorkerOutcome::Crashed,
                    _ => WorkerOutcome::Completed,
                };
                self.pool.release(worker, outcome).await;
            }
            let _ = self.store.remove(&scratch.id).await;

            match result {
                Ok(()) => {
                    metrics::CONVERSION_ATTEMPTS
                        .with_label_values(&[capability_id.as_str(), "success"])
                        .inc();
                    self.store.unpin(&output.id);
                    return Ok((capability_id, output.id));
                }
                Err(CapabilityError::Cancelled) => {
                    metrics::CONVERSION_ATTEMPTS
                        .with_label_values(&[capability_id.as_str(), "cancelled"])
                        .inc();
                    self.discard(&output.id).await;
                    return Err(RouterError::Cancelled);
                }
                Err(e) => {
                    metrics::CONVERSION_ATTEMPTS
                        .with_label_values(&[capability_id.as_str(), "failed"])
                        .inc();
                    warn!(job_id = %id, capability = %capability_id, "attempt failed: {}", e);
                    self.discard(&output.id).await;
                    self.record_failure(id, capability_id, &e.to_string());
                }
            }
        }

        Err(RouterError::ChainExhausted {
            attempts: chain.entries.len(),
        })
    }

    async fn discard(&self, output: &ArtifactId) {
        self.store.unpin(output);
        let _ = self.store.remove(output).await;
    }

    fn record_failure(&self, id: &JobId, capability: CapabilityId, error: &str) {
        let _ = self.tracker.record_failure(
            id,
            AttemptFailure {
                capability,
                error: error.to_string(),
                failed_at: Utc::now(),
            },
        );
    }

    fn finalize(&self, id: &JobId, result: Result<(CapabilityId, ArtifactId), RouterError>) {
        let (state, label) = match result {
            Ok((capability, output)) => {
                info!(job_id = %id, capability = %capability, output = %output, "conversion succeeded");
                (
                    JobState::Succeeded {
                        capability,
                        output,
                        completed_at: Utc::now(),
                    },
                    "succeeded",
                )
            }
            Err(RouterError::Cancelled) => {
                info!(job_id = %id, "job cancelled");
                (
                    JobState::Cancelled {
                        cancelled_at: Utc::now(),
                    },
                    "cancelled",
                )
            }
            Err(e) => {
                warn!(job_id = %id, "job failed: {}", e);
                (
                    JobState::Failed {
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    },
                    "failed",
                )
            }
        };
        match self.tracker.transition(id, state) {
            Ok(_) => metrics::JOBS_COMPLETED.with_label_values(&[label]).inc(),
            // Lost a race with a queued-cancel; the job is already terminal.
            Err(e) => debug!(job_id = %id, "finalize skipped: {}", e),
        }
    }
}

/// Resolves when the job's cancellation flag is raised. Pends forever
/// if the tracker entry is gone, which only happens at shutdown.
async fn cancel_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
