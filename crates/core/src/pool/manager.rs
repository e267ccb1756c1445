//! Bounded pool of external-engine workers.
//!
//! Checkout capacity is a semaphore whose permits track idle slots
//! exactly: a crashed worker forgets its permit and the respawn task
//! adds one back once a replacement is up, so callers can never observe
//! more than `size` busy workers.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::metrics;

use super::config::PoolConfig;
use super::engine::{Engine, WorkerInstance};
use super::error::PoolError;
use super::types::{PoolHealth, PoolStatus, WorkerOutcome, WorkerState};

/// A checked-out worker.
///
/// Holds the slot's capacity permit; must be returned via
/// [`ProcessPoolManager::release`] so the slot's state is settled.
#[derive(Debug)]
pub struct PoolWorker {
    slot: usize,
    generation: u64,
    workspace: PathBuf,
    permit: OwnedSemaphorePermit,
}

impl PoolWorker {
    /// Slot index, for logs.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Generation of the underlying engine instance. Bumped on every
    /// respawn so stale handles are detectable.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The worker's private engine workspace (e.g. soffice profile dir).
    pub fn workspace(&self) -> &std::path::Path {
        &self.workspace
    }
}

struct Slot {
    state: WorkerState,
    generation: u64,
    last_used: DateTime<Utc>,
    instance: Option<WorkerInstance>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            state: WorkerState::Dead,
            generation: 0,
            last_used: Utc::now(),
            instance: None,
        }
    }
}

struct PoolState {
    slots: Vec<Slot>,
    health: PoolHealth,
    consecutive_spawn_failures: u32,
    draining: bool,
}

/// Owns the bounded set of engine worker slots.
pub struct ProcessPoolManager {
    config: PoolConfig,
    engine: Arc<dyn Engine>,
    state: Mutex<PoolState>,
    idle: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    total_checkouts: AtomicU64,
    total_checkout_timeouts: AtomicU64,
    total_crashes: AtomicU64,
    total_respawns: AtomicU64,
}

impl ProcessPoolManager {
    pub fn new(config: PoolConfig, engine: Arc<dyn Engine>) -> Self {
        let size = config.size;
        Self {
            config,
            engine,
            state: Mutex::new(PoolState {
                slots: (0..size).map(|_| Slot::empty()).collect(),
                health: PoolHealth::Healthy,
                consecutive_spawn_failures: 0,
                draining: false,
            }),
            idle: Arc::new(Semaphore::new(0)),
            waiting: Arc::new(AtomicUsize::new(0)),
            total_checkouts: AtomicU64::new(0),
            total_checkout_timeouts: AtomicU64::new(0),
            total_crashes: AtomicU64::new(0),
            total_respawns: AtomicU64::new(0),
        }
    }

    /// Spawns the initial worker set. Spawn failures do not abort
    /// startup: failed slots go through the regular respawn path, and
    /// the pool marks itself unhealthy if the engine never comes up.
    pub async fn start(self: &Arc<Self>) {
        info!(
            engine = self.engine.name(),
            size = self.config.size,
            "starting process pool"
        );
        for slot_idx in 0..self.config.size {
            if !self.lock_state().health.is_healthy() {
                warn!("pool unhealthy during startup, skipping remaining workers");
                break;
            }
            match self.engine.spawn(slot_idx).await {
                Ok(instance) => {
                    let mut state = self.lock_state();
                    let slot = &mut state.slots[slot_idx];
                    slot.instance = Some(instance);
                    slot.state = WorkerState::Idle;
                    state.consecutive_spawn_failures = 0;
                    drop(state);
                    self.idle.add_permits(1);
                }
                Err(e) => {
                    warn!(slot = slot_idx, "initial worker spawn failed: {}", e);
                    self.note_spawn_failure(&e.to_string());
                    self.spawn_respawn_task(slot_idx);
                }
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("pool state lock poisoned")
    }

    /// The configured checkout deadline.
    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.config.checkout_timeout_secs)
    }

    /// Blocks (cooperatively) until a worker is idle or the deadline
    /// elapses. Never exceeds `size` concurrently checked-out workers.
    pub async fn checkout(self: &Arc<Self>, deadline: Duration) -> Result<PoolWorker, PoolError> {
        {
            let state = self.lock_state();
            if state.draining {
                return Err(PoolError::Draining);
            }
            if let PoolHealth::Unhealthy { reason } = &state.health {
                return Err(PoolError::Unhealthy {
                    reason: reason.clone(),
                });
            }
        }

        let permit = match self.idle.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(PoolError::Draining),
            Err(TryAcquireError::NoPermits) => {
                let depth = self.waiting.load(Ordering::SeqCst);
                if depth >= self.config.checkout_queue_depth {
                    metrics::POOL_CHECKOUTS.with_label_values(&["rejected"]).inc();
                    return Err(PoolError::QueueFull { depth });
                }
                let _wait_guard = WaitGuard::enter(&self.waiting);
                match timeout(deadline, self.idle.clone().acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => return Err(PoolError::Draining),
                    Err(_) => {
                        self.total_checkout_timeouts.fetch_add(1, Ordering::Relaxed);
                        metrics::POOL_CHECKOUTS.with_label_values(&["timeout"]).inc();
                        return Err(PoolError::Timeout {
                            waited_secs: deadline.as_secs(),
                        });
                    }
                }
            }
        };

        let mut state = self.lock_state();
        let found = state
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.state == WorkerState::Idle);
        let (slot_idx, slot) = match found {
            Some(found) => found,
            None => {
                // A permit without an idle slot means bookkeeping drift;
                // surface it rather than hanging the caller.
                permit.forget();
                error!("pool permit acquired but no idle slot exists");
                return Err(PoolError::Unhealthy {
                    reason: "pool slot accounting inconsistent".to_string(),
                });
            }
        };

        let workspace = match &slot.instance {
            Some(instance) => instance.workspace(),
            None => {
                permit.forget();
                error!(slot = slot_idx, "idle slot has no engine instance");
                return Err(PoolError::Unhealthy {
                    reason: "pool slot accounting inconsistent".to_string(),
                });
            }
        };

        slot.state = WorkerState::Busy;
        slot.last_used = Utc::now();
        let generation = slot.generation;
        drop(state);

        self.total_checkouts.fetch_add(1, Ordering::Relaxed);
        metrics::POOL_CHECKOUTS.with_label_values(&["ok"]).inc();
        debug!(slot = slot_idx, generation, "worker checked out");

        Ok(PoolWorker {
            slot: slot_idx,
            generation,
            workspace,
            permit,
        })
    }

    /// Returns a worker. `Completed` workers are health-checked and go
    /// back to idle; crashed (or unhealthy) workers are torn down and a
    /// replacement is spawned asynchronously under a new generation.
    pub async fn release(self: &Arc<Self>, worker: PoolWorker, outcome: WorkerOutcome) {
        let PoolWorker {
            slot: slot_idx,
            generation,
            permit,
            ..
        } = worker;

        // Stale handles (slot respawned underneath the caller) carry no
        // capacity; reject them outright.
        let instance = {
            let mut state = self.lock_state();
            let slot = &mut state.slots[slot_idx];
            if slot.generation != generation || slot.state != WorkerState::Busy {
                warn!(
                    slot = slot_idx,
                    generation, "ignoring release of stale worker handle"
                );
                permit.forget();
                return;
            }
            slot.instance.take()
        };

        let Some(instance) = instance else {
            permit.forget();
            error!(slot = slot_idx, "busy slot has no engine instance");
            return;
        };

        let healthy = match outcome {
            WorkerOutcome::Crashed => false,
            WorkerOutcome::Completed => self.engine.health_check(&instance).await,
        };

        if healthy {
            let mut state = self.lock_state();
            let slot = &mut state.slots[slot_idx];
            slot.instance = Some(instance);
            slot.state = WorkerState::Idle;
            slot.last_used = Utc::now();
            drop(state);
            drop(permit);
            debug!(slot = slot_idx, generation, "worker released");
        } else {
            if outcome == WorkerOutcome::Completed {
                warn!(slot = slot_idx, generation, "worker failed post-call health check");
            }
            {
                let mut state = self.lock_state();
                state.slots[slot_idx].state = WorkerState::Dead;
            }
            permit.forget();
            self.total_crashes.fetch_add(1, Ordering::Relaxed);
            metrics::POOL_WORKER_CRASHES.inc();
            self.engine.shutdown(instance).await;
            info!(slot = slot_idx, generation, "worker torn down, respawning");
            self.spawn_respawn_task(slot_idx);
        }
    }

    /// Records a spawn failure and flips the pool unhealthy past the
    /// configured threshold.
    fn note_spawn_failure(&self, reason: &str) {
        let mut state = self.lock_state();
        state.consecutive_spawn_failures += 1;
        let failures = state.consecutive_spawn_failures;
        if failures >= self.config.spawn_failure_threshold && state.health.is_healthy() {
            let diagnostic = format!(
                "{} consecutive spawn failures (last: {})",
                failures, reason
            );
            error!("marking pool unhealthy: {}", diagnostic);
            state.health = PoolHealth::Unhealthy { reason: diagnostic };
        }
    }

    /// Spawns a background task that brings a dead slot back up,
    /// backing off between attempts and giving up once the pool is
    /// unhealthy.
    fn spawn_respawn_task(self: &Arc<Self>, slot_idx: usize) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let backoff = Duration::from_millis(pool.config.respawn_backoff_ms);
            loop {
                {
                    let state = pool.lock_state();
                    if state.draining || !state.health.is_healthy() {
                        return;
                    }
                }
                sleep(backoff).await;
                match pool.engine.spawn(slot_idx).await {
                    Ok(instance) => {
                        // The guard must not be in scope across an await,
                        // so the draining check and slot update happen in
                        // one locked block that hands back either the
                        // unused instance or the new generation.
                        let stored = {
                            let mut state = pool.lock_state();
                            if state.draining {
                                Err(instance)
                            } else {
                                let slot = &mut state.slots[slot_idx];
                                slot.instance = Some(instance);
                                slot.generation += 1;
                                slot.state = WorkerState::Idle;
                                slot.last_used = Utc::now();
                                let generation = slot.generation;
                                state.consecutive_spawn_failures = 0;
                                Ok(generation)
                            }
                        };
                        match stored {
                            Err(instance) => {
                                pool.engine.shutdown(instance).await;
                            }
                            Ok(generation) => {
                                pool.idle.add_permits(1);
                                pool.total_respawns.fetch_add(1, Ordering::Relaxed);
                                metrics::POOL_RESPAWNS.inc();
                                info!(slot = slot_idx, generation, "worker respawned");
                            }
                        }
                        return;
                    }
                    Err(e) => {
                        warn!(slot = slot_idx, "worker respawn failed: {}", e);
                        pool.note_spawn_failure(&e.to_string());
                    }
                }
            }
        });
    }

    /// Stops issuing checkouts and waits for in-flight workers, then
    /// shuts every instance down. Busy workers still running past the
    /// drain deadline are force-terminated.
    pub async fn drain(self: &Arc<Self>) {
        info!("draining process pool");
        {
            let mut state = self.lock_state();
            state.draining = true;
        }
        self.idle.close();

        let deadline = Instant::now() + Duration::from_secs(self.config.drain_timeout_secs);
        loop {
            let busy = {
                let state = self.lock_state();
                state
                    .slots
                    .iter()
                    .filter(|s| s.state == WorkerState::Busy)
                    .count()
            };
            if busy == 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!(busy, "drain deadline reached, force-terminating busy workers");
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }

        let instances: Vec<WorkerInstance> = {
            let mut state = self.lock_state();
            state
                .slots
                .iter_mut()
                .filter_map(|slot| {
                    slot.state = WorkerState::Draining;
                    slot.instance.take()
                })
                .collect()
        };
        for instance in instances {
            self.engine.shutdown(instance).await;
        }
        info!("process pool drained");
    }

    /// Snapshot of the pool for status endpoints.
    pub fn status(&self) -> PoolStatus {
        let state = self.lock_state();
        let count = |wanted: WorkerState| state.slots.iter().filter(|s| s.state == wanted).count();
        PoolStatus {
            size: self.config.size,
            idle: count(WorkerState::Idle),
            busy: count(WorkerState::Busy),
            dead: count(WorkerState::Dead),
            health: state.health.clone(),
            total_checkouts: self.total_checkouts.load(Ordering::Relaxed),
            total_checkout_timeouts: self.total_checkout_timeouts.load(Ordering::Relaxed),
            total_crashes: self.total_crashes.load(Ordering::Relaxed),
            total_respawns: self.total_respawns.load(Ordering::Relaxed),
        }
    }

    /// Current pool health.
    pub fn health(&self) -> PoolHealth {
        self.lock_state().health.clone()
    }
}

/// RAII counter for callers parked in the checkout queue.
struct WaitGuard {
    waiting: Arc<AtomicUsize>,
}

impl WaitGuard {
    fn enter(waiting: &Arc<AtomicUsize>) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self {
            waiting: Arc::clone(waiting),
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}
