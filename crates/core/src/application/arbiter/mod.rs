//! Resource Arbiter - admission control for waking workers
//!
//! Decides whether a worker may become active based on live host metrics.
//! Requests that cannot be admitted wait in a priority queue until a
//! reconciliation tick (periodic loop or `release()`) finds headroom.

mod queue;

pub use queue::{AdmissionOutcome, AdmissionQueue, Resolved};

use crate::application::constants::{
    CRITICAL_RAM_CEILING, MAX_CPU_PERCENT, MAX_RAM_RATIO, STARTUP_GRACE_PERIOD,
};
use crate::application::ShutdownToken;
use crate::domain::{AdmissionPriority, ResourceMetrics, Worker, WorkerId};
use crate::error::{AppError, Result};
use crate::port::{MetricsSource, PowerPolicy, TimeProvider};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Admission thresholds
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Queue non-critical requests above this RAM ratio
    pub max_ram_ratio: f64,
    /// Queue non-critical requests above this CPU load (percent)
    pub max_cpu_percent: f32,
    /// CRITICAL requests are admitted immediately below this RAM ratio
    pub critical_ram_ceiling: f64,
    /// Everything is admitted while process uptime is below this
    pub startup_grace: Duration,
    /// `None` keeps queued requests waiting until admitted
    pub max_queue_wait: Option<Duration>,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            max_ram_ratio: MAX_RAM_RATIO,
            max_cpu_percent: MAX_CPU_PERCENT,
            critical_ram_ceiling: CRITICAL_RAM_CEILING,
            startup_grace: STARTUP_GRACE_PERIOD,
            max_queue_wait: None,
        }
    }
}

impl ArbiterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_ram_ratio > 0.0 && self.max_ram_ratio <= 1.0) {
            return Err(AppError::Config(format!(
                "max_ram_ratio must be in (0, 1], got {}",
                self.max_ram_ratio
            )));
        }
        if !(self.critical_ram_ceiling >= self.max_ram_ratio && self.critical_ram_ceiling <= 1.0) {
            return Err(AppError::Config(format!(
                "critical_ram_ceiling must be in [max_ram_ratio, 1], got {}",
                self.critical_ram_ceiling
            )));
        }
        if !(self.max_cpu_percent > 0.0 && self.max_cpu_percent <= 100.0) {
            return Err(AppError::Config(format!(
                "max_cpu_percent must be in (0, 100], got {}",
                self.max_cpu_percent
            )));
        }
        if self.max_queue_wait == Some(Duration::ZERO) {
            return Err(AppError::Config("max_queue_wait must be positive".to_string()));
        }
        Ok(())
    }
}

fn ram_percent(metrics: &ResourceMetrics) -> String {
    format!("{:.1}", metrics.ram_usage_percent())
}

/// Process-wide admission gate. Construct once and share via `Arc`.
pub struct ResourceArbiter {
    metrics: Arc<dyn MetricsSource>,
    time_provider: Arc<dyn TimeProvider>,
    config: ArbiterConfig,
    started_at_ms: i64,
    queue: Mutex<AdmissionQueue>,
    // Held for a whole reconciliation tick so ticks never interleave
    tick_gate: tokio::sync::Mutex<()>,
}

impl ResourceArbiter {
    /// Create a new arbiter; uptime for the startup grace period counts from now
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        time_provider: Arc<dyn TimeProvider>,
        config: ArbiterConfig,
    ) -> Self {
        let started_at_ms = time_provider.now_millis();
        info!(
            max_ram_percent = config.max_ram_ratio * 100.0,
            max_cpu_percent = config.max_cpu_percent,
            grace_secs = config.startup_grace.as_secs(),
            max_queue_wait_secs = ?config.max_queue_wait.map(|d| d.as_secs()),
            "Resource arbiter initialized"
        );
        Self {
            metrics,
            time_provider,
            config,
            started_at_ms,
            queue: Mutex::new(AdmissionQueue::new()),
            tick_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn queue(&self) -> MutexGuard<'_, AdmissionQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn uptime(&self) -> Duration {
        let elapsed = self.time_provider.now_millis() - self.started_at_ms;
        Duration::from_millis(elapsed.max(0) as u64)
    }

    fn has_headroom(&self, metrics: &ResourceMetrics) -> bool {
        metrics.ram_usage_ratio() < self.config.max_ram_ratio
            && metrics.cpu_load_percent < self.config.max_cpu_percent
    }

    fn is_overloaded(&self, metrics: &ResourceMetrics) -> bool {
        metrics.ram_usage_ratio() > self.config.max_ram_ratio
            || metrics.cpu_load_percent > self.config.max_cpu_percent
    }

    /// Ask for permission to activate `worker`.
    ///
    /// Resolves immediately when resources allow, otherwise suspends until
    /// a reconciliation tick admits the request. Returns `false` only when
    /// a `max_queue_wait` is configured and expires.
    pub async fn request_admission(&self, worker: &Worker, priority: AdmissionPriority) -> bool {
        self.request_admission_outcome(worker, priority)
            .await
            .is_admitted()
    }

    /// Same as `request_admission` but reports how a queued request ended
    pub async fn request_admission_outcome(
        &self,
        worker: &Worker,
        priority: AdmissionPriority,
    ) -> AdmissionOutcome {
        let metrics = self.metrics.sample().await;
        let ram_ratio = metrics.ram_usage_ratio();

        if priority == AdmissionPriority::Critical && ram_ratio < self.config.critical_ram_ceiling
        {
            info!(
                worker_id = %worker.id,
                priority = %priority,
                ram_percent = %ram_percent(&metrics),
                "Admitted critical request"
            );
            return AdmissionOutcome::Admitted;
        }

        if self.uptime() < self.config.startup_grace {
            info!(
                worker_id = %worker.id,
                priority = %priority,
                ram_percent = %ram_percent(&metrics),
                "Admitted during startup grace period"
            );
            return AdmissionOutcome::Admitted;
        }

        if self.is_overloaded(&metrics) {
            let rx = {
                let mut queue = self.queue();
                let rx = queue.push(worker.id.clone(), priority, self.time_provider.now_millis());
                info!(
                    worker_id = %worker.id,
                    worker = %worker.name,
                    priority = %priority,
                    ram_percent = %ram_percent(&metrics),
                    cpu = %metrics.cpu_load_percent,
                    queue_len = queue.len(),
                    "Queuing admission request"
                );
                rx
            };
            // The sender only disappears if the arbiter itself is dropped
            return rx.await.unwrap_or(AdmissionOutcome::Cancelled);
        }

        info!(
            worker_id = %worker.id,
            priority = %priority,
            ram_percent = %ram_percent(&metrics),
            "Admitted immediately"
        );
        AdmissionOutcome::Admitted
    }

    /// Signal that a worker freed resources; runs one reconciliation tick
    pub async fn release(&self) -> Option<WorkerId> {
        self.reconcile().await
    }

    /// One reconciliation tick: admit at most one queued request.
    ///
    /// Returns the admitted worker ID, if any.
    pub async fn reconcile(&self) -> Option<WorkerId> {
        let _tick = self.tick_gate.lock().await;
        let now = self.time_provider.now_millis();

        {
            let mut queue = self.queue();
            for resolved in queue.purge_cancelled(now) {
                debug!(
                    worker_id = %resolved.worker_id,
                    priority = %resolved.priority,
                    waited_ms = resolved.waited_ms,
                    "Dropped cancelled admission request"
                );
            }
            if let Some(max_wait) = self.config.max_queue_wait {
                for resolved in queue.expire(now, max_wait) {
                    warn!(
                        worker_id = %resolved.worker_id,
                        priority = %resolved.priority,
                        waited_ms = resolved.waited_ms,
                        "Admission request timed out in queue"
                    );
                }
            }
            if queue.is_empty() {
                return None;
            }
        }

        let metrics = self.metrics.sample().await;
        if !self.has_headroom(&metrics) {
            debug!(
                ram_percent = %ram_percent(&metrics),
                cpu = %metrics.cpu_load_percent,
                queue_len = self.queue_len(),
                "No headroom, admission queue held"
            );
            return None;
        }

        let (admitted, cancelled) = self.queue().admit_head(now);
        for resolved in cancelled {
            debug!(
                worker_id = %resolved.worker_id,
                priority = %resolved.priority,
                "Skipped cancelled admission request"
            );
        }

        let admitted = admitted?;
        info!(
            worker_id = %admitted.worker_id,
            priority = %admitted.priority,
            ram_percent = %ram_percent(&metrics),
            waited_ms = admitted.waited_ms,
            queue_len = self.queue_len(),
            "Admitted from queue"
        );
        Some(admitted.worker_id)
    }

    /// Number of requests currently waiting
    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    /// Waiting requests in drain order
    pub fn queue_snapshot(&self) -> Vec<(WorkerId, AdmissionPriority)> {
        self.queue().snapshot()
    }

    /// Reconciliation loop (background task)
    ///
    /// The interval is re-read from the power policy on every tick.
    /// Should be spawned in tokio::spawn
    pub async fn run(self: Arc<Self>, policy: Arc<dyn PowerPolicy>, mut shutdown: ShutdownToken) {
        info!(
            interval_ms = policy.reconcile_interval().as_millis() as u64,
            "Admission queue processor started"
        );
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = sleep(policy.reconcile_interval()) => {
                    self.reconcile().await;
                }
                _ = shutdown.wait() => break,
            }
        }
        info!(pending = self.queue_len(), "Admission queue processor stopped");
    }
}
