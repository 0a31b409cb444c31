//! Lifecycle Scheduler - hibernates idle workers
//!
//! Timeout matrix (idle duration before hibernation):
//!
//! | mode   | base  | CORE                 | WORKER              |
//! |--------|-------|----------------------|---------------------|
//! | ECO    | 60s   | 60s                  | 30s                 |
//! | NORMAL | 300s  | exempt unless forced | 150s                |
//! | HIGH   | 1800s | exempt unless forced | 900s                |
//! | ULTRA  | -     | exempt unless forced | exempt unless forced|
//!
//! STANDARD workers use the base timeout. A forced sweep hibernates every
//! IDLE worker. ACTIVE and HIBERNATED workers are never touched.

use crate::application::ShutdownToken;
use crate::domain::{SystemMode, Worker, WorkerStatus, WorkerTier};
use crate::error::Result;
use crate::port::{Hibernator, PowerPolicy, TimeProvider, WorkerRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Non-forced pruning rule for a (mode, tier) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    /// Never pruned unless forced
    Exempt,
    /// Pruned once idle strictly longer than this
    After(Duration),
}

impl IdlePolicy {
    pub fn for_worker(mode: SystemMode, tier: WorkerTier) -> Self {
        if mode == SystemMode::Ultra {
            return IdlePolicy::Exempt;
        }
        let base = mode.base_idle_timeout();
        match tier {
            WorkerTier::Core if mode != SystemMode::Eco => IdlePolicy::Exempt,
            WorkerTier::Worker => IdlePolicy::After(base / 2),
            _ => IdlePolicy::After(base),
        }
    }

    fn is_due(&self, idle_ms: i64) -> bool {
        match self {
            IdlePolicy::Exempt => false,
            IdlePolicy::After(timeout) => idle_ms > timeout.as_millis() as i64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// When off, only forced sweeps hibernate anything
    pub smart_paging: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self { smart_paging: true }
    }
}

pub struct LifecycleScheduler {
    registry: Arc<dyn WorkerRegistry>,
    hibernator: Arc<dyn Hibernator>,
    power: Arc<dyn PowerPolicy>,
    time_provider: Arc<dyn TimeProvider>,
    config: PruneConfig,
    /// Serializes sweeps (timer and forced)
    sweep_gate: Mutex<()>,
}

impl LifecycleScheduler {
    pub fn new(
        registry: Arc<dyn WorkerRegistry>,
        hibernator: Arc<dyn Hibernator>,
        power: Arc<dyn PowerPolicy>,
        time_provider: Arc<dyn TimeProvider>,
        config: PruneConfig,
    ) -> Self {
        Self {
            registry,
            hibernator,
            power,
            time_provider,
            config,
            sweep_gate: Mutex::new(()),
        }
    }

    /// Hibernate idle workers whose timeout elapsed (or all idle workers if `force`).
    ///
    /// Returns how many workers were hibernated in this sweep. A failure on
    /// one worker is logged and the sweep continues.
    pub async fn prune_idle(&self, force: bool) -> usize {
        if !self.config.smart_paging && !force {
            return 0;
        }

        let _sweep = self.sweep_gate.lock().await;
        let mode = self.power.mode();
        let now = self.time_provider.now_millis();
        let mut pruned = 0;

        for worker in self.registry.list().await {
            if worker.status != WorkerStatus::Idle {
                continue;
            }

            let idle_ms = worker.idle_for_ms(now);
            let policy = IdlePolicy::for_worker(mode, worker.tier);
            if !force && !policy.is_due(idle_ms) {
                continue;
            }

            match self.hibernate(&worker).await {
                Ok(()) => {
                    debug!(
                        worker_id = %worker.id,
                        tier = %worker.tier,
                        idle_ms = idle_ms,
                        "Worker hibernated"
                    );
                    pruned += 1;
                }
                Err(e) => {
                    warn!(worker_id = %worker.id, error = %e, "Failed to hibernate worker");
                }
            }
        }

        if pruned > 0 {
            info!(pruned = pruned, mode = %mode, forced = force, "Pruned idle workers");
        }
        pruned
    }

    /// Claim the worker (IDLE -> HIBERNATED) before dehydrating it.
    ///
    /// Once claimed, a concurrent wake goes through HIBERNATED -> ACTIVE and
    /// another sweep cannot claim it again. A failed dehydrate rolls the
    /// claim back to IDLE.
    async fn hibernate(&self, worker: &Worker) -> Result<()> {
        self.registry.mark_hibernated(&worker.id).await?;

        if let Err(e) = self.hibernator.dehydrate(worker).await {
            if let Err(rollback) = self.registry.restore_idle(&worker.id).await {
                warn!(
                    worker_id = %worker.id,
                    error = %rollback,
                    "Could not restore worker to IDLE after failed dehydrate"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Periodic pruning loop (background task)
    pub async fn run(self: Arc<Self>, every: Duration, mut shutdown: ShutdownToken) {
        info!(interval_secs = every.as_secs(), "Lifecycle scheduler started");
        let mut tick = interval(every);
        // First tick fires immediately; skip it so fresh workers get their full timeout
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.prune_idle(false).await;
                }
                _ = shutdown.wait() => break,
            }
        }
        info!("Lifecycle scheduler stopped");
    }
}
