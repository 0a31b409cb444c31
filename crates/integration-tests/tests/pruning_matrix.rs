//! Lifecycle pruning through the in-memory registry

use arbiter_core::application::{LifecycleScheduler, ModePowerPolicy, PruneConfig};
use arbiter_core::domain::{SystemMode, WorkerStatus, WorkerTier};
use arbiter_core::port::hibernator::mocks::MockHibernator;
use arbiter_core::port::time_provider::mocks::MockTimeProvider;
use arbiter_core::port::{IdProvider, InMemoryWorkerRegistry, WorkerRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SECOND: i64 = 1_000;
const HOUR: i64 = 3_600 * SECOND;

#[derive(Default)]
struct SeqIds(AtomicU64);

impl IdProvider for SeqIds {
    fn generate_id(&self) -> String {
        format!("w-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

struct Harness {
    clock: Arc<MockTimeProvider>,
    registry: Arc<InMemoryWorkerRegistry>,
    hibernator: Arc<MockHibernator>,
    power: Arc<ModePowerPolicy>,
    scheduler: LifecycleScheduler,
}

fn harness(mode: SystemMode) -> Harness {
    let clock = Arc::new(MockTimeProvider::new(1_000_000));
    let registry = Arc::new(InMemoryWorkerRegistry::new(
        Arc::new(SeqIds::default()),
        clock.clone(),
    ));
    let hibernator = Arc::new(MockHibernator::new());
    let power = Arc::new(ModePowerPolicy::new(mode));
    let scheduler = LifecycleScheduler::new(
        registry.clone(),
        hibernator.clone(),
        power.clone(),
        clock.clone(),
        PruneConfig::default(),
    );
    Harness {
        clock,
        registry,
        hibernator,
        power,
        scheduler,
    }
}

async fn status_of(registry: &InMemoryWorkerRegistry, id: &str) -> WorkerStatus {
    registry.get(id).await.unwrap().status
}

#[tokio::test]
async fn test_eco_core_idle_65s_is_pruned() {
    let h = harness(SystemMode::Eco);
    let core = h.registry.register("planner", WorkerTier::Core, vec![]).await;

    h.clock.advance(65 * SECOND);

    assert_eq!(h.scheduler.prune_idle(false).await, 1);
    assert_eq!(status_of(&h.registry, &core.id).await, WorkerStatus::Hibernated);
    assert_eq!(h.hibernator.dehydrated(), vec![core.id]);
}

#[tokio::test]
async fn test_normal_core_idle_one_hour_is_kept() {
    let h = harness(SystemMode::Normal);
    let core = h.registry.register("planner", WorkerTier::Core, vec![]).await;

    h.clock.advance(HOUR);

    assert_eq!(h.scheduler.prune_idle(false).await, 0);
    assert_eq!(status_of(&h.registry, &core.id).await, WorkerStatus::Idle);
}

#[tokio::test]
async fn test_ultra_worker_idle_one_hour_is_kept() {
    let h = harness(SystemMode::Ultra);
    let w = h.registry.register("coder", WorkerTier::Worker, vec![]).await;

    h.clock.advance(HOUR);

    assert_eq!(h.scheduler.prune_idle(false).await, 0);
    assert_eq!(status_of(&h.registry, &w.id).await, WorkerStatus::Idle);
}

#[tokio::test]
async fn test_ultra_worker_forced_prune() {
    let h = harness(SystemMode::Ultra);
    let w = h.registry.register("coder", WorkerTier::Worker, vec![]).await;

    h.clock.advance(SECOND);

    assert_eq!(h.scheduler.prune_idle(true).await, 1);
    assert_eq!(status_of(&h.registry, &w.id).await, WorkerStatus::Hibernated);
}

#[tokio::test]
async fn test_active_and_hibernated_workers_never_touched() {
    let modes = [
        SystemMode::Eco,
        SystemMode::Normal,
        SystemMode::High,
        SystemMode::Ultra,
    ];
    let tiers = [WorkerTier::Core, WorkerTier::Standard, WorkerTier::Worker];

    for mode in modes {
        let h = harness(mode);
        let mut active = Vec::new();
        let mut hibernated = Vec::new();

        for tier in tiers {
            let a = h.registry.register("busy", tier, vec![]).await;
            h.registry.activate(&a.id).await.unwrap();
            active.push(a.id);

            let z = h.registry.register("asleep", tier, vec![]).await;
            h.registry.mark_hibernated(&z.id).await.unwrap();
            hibernated.push(z.id);
        }

        h.clock.advance(24 * HOUR);

        for force in [false, true] {
            assert_eq!(h.scheduler.prune_idle(force).await, 0, "mode {}", mode);
        }
        for id in &active {
            assert_eq!(status_of(&h.registry, id).await, WorkerStatus::Active);
        }
        for id in &hibernated {
            assert_eq!(status_of(&h.registry, id).await, WorkerStatus::Hibernated);
        }
        assert!(h.hibernator.dehydrated().is_empty());
    }
}

#[tokio::test]
async fn test_worker_released_back_to_idle_restarts_clock() {
    let h = harness(SystemMode::Normal);
    let w = h.registry.register("coder", WorkerTier::Worker, vec![]).await;

    h.registry.activate(&w.id).await.unwrap();
    h.clock.advance(HOUR);
    h.registry.mark_idle(&w.id).await.unwrap();

    // WORKER tier in NORMAL: 150s, counted from when it went idle
    h.clock.advance(150 * SECOND);
    assert_eq!(h.scheduler.prune_idle(false).await, 0);

    h.clock.advance(1);
    assert_eq!(h.scheduler.prune_idle(false).await, 1);
}

#[tokio::test]
async fn test_mode_switch_applies_on_next_sweep() {
    let h = harness(SystemMode::Ultra);
    let core = h.registry.register("planner", WorkerTier::Core, vec![]).await;

    h.clock.advance(2 * 60 * SECOND);
    assert_eq!(h.scheduler.prune_idle(false).await, 0);

    h.power.set_mode(SystemMode::Eco);
    assert_eq!(h.scheduler.prune_idle(false).await, 1);
    assert_eq!(status_of(&h.registry, &core.id).await, WorkerStatus::Hibernated);
}

#[tokio::test]
async fn test_failed_dehydrate_leaves_worker_idle() {
    let h = harness(SystemMode::Eco);
    let stuck = h.registry.register("stuck", WorkerTier::Standard, vec![]).await;
    let fine = h.registry.register("fine", WorkerTier::Standard, vec![]).await;
    h.hibernator.fail_for(&stuck.id);

    h.clock.advance(61 * SECOND);

    assert_eq!(h.scheduler.prune_idle(false).await, 1);
    assert_eq!(status_of(&h.registry, &stuck.id).await, WorkerStatus::Idle);
    assert_eq!(status_of(&h.registry, &fine.id).await, WorkerStatus::Hibernated);
}
