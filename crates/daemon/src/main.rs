//! Resource Arbiter - Main Entry Point
//!
//! Runs the admission reconciliation loop and the idle-worker pruning loop
//! until Ctrl+C.

mod config;
mod hibernator;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arbiter_core::application::{
    shutdown_channel, LifecycleScheduler, MetricsSampler, ModePowerPolicy, ResourceArbiter,
    SamplerConfig,
};
use arbiter_core::port::id_provider::UuidProvider;
use arbiter_core::port::time_provider::SystemTimeProvider;
use arbiter_core::port::{InMemoryWorkerRegistry, MetricsSource, PowerPolicy, TimeProvider};
use arbiter_infra_system::{GpuMonitor, SubprocessCommandRunner, SysinfoHostProbe};

use config::{DaemonConfig, LogFormat};
use hibernator::LogHibernator;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Library crates log under `arbiter_*`, the binary under `resource_arbiter`
const DEFAULT_LOG_FILTER: &str = "arbiter=info,resource_arbiter=info";

/// Install the global subscriber. The returned guard flushes the file
/// writer and must live until exit.
fn init_logging(config: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(fmt::layer().pretty())),
    };

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "arbiter.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .with(file)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (before logging, so a bad value fails fast)
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    let _log_guard = init_logging(&config)?;

    info!("Resource Arbiter v{} starting...", VERSION);
    info!(
        mode = %config.mode,
        prune_interval_secs = config.prune_interval.as_secs(),
        smart_paging = config.prune.smart_paging,
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let runner = Arc::new(SubprocessCommandRunner::default());

    let gpu = Arc::new(GpuMonitor::with_timeout(runner, config.command_timeout));
    let vendor = gpu.vendor().await;

    let sampler = Arc::new(MetricsSampler::new(
        Arc::new(SysinfoHostProbe::new()),
        gpu,
        time_provider.clone(),
        SamplerConfig::default(),
    ));

    let initial = sampler.sample().await;
    info!(
        gpu_vendor = %vendor,
        cpu_percent = initial.cpu_load_percent,
        ram_percent = initial.ram_usage_percent(),
        vram_used_mb = initial.vram_used_mb,
        vram_total_mb = initial.vram_total_mb,
        "Initial resource snapshot"
    );

    let arbiter = Arc::new(ResourceArbiter::new(
        sampler,
        time_provider.clone(),
        config.arbiter.clone(),
    ));
    let power: Arc<dyn PowerPolicy> = Arc::new(ModePowerPolicy::new(config.mode));

    // 4. Register startup workers
    let registry = Arc::new(InMemoryWorkerRegistry::new(
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));
    for seed in &config.workers {
        let worker = registry
            .register(seed.name.clone(), seed.tier, Vec::new())
            .await;
        info!(worker_id = %worker.id, worker_name = %worker.name, tier = %worker.tier, "Worker registered");
    }

    let scheduler = Arc::new(LifecycleScheduler::new(
        registry,
        Arc::new(LogHibernator),
        power.clone(),
        time_provider,
        config.prune.clone(),
    ));

    // 5. Start background loops
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    info!("Starting admission reconciler...");
    let arbiter_handle = tokio::spawn(arbiter.run(power, shutdown_rx.clone()));

    info!("Starting lifecycle scheduler...");
    let prune_handle = tokio::spawn(scheduler.run(config.prune_interval, shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = arbiter_handle.await;
        let _ = prune_handle.await;
    })
    .await;
    if joined.is_err() {
        warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Background loops did not stop in time"
        );
    }

    info!("Shutdown complete.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::{debug, Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};

    /// Records the target of every event that passes the filter
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_default_filter_keeps_daemon_and_library_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(DEFAULT_LOG_FILTER))
            .with(Targets(seen.clone()));

        tracing::subscriber::with_default(subscriber, || {
            info!("daemon event");
            info!(target: "arbiter_core::application::arbiter", "core event");
            debug!(target: "arbiter_core::application::arbiter", "below info");
            info!(target: "hyper::proto", "unrelated crate");
        });

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                module_path!().to_string(),
                "arbiter_core::application::arbiter".to_string(),
            ]
        );
    }
}
