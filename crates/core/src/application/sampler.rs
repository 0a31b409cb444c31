//! Metrics Sampler - cached CPU/RAM/VRAM snapshots
//!
//! Combines a host probe (CPU + RAM) and a GPU probe (VRAM) into one
//! immutable `ResourceMetrics`. Snapshots are reused for a short TTL so
//! frequent admission checks do not hammer the host; failures are logged
//! and masked with a simulated snapshot.

use crate::application::constants::METRICS_CACHE_TTL;
use crate::domain::ResourceMetrics;
use crate::port::{GpuProbe, HostProbe, MetricsSource, TimeProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// CPU load at which a saturation warning is emitted
const CPU_SATURATION_WARN_PERCENT: f32 = 99.0;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub cache_ttl: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: METRICS_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedSnapshot {
    taken_at: i64,
    metrics: ResourceMetrics,
}

/// Sampler shared by every consumer of host metrics
pub struct MetricsSampler {
    host: Arc<dyn HostProbe>,
    gpu: Arc<dyn GpuProbe>,
    time_provider: Arc<dyn TimeProvider>,
    config: SamplerConfig,
    last: Mutex<Option<CachedSnapshot>>,
}

impl MetricsSampler {
    pub fn new(
        host: Arc<dyn HostProbe>,
        gpu: Arc<dyn GpuProbe>,
        time_provider: Arc<dyn TimeProvider>,
        config: SamplerConfig,
    ) -> Self {
        Self {
            host,
            gpu,
            time_provider,
            config,
            last: Mutex::new(None),
        }
    }

    fn cached(&self, now: i64) -> Option<CachedSnapshot> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.filter(|snap| now - snap.taken_at < self.config.cache_ttl.as_millis() as i64)
    }

    fn previous(&self) -> Option<CachedSnapshot> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self, snapshot: CachedSnapshot) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }

    async fn refresh(&self, now: i64) -> ResourceMetrics {
        let (host, vram) = tokio::join!(self.host.cpu_and_memory(), self.gpu.vram());

        let host = match host {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "Failed to read host metrics, using simulated snapshot");
                return ResourceMetrics::simulated();
            }
        };

        let metrics = ResourceMetrics {
            cpu_load_percent: host.cpu_load_percent,
            ram_used_bytes: host.ram_used_bytes,
            ram_total_bytes: host.ram_total_bytes,
            vram_used_mb: vram.used_mb,
            vram_total_mb: vram.total_mb,
        };

        // Warn on the transition into saturation only
        let was_saturated = self
            .previous()
            .map(|p| p.metrics.cpu_load_percent >= CPU_SATURATION_WARN_PERCENT)
            .unwrap_or(false);
        if metrics.cpu_load_percent >= CPU_SATURATION_WARN_PERCENT && !was_saturated {
            warn!(cpu = %metrics.cpu_load_percent, "CPU load saturated");
        }

        debug!(
            cpu = %metrics.cpu_load_percent,
            ram_percent = %format!("{:.1}", metrics.ram_usage_percent()),
            vram_used_mb = metrics.vram_used_mb,
            vram_total_mb = metrics.vram_total_mb,
            "Resource metrics refreshed"
        );

        self.store(CachedSnapshot {
            taken_at: now,
            metrics,
        });
        metrics
    }
}

#[async_trait]
impl MetricsSource for MetricsSampler {
    async fn sample(&self) -> ResourceMetrics {
        let now = self.time_provider.now_millis();
        if let Some(snap) = self.cached(now) {
            return snap.metrics;
        }
        self.refresh(now).await
    }
}
