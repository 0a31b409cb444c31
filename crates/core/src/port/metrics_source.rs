// Metrics source port - what the arbiter reads to make decisions
use crate::domain::ResourceMetrics;
use async_trait::async_trait;

/// Source of whole resource snapshots
///
/// Always yields *some* snapshot; a degraded one on failure.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> ResourceMetrics;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const GIB: u64 = 1024 * 1024 * 1024;

    /// Mock MetricsSource with adjustable RAM and CPU
    pub struct MockMetricsSource {
        metrics: Mutex<ResourceMetrics>,
        samples: AtomicUsize,
    }

    impl MockMetricsSource {
        /// `ram_ratio` is the fraction of a 16 GiB host in use
        pub fn new(ram_ratio: f64, cpu_load_percent: f32) -> Self {
            let mock = Self {
                metrics: Mutex::new(ResourceMetrics {
                    cpu_load_percent,
                    ram_used_bytes: 0,
                    ram_total_bytes: 16 * GIB,
                    vram_used_mb: 0,
                    vram_total_mb: 0,
                }),
                samples: AtomicUsize::new(0),
            };
            mock.set_ram_ratio(ram_ratio);
            mock
        }

        pub fn set_ram_ratio(&self, ram_ratio: f64) {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.ram_used_bytes = (metrics.ram_total_bytes as f64 * ram_ratio) as u64;
        }

        pub fn set_cpu_load(&self, cpu_load_percent: f32) {
            self.metrics.lock().unwrap().cpu_load_percent = cpu_load_percent;
        }

        pub fn sample_count(&self) -> usize {
            self.samples.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetricsSource for MockMetricsSource {
        async fn sample(&self) -> ResourceMetrics {
            self.samples.fetch_add(1, Ordering::SeqCst);
            *self.metrics.lock().unwrap()
        }
    }
}
