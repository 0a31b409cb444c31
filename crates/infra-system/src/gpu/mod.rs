//! GPU VRAM monitoring across vendors
//!
//! The vendor is detected once per `GpuMonitor` (NVIDIA, then AMD, then
//! Intel presence-only, else none) and the matching `VramProvider` is
//! reused for every later query. All failures degrade to zero usage.

mod amd;
mod detect;
mod nvidia;

pub use amd::AmdVram;
pub use detect::detect_vendor;
pub use nvidia::NvidiaVram;

use arbiter_core::application::constants::COMMAND_TIMEOUT;
use arbiter_core::domain::VramUsage;
use arbiter_core::port::{CommandRunner, GpuProbe};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// Detected GPU vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    /// Present, but no VRAM tooling
    Intel,
    None,
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "nvidia"),
            GpuVendor::Amd => write!(f, "amd"),
            GpuVendor::Intel => write!(f, "intel"),
            GpuVendor::None => write!(f, "none"),
        }
    }
}

/// Vendor-specific VRAM query. Must enforce its own timeout and never fail.
#[async_trait]
pub trait VramProvider: Send + Sync {
    fn vendor(&self) -> GpuVendor;

    async fn query(&self) -> VramUsage;
}

/// Provider for Intel-only or GPU-less hosts
pub struct NoVram(pub GpuVendor);

#[async_trait]
impl VramProvider for NoVram {
    fn vendor(&self) -> GpuVendor {
        self.0
    }

    async fn query(&self) -> VramUsage {
        VramUsage::zero()
    }
}

/// `GpuProbe` that detects the vendor lazily and memoizes the provider
pub struct GpuMonitor {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    provider: OnceCell<Box<dyn VramProvider>>,
}

impl GpuMonitor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_timeout(runner, COMMAND_TIMEOUT)
    }

    pub fn with_timeout(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            provider: OnceCell::new(),
        }
    }

    async fn provider(&self) -> &dyn VramProvider {
        self.provider
            .get_or_init(|| async {
                let vendor = detect_vendor(self.runner.as_ref(), self.timeout).await;
                info!(vendor = %vendor, "GPU vendor detected");
                self.build_provider(vendor)
            })
            .await
            .as_ref()
    }

    fn build_provider(&self, vendor: GpuVendor) -> Box<dyn VramProvider> {
        match vendor {
            GpuVendor::Nvidia => Box::new(NvidiaVram::new(self.runner.clone(), self.timeout)),
            GpuVendor::Amd => Box::new(AmdVram::new(self.runner.clone(), self.timeout)),
            other => Box::new(NoVram(other)),
        }
    }

    /// Detected vendor (runs detection on first call)
    pub async fn vendor(&self) -> GpuVendor {
        self.provider().await.vendor()
    }
}

#[async_trait]
impl GpuProbe for GpuMonitor {
    async fn vram(&self) -> VramUsage {
        self.provider().await.query().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::port::command_runner::mocks::MockCommandRunner;

    const NVIDIA_DETECT: &str = "nvidia-smi --query-gpu=name --format=csv,noheader";
    const NVIDIA_QUERY: &str =
        "nvidia-smi --query-gpu=memory.used,memory.total --format=csv,noheader,nounits";

    #[tokio::test]
    async fn test_detection_runs_once() {
        let runner = Arc::new(
            MockCommandRunner::new()
                .on(NVIDIA_DETECT, "NVIDIA GeForce RTX 4090\n")
                .on(NVIDIA_QUERY, "1024, 24564\n"),
        );
        let monitor = GpuMonitor::new(runner.clone());

        assert_eq!(monitor.vram().await, VramUsage::new(1024, 24564));
        assert_eq!(monitor.vram().await, VramUsage::new(1024, 24564));
        assert_eq!(monitor.vendor().await, GpuVendor::Nvidia);

        assert_eq!(runner.call_count(NVIDIA_DETECT), 1);
        assert_eq!(runner.call_count(NVIDIA_QUERY), 2);
    }

    #[tokio::test]
    async fn test_no_gpu_yields_zero() {
        let runner = Arc::new(MockCommandRunner::new());
        let monitor = GpuMonitor::new(runner.clone());

        assert_eq!(monitor.vram().await, VramUsage::zero());
        assert_eq!(monitor.vendor().await, GpuVendor::None);

        // Detection tried every tool exactly once, and was not repeated
        monitor.vram().await;
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_intel_has_no_vram() {
        let runner = Arc::new(MockCommandRunner::new().on(
            "lspci",
            "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620\n",
        ));
        let monitor = GpuMonitor::new(runner);

        assert_eq!(monitor.vendor().await, GpuVendor::Intel);
        assert_eq!(monitor.vram().await, VramUsage::zero());
    }

    #[tokio::test]
    async fn test_vendor_query_failure_degrades_to_zero() {
        let runner = Arc::new(
            MockCommandRunner::new()
                .on(NVIDIA_DETECT, "Tesla T4\n")
                .fail(NVIDIA_QUERY),
        );
        let monitor = GpuMonitor::new(runner);

        assert_eq!(monitor.vram().await, VramUsage::zero());
    }
}
