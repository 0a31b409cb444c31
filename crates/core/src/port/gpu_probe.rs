// GPU memory probe port
use crate::domain::VramUsage;
use async_trait::async_trait;

/// VRAM query. Implementations never fail: tool errors, timeouts and
/// malformed output all normalise to `VramUsage::zero()`.
#[async_trait]
pub trait GpuProbe: Send + Sync {
    async fn vram(&self) -> VramUsage;
}

/// Probe for hosts without GPU tooling
pub struct NoGpuProbe;

#[async_trait]
impl GpuProbe for NoGpuProbe {
    async fn vram(&self) -> VramUsage {
        VramUsage::zero()
    }
}
