// GPU vendor detection

use super::GpuVendor;
use arbiter_core::port::CommandRunner;
use std::time::Duration;
use tracing::debug;

/// Probe vendor tooling in order: NVIDIA, AMD (ROCm), Intel (lspci), none
pub async fn detect_vendor(runner: &dyn CommandRunner, timeout: Duration) -> GpuVendor {
    match runner
        .run("nvidia-smi", &["--query-gpu=name", "--format=csv,noheader"], timeout)
        .await
    {
        Ok(_) => return GpuVendor::Nvidia,
        Err(e) => debug!(error = %e, "nvidia-smi unavailable"),
    }

    match runner.run("rocm-smi", &["--showproductname"], timeout).await {
        Ok(_) => return GpuVendor::Amd,
        Err(e) => debug!(error = %e, "rocm-smi unavailable"),
    }

    match runner.run("lspci", &[], timeout).await {
        Ok(output) if has_intel_display(&output.stdout) => return GpuVendor::Intel,
        Ok(_) => {}
        Err(e) => debug!(error = %e, "lspci unavailable"),
    }

    GpuVendor::None
}

/// True if any VGA/3D/display controller line mentions Intel
fn has_intel_display(lspci: &str) -> bool {
    lspci
        .lines()
        .map(str::to_ascii_lowercase)
        .filter(|line| line.contains("vga") || line.contains("3d") || line.contains("display"))
        .any(|line| line.contains("intel"))
}
