// NVIDIA VRAM via nvidia-smi

use super::{GpuVendor, VramProvider};
use arbiter_core::domain::VramUsage;
use arbiter_core::port::CommandRunner;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const QUERY_ARGS: &[&str] = &[
    "--query-gpu=memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

pub struct NvidiaVram {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl NvidiaVram {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }
}

/// Parse `used, total` CSV lines (MB), one per device, summed across devices.
/// Any malformed line invalidates the whole reading.
pub(crate) fn parse_memory_csv(stdout: &str) -> Option<VramUsage> {
    let mut usage = VramUsage::zero();
    let mut devices = 0;

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split(',').map(str::trim);
        let used = fields.next()?.parse::<u64>().ok()?;
        let total = fields.next()?.parse::<u64>().ok()?;
        usage.used_mb += used;
        usage.total_mb += total;
        devices += 1;
    }

    (devices > 0).then_some(usage)
}

#[async_trait]
impl VramProvider for NvidiaVram {
    fn vendor(&self) -> GpuVendor {
        GpuVendor::Nvidia
    }

    async fn query(&self) -> VramUsage {
        let output = match self.runner.run("nvidia-smi", QUERY_ARGS, self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "nvidia-smi memory query failed");
                return VramUsage::zero();
            }
        };

        parse_memory_csv(&output.stdout).unwrap_or_else(|| {
            debug!(stdout = %output.stdout, "Unparseable nvidia-smi output");
            VramUsage::zero()
        })
    }
}
