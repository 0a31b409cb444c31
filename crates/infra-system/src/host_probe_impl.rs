// Host probe implementation
// reason: sysinfo for cross-platform CPU/RAM monitoring
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::debug;

use arbiter_core::port::host_probe::{HostProbe, HostSample, ProbeError};

/// CPU and RAM probe backed by sysinfo
///
/// Keeps one `System` alive: CPU usage is computed from the delta between
/// two refreshes, so the first reading after construction is a baseline.
pub struct SysinfoHostProbe {
    system: Arc<Mutex<System>>,
}

impl SysinfoHostProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoHostProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn read(system: &Mutex<System>) -> Result<HostSample, ProbeError> {
    let mut sys = system.lock().unwrap_or_else(|e| e.into_inner());
    sys.refresh_cpu();
    sys.refresh_memory();

    let sample = HostSample {
        cpu_load_percent: sys.global_cpu_info().cpu_usage(),
        ram_used_bytes: sys.used_memory(),
        ram_total_bytes: sys.total_memory(),
    };

    if sample.ram_total_bytes == 0 {
        return Err(ProbeError::Unavailable(
            "total memory reported as zero".to_string(),
        ));
    }
    Ok(sample)
}

#[async_trait]
impl HostProbe for SysinfoHostProbe {
    async fn cpu_and_memory(&self) -> Result<HostSample, ProbeError> {
        // sysinfo reads /proc (or platform APIs) synchronously
        let system = Arc::clone(&self.system);
        let sample = tokio::task::spawn_blocking(move || read(&system))
            .await
            .map_err(|e| ProbeError::TaskFailed(e.to_string()))??;

        debug!(
            cpu = %sample.cpu_load_percent,
            mem_used_mb = sample.ram_used_bytes / 1024 / 1024,
            mem_total_mb = sample.ram_total_bytes / 1024 / 1024,
            "Host metrics collected"
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cpu_and_memory() {
        let probe = SysinfoHostProbe::new();
        let sample = probe.cpu_and_memory().await.unwrap();

        // Basic sanity checks
        assert!(sample.cpu_load_percent >= 0.0);
        assert!(sample.cpu_load_percent <= 100.0);
        assert!(sample.ram_total_bytes > 0);
        assert!(sample.ram_used_bytes <= sample.ram_total_bytes);
    }
}
