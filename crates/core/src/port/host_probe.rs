// Host probe port - CPU load and system RAM
use async_trait::async_trait;
use thiserror::Error;

/// Raw CPU/RAM reading from the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_load_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Host metrics unavailable: {0}")]
    Unavailable(String),

    #[error("Probe task failed: {0}")]
    TaskFailed(String),
}

#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn cpu_and_memory(&self) -> Result<HostSample, ProbeError>;
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Host probe returning a settable sample, or failing on demand
    pub struct MockHostProbe {
        sample: Mutex<Option<HostSample>>,
        calls: AtomicUsize,
    }

    impl MockHostProbe {
        pub fn new(cpu_load_percent: f32, ram_used_bytes: u64, ram_total_bytes: u64) -> Self {
            Self {
                sample: Mutex::new(Some(HostSample {
                    cpu_load_percent,
                    ram_used_bytes,
                    ram_total_bytes,
                })),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                sample: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_cpu_load(&self, cpu_load_percent: f32) {
            if let Some(sample) = self.sample.lock().unwrap().as_mut() {
                sample.cpu_load_percent = cpu_load_percent;
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HostProbe for MockHostProbe {
        async fn cpu_and_memory(&self) -> Result<HostSample, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sample
                .lock()
                .unwrap()
                .ok_or_else(|| ProbeError::Unavailable("mock probe offline".to_string()))
        }
    }
}
