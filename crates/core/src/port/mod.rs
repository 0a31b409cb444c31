// Port Layer - Interfaces for external collaborators

pub mod command_runner;
pub mod gpu_probe;
pub mod hibernator;
pub mod host_probe;
pub mod id_provider; // For deterministic testing
pub mod metrics_source;
pub mod power_policy;
pub mod time_provider;
pub mod worker_registry;

// Re-exports
pub use command_runner::{CommandError, CommandOutput, CommandRunner};
pub use gpu_probe::GpuProbe;
pub use hibernator::{HibernateError, Hibernator};
pub use host_probe::{HostProbe, HostSample, ProbeError};
pub use id_provider::IdProvider;
pub use metrics_source::MetricsSource;
pub use power_policy::PowerPolicy;
pub use time_provider::TimeProvider;
pub use worker_registry::{InMemoryWorkerRegistry, WorkerRegistry};
