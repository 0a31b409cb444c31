// Application Layer - Use Cases

pub mod arbiter;
pub mod constants;
pub mod lifecycle;
pub mod power;
pub mod sampler;
mod shutdown;

// Re-exports
pub use arbiter::{AdmissionOutcome, ArbiterConfig, ResourceArbiter};
pub use lifecycle::{IdlePolicy, LifecycleScheduler, PruneConfig};
pub use power::ModePowerPolicy;
pub use sampler::{MetricsSampler, SamplerConfig};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
