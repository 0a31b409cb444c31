// Domain Layer - Pure decision inputs and entities

pub mod admission;
pub mod error;
pub mod metrics;
pub mod mode;
pub mod worker;

// Re-exports
pub use admission::AdmissionPriority;
pub use error::DomainError;
pub use metrics::{ResourceMetrics, VramUsage};
pub use mode::SystemMode;
pub use worker::{Worker, WorkerId, WorkerStatus, WorkerTier};
