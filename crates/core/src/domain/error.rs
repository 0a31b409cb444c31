// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid worker state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid system mode: {0}")]
    InvalidMode(String),

    #[error("Invalid worker tier: {0}")]
    InvalidTier(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
